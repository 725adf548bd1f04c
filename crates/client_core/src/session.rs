//! Company authoring session.
//!
//! The session owns every piece of mutable authoring state. Asynchronous work
//! (catalog load, debounce timers, lookups, submission, notification expiry)
//! runs as tasks that report back as [`SessionEvent`]s; state only changes in
//! [`AuthoringSession::apply`], one event at a time. Dropping or closing the
//! session aborts all outstanding tasks.

use std::{future::Future, sync::Arc, time::Duration};

use shared::{
    domain::LocationId,
    protocol::{
        CompanyNameCandidate, CreatedCompany, LocationCandidate, ServiceCatalog,
    },
};
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinSet},
};
use tracing::{debug, info, warn};

use crate::{
    catalog::ReferenceCatalogCache,
    draft::{CompanyDraft, ProjectDraft},
    editor::{CommitOutcome, ProjectEditor, ProjectForm},
    error::{CatalogError, EditorError, SessionError, SubmitError},
    notify::{Notification, NotificationQueue, Severity},
    search::{DebouncedSearch, SearchRole},
    selection::ReferenceSelection,
    submission::{SubmissionOrchestrator, SubmissionPhase, SubmissionResolution},
    validation::ValidationErrorSet,
    Credential, DirectoryApi, Navigator,
};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_MIN_QUERY_LEN: usize = 2;
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct AuthoringOptions {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub notification_timeout: Duration,
}

impl Default for AuthoringOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            notification_timeout: DEFAULT_NOTIFICATION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterpartRole {
    Client,
    Provider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKey {
    Location,
    Counterpart(CounterpartRole),
}

#[derive(Debug)]
pub enum SessionEvent {
    CatalogResolved {
        epoch: u64,
        result: Result<Arc<ServiceCatalog>, CatalogError>,
    },
    DebounceElapsed {
        key: SearchKey,
        generation: u64,
    },
    LocationsResolved {
        generation: u64,
        result: Result<Vec<LocationCandidate>, String>,
    },
    CompaniesResolved {
        role: CounterpartRole,
        generation: u64,
        result: Result<Vec<CompanyNameCandidate>, String>,
    },
    SubmissionResolved {
        attempt: u64,
        result: Result<CreatedCompany, SubmitError>,
    },
    NotificationElapsed {
        id: u64,
    },
}

#[derive(Debug, Clone)]
pub enum CatalogState {
    Loading,
    Ready(Arc<ServiceCatalog>),
    Unavailable(String),
}

impl CatalogState {
    pub fn ready(&self) -> Option<&ServiceCatalog> {
        match self {
            CatalogState::Ready(catalog) => Some(catalog),
            _ => None,
        }
    }
}

/// Spawns session tasks and hands out epoch tokens.
pub(crate) struct Scheduler {
    tx: mpsc::UnboundedSender<SessionEvent>,
    tasks: JoinSet<()>,
    epoch: u64,
}

impl Scheduler {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            tx,
            tasks: JoinSet::new(),
            epoch: 0,
        }
    }

    pub(crate) fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    pub(crate) fn after(&mut self, delay: Duration, event: SessionEvent) -> AbortHandle {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            event
        })
    }

    pub(crate) fn spawn<F>(&mut self, future: F) -> AbortHandle
    where
        F: Future<Output = SessionEvent> + Send + 'static,
    {
        self.reap();
        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            let event = future.await;
            let _ = tx.send(event);
        })
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Aborts every task and forgets them.
    pub(crate) fn shutdown(&mut self) {
        self.tasks.abort_all();
        self.tasks.detach_all();
    }

    fn reap(&mut self) {
        while self.tasks.try_join_next().is_some() {}
    }
}

enum Wake {
    Event(Option<SessionEvent>),
    TaskDone,
}

pub struct AuthoringSession {
    api: Arc<dyn DirectoryApi>,
    navigator: Arc<dyn Navigator>,
    catalog_cache: Arc<ReferenceCatalogCache>,
    options: AuthoringOptions,
    scheduler: Scheduler,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    draft: CompanyDraft,
    catalog: CatalogState,
    catalog_epoch: u64,
    services_tab: Option<String>,
    location_search: DebouncedSearch<LocationCandidate>,
    editor: ProjectEditor,
    submission: SubmissionOrchestrator,
    notifications: NotificationQueue,
    closed: bool,
}

impl AuthoringSession {
    /// Opens a session and starts loading the service catalog.
    /// Must be called from within a tokio runtime.
    pub fn open(
        api: Arc<dyn DirectoryApi>,
        navigator: Arc<dyn Navigator>,
        options: AuthoringOptions,
    ) -> Self {
        let catalog_cache = ReferenceCatalogCache::new(Arc::clone(&api));
        Self::open_with_catalog(api, navigator, catalog_cache, options)
    }

    pub fn open_with_catalog(
        api: Arc<dyn DirectoryApi>,
        navigator: Arc<dyn Navigator>,
        catalog_cache: Arc<ReferenceCatalogCache>,
        options: AuthoringOptions,
    ) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let notifications = NotificationQueue::new(options.notification_timeout);
        let mut session = Self {
            api,
            navigator,
            catalog_cache,
            options,
            scheduler: Scheduler::new(tx),
            events,
            draft: CompanyDraft::default(),
            catalog: CatalogState::Loading,
            catalog_epoch: 0,
            services_tab: None,
            location_search: DebouncedSearch::new(SearchRole::Location),
            editor: ProjectEditor::new(),
            submission: SubmissionOrchestrator::new(),
            notifications,
            closed: false,
        };
        info!("authoring session opened");
        session.load_catalog();
        session
    }

    pub fn options(&self) -> &AuthoringOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn draft(&self) -> &CompanyDraft {
        &self.draft
    }

    /// Plain company fields. Location, services and projects go through
    /// their dedicated operations.
    pub fn draft_mut(&mut self) -> &mut CompanyDraft {
        &mut self.draft
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    /// Retries the catalog load after a failure. No-op while loading or loaded.
    pub fn reload_catalog(&mut self) {
        if !self.closed && matches!(self.catalog, CatalogState::Unavailable(_)) {
            self.load_catalog();
        }
    }

    pub fn company_services(&mut self) -> ReferenceSelection<'_> {
        ReferenceSelection::bind(
            &mut self.draft.service_ids,
            &mut self.services_tab,
            self.catalog.ready(),
        )
    }

    pub fn location_search(&self) -> &DebouncedSearch<LocationCandidate> {
        &self.location_search
    }

    pub fn location_input(&mut self, text: &str) {
        if self.closed {
            return;
        }
        let debounce = self.options.debounce;
        self.location_search
            .on_input(text, SearchKey::Location, debounce, &mut self.scheduler);
    }

    pub fn select_location(&mut self, candidate: LocationCandidate) {
        debug!(location_id = %candidate.id, "location selected");
        self.draft.location = Some(candidate.clone());
        self.location_search.on_select(candidate, &mut self.scheduler);
    }

    pub fn clear_location(&mut self) {
        self.draft.location = None;
        self.location_search.on_clear(&mut self.scheduler);
    }

    pub fn location_id(&self) -> Option<LocationId> {
        self.draft.location_id()
    }

    pub fn project_editor(&self) -> &ProjectEditor {
        &self.editor
    }

    pub fn project_form(&self) -> Option<&ProjectForm> {
        self.editor.form()
    }

    pub fn project_form_mut(&mut self) -> Option<&mut ProjectForm> {
        self.editor.form_mut()
    }

    pub fn open_project_create(&mut self) -> Result<&mut ProjectForm, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(self.editor.open_for_create()?)
    }

    pub fn open_project_edit(&mut self, index: usize) -> Result<&mut ProjectForm, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(self.editor.open_for_edit(&self.draft.projects, index)?)
    }

    pub fn project_services(&mut self) -> Result<ReferenceSelection<'_>, SessionError> {
        let catalog = self.catalog.ready();
        let form = self.editor.form_mut().ok_or(EditorError::NotEditing)?;
        Ok(form.services(catalog))
    }

    pub fn counterpart_input(
        &mut self,
        role: CounterpartRole,
        text: &str,
    ) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let debounce = self.options.debounce;
        let form = self.editor.form_mut().ok_or(EditorError::NotEditing)?;
        form.search_mut(role).on_input(
            text,
            SearchKey::Counterpart(role),
            debounce,
            &mut self.scheduler,
        );
        Ok(())
    }

    pub fn select_counterpart(
        &mut self,
        role: CounterpartRole,
        candidate: CompanyNameCandidate,
    ) -> Result<(), SessionError> {
        let form = self.editor.form_mut().ok_or(EditorError::NotEditing)?;
        form.search_mut(role).on_select(candidate, &mut self.scheduler);
        Ok(())
    }

    pub fn clear_counterpart(&mut self, role: CounterpartRole) -> Result<(), SessionError> {
        let form = self.editor.form_mut().ok_or(EditorError::NotEditing)?;
        form.search_mut(role).on_clear(&mut self.scheduler);
        Ok(())
    }

    pub fn commit_project(&mut self) -> Result<CommitOutcome, SessionError> {
        Ok(self.editor.commit(&mut self.draft.projects)?)
    }

    pub fn cancel_project(&mut self) -> bool {
        self.editor.cancel()
    }

    pub fn remove_project(&mut self, index: usize) -> Result<ProjectDraft, SessionError> {
        Ok(self.editor.remove(&mut self.draft.projects, index)?)
    }

    pub fn phase(&self) -> &SubmissionPhase {
        self.submission.phase()
    }

    pub fn errors(&self) -> &ValidationErrorSet {
        self.submission.errors()
    }

    /// True once after a locally blocked submission; the view scrolls to the top.
    pub fn take_focus_request(&mut self) -> bool {
        self.submission.take_focus_request()
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn dismiss_notification(&mut self) {
        if let Some(next) = self.notifications.dismiss().cloned() {
            self.schedule_expiry(&next);
        }
    }

    /// Validates the draft and, when it passes, sends it to the backend.
    pub fn submit(&mut self, credential: Credential) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if self.editor.is_open() {
            return Err(SessionError::ProjectFormOpen);
        }

        let Some((attempt, payload)) = self.submission.begin(&self.draft)? else {
            return Ok(());
        };

        let api = Arc::clone(&self.api);
        self.scheduler.spawn(async move {
            let result = api.submit_company(&payload, &credential).await;
            SessionEvent::SubmissionResolved { attempt, result }
        });
        Ok(())
    }

    /// Tears the session down. Pending work is aborted and later events ignored.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.scheduler.shutdown();
        self.submission.abandon();
        self.location_search.invalidate(&mut self.scheduler);
        self.editor.cancel();
        info!("authoring session closed");
    }

    /// Number of spawned tasks that have not been reaped yet.
    pub fn tasks_in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    /// Waits for the next event and applies it. Returns false once no task is
    /// left that could produce one.
    pub async fn pump(&mut self) -> bool {
        loop {
            if self.closed {
                return false;
            }
            if let Ok(event) = self.events.try_recv() {
                self.apply(event);
                return true;
            }
            if self.scheduler.tasks.is_empty() {
                return false;
            }

            let wake = tokio::select! {
                biased;
                event = self.events.recv() => Wake::Event(event),
                _ = self.scheduler.tasks.join_next() => Wake::TaskDone,
            };
            match wake {
                Wake::Event(Some(event)) => {
                    self.apply(event);
                    return true;
                }
                Wake::Event(None) => return false,
                Wake::TaskDone => continue,
            }
        }
    }

    /// Pumps until `done` holds or nothing is left to wait for.
    pub async fn pump_until(&mut self, mut done: impl FnMut(&Self) -> bool) -> bool {
        loop {
            if done(&*self) {
                return true;
            }
            if !self.pump().await {
                return done(&*self);
            }
        }
    }

    pub fn apply(&mut self, event: SessionEvent) {
        if self.closed {
            debug!(?event, "session closed; dropping event");
            return;
        }

        match event {
            SessionEvent::CatalogResolved { epoch, result } => self.on_catalog(epoch, result),
            SessionEvent::DebounceElapsed { key, generation } => {
                self.on_debounce(key, generation)
            }
            SessionEvent::LocationsResolved { generation, result } => {
                if self.location_search.on_response(generation, result) {
                    debug!(
                        generation,
                        results = self.location_search.results().len(),
                        "location results applied"
                    );
                }
            }
            SessionEvent::CompaniesResolved {
                role,
                generation,
                result,
            } => match self.editor.form_mut() {
                Some(form) => {
                    form.search_mut(role).on_response(generation, result);
                }
                None => debug!(?role, generation, "project form closed; dropping company results"),
            },
            SessionEvent::SubmissionResolved { attempt, result } => {
                self.on_submission(attempt, result)
            }
            SessionEvent::NotificationElapsed { id } => {
                if let Some(next) = self.notifications.expire(id).cloned() {
                    self.schedule_expiry(&next);
                }
            }
        }
    }

    fn load_catalog(&mut self) {
        self.catalog_epoch = self.scheduler.next_epoch();
        self.catalog = CatalogState::Loading;
        let epoch = self.catalog_epoch;
        let cache = Arc::clone(&self.catalog_cache);
        self.scheduler.spawn(async move {
            SessionEvent::CatalogResolved {
                epoch,
                result: cache.load().await,
            }
        });
    }

    fn on_catalog(&mut self, epoch: u64, result: Result<Arc<ServiceCatalog>, CatalogError>) {
        if epoch != self.catalog_epoch {
            return;
        }
        match result {
            Ok(catalog) => self.catalog = CatalogState::Ready(catalog),
            Err(err) => {
                warn!(error = %err, "service selection disabled");
                self.catalog = CatalogState::Unavailable(err.to_string());
                self.notify(
                    Severity::Warning,
                    "Services could not be loaded; service selection is unavailable",
                );
            }
        }
    }

    fn on_debounce(&mut self, key: SearchKey, generation: u64) {
        let min_query_len = self.options.min_query_len;
        match key {
            SearchKey::Location => {
                let Some(term) = self.location_search.on_timer(generation, min_query_len) else {
                    return;
                };
                debug!(generation, "issuing location search");
                let api = Arc::clone(&self.api);
                self.scheduler.spawn(async move {
                    let result = api
                        .search_locations(&term)
                        .await
                        .map_err(|err| err.to_string());
                    SessionEvent::LocationsResolved { generation, result }
                });
            }
            SearchKey::Counterpart(role) => {
                let Some(form) = self.editor.form_mut() else {
                    return;
                };
                let Some(term) = form.search_mut(role).on_timer(generation, min_query_len) else {
                    return;
                };
                debug!(?role, generation, "issuing company name search");
                let api = Arc::clone(&self.api);
                self.scheduler.spawn(async move {
                    let result = api
                        .search_companies_by_name(&term)
                        .await
                        .map_err(|err| err.to_string());
                    SessionEvent::CompaniesResolved {
                        role,
                        generation,
                        result,
                    }
                });
            }
        }
    }

    fn on_submission(&mut self, attempt: u64, result: Result<CreatedCompany, SubmitError>) {
        let Some(resolution) = self.submission.resolve(attempt, result) else {
            return;
        };

        match resolution {
            SubmissionResolution::Succeeded(record) => {
                self.discard_draft();
                self.notify(Severity::Success, format!("{} was created", record.name));
                self.navigator.company_created(&record);
            }
            SubmissionResolution::Rejected { fields } => {
                self.notify(
                    Severity::Error,
                    format!("The server rejected {fields} field(s); please review them"),
                );
            }
            SubmissionResolution::Failed(message) => {
                self.notify(Severity::Error, message);
            }
        }
    }

    fn discard_draft(&mut self) {
        self.draft = CompanyDraft::default();
        self.services_tab = None;
        self.location_search.on_clear(&mut self.scheduler);
        self.editor.cancel();
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        if let Some(visible) = self.notifications.push(severity, message).cloned() {
            self.schedule_expiry(&visible);
        }
    }

    fn schedule_expiry(&mut self, notification: &Notification) {
        self.scheduler.after(
            notification.timeout,
            SessionEvent::NotificationElapsed {
                id: notification.id,
            },
        );
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
