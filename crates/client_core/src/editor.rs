//! Add/edit/remove of project drafts through a detached sub-form.
//!
//! `Closed -> Editing(form) -> Closed`. The form works on its own copy of the
//! project; the committed list changes only in `commit` and `remove`.

use std::collections::BTreeSet;

use shared::{
    domain::ServiceId,
    protocol::{CompanyNameCandidate, ServiceCatalog},
};
use tracing::{debug, info};

use crate::{
    draft::{normalize_technologies, parse_technologies, CounterpartName, ProjectDraft},
    error::EditorError,
    search::{DebouncedSearch, SearchRole},
    selection::ReferenceSelection,
    session::CounterpartRole,
    validation::{validate_project, ValidationErrorSet},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Appended(usize),
    Replaced(usize),
    /// The form failed validation and stays open.
    Rejected,
}

#[derive(Debug)]
pub struct ProjectForm {
    draft: ProjectDraft,
    original_index: Option<usize>,
    client: DebouncedSearch<CompanyNameCandidate>,
    provider: DebouncedSearch<CompanyNameCandidate>,
    services_tab: Option<String>,
    errors: ValidationErrorSet,
}

impl ProjectForm {
    fn new(draft: ProjectDraft, original_index: Option<usize>) -> Self {
        let client = counterpart_search(draft.client.as_ref());
        let provider = counterpart_search(draft.provider.as_ref());
        Self {
            draft,
            original_index,
            client,
            provider,
            services_tab: None,
            errors: ValidationErrorSet::new(),
        }
    }

    pub fn draft(&self) -> &ProjectDraft {
        &self.draft
    }

    /// Plain fields of the detached copy. Counterparts are taken from the
    /// client/provider searches when the form is committed.
    pub fn draft_mut(&mut self) -> &mut ProjectDraft {
        &mut self.draft
    }

    pub fn original_index(&self) -> Option<usize> {
        self.original_index
    }

    pub fn is_new(&self) -> bool {
        self.original_index.is_none()
    }

    pub fn errors(&self) -> &ValidationErrorSet {
        &self.errors
    }

    pub fn search(&self, role: CounterpartRole) -> &DebouncedSearch<CompanyNameCandidate> {
        match role {
            CounterpartRole::Client => &self.client,
            CounterpartRole::Provider => &self.provider,
        }
    }

    pub(crate) fn search_mut(
        &mut self,
        role: CounterpartRole,
    ) -> &mut DebouncedSearch<CompanyNameCandidate> {
        match role {
            CounterpartRole::Client => &mut self.client,
            CounterpartRole::Provider => &mut self.provider,
        }
    }

    /// Replaces the technology list from comma or newline separated text.
    pub fn set_technologies_text(&mut self, raw: &str) {
        self.draft.technologies = parse_technologies(raw);
    }

    pub fn add_technology(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.draft.technologies.iter().any(|t| t == tag) {
            return false;
        }
        self.draft.technologies.push(tag.to_string());
        true
    }

    pub fn remove_technology(&mut self, index: usize) -> Option<String> {
        (index < self.draft.technologies.len()).then(|| self.draft.technologies.remove(index))
    }

    pub fn services<'a>(&'a mut self, catalog: Option<&'a ServiceCatalog>) -> ReferenceSelection<'a> {
        ReferenceSelection::bind(&mut self.draft.service_ids, &mut self.services_tab, catalog)
    }

    pub fn service_ids(&self) -> &BTreeSet<ServiceId> {
        &self.draft.service_ids
    }

    /// Counterpart the field would commit: the picked suggestion, else the typed text.
    pub fn resolved_counterpart(&self, role: CounterpartRole) -> Option<CounterpartName> {
        let search = self.search(role);
        match search.selection() {
            Some(candidate) => Some(CounterpartName::Selected(candidate.clone())),
            None => search
                .typed_fallback()
                .map(|text| CounterpartName::Typed(text.to_string())),
        }
    }

    fn finalize(&self) -> ProjectDraft {
        let mut project = self.draft.clone();
        project.client = self.resolved_counterpart(CounterpartRole::Client);
        project.provider = self.resolved_counterpart(CounterpartRole::Provider);
        project.technologies =
            normalize_technologies(project.technologies.iter().map(String::as_str));
        project
    }
}

fn counterpart_search(existing: Option<&CounterpartName>) -> DebouncedSearch<CompanyNameCandidate> {
    match existing {
        Some(CounterpartName::Selected(candidate)) => {
            DebouncedSearch::with_selection(SearchRole::CounterpartCompany, candidate.clone())
        }
        Some(CounterpartName::Typed(text)) => {
            DebouncedSearch::with_typed(SearchRole::CounterpartCompany, text.clone())
        }
        None => DebouncedSearch::new(SearchRole::CounterpartCompany),
    }
}

#[derive(Debug, Default)]
pub struct ProjectEditor {
    form: Option<Box<ProjectForm>>,
}

impl ProjectEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn form(&self) -> Option<&ProjectForm> {
        self.form.as_deref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ProjectForm> {
        self.form.as_deref_mut()
    }

    pub fn open_for_create(&mut self) -> Result<&mut ProjectForm, EditorError> {
        if self.form.is_some() {
            return Err(EditorError::AlreadyEditing);
        }
        debug!("project form opened for create");
        let form = self
            .form
            .insert(Box::new(ProjectForm::new(ProjectDraft::default(), None)));
        Ok(&mut **form)
    }

    pub fn open_for_edit(
        &mut self,
        projects: &[ProjectDraft],
        index: usize,
    ) -> Result<&mut ProjectForm, EditorError> {
        if self.form.is_some() {
            return Err(EditorError::AlreadyEditing);
        }
        let project = projects.get(index).ok_or(EditorError::IndexOutOfRange {
            index,
            len: projects.len(),
        })?;
        debug!(index, "project form opened for edit");
        let form = self
            .form
            .insert(Box::new(ProjectForm::new(project.clone(), Some(index))));
        Ok(&mut **form)
    }

    /// Validates the open form and writes it into `projects`.
    pub fn commit(&mut self, projects: &mut Vec<ProjectDraft>) -> Result<CommitOutcome, EditorError> {
        let form = self.form.as_deref_mut().ok_or(EditorError::NotEditing)?;

        let project = form.finalize();
        let errors = validate_project(&project);
        if !errors.is_empty() {
            debug!(fields = errors.field_count(), "project form rejected");
            form.errors = errors;
            return Ok(CommitOutcome::Rejected);
        }

        let outcome = match form.original_index {
            None => {
                projects.push(project);
                CommitOutcome::Appended(projects.len() - 1)
            }
            Some(index) => {
                let len = projects.len();
                let slot = projects
                    .get_mut(index)
                    .ok_or(EditorError::IndexOutOfRange { index, len })?;
                *slot = project;
                CommitOutcome::Replaced(index)
            }
        };

        self.form = None;
        info!(outcome = ?outcome, projects = projects.len(), "project committed");
        Ok(outcome)
    }

    /// Discards the open form. Returns false when nothing was open.
    pub fn cancel(&mut self) -> bool {
        let was_open = self.form.take().is_some();
        if was_open {
            debug!("project form cancelled");
        }
        was_open
    }

    pub fn remove(
        &self,
        projects: &mut Vec<ProjectDraft>,
        index: usize,
    ) -> Result<ProjectDraft, EditorError> {
        if self.form.is_some() {
            return Err(EditorError::AlreadyEditing);
        }
        if index >= projects.len() {
            return Err(EditorError::IndexOutOfRange {
                index,
                len: projects.len(),
            });
        }
        let removed = projects.remove(index);
        info!(index, projects = projects.len(), "project removed");
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;
