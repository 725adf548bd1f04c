use std::{collections::BTreeSet, fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client_core::{
    editor::CommitOutcome, AuthoringSession, CatalogState, CounterpartName, CounterpartRole,
    Credential, DirectoryApi, HttpDirectoryApi, MissingDirectoryApi, Navigator, SubmissionPhase,
};
use serde::Deserialize;
use shared::{
    domain::{ClientType, CompanySize, ServiceId},
    protocol::{CreatedCompany, LocationCandidate},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(about = "Author company profiles against the directory backend")]
struct Args {
    /// Overrides the configured directory API base URL.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the grouped service catalog.
    Catalog,
    SearchLocations {
        term: String,
    },
    SearchCompanies {
        term: String,
    },
    /// Replay a JSON company draft through an authoring session and submit it.
    Submit {
        #[arg(long)]
        draft: PathBuf,
        #[arg(long)]
        credential: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct DraftDocument {
    name: String,
    #[serde(default)]
    description: String,
    founded_year: Option<i32>,
    #[serde(default)]
    address: String,
    location: Option<LocationCandidate>,
    size: Option<CompanySize>,
    #[serde(default)]
    website: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    service_ids: BTreeSet<ServiceId>,
    #[serde(default)]
    projects: Vec<ProjectDocument>,
}

#[derive(Debug, Deserialize)]
struct ProjectDocument {
    name: String,
    #[serde(default)]
    description: String,
    start_date: Option<NaiveDate>,
    completion_date: Option<NaiveDate>,
    #[serde(default)]
    technologies: Vec<String>,
    client: Option<String>,
    provider: Option<String>,
    client_type: Option<ClientType>,
    #[serde(default)]
    service_ids: BTreeSet<ServiceId>,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    is_published: bool,
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn company_created(&self, record: &CreatedCompany) {
        info!(company_id = %record.id, "navigating to company page");
        println!("created company {} (id={})", record.name, record.id);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    let api = directory(&settings)?;

    match args.command {
        Command::Catalog => {
            let catalog = api.load_service_catalog().await?;
            for category in &catalog.categories {
                println!("{}", category.name);
                for service in &category.services {
                    println!("  [{}] {}", service.id, service.name);
                }
            }
        }
        Command::SearchLocations { term } => {
            for location in api.search_locations(&term).await? {
                println!("[{}] {}", location.id, location.label());
            }
        }
        Command::SearchCompanies { term } => {
            for company in api.search_companies_by_name(&term).await? {
                println!("[{}] {}", company.id, company.name);
            }
        }
        Command::Submit { draft, credential } => {
            let credential = credential
                .or_else(|| settings.credential.clone())
                .context("a credential is required; pass --credential or set DIRECTORY_CREDENTIAL")?;
            let raw = fs::read_to_string(&draft)
                .with_context(|| format!("failed to read draft '{}'", draft.display()))?;
            let document: DraftDocument =
                serde_json::from_str(&raw).context("draft is not a valid company document")?;
            submit(
                api,
                Arc::new(PrintNavigator),
                &settings,
                document,
                Credential::new(credential),
            )
            .await?;
        }
    }

    Ok(())
}

fn directory(settings: &Settings) -> Result<Arc<dyn DirectoryApi>> {
    if settings.api_url.trim().is_empty() {
        warn!("no directory API configured; every request will fail");
        return Ok(Arc::new(MissingDirectoryApi));
    }
    Ok(Arc::new(HttpDirectoryApi::new(
        settings.api_url.clone(),
        settings.request_timeout(),
    )?))
}

async fn submit(
    api: Arc<dyn DirectoryApi>,
    navigator: Arc<dyn Navigator>,
    settings: &Settings,
    document: DraftDocument,
    credential: Credential,
) -> Result<()> {
    let mut session =
        AuthoringSession::open(Arc::clone(&api), navigator, settings.authoring_options());
    session
        .pump_until(|s| !matches!(s.catalog(), CatalogState::Loading))
        .await;

    let DraftDocument {
        name,
        description,
        founded_year,
        address,
        location,
        size,
        website,
        phone,
        email,
        service_ids,
        projects,
    } = document;

    let draft = session.draft_mut();
    draft.name = name;
    draft.description = description;
    draft.founded_year = founded_year;
    draft.address = address;
    draft.size = size;
    draft.website = website;
    draft.phone = phone;
    draft.email = email;
    if let Some(location) = location {
        session.select_location(location);
    }
    if services_available(&session, service_ids.len(), "company") {
        let mut services = session.company_services();
        for id in service_ids {
            if !services.contains(id) {
                services.toggle(id)?;
            }
        }
    }
    for (index, project) in projects.into_iter().enumerate() {
        replay_project(&mut session, api.as_ref(), index, project).await?;
    }

    session.submit(credential)?;
    session.pump_until(|s| s.phase().is_terminal()).await;

    let outcome = match session.phase() {
        SubmissionPhase::Succeeded(_) => {
            if let Some(notification) = session.notifications().visible() {
                println!("{}", notification.message);
            }
            Ok(())
        }
        phase => {
            for line in session.errors().summary() {
                eprintln!("{line}");
            }
            Err(anyhow::anyhow!("submission did not succeed: {phase:?}"))
        }
    };
    session.close();
    outcome
}

/// False when services were requested but the catalog could not be loaded.
/// The rest of the draft is still submitted.
fn services_available(session: &AuthoringSession, requested: usize, scope: &str) -> bool {
    if requested == 0 {
        return false;
    }
    if session.catalog().ready().is_none() {
        warn!(scope, requested, "service catalog unavailable; skipping service selection");
        return false;
    }
    true
}

async fn replay_project(
    session: &mut AuthoringSession,
    api: &dyn DirectoryApi,
    index: usize,
    project: ProjectDocument,
) -> Result<()> {
    let form = session.open_project_create()?;
    let draft = form.draft_mut();
    draft.name = project.name;
    draft.description = project.description;
    draft.start_date = project.start_date;
    draft.completion_date = project.completion_date;
    draft.client_type = project.client_type;
    draft.is_completed = project.is_completed;
    draft.is_published = project.is_published;
    form.set_technologies_text(&project.technologies.join(","));

    if let Some(client) = &project.client {
        replay_counterpart(session, api, CounterpartRole::Client, client).await?;
    }
    if let Some(provider) = &project.provider {
        replay_counterpart(session, api, CounterpartRole::Provider, provider).await?;
    }
    if services_available(session, project.service_ids.len(), "project") {
        let mut services = session.project_services()?;
        for id in project.service_ids {
            services.toggle(id)?;
        }
    }

    if session.commit_project()? == CommitOutcome::Rejected {
        let summary = session
            .project_form()
            .map(|form| form.errors().summary().join("; "))
            .unwrap_or_default();
        session.cancel_project();
        bail!("project {index} was rejected: {summary}");
    }
    Ok(())
}

/// Picks the directory company whose name matches exactly; otherwise keeps
/// the name as typed text.
async fn replay_counterpart(
    session: &mut AuthoringSession,
    api: &dyn DirectoryApi,
    role: CounterpartRole,
    name: &str,
) -> Result<()> {
    let typed = CounterpartName::Typed(name.to_string());
    match api.search_companies_by_name(name.trim()).await {
        Ok(candidates) => {
            if let Some(candidate) = candidates.into_iter().find(|c| typed.refers_to(&c.name)) {
                debug!(?role, company_id = %candidate.id, "counterpart matched directory company");
                session.select_counterpart(role, candidate)?;
                return Ok(());
            }
        }
        Err(err) => warn!(?role, error = %err, "company lookup failed; keeping typed name"),
    }
    session.counterpart_input(role, name)?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
