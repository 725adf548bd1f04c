use std::fmt;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::protocol::{
    CompanyNameCandidate, CompanySubmission, CreatedCompany, LocationCandidate, ServiceCatalog,
};

pub mod catalog;
pub mod draft;
pub mod editor;
pub mod error;
pub mod http;
pub mod notify;
pub mod search;
pub mod selection;
pub mod session;
pub mod submission;
pub mod validation;

pub use catalog::ReferenceCatalogCache;
pub use draft::{CompanyDraft, CounterpartName, ProjectDraft};
pub use editor::{ProjectEditor, ProjectForm};
pub use error::{CatalogError, EditorError, SelectionError, SessionError, SubmitError};
pub use http::HttpDirectoryApi;
pub use notify::{Notification, NotificationQueue, Severity};
pub use search::{DebouncedSearch, SearchRole};
pub use selection::ReferenceSelection;
pub use session::{
    AuthoringOptions, AuthoringSession, CatalogState, CounterpartRole, SearchKey, SessionEvent,
};
pub use submission::{SubmissionOrchestrator, SubmissionPhase};
pub use validation::ValidationErrorSet;

/// Backend calls the authoring core depends on.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn search_locations(&self, term: &str) -> Result<Vec<LocationCandidate>>;
    async fn search_companies_by_name(&self, term: &str) -> Result<Vec<CompanyNameCandidate>>;
    async fn load_service_catalog(&self) -> Result<ServiceCatalog>;
    async fn submit_company(
        &self,
        payload: &CompanySubmission,
        credential: &Credential,
    ) -> std::result::Result<CreatedCompany, SubmitError>;
}

pub struct MissingDirectoryApi;

#[async_trait]
impl DirectoryApi for MissingDirectoryApi {
    async fn search_locations(&self, _term: &str) -> Result<Vec<LocationCandidate>> {
        Err(anyhow!("directory backend is unavailable"))
    }

    async fn search_companies_by_name(&self, _term: &str) -> Result<Vec<CompanyNameCandidate>> {
        Err(anyhow!("directory backend is unavailable"))
    }

    async fn load_service_catalog(&self) -> Result<ServiceCatalog> {
        Err(anyhow!("directory backend is unavailable"))
    }

    async fn submit_company(
        &self,
        _payload: &CompanySubmission,
        _credential: &Credential,
    ) -> std::result::Result<CreatedCompany, SubmitError> {
        Err(SubmitError::Transport(
            "directory backend is unavailable".to_string(),
        ))
    }
}

/// Receives the created record once a submission succeeds.
pub trait Navigator: Send + Sync {
    fn company_created(&self, record: &CreatedCompany);
}

/// Opaque session credential, forwarded to the backend unmodified.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
