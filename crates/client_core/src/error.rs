use shared::{domain::ServiceId, error::FieldErrorMap};
use thiserror::Error;

/// Failure of `DirectoryApi::submit_company`.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("server rejected {} field(s)", .0.len())]
    Validation(FieldErrorMap),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
}

impl SubmitError {
    pub fn field_errors(&self) -> Option<&FieldErrorMap> {
        match self {
            SubmitError::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(value: reqwest::Error) -> Self {
        SubmitError::Transport(value.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("service catalog unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("service catalog is not loaded")]
    CatalogUnavailable,
    #[error("service {0} is not part of the catalog")]
    UnknownService(ServiceId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("a project form is already open")]
    AlreadyEditing,
    #[error("no project form is open")]
    NotEditing,
    #[error("project index {index} is out of range for {len} project(s)")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("the company has already been submitted")]
    AlreadySubmitted,
    #[error("close the open project form before submitting")]
    ProjectFormOpen,
    #[error("the authoring session is closed")]
    Closed,
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}
