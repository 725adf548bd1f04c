//! Submission lifecycle:
//! `Idle -> Validating -> { Blocked | Submitting -> { Succeeded | Failed } }`.

use shared::protocol::{CompanySubmission, CreatedCompany};
use tracing::{debug, info, warn};

use crate::{
    draft::CompanyDraft,
    error::{SessionError, SubmitError},
    validation::{validate_company, ValidationErrorSet},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    /// Field errors are waiting for correction.
    Blocked,
    Submitting,
    Succeeded(CreatedCompany),
    /// Non-field failure; submitting again retries.
    Failed(String),
}

impl SubmissionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionPhase::Blocked | SubmissionPhase::Succeeded(_) | SubmissionPhase::Failed(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResolution {
    Succeeded(CreatedCompany),
    Rejected { fields: usize },
    Failed(String),
}

#[derive(Debug)]
pub struct SubmissionOrchestrator {
    phase: SubmissionPhase,
    attempt: u64,
    errors: ValidationErrorSet,
    focus_top: bool,
}

impl Default for SubmissionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionOrchestrator {
    pub fn new() -> Self {
        Self {
            phase: SubmissionPhase::Idle,
            attempt: 0,
            errors: ValidationErrorSet::new(),
            focus_top: false,
        }
    }

    pub fn phase(&self) -> &SubmissionPhase {
        &self.phase
    }

    pub fn errors(&self) -> &ValidationErrorSet {
        &self.errors
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Returns true once after local validation blocked a submission.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_top)
    }

    /// Runs local validation. `Ok(Some(..))` carries the attempt token and
    /// payload to send; `Ok(None)` means the submission was blocked locally.
    pub fn begin(
        &mut self,
        draft: &CompanyDraft,
    ) -> Result<Option<(u64, CompanySubmission)>, SessionError> {
        match self.phase {
            SubmissionPhase::Submitting => return Err(SessionError::AlreadySubmitting),
            SubmissionPhase::Succeeded(_) => return Err(SessionError::AlreadySubmitted),
            _ => {}
        }

        self.errors.clear();
        self.phase = SubmissionPhase::Validating;

        let errors = validate_company(draft);
        if !errors.is_empty() {
            debug!(fields = errors.field_count(), "submission blocked by local validation");
            self.block(errors);
            return Ok(None);
        }

        let Some(payload) = draft.to_submission() else {
            let mut errors = ValidationErrorSet::new();
            errors.set_general("The company draft is incomplete");
            self.block(errors);
            return Ok(None);
        };

        self.attempt += 1;
        self.phase = SubmissionPhase::Submitting;
        info!(
            attempt = self.attempt,
            projects = payload.projects.len(),
            services = payload.service_ids.len(),
            "submitting company"
        );
        Ok(Some((self.attempt, payload)))
    }

    /// Applies a backend result. Results for an attempt that is no longer in
    /// flight are ignored and return `None`.
    pub fn resolve(
        &mut self,
        attempt: u64,
        result: Result<CreatedCompany, SubmitError>,
    ) -> Option<SubmissionResolution> {
        if self.phase != SubmissionPhase::Submitting || attempt != self.attempt {
            debug!(attempt, current = self.attempt, "ignoring stale submission result");
            return None;
        }

        match result {
            Ok(record) => {
                info!(company_id = %record.id, "company created");
                self.phase = SubmissionPhase::Succeeded(record.clone());
                Some(SubmissionResolution::Succeeded(record))
            }
            Err(SubmitError::Validation(fields)) => {
                self.errors.merge_server_errors(&fields);
                if self.errors.is_empty() {
                    self.errors
                        .set_general("The server rejected the submission");
                }
                let fields = self.errors.field_count();
                warn!(fields, "submission rejected by server validation");
                self.phase = SubmissionPhase::Blocked;
                Some(SubmissionResolution::Rejected { fields })
            }
            Err(err) => {
                let message = format!("Submission failed: {err}");
                warn!(error = %err, "submission failed");
                self.errors.set_general(message.clone());
                self.phase = SubmissionPhase::Failed(message.clone());
                Some(SubmissionResolution::Failed(message))
            }
        }
    }

    /// Drops the in-flight attempt, if any, back to `Idle`.
    pub(crate) fn abandon(&mut self) {
        if self.phase == SubmissionPhase::Submitting {
            self.phase = SubmissionPhase::Idle;
        }
    }

    fn block(&mut self, errors: ValidationErrorSet) {
        self.errors = errors;
        self.phase = SubmissionPhase::Blocked;
        self.focus_top = true;
    }
}

#[cfg(test)]
#[path = "tests/submission_tests.rs"]
mod tests;
