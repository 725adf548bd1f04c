use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::{
    error::FieldErrorMap,
    protocol::{
        CompanyNameCandidate, CompanySubmission, CreatedCompany, GroupedServices,
        LocationCandidate, ServiceCatalog,
    },
};
use tracing::{debug, warn};

use crate::{error::SubmitError, Credential, DirectoryApi};

const MAX_ERROR_BODY_CHARS: usize = 200;

/// `DirectoryApi` over the directory backend's JSON routes.
pub struct HttpDirectoryApi {
    http: Client,
    base_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct SubmitFailureBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    errors: FieldErrorMap,
    #[serde(default)]
    field_errors: FieldErrorMap,
}

impl HttpDirectoryApi {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build directory http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryApi {
    async fn search_locations(&self, term: &str) -> Result<Vec<LocationCandidate>> {
        let locations = self
            .http
            .get(format!("{}/locations/search", self.base_url))
            .query(&[("term", term)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(locations)
    }

    async fn search_companies_by_name(&self, term: &str) -> Result<Vec<CompanyNameCandidate>> {
        let companies = self
            .http
            .get(format!("{}/companies/search", self.base_url))
            .query(&[("name", term)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(companies)
    }

    async fn load_service_catalog(&self) -> Result<ServiceCatalog> {
        let grouped: GroupedServices = self
            .http
            .get(format!("{}/services/grouped", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("malformed service catalog")?;
        Ok(ServiceCatalog::from_grouped(grouped))
    }

    async fn submit_company(
        &self,
        payload: &CompanySubmission,
        credential: &Credential,
    ) -> std::result::Result<CreatedCompany, SubmitError> {
        let response = self
            .http
            .post(format!("{}/companies", self.base_url))
            .bearer_auth(credential.expose())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<CreatedCompany>()
                .await
                .map_err(|e| SubmitError::Transport(format!("invalid created record: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_submit_failure(status.as_u16(), &body);
        warn!(status = status.as_u16(), error = %error, "company submission rejected");
        Err(error)
    }
}

pub(crate) fn classify_submit_failure(status: u16, body: &str) -> SubmitError {
    let parsed: SubmitFailureBody = serde_json::from_str(body).unwrap_or_default();

    let mut fields = parsed.errors;
    for (key, messages) in parsed.field_errors {
        fields.entry(key).or_default().extend(messages);
    }
    fields.retain(|_, messages| !messages.is_empty());

    if matches!(status, 400 | 422) && !fields.is_empty() {
        debug!(status, fields = fields.len(), "structured validation failure");
        return SubmitError::Validation(fields);
    }

    let message = parsed
        .message
        .or(parsed.title)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("request failed with status {status}")
            } else {
                trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
            }
        });

    SubmitError::Server { status, message }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
