//! In-memory authoring state for a company and its project portfolio.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use shared::{
    domain::{ClientType, CompanyId, CompanySize, LocationId, ServiceId},
    protocol::{
        CompanyNameCandidate, CompanySubmission, LocationCandidate, ProjectSubmission,
    },
};

/// A counterpart company named on a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterpartName {
    /// Picked from the company-name suggestions.
    Selected(CompanyNameCandidate),
    /// Raw text kept because no suggestion was picked.
    Typed(String),
}

impl CounterpartName {
    pub fn name(&self) -> &str {
        match self {
            CounterpartName::Selected(candidate) => &candidate.name,
            CounterpartName::Typed(text) => text,
        }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        match self {
            CounterpartName::Selected(candidate) => Some(candidate.id),
            CounterpartName::Typed(_) => None,
        }
    }

    /// Case-insensitive match against a company name, ignoring surrounding whitespace.
    pub fn refers_to(&self, company_name: &str) -> bool {
        let company_name = company_name.trim();
        !company_name.is_empty() && self.name().trim().to_lowercase() == company_name.to_lowercase()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDraft {
    pub name: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub technologies: Vec<String>,
    pub client: Option<CounterpartName>,
    pub provider: Option<CounterpartName>,
    pub client_type: Option<ClientType>,
    pub service_ids: BTreeSet<ServiceId>,
    pub is_completed: bool,
    pub is_published: bool,
}

impl ProjectDraft {
    pub fn names_company(&self, company_name: &str) -> bool {
        self.client
            .iter()
            .chain(self.provider.iter())
            .any(|counterpart| counterpart.refers_to(company_name))
    }

    pub fn to_submission(&self) -> ProjectSubmission {
        ProjectSubmission {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            start_date: self.start_date,
            completion_date: self.completion_date,
            technologies: normalize_technologies(self.technologies.iter().map(String::as_str)),
            client_company_name: counterpart_text(self.client.as_ref()),
            client_company_id: self.client.as_ref().and_then(CounterpartName::company_id),
            provider_company_name: counterpart_text(self.provider.as_ref()),
            provider_company_id: self.provider.as_ref().and_then(CounterpartName::company_id),
            client_type: self.client_type,
            service_ids: self.service_ids.iter().copied().collect(),
            is_completed: self.is_completed,
            is_published: self.is_published,
        }
    }
}

fn counterpart_text(counterpart: Option<&CounterpartName>) -> String {
    counterpart
        .map(|counterpart| counterpart.name().to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyDraft {
    pub name: String,
    pub description: String,
    pub founded_year: Option<i32>,
    pub address: String,
    pub size: Option<CompanySize>,
    pub website: String,
    pub phone: String,
    pub email: String,
    pub(crate) location: Option<LocationCandidate>,
    pub(crate) service_ids: BTreeSet<ServiceId>,
    pub(crate) projects: Vec<ProjectDraft>,
}

impl CompanyDraft {
    pub fn location_id(&self) -> Option<LocationId> {
        self.location.as_ref().map(|location| location.id)
    }

    pub fn location(&self) -> Option<&LocationCandidate> {
        self.location.as_ref()
    }

    pub fn service_ids(&self) -> &BTreeSet<ServiceId> {
        &self.service_ids
    }

    /// Committed projects. Never reflects an open project form.
    pub fn projects(&self) -> &[ProjectDraft] {
        &self.projects
    }

    /// True when at least one project lists this company as client or provider.
    pub fn portfolio_includes_self(&self) -> bool {
        self.projects
            .iter()
            .any(|project| project.names_company(&self.name))
    }

    /// Builds the submission payload; `None` while required fields are unset.
    pub fn to_submission(&self) -> Option<CompanySubmission> {
        Some(CompanySubmission {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            founded_year: self.founded_year?,
            address: self.address.trim().to_string(),
            location_id: self.location_id()?,
            size: self.size,
            website: optional_text(&self.website),
            phone: optional_text(&self.phone),
            email: optional_text(&self.email),
            service_ids: self.service_ids.iter().copied().collect(),
            projects: self.projects.iter().map(ProjectDraft::to_submission).collect(),
        })
    }
}

fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Trims tags, drops empty ones and exact duplicates, keeping first-seen order.
pub fn normalize_technologies<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_string()))
        .map(str::to_string)
        .collect()
}

/// Splits comma or newline separated technology input.
pub fn parse_technologies(raw: &str) -> Vec<String> {
    normalize_technologies(raw.split([',', '\n']))
}
