use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ClientType, CompanyId, CompanySize, LocationId, ServiceId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub id: LocationId,
    pub city: String,
    pub country: String,
}

impl LocationCandidate {
    pub fn label(&self) -> String {
        match (self.city.trim().is_empty(), self.country.trim().is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.country),
            (false, true) => self.city.clone(),
            (true, _) => self.country.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyNameCandidate {
    pub id: CompanyId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: ServiceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCategory {
    pub name: String,
    pub services: Vec<ServiceEntry>,
}

/// Service taxonomy grouped by category, as served by `GET /services/grouped`.
pub type GroupedServices = BTreeMap<String, Vec<ServiceEntry>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCatalog {
    pub categories: Vec<ServiceCategory>,
}

impl ServiceCatalog {
    pub fn from_grouped(grouped: GroupedServices) -> Self {
        Self {
            categories: grouped
                .into_iter()
                .map(|(name, services)| ServiceCategory { name, services })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|category| category.services.is_empty())
    }

    pub fn contains(&self, id: ServiceId) -> bool {
        self.find(id).is_some()
    }

    pub fn find(&self, id: ServiceId) -> Option<&ServiceEntry> {
        self.categories
            .iter()
            .flat_map(|category| category.services.iter())
            .find(|entry| entry.id == id)
    }

    pub fn category(&self, name: &str) -> Option<&ServiceCategory> {
        self.categories.iter().find(|category| category.name == name)
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.name.as_str())
    }
}

impl From<GroupedServices> for ServiceCatalog {
    fn from(value: GroupedServices) -> Self {
        Self::from_grouped(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSubmission {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    pub technologies: Vec<String>,
    pub client_company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_company_id: Option<CompanyId>,
    pub provider_company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_company_id: Option<CompanyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_type: Option<ClientType>,
    pub service_ids: Vec<ServiceId>,
    pub is_completed: bool,
    pub is_published: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySubmission {
    pub name: String,
    pub description: String,
    pub founded_year: i32,
    pub address: String,
    pub location_id: LocationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<CompanySize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub service_ids: Vec<ServiceId>,
    pub projects: Vec<ProjectSubmission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCompany {
    pub id: CompanyId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
