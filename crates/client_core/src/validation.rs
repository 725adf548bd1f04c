//! Field-keyed validation errors, local draft checks, and server key normalization.
//!
//! Field paths are snake_case names (`founded_year`), project fields are
//! `projects[i].field`, and server errors that name a project field without an
//! index land on the wildcard path `projects[*].field`.

use std::collections::BTreeMap;

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use shared::error::FieldErrorMap;
use url::Url;

use crate::draft::{CompanyDraft, ProjectDraft};

pub mod fields {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const FOUNDED_YEAR: &str = "founded_year";
    pub const ADDRESS: &str = "address";
    pub const LOCATION_ID: &str = "location_id";
    pub const SIZE: &str = "size";
    pub const WEBSITE: &str = "website";
    pub const PHONE: &str = "phone";
    pub const EMAIL: &str = "email";
    pub const SERVICE_IDS: &str = "service_ids";
    pub const PROJECTS: &str = "projects";

    pub const PROJECT_NAME: &str = "name";
    pub const PROJECT_COMPLETION_DATE: &str = "completion_date";
}

pub const EARLIEST_FOUNDED_YEAR: i32 = 1800;

const COMPANY_FIELDS: &[&str] = &[
    fields::NAME,
    fields::DESCRIPTION,
    fields::FOUNDED_YEAR,
    fields::ADDRESS,
    fields::LOCATION_ID,
    fields::SIZE,
    fields::WEBSITE,
    fields::PHONE,
    fields::EMAIL,
    fields::SERVICE_IDS,
    fields::PROJECTS,
];

const COMPANY_ALIASES: &[(&str, &str)] = &[
    ("company_name", fields::NAME),
    ("location", fields::LOCATION_ID),
    ("city", fields::LOCATION_ID),
    ("founded", fields::FOUNDED_YEAR),
    ("year_founded", fields::FOUNDED_YEAR),
    ("founded_at", fields::FOUNDED_YEAR),
    ("company_size", fields::SIZE),
    ("website_url", fields::WEBSITE),
    ("phone_number", fields::PHONE),
    ("email_address", fields::EMAIL),
    ("services", fields::SERVICE_IDS),
];

const PROJECT_FIELDS: &[&str] = &[
    "start_date",
    "completion_date",
    "technologies",
    "client_company_name",
    "provider_company_name",
    "client_type",
    "is_completed",
    "is_published",
];

const PROJECT_ALIASES: &[(&str, &str)] = &[
    ("title", "name"),
    ("client", "client_company_name"),
    ("client_name", "client_company_name"),
    ("provider", "provider_company_name"),
    ("provider_name", "provider_company_name"),
    ("services", "service_ids"),
    ("technology", "technologies"),
    ("end_date", "completion_date"),
];

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9(][0-9 ()./-]{5,22}[0-9]$").expect("valid phone regex"));
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("valid email regex")
});

pub fn project_path(index: usize, field: &str) -> String {
    format!("projects[{index}].{field}")
}

pub fn project_wildcard_path(field: &str) -> String {
    format!("projects[*].{field}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrorSet {
    fields: BTreeMap<String, Vec<String>>,
    general: Option<String>,
}

impl ValidationErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_none()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.general = None;
    }

    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(path.into())
            .or_default()
            .push(message.into());
    }

    pub fn set_general(&mut self, message: impl Into<String>) {
        self.general = Some(message.into());
    }

    pub fn general(&self) -> Option<&str> {
        self.general.as_deref()
    }

    pub fn messages(&self, path: &str) -> &[String] {
        self.fields.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, path: &str) -> Option<&str> {
        self.messages(path).first().map(String::as_str)
    }

    /// Error for a field of project `index`, falling back to the wildcard path.
    pub fn project_field(&self, index: usize, field: &str) -> Option<&str> {
        self.first(&project_path(index, field))
            .or_else(|| self.first(&project_wildcard_path(field)))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Normalizes server keys and merges their messages into this set.
    pub fn merge_server_errors(&mut self, server: &FieldErrorMap) {
        for (key, messages) in server {
            match normalize_server_key(key) {
                Some(path) => {
                    for message in messages {
                        self.insert(path.clone(), message.clone());
                    }
                }
                None => {
                    if let Some(message) = messages.first() {
                        self.set_general(message.clone());
                    }
                }
            }
        }
    }

    /// Lines for the error panel shown above the submit action.
    pub fn summary(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.general.iter().cloned().collect();
        for (path, messages) in &self.fields {
            for message in messages {
                lines.push(format!("{path}: {message}"));
            }
        }
        lines
    }
}

/// Local checks run before any network call.
pub fn validate_company(draft: &CompanyDraft) -> ValidationErrorSet {
    let mut errors = ValidationErrorSet::new();

    if draft.name.trim().is_empty() {
        errors.insert(fields::NAME, "Company name is required");
    }

    match draft.founded_year {
        None => errors.insert(fields::FOUNDED_YEAR, "Founded year is required"),
        Some(year) => {
            let current = Utc::now().year();
            if !(EARLIEST_FOUNDED_YEAR..=current).contains(&year) {
                errors.insert(
                    fields::FOUNDED_YEAR,
                    format!("Founded year must be between {EARLIEST_FOUNDED_YEAR} and {current}"),
                );
            }
        }
    }

    if draft.address.trim().is_empty() {
        errors.insert(fields::ADDRESS, "Address is required");
    }

    let phone = draft.phone.trim();
    if !phone.is_empty() && !is_valid_phone(phone) {
        errors.insert(fields::PHONE, "Enter a valid phone number");
    }

    let email = draft.email.trim();
    if !email.is_empty() && !is_valid_email(email) {
        errors.insert(fields::EMAIL, "Enter a valid email address");
    }

    let website = draft.website.trim();
    if !website.is_empty() && !is_valid_website(website) {
        errors.insert(fields::WEBSITE, "Enter a valid http(s) website URL");
    }

    if draft.location_id().is_none() {
        errors.insert(fields::LOCATION_ID, "Select a location");
    }

    if !draft.portfolio_includes_self() {
        let message = if draft.name.trim().is_empty() {
            "At least one project must list this company as its client or provider".to_string()
        } else {
            format!(
                "At least one project must list {} as its client or provider",
                draft.name.trim()
            )
        };
        errors.insert(fields::PROJECTS, message);
    }

    errors
}

/// Checks run when a project form is committed. Paths are project-local.
pub fn validate_project(project: &ProjectDraft) -> ValidationErrorSet {
    let mut errors = ValidationErrorSet::new();

    if project.name.trim().is_empty() {
        errors.insert(fields::PROJECT_NAME, "Project name is required");
    }

    if let (Some(start), Some(completion)) = (project.start_date, project.completion_date) {
        if completion < start {
            errors.insert(
                fields::PROJECT_COMPLETION_DATE,
                "Completion date cannot be before the start date",
            );
        }
    }

    errors
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone) && phone.chars().filter(char::is_ascii_digit).count() >= 7
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

pub fn is_valid_website(website: &str) -> bool {
    Url::parse(website)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Maps a server field key onto the local field-path convention.
///
/// Returns `None` for keys that denote a non-field error.
pub fn normalize_server_key(key: &str) -> Option<String> {
    let key = key.trim().trim_start_matches('$').trim_start_matches('.');
    let segments = split_key(key);
    let (first, rest) = segments.split_first()?;

    if first.name.is_empty() || matches!(first.name.as_str(), "general" | "non_field_errors") {
        return None;
    }

    if matches!(first.name.as_str(), "project" | "projects") {
        let field = rest
            .iter()
            .map(|segment| segment.name.as_str())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        if field.is_empty() {
            return Some(fields::PROJECTS.to_string());
        }
        let field = project_alias(strip_project_prefix(&field));
        return Some(match first.index {
            Some(index) => project_path(index, &field),
            None => project_wildcard_path(&field),
        });
    }

    let joined = segments
        .iter()
        .map(|segment| segment.name.as_str())
        .collect::<Vec<_>>()
        .join(".");

    if COMPANY_FIELDS.contains(&joined.as_str()) {
        return Some(joined);
    }
    if let Some((_, path)) = COMPANY_ALIASES.iter().find(|(alias, _)| *alias == joined) {
        return Some((*path).to_string());
    }
    if let Some(field) = joined.strip_prefix("project_") {
        return Some(project_wildcard_path(&project_alias(field)));
    }
    if PROJECT_FIELDS.contains(&joined.as_str()) {
        return Some(project_wildcard_path(&joined));
    }

    Some(joined)
}

struct KeySegment {
    name: String,
    index: Option<usize>,
}

fn split_key(key: &str) -> Vec<KeySegment> {
    let mut segments: Vec<KeySegment> = Vec::new();
    for part in key.split('.') {
        if let Ok(index) = part.parse::<usize>() {
            if let Some(last) = segments.last_mut() {
                last.index = Some(index);
                continue;
            }
        }
        let (name, index) = match part.split_once('[') {
            Some((name, tail)) => (
                name,
                tail.trim_end_matches(']').parse::<usize>().ok(),
            ),
            None => (part, None),
        };
        segments.push(KeySegment {
            name: to_snake_case(name),
            index,
        });
    }
    segments
}

fn strip_project_prefix(field: &str) -> &str {
    field.strip_prefix("project_").unwrap_or(field)
}

fn project_alias(field: &str) -> String {
    PROJECT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == field)
        .map(|(_, path)| (*path).to_string())
        .unwrap_or_else(|| field.to_string())
}

fn to_snake_case(raw: &str) -> String {
    let chars: Vec<char> = raw.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
