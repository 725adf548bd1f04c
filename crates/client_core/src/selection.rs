//! Multi-select over the grouped service catalog.
//!
//! A `ReferenceSelection` borrows exactly one scope's id set and tab state, so
//! the same code serves the company and every project form.

use std::collections::BTreeSet;

use shared::{
    domain::ServiceId,
    protocol::{ServiceCatalog, ServiceEntry},
};

use crate::error::SelectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub id: ServiceId,
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionGroup {
    pub category: String,
    pub entries: Vec<SelectionEntry>,
}

pub struct ReferenceSelection<'a> {
    ids: &'a mut BTreeSet<ServiceId>,
    tab: &'a mut Option<String>,
    catalog: Option<&'a ServiceCatalog>,
}

impl<'a> ReferenceSelection<'a> {
    pub fn bind(
        ids: &'a mut BTreeSet<ServiceId>,
        tab: &'a mut Option<String>,
        catalog: Option<&'a ServiceCatalog>,
    ) -> Self {
        Self { ids, tab, catalog }
    }

    pub fn is_available(&self) -> bool {
        self.catalog.is_some()
    }

    /// Adds `id` when absent, removes it when present. Returns the new membership.
    pub fn toggle(&mut self, id: ServiceId) -> Result<bool, SelectionError> {
        let catalog = self.catalog.ok_or(SelectionError::CatalogUnavailable)?;
        if !catalog.contains(id) {
            return Err(SelectionError::UnknownService(id));
        }
        if self.ids.remove(&id) {
            Ok(false)
        } else {
            self.ids.insert(id);
            Ok(true)
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: ServiceId) -> bool {
        self.ids.contains(&id)
    }

    pub fn selected_ids(&self) -> Vec<ServiceId> {
        self.ids.iter().copied().collect()
    }

    pub fn categories(&self) -> Vec<&str> {
        self.catalog
            .map(|catalog| catalog.category_names().collect())
            .unwrap_or_default()
    }

    /// Active tab; defaults to the first category.
    pub fn active_category(&self) -> Option<&str> {
        let catalog = self.catalog?;
        match self.tab.as_deref() {
            Some(name) if catalog.category(name).is_some() => Some(name),
            _ => catalog.category_names().next(),
        }
    }

    /// Switches the visible tab. Does not affect the selection.
    pub fn select_category(&mut self, name: &str) -> bool {
        let known = self
            .catalog
            .is_some_and(|catalog| catalog.category(name).is_some());
        if known {
            *self.tab = Some(name.to_string());
        }
        known
    }

    pub fn groups(&self) -> Vec<SelectionGroup> {
        let Some(catalog) = self.catalog else {
            return Vec::new();
        };
        catalog
            .categories
            .iter()
            .map(|category| SelectionGroup {
                category: category.name.clone(),
                entries: self.entries(&category.services),
            })
            .collect()
    }

    pub fn visible_entries(&self) -> Vec<SelectionEntry> {
        let (Some(catalog), Some(active)) = (self.catalog, self.active_category()) else {
            return Vec::new();
        };
        catalog
            .category(active)
            .map(|category| self.entries(&category.services))
            .unwrap_or_default()
    }

    fn entries(&self, services: &[ServiceEntry]) -> Vec<SelectionEntry> {
        services
            .iter()
            .map(|entry| SelectionEntry {
                id: entry.id,
                name: entry.name.clone(),
                selected: self.ids.contains(&entry.id),
            })
            .collect()
    }
}
