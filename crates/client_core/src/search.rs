//! Query-as-you-type lookup state for one search field.
//!
//! Every input, selection or clear takes a fresh generation from the session's
//! epoch counter. Timer firings and lookup responses carry the generation they
//! were issued under and are dropped unless it is still current.

use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::debug;

use crate::session::{Scheduler, SearchKey, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRole {
    Location,
    CounterpartCompany,
}

impl SearchRole {
    /// Whether unmatched typed text is an acceptable committed value.
    pub fn allows_free_text(self) -> bool {
        matches!(self, SearchRole::CounterpartCompany)
    }
}

#[derive(Debug)]
pub struct DebouncedSearch<T> {
    role: SearchRole,
    query: String,
    generation: u64,
    applied_generation: Option<u64>,
    results: Vec<T>,
    loading: bool,
    selection: Option<T>,
    last_error: Option<String>,
    timer: Option<AbortHandle>,
}

impl<T: Clone> DebouncedSearch<T> {
    pub fn new(role: SearchRole) -> Self {
        Self {
            role,
            query: String::new(),
            generation: 0,
            applied_generation: None,
            results: Vec::new(),
            loading: false,
            selection: None,
            last_error: None,
            timer: None,
        }
    }

    /// Starts a field already holding a committed candidate.
    pub fn with_selection(role: SearchRole, selection: T) -> Self {
        let mut search = Self::new(role);
        search.selection = Some(selection);
        search
    }

    /// Starts a free-text field already holding typed text; no lookup is issued.
    pub fn with_typed(role: SearchRole, text: impl Into<String>) -> Self {
        let mut search = Self::new(role);
        search.query = text.into();
        search
    }

    pub fn role(&self) -> SearchRole {
        self.role
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[T] {
        &self.results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn selection(&self) -> Option<&T> {
        self.selection.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation of the last timer firing or response that was applied.
    pub fn applied_generation(&self) -> Option<u64> {
        self.applied_generation
    }

    /// Typed text usable as the committed value when nothing was selected.
    pub fn typed_fallback(&self) -> Option<&str> {
        if !self.role.allows_free_text() || self.query.trim().is_empty() {
            return None;
        }
        Some(&self.query)
    }

    pub(crate) fn on_input(
        &mut self,
        text: &str,
        key: SearchKey,
        debounce: Duration,
        scheduler: &mut Scheduler,
    ) {
        self.query = text.to_string();
        self.generation = scheduler.next_epoch();
        if self.role.allows_free_text() {
            self.selection = None;
        }
        self.cancel_timer();
        let generation = self.generation;
        self.timer = Some(scheduler.after(
            debounce,
            SessionEvent::DebounceElapsed { key, generation },
        ));
    }

    /// Returns the term to look up when `generation` is current and the
    /// query is long enough. Short queries clear the results instead.
    pub(crate) fn on_timer(&mut self, generation: u64, min_query_len: usize) -> Option<String> {
        if generation != self.generation {
            debug!(role = ?self.role, generation, current = self.generation, "stale debounce timer");
            return None;
        }
        self.timer = None;

        let term = self.query.trim();
        if term.chars().count() < min_query_len {
            self.results.clear();
            self.loading = false;
            self.last_error = None;
            self.applied_generation = Some(generation);
            return None;
        }

        self.loading = true;
        Some(term.to_string())
    }

    /// Applies a lookup response; returns false when it was stale.
    pub(crate) fn on_response(&mut self, generation: u64, result: Result<Vec<T>, String>) -> bool {
        if generation != self.generation {
            debug!(role = ?self.role, generation, current = self.generation, "discarding stale search response");
            return false;
        }

        self.loading = false;
        self.applied_generation = Some(generation);
        match result {
            Ok(results) => {
                self.results = results;
                self.last_error = None;
            }
            Err(err) => {
                self.results.clear();
                self.last_error = Some(err);
            }
        }
        true
    }

    pub(crate) fn on_select(&mut self, candidate: T, scheduler: &mut Scheduler) {
        self.selection = Some(candidate);
        self.reset(scheduler);
    }

    pub(crate) fn on_clear(&mut self, scheduler: &mut Scheduler) {
        self.selection = None;
        self.reset(scheduler);
    }

    /// Invalidates anything in flight without touching the committed selection.
    pub(crate) fn invalidate(&mut self, scheduler: &mut Scheduler) {
        self.generation = scheduler.next_epoch();
        self.cancel_timer();
        self.loading = false;
    }

    fn reset(&mut self, scheduler: &mut Scheduler) {
        self.query.clear();
        self.results.clear();
        self.last_error = None;
        self.invalidate(scheduler);
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<T> Drop for DebouncedSearch<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/search_tests.rs"]
mod tests;
