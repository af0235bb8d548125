//! Fan-in of independent sub-fetches.
//!
//! Each sub-fetch yields its own `Result`; `Gathered` keeps every `Ok` value
//! and the errors alongside the key that produced them, so one failure never
//! hides its siblings.

use std::fmt::Display;

use crate::errors::{EngineError, Result};

#[derive(Debug)]
pub struct Gathered<K, T> {
    pub values: Vec<T>,
    pub failures: Vec<(K, EngineError)>,
}

impl<K: Display, T> Gathered<K, T> {
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (K, Result<T>)>,
    {
        let mut values = Vec::new();
        let mut failures = Vec::new();
        for (key, result) in results {
            match result {
                Ok(value) => values.push(value),
                Err(err) => failures.push((key, err)),
            }
        }
        Self { values, failures }
    }

    pub fn failed_keys(&self) -> impl Iterator<Item = &K> {
        self.failures.iter().map(|(key, _)| key)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Logs each failure at `warn` and a one-line summary at `debug`.
    pub fn log_failures(&self, component: &str, context: &str) {
        for (key, err) in &self.failures {
            log::warn!("{component} [{context}] {key} failed ({}): {err}", err.kind());
        }
        let total = self.values.len() + self.failures.len();
        log::debug!(
            "{component} [{context}] {}/{} sub-fetches succeeded",
            self.values.len(),
            total
        );
    }
}
