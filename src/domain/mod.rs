//! Ingestion jobs and the calculations behind the read endpoints.

pub mod history;
pub mod news;
pub mod stocks;

#[cfg(test)]
pub mod fake_source;

use serde::Serialize;

/// Outcome of a batch job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub processed: usize,
    pub saved: usize,
    pub failed: usize,
}
