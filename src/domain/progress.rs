use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Coarse pipeline phase, exposed to pollers alongside the percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapePhase {
    Queued,
    Initializing,
    Navigating,
    IdentifyingListing,
    LocatingReviews,
    Extracting,
    Analyzing,
    Complete,
    Failed,
}

impl ScrapePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScrapePhase::Complete | ScrapePhase::Failed)
    }
}

/// Shared progress sink for one scrape job.
///
/// Written only by the pipeline driving the job; read concurrently by
/// pollers through [`Progress::snapshot`]. The percentage only moves
/// forward within an attempt (`advance` is a max-write), while a retry
/// starting over rewinds it explicitly with `reset`.
#[derive(Debug)]
pub struct Progress {
    percentage: AtomicU8,
    message: Mutex<String>,
    phase: Mutex<ScrapePhase>,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            percentage: AtomicU8::new(0),
            message: Mutex::new(String::new()),
            phase: Mutex::new(ScrapePhase::Queued),
        }
    }

    /// Raise the percentage to `pct` if it is not already past it.
    pub fn advance(&self, pct: u8) {
        self.percentage.fetch_max(pct.min(100), Ordering::SeqCst);
    }

    /// Rewind the percentage unconditionally. Used when a fresh attempt
    /// starts over after a failed one.
    pub fn reset(&self, pct: u8) {
        self.percentage.store(pct.min(100), Ordering::SeqCst);
    }

    pub fn set_message(&self, message: impl Into<String>) {
        *self
            .message
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = message.into();
    }

    pub fn set_phase(&self, phase: ScrapePhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Advance the percentage and replace phase and message in one call.
    pub fn update(&self, phase: ScrapePhase, pct: u8, message: impl Into<String>) {
        self.set_phase(phase);
        self.advance(pct);
        self.set_message(message);
    }

    /// Mark the job failed without touching the percentage.
    pub fn fail(&self, message: impl Into<String>) {
        self.set_phase(ScrapePhase::Failed);
        self.set_message(message);
    }

    pub fn percentage(&self) -> u8 {
        self.percentage.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percentage: self.percentage(),
            message: self
                .message
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            phase: *self.phase.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a job's progress.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub percentage: u8,
    pub message: String,
    pub phase: ScrapePhase,
}
