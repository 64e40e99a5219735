//! Reporter sinks
//!
//! The scheduler calls a [`Reporter`] synchronously, in event order: a start
//! event before any descendant is processed, a done event after all of them.

use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::models::{NodeKind, RunResult, Status};

/// Receiver of run events
pub trait Reporter: Send + Sync {
    fn spec_started(&self, _result: &RunResult) {}

    fn spec_done(&self, _result: &RunResult) {}

    fn suite_started(&self, _result: &RunResult) {}

    fn suite_done(&self, _result: &RunResult) {}
}

/// Reporter that ignores every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Forwards events to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl TracingReporter {
    fn done(result: &RunResult) {
        match result.status {
            Some(Status::Failed) => warn!("{}", result),
            _ => info!("{}", result),
        }
    }
}

impl Reporter for TracingReporter {
    fn spec_started(&self, result: &RunResult) {
        debug!("{} {}", result.action, result.full_name);
    }

    fn spec_done(&self, result: &RunResult) {
        Self::done(result);
    }

    fn suite_started(&self, result: &RunResult) {
        debug!("{} {}", result.action, result.full_name);
    }

    fn suite_done(&self, result: &RunResult) {
        Self::done(result);
    }
}

/// Which callback produced a recorded event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    SpecStarted,
    SpecDone,
    SuiteStarted,
    SuiteDone,
}

/// Keeps every event it receives, in order
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<(EventKind, RunResult)>>,
}

impl RecordingReporter {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, kind: EventKind, result: &RunResult) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, result.clone()));
    }

    /// Get a copy of every recorded event
    pub fn events(&self) -> Vec<(EventKind, RunResult)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the results recorded for one callback
    pub fn of_kind(&self, kind: EventKind) -> Vec<RunResult> {
        self.events()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, r)| r)
            .collect()
    }

    /// `(event kind, testPath)` pairs, handy for asserting event order
    pub fn trace(&self) -> Vec<(EventKind, String)> {
        self.events()
            .into_iter()
            .map(|(k, r)| (k, r.test_path))
            .collect()
    }

    /// Count skipped events of one node kind
    pub fn skipped(&self, kind: NodeKind) -> usize {
        self.events()
            .iter()
            .filter(|(_, r)| r.kind == kind && r.skipped)
            .count()
    }

    /// Drop every recorded event
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Reporter for RecordingReporter {
    fn spec_started(&self, result: &RunResult) {
        self.record(EventKind::SpecStarted, result);
    }

    fn spec_done(&self, result: &RunResult) {
        self.record(EventKind::SpecDone, result);
    }

    fn suite_started(&self, result: &RunResult) {
        self.record(EventKind::SuiteStarted, result);
    }

    fn suite_done(&self, result: &RunResult) {
        self.record(EventKind::SuiteDone, result);
    }
}
