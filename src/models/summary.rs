//! Aggregated counts over a finished run

use serde::{Deserialize, Serialize};
use std::fmt;

use super::node::NodeKind;
use super::run_result::{ResultAction, RunResult};

/// Counts collected from a run result tree
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub suites_passed: usize,
    pub suites_failed: usize,
    pub specs_passed: usize,
    pub specs_failed: usize,
    pub hook_failures: usize,
}

impl RunSummary {
    /// Collect counts over a result tree
    pub fn from_results(results: &[RunResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.collect(result);
        }
        summary
    }

    fn collect(&mut self, result: &RunResult) {
        if matches!(result.action, ResultAction::Hook(_)) && result.failed {
            self.hook_failures += 1;
        }

        match result.kind {
            NodeKind::Suite if !result.skipped => {
                if result.failed {
                    self.suites_failed += 1;
                } else if result.passed {
                    self.suites_passed += 1;
                }
            }
            NodeKind::Spec if result.action == ResultAction::Test => {
                if result.failed {
                    self.specs_failed += 1;
                } else if result.passed {
                    self.specs_passed += 1;
                }
            }
            _ => {}
        }

        for child in result.tests.iter().chain(result.describes.iter()) {
            self.collect(child);
        }
    }

    /// Get total executed specs
    pub fn total_specs(&self) -> usize {
        self.specs_passed + self.specs_failed
    }

    /// Whether nothing failed
    pub fn is_success(&self) -> bool {
        self.suites_failed == 0 && self.specs_failed == 0 && self.hook_failures == 0
    }

    /// Get spec pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total_specs() == 0 {
            0.0
        } else {
            (self.specs_passed as f64 / self.total_specs() as f64) * 100.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Suites: {} passed, {} failed",
            self.suites_passed, self.suites_failed
        )?;
        writeln!(
            f,
            "Specs: {} passed, {} failed ({:.1}%)",
            self.specs_passed,
            self.specs_failed,
            self.pass_rate()
        )?;
        write!(f, "Hook failures: {}", self.hook_failures)
    }
}
