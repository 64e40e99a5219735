//! Data models for the test tree and its run results
//!
//! This module contains the node model built during registration and the
//! result/event shapes produced by the scheduler.

mod node;
mod run_result;
mod summary;

pub use node::{
    make_hook, make_spec_action, Hook, HookKind, HookSet, NodeKind, Parent, Root, Spec, SpecAction, SpecHandle, Suite,
    SuiteId, Tree,
};
pub use run_result::{Expectation, ResultAction, RunResult, Status};
pub use summary::RunSummary;
