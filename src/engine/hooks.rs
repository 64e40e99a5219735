//! Hook group invocation
//!
//! All hooks of one kind on one node start together and are awaited as a
//! unit. A failing member does not cancel its siblings.

use futures::future::join_all;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use crate::models::{
    Expectation, Hook, HookKind, HookSet, NodeKind, ResultAction, RunResult, SpecAction,
};

/// Path id used for hooks that belong to the enclosing scope of a suite
pub(crate) const SCOPE_ID: &str = "root";

/// Awaits an action, turning errors and panics into an [`Expectation`]
pub(crate) async fn guarded<T, F>(action: F) -> Result<T, Expectation>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(action).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(Expectation::from_error(&error)),
        Err(panic) => Err(Expectation::from_panic(panic)),
    }
}

pub(crate) async fn call_spec(action: &SpecAction) -> Result<Value, Expectation> {
    guarded(async { action().await }).await
}

async fn call_hook(hook: &Hook) -> Result<(), Expectation> {
    guarded(async { hook().await }).await
}

/// Failure of one member of a hook group
#[derive(Debug)]
pub(crate) struct HookFailure {
    pub index: usize,
    pub expectation: Expectation,
}

/// Runs every hook concurrently and reports the lowest-index failure
pub(crate) async fn invoke_group(hooks: &[Hook]) -> Result<(), HookFailure> {
    if hooks.is_empty() {
        return Ok(());
    }

    let outcomes = join_all(hooks.iter().map(call_hook)).await;

    match outcomes
        .into_iter()
        .enumerate()
        .find_map(|(index, outcome)| outcome.err().map(|e| (index, e)))
    {
        Some((index, expectation)) => Err(HookFailure { index, expectation }),
        None => Ok(()),
    }
}

/// Node a hook failure is addressed to
#[derive(Clone, Debug)]
pub(crate) struct HookTarget {
    kind: NodeKind,
    description: String,
    id: String,
    path: String,
    full_name: String,
    name_hook: bool,
}

impl HookTarget {
    /// The enclosing scope (root or outer suite) wrapping a child suite
    pub fn scope(kind: NodeKind, description: &str) -> Self {
        Self {
            kind,
            description: description.to_string(),
            id: SCOPE_ID.to_string(),
            path: format!("/{SCOPE_ID}"),
            full_name: description.to_string(),
            name_hook: false,
        }
    }

    pub fn suite(description: &str, suite_id: &str) -> Self {
        Self {
            kind: NodeKind::Suite,
            description: description.to_string(),
            id: suite_id.to_string(),
            path: format!("/{suite_id}"),
            full_name: description.to_string(),
            name_hook: true,
        }
    }

    pub fn spec(suite_description: &str, description: &str, suite_id: &str, spec_id: &str) -> Self {
        Self {
            kind: NodeKind::Spec,
            description: description.to_string(),
            id: spec_id.to_string(),
            path: format!("/{suite_id}/{spec_id}"),
            full_name: format!("{suite_description} > {description}"),
            name_hook: true,
        }
    }

    fn failure(&self, hook: HookKind, failure: HookFailure) -> RunResult {
        let full_name = if self.name_hook {
            format!("{} > {}", self.full_name, hook)
        } else {
            self.full_name.clone()
        };

        RunResult::new(
            self.kind,
            &self.description,
            &self.id,
            format!("{}/{}{}", self.path, hook, failure.index),
            full_name,
            ResultAction::Hook(hook),
        )
        .fail(failure.expectation)
    }
}

/// Invokes the `kind` collection of `hooks`, returning a failure result if
/// any member failed
pub(crate) async fn run_group(
    hooks: &HookSet,
    kind: HookKind,
    target: &HookTarget,
) -> Option<RunResult> {
    let group = hooks.get(kind);
    if group.is_empty() {
        return None;
    }

    debug!("Running {} {} hook(s) for {}", group.len(), kind, target.path);

    match invoke_group(group).await {
        Ok(()) => None,
        Err(failure) => {
            warn!(
                "{} hook {} failed for {}: {}",
                kind, failure.index, target.path, failure.expectation.message
            );
            Some(target.failure(kind, failure))
        }
    }
}
