//! Run result events
//!
//! One shape is used both for reporter callbacks and for the aggregated
//! result tree returned by a run.

use chrono::Utc;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::any::Any;
use std::fmt;

use super::node::{HookKind, NodeKind};
use crate::error::ActionError;

/// Transition a result describes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultAction {
    Start,
    Skipped,
    End,
    Test,
    Hook(HookKind),
}

impl ResultAction {
    /// Get the wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultAction::Start => "start",
            ResultAction::Skipped => "skipped",
            ResultAction::End => "end",
            ResultAction::Test => "test",
            ResultAction::Hook(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for ResultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResultAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Final outcome of a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

impl Status {
    /// Get the display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Passed => "✓",
            Status::Failed => "✗",
            Status::Skipped => "○",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "PASSED"),
            Status::Failed => write!(f, "FAILED"),
            Status::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Name and message of a raised error
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    pub name: String,
    pub message: String,
}

impl Expectation {
    /// Create an expectation from a name and message
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Uses the name of an [`ActionError`] when one is in the chain, `"Error"` otherwise
    pub fn from_error(error: &anyhow::Error) -> Self {
        match error.chain().find_map(|e| e.downcast_ref::<ActionError>()) {
            Some(action_error) => Self::new(&action_error.name, &action_error.message),
            None => Self::new("Error", format!("{error:#}")),
        }
    }

    /// Build an expectation named `"Panic"` from a panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "action panicked".to_string()
        };
        Self::new("Panic", message)
    }
}

/// Result/event object handed to reporters and collected into the run result
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub id: String,
    pub action: ResultAction,
    pub test_path: String,
    pub full_name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub description: String,
    pub failed: bool,
    pub passed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub failed_expectations: Vec<Expectation>,
    pub passed_expectations: Vec<Value>,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<RunResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub describes: Vec<RunResult>,
}

impl RunResult {
    /// Create a result with no outcome yet
    pub fn new(
        kind: NodeKind,
        description: impl Into<String>,
        id: impl Into<String>,
        test_path: impl Into<String>,
        full_name: impl Into<String>,
        action: ResultAction,
    ) -> Self {
        Self {
            id: id.into(),
            action,
            test_path: test_path.into(),
            full_name: full_name.into(),
            kind,
            description: description.into(),
            failed: false,
            passed: false,
            skipped: false,
            failed_expectations: Vec::new(),
            passed_expectations: Vec::new(),
            timestamp: Utc::now().timestamp_millis(),
            status: None,
            tests: Vec::new(),
            describes: Vec::new(),
        }
    }

    /// Copy of a start event marked as skipped
    pub fn skipped(&self) -> Self {
        Self {
            action: ResultAction::Skipped,
            skipped: true,
            status: Some(Status::Skipped),
            ..self.clone()
        }
    }

    /// Marks the result passed. Only object payloads are recorded as
    /// passed expectations.
    pub fn pass(mut self, payload: Value) -> Self {
        self.passed = true;
        self.failed = false;
        self.status = Some(Status::Passed);
        if payload.is_object() {
            self.passed_expectations.push(payload);
        }
        self
    }

    /// Marks the result failed with `expectation`
    pub fn fail(mut self, expectation: Expectation) -> Self {
        self.failed = true;
        self.passed = false;
        self.status = Some(Status::Failed);
        self.failed_expectations.push(expectation);
        self
    }

    /// Marks the result failed without an expectation of its own, used when
    /// a descendant failed
    pub fn mark_failed(mut self) -> Self {
        self.failed = true;
        self.passed = false;
        self.status = Some(Status::Failed);
        self
    }

    /// Set the action
    pub fn with_action(mut self, action: ResultAction) -> Self {
        self.action = action;
        self
    }

    /// Takes over the addressing and failure of a hook failure while keeping
    /// this node's identity and collected children
    pub fn absorb_failure(mut self, failure: RunResult) -> Self {
        self.action = failure.action;
        self.test_path = failure.test_path;
        self.full_name = failure.full_name;
        self.failed = true;
        self.passed = false;
        self.status = Some(Status::Failed);
        self.failed_expectations = failure.failed_expectations;
        self.passed_expectations.clear();
        self.timestamp = failure.timestamp;
        self
    }

    /// Whether this result reports a failed hook
    pub fn is_hook_failure(&self) -> bool {
        matches!(self.action, ResultAction::Hook(_)) && self.failed
    }

    /// Get the first failed expectation
    pub fn first_failure(&self) -> Option<&Expectation> {
        self.failed_expectations.first()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.status.map(|s| s.symbol()).unwrap_or("·");
        write!(f, "{} {} ({})", symbol, self.full_name, self.test_path)?;
        if let Some(failure) = self.first_failure() {
            write!(f, " - {}: {}", failure.name, failure.message)?;
        }
        Ok(())
    }
}
