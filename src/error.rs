//! Error types
//!
//! Registration errors surface immediately to the caller. Errors raised by
//! hook and spec actions are captured by the scheduler and turned into
//! result data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Contract violations detected while building or running a tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("All test method calls must be called within a describe method (test \"{description}\")")]
    SpecOutsideSuite { description: String },

    #[error("The {kind} method requires a non-empty description")]
    MissingDescription { kind: &'static str },

    #[error("Cannot run while a describe body is still registering")]
    RunDuringRegistration,

    #[error("Handle does not belong to the current tree (issued before a reset or by another engine)")]
    StaleHandle,

    #[error("No step definition matches \"{step}\" in scenario \"{scenario}\"")]
    UnresolvedStep { scenario: String, step: String },
}

/// Error with an explicit name, for actions that want to control the
/// `name` reported in a failed expectation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct ActionError {
    pub name: String,
    pub message: String,
}

impl ActionError {
    /// Create an error with the given reported name
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}
