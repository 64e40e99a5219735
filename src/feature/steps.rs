//! Scenario model and step resolution

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use super::short_id::{SeededShortId, ShortId};
use crate::models::{make_hook, Hook};

/// Action bound to one step text
pub type StepAction = Hook;

/// A scenario handed over by the feature parser
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scenario {
    pub uuid: String,
    pub index: usize,
    pub description: String,
    pub steps: Vec<String>,
}

impl Scenario {
    /// `index` is the scenario's line index in its feature and seeds the uuid
    pub fn new(index: usize, description: impl Into<String>, steps: Vec<String>) -> Self {
        Self::with_ids(&SeededShortId, index, description, steps)
    }

    /// Build a scenario with ids from `ids`
    pub fn with_ids(
        ids: &dyn ShortId,
        index: usize,
        description: impl Into<String>,
        steps: Vec<String>,
    ) -> Self {
        Self {
            uuid: ids.short_id(index as u64),
            index,
            description: description.into(),
            steps,
        }
    }
}

/// Resolves step text to an executable action
pub trait StepResolver {
    fn resolve(&self, text: &str) -> Option<StepAction>;
}

/// Exact-text step table
#[derive(Default)]
pub struct StepRegistry {
    steps: HashMap<String, StepAction>,
}

impl StepRegistry {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `text` to `action`, replacing any earlier binding
    pub fn define<F, Fut>(&mut self, text: impl Into<String>, action: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.steps.insert(text.into(), make_hook(action));
        self
    }

    /// Number of defined steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl StepResolver for StepRegistry {
    fn resolve(&self, text: &str) -> Option<StepAction> {
        self.steps.get(text.trim()).cloned()
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.steps.keys().collect();
        keys.sort();
        f.debug_struct("StepRegistry").field("steps", &keys).finish()
    }
}
