//! Registration API
//!
//! Builds the suite/spec tree synchronously. `describe` runs its body right
//! away with the new suite as the active parent, then restores the previous
//! parent, so nesting follows the call stack.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ConfigurationError;
use crate::models::{
    make_hook, make_spec_action, HookKind, Parent, Spec, SpecAction, SpecHandle, Suite, SuiteId,
    Tree,
};
use crate::reporter::{NoopReporter, Reporter};

/// Result of a registration call
pub type Registration<T> = Result<T, ConfigurationError>;

/// Selection modifier applied when registering a node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Modifier {
    None,
    Only,
    Skip,
}

/// Test registration and execution engine
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) tree: Tree,
    pub(crate) active_parent: Parent,
    pub(crate) test_only: bool,
    pub(crate) describe_only: bool,
    pub(crate) reporter: Arc<dyn Reporter>,
}

impl Engine {
    /// Create a new engine
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tree: Tree::new(config.description.clone()),
            config,
            active_parent: Parent::Root,
            test_only: false,
            describe_only: false,
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Set the reporter sink
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the reporter sink
    pub fn set_reporter(&mut self, reporter: Arc<dyn Reporter>) {
        self.reporter = reporter;
    }

    /// Re-apply description and timeout, e.g. right before a run
    pub fn configure(&mut self, config: EngineConfig) {
        self.tree.root_mut().description = config.description.clone();
        self.config = config;
    }

    /// Get the current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Default spec timeout
    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    /// Get the registered tree
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Get the node new registrations attach to
    pub fn active_parent(&self) -> Parent {
        self.active_parent
    }

    /// Whether any `test_only` was registered since the last reset
    pub fn has_test_only(&self) -> bool {
        self.test_only
    }

    /// Whether any `describe_only` was registered since the last reset
    pub fn has_describe_only(&self) -> bool {
        self.describe_only
    }

    /// Drop every registered node and filter flag
    pub fn reset(&mut self) {
        debug!("Resetting engine \"{}\"", self.config.description);
        self.tree = Tree::new(self.config.description.clone());
        self.active_parent = Parent::Root;
        self.test_only = false;
        self.describe_only = false;
    }

    /// Register a suite and run its body with the suite as active parent
    pub fn describe<F>(&mut self, description: impl Into<String>, body: F) -> Registration<SuiteId>
    where
        F: FnOnce(&mut Self) -> Registration<()>,
    {
        self.register_suite(description.into(), body, Modifier::None)
    }

    /// Register a suite that is the only selection for the run
    pub fn describe_only<F>(
        &mut self,
        description: impl Into<String>,
        body: F,
    ) -> Registration<SuiteId>
    where
        F: FnOnce(&mut Self) -> Registration<()>,
    {
        self.register_suite(description.into(), body, Modifier::Only)
    }

    /// Register a suite that never runs
    pub fn describe_skip<F>(
        &mut self,
        description: impl Into<String>,
        body: F,
    ) -> Registration<SuiteId>
    where
        F: FnOnce(&mut Self) -> Registration<()>,
    {
        self.register_suite(description.into(), body, Modifier::Skip)
    }

    fn register_suite<F>(
        &mut self,
        description: String,
        body: F,
        modifier: Modifier,
    ) -> Registration<SuiteId>
    where
        F: FnOnce(&mut Self) -> Registration<()>,
    {
        require_description("describe", &description)?;

        let parent = self.active_parent;
        let mut suite = Suite::new(description, parent);
        match modifier {
            Modifier::Only => suite.only = true,
            Modifier::Skip => suite.skip = true,
            Modifier::None => {}
        }
        let id = self.tree.add_suite(suite);

        if modifier == Modifier::Only {
            self.describe_only = true;
            self.tree.mark_only_child(parent);
        }

        self.active_parent = Parent::Suite(id);
        let outcome = body(self);
        self.active_parent = parent;

        outcome.map(|()| id)
    }

    /// Register a spec in the active suite
    pub fn test<F, Fut, T>(
        &mut self,
        description: impl Into<String>,
        action: F,
    ) -> Registration<SpecHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.register_action(description, make_spec_action(action), None, Modifier::None)
    }

    /// Register a spec with its own timeout
    pub fn test_with_timeout<F, Fut, T>(
        &mut self,
        description: impl Into<String>,
        action: F,
        timeout: Duration,
    ) -> Registration<SpecHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.register_action(
            description,
            make_spec_action(action),
            Some(timeout),
            Modifier::None,
        )
    }

    /// Register a spec that is the only selection in its suite
    pub fn test_only<F, Fut, T>(
        &mut self,
        description: impl Into<String>,
        action: F,
    ) -> Registration<SpecHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.register_action(description, make_spec_action(action), None, Modifier::Only)
    }

    /// [`Engine::test_only`] with its own timeout
    pub fn test_only_with_timeout<F, Fut, T>(
        &mut self,
        description: impl Into<String>,
        action: F,
        timeout: Duration,
    ) -> Registration<SpecHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.register_action(
            description,
            make_spec_action(action),
            Some(timeout),
            Modifier::Only,
        )
    }

    /// Register a spec that never runs
    pub fn test_skip<F, Fut, T>(
        &mut self,
        description: impl Into<String>,
        action: F,
    ) -> Registration<SpecHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.register_action(description, make_spec_action(action), None, Modifier::Skip)
    }

    /// [`Engine::test_skip`] with its own timeout
    pub fn test_skip_with_timeout<F, Fut, T>(
        &mut self,
        description: impl Into<String>,
        action: F,
        timeout: Duration,
    ) -> Registration<SpecHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.register_action(
            description,
            make_spec_action(action),
            Some(timeout),
            Modifier::Skip,
        )
    }

    /// Register a placeholder spec without an action
    pub fn xtest(&mut self, description: impl Into<String>) -> Registration<SpecHandle> {
        self.register_spec(Spec::new(description, None), Modifier::Skip)
    }

    /// Alias of [`Engine::test`]
    pub fn it<F, Fut, T>(&mut self, description: impl Into<String>, action: F) -> Registration<SpecHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.test(description, action)
    }

    /// Alias of [`Engine::test_with_timeout`]
    pub fn it_with_timeout<F, Fut, T>(
        &mut self,
        description: impl Into<String>,
        action: F,
        timeout: Duration,
    ) -> Registration<SpecHandle>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.test_with_timeout(description, action, timeout)
    }

    /// Alias of [`Engine::xtest`]
    pub fn xit(&mut self, description: impl Into<String>) -> Registration<SpecHandle> {
        self.xtest(description)
    }

    /// Register a spec with an already boxed action, see [`make_spec_action`]
    pub fn test_action(
        &mut self,
        description: impl Into<String>,
        action: SpecAction,
        timeout: Option<Duration>,
    ) -> Registration<SpecHandle> {
        self.register_action(description, action, timeout, Modifier::None)
    }

    fn register_action(
        &mut self,
        description: impl Into<String>,
        action: SpecAction,
        timeout: Option<Duration>,
        modifier: Modifier,
    ) -> Registration<SpecHandle> {
        let mut spec = Spec::new(description, Some(action));
        spec.timeout = timeout;
        self.register_spec(spec, modifier)
    }

    fn register_spec(&mut self, mut spec: Spec, modifier: Modifier) -> Registration<SpecHandle> {
        let suite_id = match self.active_parent {
            Parent::Suite(id) => id,
            Parent::Root => {
                return Err(ConfigurationError::SpecOutsideSuite {
                    description: spec.description,
                })
            }
        };
        require_description("test", &spec.description)?;

        match modifier {
            Modifier::Only => spec.only = true,
            Modifier::Skip => spec.skip = true,
            Modifier::None => {}
        }

        let suite = self.tree.suite_mut(suite_id);
        suite.tests.push(spec);
        let handle = SpecHandle {
            suite: suite_id,
            index: suite.tests.len() - 1,
        };

        if modifier == Modifier::Only {
            self.test_only = true;
            self.tree.mark_only_child(self.active_parent);
        }

        Ok(handle)
    }

    /// Register a hook on the active parent (the root outside any suite)
    pub fn add_hook<F, Fut>(&mut self, kind: HookKind, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.tree
            .hooks_mut(self.active_parent)
            .push(kind, make_hook(action));
    }

    /// Register a hook run once before the active parent's children
    pub fn before_all<F, Fut>(&mut self, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_hook(HookKind::BeforeAll, action);
    }

    /// Register a hook run once after the active parent's children
    pub fn after_all<F, Fut>(&mut self, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_hook(HookKind::AfterAll, action);
    }

    /// Register a hook run before each spec (or child suite) of the active parent
    pub fn before_each<F, Fut>(&mut self, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_hook(HookKind::BeforeEach, action);
    }

    /// Register a hook run after each spec (or child suite) of the active parent
    pub fn after_each<F, Fut>(&mut self, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_hook(HookKind::AfterEach, action);
    }

    /// Mark a registered suite as skipped. Ids from before the last reset
    /// or from another engine are rejected.
    pub fn disable_suite(&mut self, id: SuiteId) -> Registration<()> {
        if !self.tree.contains(id) {
            return Err(ConfigurationError::StaleHandle);
        }
        self.tree.suite_mut(id).disabled();
        Ok(())
    }

    /// Mark a registered spec as skipped, rejecting stale handles like
    /// [`Engine::disable_suite`]
    pub fn disable_spec(&mut self, handle: SpecHandle) -> Registration<()> {
        if !self.tree.contains_spec(handle) {
            return Err(ConfigurationError::StaleHandle);
        }
        self.tree.spec_mut(handle).disabled();
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn require_description(kind: &'static str, description: &str) -> Registration<()> {
    if description.trim().is_empty() {
        return Err(ConfigurationError::MissingDescription { kind });
    }
    Ok(())
}
