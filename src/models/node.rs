//! Node model for registered suites and specs
//!
//! Suites live in an arena owned by [`Tree`] and are addressed by [`SuiteId`].
//! Every suite keeps the id of its parent so `only` marks can be walked back
//! up the chain without a top-down search.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of tree stamps; every tree gets its own
static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(0);

/// Lifecycle hook action
pub type Hook = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Spec action, resolving to the serialized "passed" payload
pub type SpecAction = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Boxes an async closure into a [`Hook`]
pub fn make_hook<F, Fut>(action: F) -> Hook
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move || action().boxed())
}

/// Boxes an async closure into a [`SpecAction`]. Falsy payloads (`()`,
/// `null`, `false`, `0` and `""`) become `true`.
pub fn make_spec_action<F, Fut, T>(action: F) -> SpecAction
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    Arc::new(move || {
        let fut = action();
        async move {
            let value = serde_json::to_value(fut.await?)?;
            Ok::<Value, anyhow::Error>(if is_falsy(&value) {
                Value::Bool(true)
            } else {
                value
            })
        }
        .boxed()
    })
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Kind of node in the tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Suite,
    Spec,
}

impl NodeKind {
    /// Get the lowercase type name used in results
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Suite => "suite",
            NodeKind::Spec => "spec",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle point a hook is registered for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    /// Get the camelCase hook name used in paths and results
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BeforeAll => "beforeAll",
            HookKind::AfterAll => "afterAll",
            HookKind::BeforeEach => "beforeEach",
            HookKind::AfterEach => "afterEach",
        }
    }

    /// Get all hook kinds
    pub fn all() -> [HookKind; 4] {
        [
            HookKind::BeforeAll,
            HookKind::AfterAll,
            HookKind::BeforeEach,
            HookKind::AfterEach,
        ]
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four hook collections attached to the root and to every suite
#[derive(Clone, Default)]
pub struct HookSet {
    before_all: Vec<Hook>,
    after_all: Vec<Hook>,
    before_each: Vec<Hook>,
    after_each: Vec<Hook>,
}

impl HookSet {
    /// Get the hooks of one kind, in registration order
    pub fn get(&self, kind: HookKind) -> &[Hook] {
        match kind {
            HookKind::BeforeAll => &self.before_all,
            HookKind::AfterAll => &self.after_all,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
        }
    }

    /// Append a hook to its kind's collection
    pub fn push(&mut self, kind: HookKind, hook: Hook) {
        match kind {
            HookKind::BeforeAll => self.before_all.push(hook),
            HookKind::AfterAll => self.after_all.push(hook),
            HookKind::BeforeEach => self.before_each.push(hook),
            HookKind::AfterEach => self.after_each.push(hook),
        }
    }

    /// Number of hooks of one kind
    pub fn len(&self, kind: HookKind) -> usize {
        self.get(kind).len()
    }

    /// Whether no hook of any kind is registered
    pub fn is_empty(&self) -> bool {
        HookKind::all().iter().all(|kind| self.get(*kind).is_empty())
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before_all", &self.before_all.len())
            .field("after_all", &self.after_all.len())
            .field("before_each", &self.before_each.len())
            .field("after_each", &self.after_each.len())
            .finish()
    }
}

/// Arena index of a suite, stamped with the tree that issued it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuiteId {
    pub(crate) tree: u64,
    pub(crate) index: usize,
}

/// Address of a registered spec: its suite and position in that suite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpecHandle {
    pub suite: SuiteId,
    pub index: usize,
}

/// Registration cursor target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parent {
    Root,
    Suite(SuiteId),
}

/// Top-level container, hosts the outermost hooks
#[derive(Debug)]
pub struct Root {
    pub description: String,
    pub describes: Vec<SuiteId>,
    pub hooks: HookSet,
}

impl Root {
    /// Create an empty root
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            describes: Vec::new(),
            hooks: HookSet::default(),
        }
    }
}

/// A `describe` node
#[derive(Debug)]
pub struct Suite {
    pub description: String,
    pub parent: Parent,
    pub describes: Vec<SuiteId>,
    pub tests: Vec<Spec>,
    pub hooks: HookSet,
    pub skip: bool,
    pub only: bool,
    /// Set when this suite or any descendant carries an only-selection
    pub only_child: bool,
}

impl Suite {
    /// Create a suite under `parent` with no modifiers
    pub fn new(description: impl Into<String>, parent: Parent) -> Self {
        Self {
            description: description.into(),
            parent,
            describes: Vec::new(),
            tests: Vec::new(),
            hooks: HookSet::default(),
            skip: false,
            only: false,
            only_child: false,
        }
    }

    /// Mark as skipped
    pub fn disabled(&mut self) {
        self.skip = true;
    }
}

/// A `test` node
#[derive(Clone)]
pub struct Spec {
    pub description: String,
    /// Absent for placeholder specs registered through `xtest`
    pub action: Option<SpecAction>,
    /// Forwarded to timing collaborators; the scheduler does not enforce it
    pub timeout: Option<Duration>,
    pub skip: bool,
    pub only: bool,
}

impl Spec {
    /// Create a spec with no modifiers or timeout
    pub fn new(description: impl Into<String>, action: Option<SpecAction>) -> Self {
        Self {
            description: description.into(),
            action,
            timeout: None,
            skip: false,
            only: false,
        }
    }

    /// Mark as skipped
    pub fn disabled(&mut self) {
        self.skip = true;
    }
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spec")
            .field("description", &self.description)
            .field("action", &self.action.is_some())
            .field("timeout", &self.timeout)
            .field("skip", &self.skip)
            .field("only", &self.only)
            .finish()
    }
}

/// Root plus the suite arena
#[derive(Debug)]
pub struct Tree {
    id: u64,
    root: Root,
    suites: Vec<Suite>,
}

impl Tree {
    /// Create an empty tree with a fresh stamp
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            root: Root::new(description),
            suites: Vec::new(),
        }
    }

    /// Get the root node
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Get the root node mutably
    pub fn root_mut(&mut self) -> &mut Root {
        &mut self.root
    }

    /// Whether `id` was issued by this tree
    pub fn contains(&self, id: SuiteId) -> bool {
        id.tree == self.id && id.index < self.suites.len()
    }

    /// Whether `handle` addresses a spec of this tree
    pub fn contains_spec(&self, handle: SpecHandle) -> bool {
        self.contains(handle.suite) && handle.index < self.suite(handle.suite).tests.len()
    }

    /// Get a suite, `None` for ids issued by another tree
    pub fn get_suite(&self, id: SuiteId) -> Option<&Suite> {
        self.contains(id).then(|| &self.suites[id.index])
    }

    /// Get a suite by id.
    ///
    /// Panics if `id` was not issued by this tree, see [`Tree::contains`].
    pub fn suite(&self, id: SuiteId) -> &Suite {
        assert_eq!(id.tree, self.id, "suite id from another tree");
        &self.suites[id.index]
    }

    /// Get a suite by id mutably. Panics like [`Tree::suite`].
    pub fn suite_mut(&mut self, id: SuiteId) -> &mut Suite {
        assert_eq!(id.tree, self.id, "suite id from another tree");
        &mut self.suites[id.index]
    }

    /// Get a spec by handle. Panics like [`Tree::suite`].
    pub fn spec(&self, handle: SpecHandle) -> &Spec {
        &self.suite(handle.suite).tests[handle.index]
    }

    /// Get a spec by handle mutably. Panics like [`Tree::suite`].
    pub fn spec_mut(&mut self, handle: SpecHandle) -> &mut Spec {
        &mut self.suite_mut(handle.suite).tests[handle.index]
    }

    /// Appends a suite under `parent` and returns its id
    pub fn add_suite(&mut self, suite: Suite) -> SuiteId {
        let id = SuiteId {
            tree: self.id,
            index: self.suites.len(),
        };
        let parent = suite.parent;
        self.suites.push(suite);
        match parent {
            Parent::Root => self.root.describes.push(id),
            Parent::Suite(parent_id) => self.suite_mut(parent_id).describes.push(id),
        }
        id
    }

    /// Get the hooks attached to `parent`
    pub fn hooks(&self, parent: Parent) -> &HookSet {
        match parent {
            Parent::Root => &self.root.hooks,
            Parent::Suite(id) => &self.suite(id).hooks,
        }
    }

    /// Get the hooks attached to `parent` mutably
    pub fn hooks_mut(&mut self, parent: Parent) -> &mut HookSet {
        match parent {
            Parent::Root => &mut self.root.hooks,
            Parent::Suite(id) => &mut self.suite_mut(id).hooks,
        }
    }

    /// Marks `from` and every ancestor suite above it as holding an only-selection.
    /// The root is never marked.
    pub fn mark_only_child(&mut self, from: Parent) {
        let mut cursor = from;
        while let Parent::Suite(id) = cursor {
            let suite = self.suite_mut(id);
            suite.only_child = true;
            cursor = suite.parent;
        }
    }

    /// Number of registered suites
    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    /// Number of registered specs across all suites
    pub fn spec_count(&self) -> usize {
        self.suites.iter().map(|s| s.tests.len()).sum()
    }
}
