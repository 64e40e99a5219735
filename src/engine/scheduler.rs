//! Test execution scheduler
//!
//! Walks the registered tree once, in registration order, emitting reporter
//! events and collecting the aggregated result tree.
//!
//! Hook scoping: a suite's `beforeEach`/`afterEach` wrap each of its own
//! specs, and wrap once around the `beforeAll`/`afterAll` of each direct child
//! suite. They are not repeated for every spec deeper down.

use anyhow::Context;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::hooks::{call_spec, run_group, HookTarget};
use super::registry::Engine;
use crate::error::ConfigurationError;
use crate::models::{
    Expectation, HookKind, NodeKind, Parent, ResultAction, RunResult, RunSummary, Suite, SuiteId,
    Tree,
};
use crate::reporter::Reporter;
use crate::utils::Timer;

/// Results of one sibling loop and whether any of them failed
#[derive(Debug, Default)]
struct Batch {
    results: Vec<RunResult>,
    failed: bool,
}

/// One pass over a tree
pub struct Scheduler<'a> {
    tree: &'a Tree,
    test_only: bool,
    describe_only: bool,
    reporter: &'a dyn Reporter,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler over `tree` with the engine's selection flags
    pub fn new(
        tree: &'a Tree,
        test_only: bool,
        describe_only: bool,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            tree,
            test_only,
            describe_only,
            reporter,
        }
    }

    /// Run the whole tree. A failing root `beforeAll` aborts the run and is
    /// the only result returned.
    pub async fn run(&self) -> Vec<RunResult> {
        let root = self.tree.root();
        let target = HookTarget::scope(NodeKind::Root, &root.description);

        if let Some(failure) = run_group(&root.hooks, HookKind::BeforeAll, &target).await {
            return vec![failure];
        }

        let Batch { mut results, .. } = self
            .run_suites(Parent::Root, &root.describes, String::new())
            .await;

        if let Some(failure) = run_group(&root.hooks, HookKind::AfterAll, &target).await {
            results.push(failure);
        }

        results
    }

    fn should_skip_suite(&self, suite: &Suite) -> bool {
        suite.skip
            || (self.describe_only && !suite.only && !suite.only_child)
            || (self.test_only && !suite.only_child)
    }

    fn scope_target(&self, scope: Parent) -> HookTarget {
        match scope {
            Parent::Root => HookTarget::scope(NodeKind::Root, &self.tree.root().description),
            Parent::Suite(id) => {
                HookTarget::scope(NodeKind::Suite, &self.tree.suite(id).description)
            }
        }
    }

    /// Walk sibling suites. `scope` supplies the `beforeEach`/`afterEach`
    /// wrapped around each sibling's `beforeAll`/`afterAll`.
    fn run_suites<'s>(
        &'s self,
        scope: Parent,
        suites: &'s [SuiteId],
        prefix: String,
    ) -> BoxFuture<'s, Batch> {
        async move {
            let scope_hooks = self.tree.hooks(scope);
            let scope_target = self.scope_target(scope);
            let mut batch = Batch::default();

            for (index, &id) in suites.iter().enumerate() {
                let suite = self.tree.suite(id);
                let suite_id = format!("suite-{prefix}{index}");
                let start = RunResult::new(
                    NodeKind::Suite,
                    &suite.description,
                    &suite_id,
                    format!("/{suite_id}"),
                    &suite.description,
                    ResultAction::Start,
                );

                if self.should_skip_suite(suite) {
                    debug!("Skipping {} \"{}\"", suite_id, suite.description);
                    self.reporter.suite_started(&start.skipped());
                    continue;
                }

                debug!("Starting {} \"{}\"", suite_id, suite.description);
                self.reporter.suite_started(&start);

                let suite_target = HookTarget::suite(&suite.description, &suite_id);

                let before = match run_group(scope_hooks, HookKind::BeforeEach, &scope_target).await
                {
                    Some(failure) => Some(failure),
                    None => run_group(&suite.hooks, HookKind::BeforeAll, &suite_target).await,
                };
                if let Some(failure) = before {
                    batch.failed = true;
                    let result = start.absorb_failure(failure);
                    self.reporter.suite_done(&result);
                    batch.results.push(result);
                    continue;
                }

                let specs = self.run_specs(suite, &suite_id).await;

                let nested = if suite.describes.is_empty() {
                    Batch::default()
                } else {
                    self.run_suites(
                        Parent::Suite(id),
                        &suite.describes,
                        format!("{prefix}{index}-"),
                    )
                    .await
                };

                let mut result = start.with_action(ResultAction::End);
                result.tests = specs.results;
                result.describes = nested.results;
                let children_failed = specs.failed || nested.failed;

                let after = match run_group(scope_hooks, HookKind::AfterEach, &scope_target).await {
                    Some(failure) => Some(failure),
                    None => run_group(&suite.hooks, HookKind::AfterAll, &suite_target).await,
                };

                let result = match after {
                    Some(failure) => result.absorb_failure(failure),
                    None if children_failed => result.mark_failed(),
                    None => result.pass(Value::Bool(true)),
                };

                batch.failed |= result.failed;
                debug!("Finished {}: {:?}", suite_id, result.status);
                self.reporter.suite_done(&result);
                batch.results.push(result);
            }

            batch
        }
        .boxed()
    }

    /// Run the specs of one suite, wrapped in that suite's own
    /// `beforeEach`/`afterEach`. A failing hook stops the remaining specs.
    async fn run_specs(&self, suite: &Suite, suite_id: &str) -> Batch {
        let mut batch = Batch::default();

        for (index, spec) in suite.tests.iter().enumerate() {
            let spec_id = format!("spec{index}");
            let start = RunResult::new(
                NodeKind::Spec,
                &spec.description,
                &spec_id,
                format!("/{suite_id}/{spec_id}"),
                format!("{} > {}", suite.description, spec.description),
                ResultAction::Start,
            );

            if (self.test_only && !spec.only) || spec.skip {
                debug!("Skipping {}/{}", suite_id, spec_id);
                self.reporter.spec_started(&start.skipped());
                continue;
            }

            self.reporter.spec_started(&start);

            let target = HookTarget::spec(&suite.description, &spec.description, suite_id, &spec_id);

            if let Some(failure) = run_group(&suite.hooks, HookKind::BeforeEach, &target).await {
                batch.failed = true;
                self.reporter.spec_done(&failure);
                batch.results.push(failure);
                break;
            }

            let outcome = match &spec.action {
                Some(action) => call_spec(action).await,
                None => Err(Expectation::new("Error", "spec has no action")),
            };
            let result = match outcome {
                Ok(payload) => start.with_action(ResultAction::Test).pass(payload),
                Err(expectation) => {
                    warn!(
                        "{}/{} failed: {}",
                        suite_id, spec_id, expectation.message
                    );
                    batch.failed = true;
                    start.with_action(ResultAction::Test).fail(expectation)
                }
            };

            if let Some(failure) = run_group(&suite.hooks, HookKind::AfterEach, &target).await {
                batch.failed = true;
                self.reporter.spec_done(&failure);
                batch.results.push(failure);
                break;
            }

            self.reporter
                .spec_done(&result.clone().with_action(ResultAction::End));
            batch.results.push(result);
        }

        batch
    }
}

impl Engine {
    /// Execute every registered suite and spec
    pub async fn run(&self) -> Result<Vec<RunResult>, ConfigurationError> {
        if self.active_parent != Parent::Root {
            return Err(ConfigurationError::RunDuringRegistration);
        }

        info!(
            "Running \"{}\": {} suite(s), {} spec(s)",
            self.tree.root().description,
            self.tree.suite_count(),
            self.tree.spec_count()
        );
        let timer = Timer::start("run");

        let scheduler = Scheduler::new(
            &self.tree,
            self.test_only,
            self.describe_only,
            self.reporter.as_ref(),
        );
        let results = scheduler.run().await;

        let summary = RunSummary::from_results(&results);
        info!(
            "Run completed in {}ms - specs passed: {}, failed: {}, hook failures: {}",
            timer.elapsed_ms(),
            summary.specs_passed,
            summary.specs_failed,
            summary.hook_failures
        );

        Ok(results)
    }

    /// Drive [`Engine::run`] to completion on a current-thread runtime
    pub fn run_blocking(&self) -> anyhow::Result<Vec<RunResult>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build runtime")?;
        Ok(runtime.block_on(self.run())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::models::{make_spec_action, Status};
    use crate::reporter::{EventKind, RecordingReporter};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorded() -> (Engine, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::new());
        let engine = Engine::default().with_reporter(reporter.clone());
        (engine, reporter)
    }

    async fn pass() -> anyhow::Result<()> {
        Ok(())
    }

    async fn boom() -> anyhow::Result<()> {
        anyhow::bail!("boom")
    }

    async fn a2_broke() -> anyhow::Result<()> {
        Err(ActionError::new("AssertionError", "a2 broke").into())
    }

    async fn explode() -> anyhow::Result<()> {
        panic!("spec exploded")
    }

    fn logged(
        log: &Log,
        label: &'static str,
    ) -> impl Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static {
        let log = log.clone();
        move || {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(label.to_string());
                anyhow::Ok(())
            }
            .boxed()
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_runs_every_spec_in_order() {
        let (mut engine, reporter) = recorded();
        engine
            .describe("math", |t| {
                t.test("one", pass)?;
                t.test("two", pass)?;
                t.test("three", pass)?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();

        assert_eq!(results.len(), 1);
        let suite = &results[0];
        assert!(suite.passed);
        assert_eq!(suite.status, Some(Status::Passed));
        assert_eq!(suite.action, ResultAction::End);
        assert_eq!(suite.tests.len(), 3);

        assert_eq!(
            reporter.trace(),
            vec![
                (EventKind::SuiteStarted, "/suite-0".to_string()),
                (EventKind::SpecStarted, "/suite-0/spec0".to_string()),
                (EventKind::SpecDone, "/suite-0/spec0".to_string()),
                (EventKind::SpecStarted, "/suite-0/spec1".to_string()),
                (EventKind::SpecDone, "/suite-0/spec1".to_string()),
                (EventKind::SpecStarted, "/suite-0/spec2".to_string()),
                (EventKind::SpecDone, "/suite-0/spec2".to_string()),
                (EventKind::SuiteDone, "/suite-0".to_string()),
            ]
        );

        let done = reporter.of_kind(EventKind::SpecDone);
        assert!(done.iter().all(|r| r.action == ResultAction::End && r.passed));
        assert_eq!(done[1].full_name, "math > two");
    }

    #[tokio::test]
    async fn test_spec_failure_does_not_stop_siblings() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("A", |t| {
                t.test("a1", pass)?;
                t.test("a2", a2_broke)?;
                Ok(())
            })
            .unwrap();
        engine
            .describe("B", |t| {
                t.test("b1", pass)?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert_eq!(results.len(), 2);

        let a = &results[0];
        assert!(a.failed);
        assert!(!a.passed);
        assert_eq!(a.tests.len(), 2);
        assert!(a.tests[0].passed);
        assert_eq!(a.tests[0].action, ResultAction::Test);
        assert!(a.tests[1].failed);
        let failure = a.tests[1].first_failure().unwrap();
        assert_eq!(failure.name, "AssertionError");
        assert_eq!(failure.message, "a2 broke");

        let b = &results[1];
        assert!(b.passed);
        assert_eq!(b.id, "suite-1");
        assert_eq!(b.tests.len(), 1);

        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.specs_passed, 2);
        assert_eq!(summary.specs_failed, 1);
        assert_eq!(summary.suites_failed, 1);
    }

    #[tokio::test]
    async fn test_panicking_spec_is_recorded() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("A", |t| {
                t.test("explodes", explode)?;
                t.test("still runs", pass)?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        let tests = &results[0].tests;
        assert_eq!(tests[0].first_failure().unwrap().name, "Panic");
        assert_eq!(tests[0].first_failure().unwrap().message, "spec exploded");
        assert!(tests[1].passed);
    }

    #[tokio::test]
    async fn test_root_before_all_failure_aborts_run() {
        let (mut engine, reporter) = recorded();
        let log: Log = Arc::default();
        engine.before_all(pass);
        engine.before_all(boom);
        engine.after_all(logged(&log, "root.afterAll"));
        engine
            .describe("never", |t| {
                t.test("never", pass)?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();

        assert_eq!(results.len(), 1);
        let failure = &results[0];
        assert!(failure.failed);
        assert_eq!(failure.id, "root");
        assert_eq!(failure.kind, NodeKind::Root);
        assert_eq!(failure.test_path, "/root/beforeAll1");
        assert_eq!(failure.action, ResultAction::Hook(HookKind::BeforeAll));
        assert_eq!(failure.first_failure().unwrap().message, "boom");
        assert!(reporter.events().is_empty());
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_root_after_all_failure_is_appended() {
        let (mut engine, _reporter) = recorded();
        engine.after_all(boom);
        engine
            .describe("A", |t| {
                t.test("a1", a2_broke)?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].failed);
        assert_eq!(results[1].test_path, "/root/afterAll0");
        assert_eq!(results[1].full_name, "root");
    }

    #[tokio::test]
    async fn test_before_each_failure_stops_remaining_specs() {
        let (mut engine, reporter) = recorded();
        engine
            .describe("A", |t| {
                t.before_each(boom);
                t.test("T1", pass)?;
                t.test("T2", pass)?;
                t.test("T3", pass)?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        let suite = &results[0];
        assert!(suite.failed);
        assert_eq!(suite.tests.len(), 1);

        let failure = &suite.tests[0];
        assert_eq!(failure.id, "spec0");
        assert_eq!(failure.test_path, "/suite-0/spec0/beforeEach0");
        assert_eq!(failure.full_name, "A > T1 > beforeEach");

        let started = reporter.of_kind(EventKind::SpecStarted);
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].description, "T1");
        let done = reporter.of_kind(EventKind::SpecDone);
        assert_eq!(done.len(), 1);
        assert!(done[0].is_hook_failure());
    }

    #[tokio::test]
    async fn test_after_each_failure_stops_remaining_specs() {
        let (mut engine, reporter) = recorded();
        let log: Log = Arc::default();
        engine
            .describe("A", |t| {
                t.after_each(boom);
                t.test("T1", logged(&log, "T1"))?;
                t.test("T2", logged(&log, "T2"))?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert_eq!(entries(&log), vec!["T1"]);
        assert_eq!(results[0].tests.len(), 1);
        assert_eq!(
            results[0].tests[0].action,
            ResultAction::Hook(HookKind::AfterEach)
        );
        assert_eq!(reporter.of_kind(EventKind::SpecStarted).len(), 1);
    }

    #[tokio::test]
    async fn test_suite_before_all_failure_skips_body() {
        let (mut engine, reporter) = recorded();
        let log: Log = Arc::default();
        engine
            .describe("A", |t| {
                t.before_all(boom);
                t.after_all(logged(&log, "A.afterAll"));
                t.test("a1", logged(&log, "a1"))?;
                t.describe("nested", |t| {
                    t.test("n1", logged(&log, "n1"))?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();
        engine
            .describe("B", |t| {
                t.test("b1", logged(&log, "b1"))?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert_eq!(entries(&log), vec!["b1"]);

        let a = &results[0];
        assert!(a.failed);
        assert_eq!(a.id, "suite-0");
        assert_eq!(a.kind, NodeKind::Suite);
        assert_eq!(a.test_path, "/suite-0/beforeAll0");
        assert_eq!(a.full_name, "A > beforeAll");
        assert!(a.tests.is_empty());
        assert!(results[1].passed);

        let suite_done = reporter.of_kind(EventKind::SuiteDone);
        assert_eq!(suite_done.len(), 2);
        assert_eq!(suite_done[0].action, ResultAction::Hook(HookKind::BeforeAll));
    }

    #[tokio::test]
    async fn test_suite_after_all_failure_keeps_children() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("A", |t| {
                t.after_all(boom);
                t.test("a1", pass)?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        let a = &results[0];
        assert!(a.failed);
        assert!(!a.passed);
        assert_eq!(a.action, ResultAction::Hook(HookKind::AfterAll));
        assert_eq!(a.tests.len(), 1);
        assert!(a.tests[0].passed);
    }

    #[tokio::test]
    async fn test_hook_scope_cascading() {
        let (mut engine, _reporter) = recorded();
        let log: Log = Arc::default();
        engine.before_all(logged(&log, "root.beforeAll"));
        engine.before_each(logged(&log, "root.beforeEach"));
        engine.after_each(logged(&log, "root.afterEach"));
        engine.after_all(logged(&log, "root.afterAll"));
        engine
            .describe("A", |t| {
                t.before_all(logged(&log, "A.beforeAll"));
                t.before_each(logged(&log, "A.beforeEach"));
                t.after_each(logged(&log, "A.afterEach"));
                t.after_all(logged(&log, "A.afterAll"));
                t.test("a1", logged(&log, "a1"))?;
                t.describe("B", |t| {
                    t.before_all(logged(&log, "B.beforeAll"));
                    t.after_all(logged(&log, "B.afterAll"));
                    t.test("b1", logged(&log, "b1"))?;
                    t.test("b2", logged(&log, "b2"))?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert!(results[0].passed);
        assert_eq!(
            entries(&log),
            vec![
                "root.beforeAll",
                "root.beforeEach",
                "A.beforeAll",
                "A.beforeEach",
                "a1",
                "A.afterEach",
                "A.beforeEach",
                "B.beforeAll",
                "b1",
                "b2",
                "A.afterEach",
                "B.afterAll",
                "root.afterEach",
                "A.afterAll",
                "root.afterAll",
            ]
        );
    }

    #[tokio::test]
    async fn test_scope_hook_failure_is_addressed_to_scope() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("outer", |t| {
                t.before_each(boom);
                t.describe("inner", |t| {
                    t.test("i1", pass)?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        let outer = &results[0];
        assert!(outer.failed);
        let inner = &outer.describes[0];
        assert_eq!(inner.id, "suite-0-0");
        assert_eq!(inner.test_path, "/root/beforeEach0");
        assert_eq!(inner.full_name, "outer");
        assert!(inner.tests.is_empty());
    }

    #[tokio::test]
    async fn test_nested_suite_ids_accumulate() {
        let (mut engine, reporter) = recorded();
        engine.describe("zero", |_| Ok(())).unwrap();
        engine
            .describe("one", |t| {
                t.describe("one-zero", |t| {
                    t.describe("one-zero-zero", |t| {
                        t.test("deep", pass)?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        let deep_suite = &results[1].describes[0].describes[0];
        assert_eq!(results[1].describes[0].id, "suite-1-0");
        assert_eq!(deep_suite.id, "suite-1-0-0");
        assert_eq!(deep_suite.tests[0].test_path, "/suite-1-0-0/spec0");

        let started: Vec<_> = reporter
            .of_kind(EventKind::SuiteStarted)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(started, vec!["suite-0", "suite-1", "suite-1-0", "suite-1-0-0"]);
    }

    #[tokio::test]
    async fn test_skipped_nodes_emit_only_start_events() {
        let (mut engine, reporter) = recorded();
        let log: Log = Arc::default();
        engine
            .describe_skip("skipped", |t| {
                t.test("never", logged(&log, "never"))?;
                t.describe("child", |_| Ok(()))?;
                Ok(())
            })
            .unwrap();
        engine
            .describe("running", |t| {
                t.xtest("pending")?;
                t.test_skip("skipped", logged(&log, "skipped"))?;
                t.test("runs", logged(&log, "runs"))?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert_eq!(entries(&log), vec!["runs"]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tests.len(), 1);

        let suites_started = reporter.of_kind(EventKind::SuiteStarted);
        assert_eq!(suites_started.len(), 2);
        assert_eq!(suites_started[0].action, ResultAction::Skipped);
        assert_eq!(suites_started[0].status, Some(Status::Skipped));
        assert_eq!(reporter.skipped(NodeKind::Suite), 1);
        assert_eq!(reporter.skipped(NodeKind::Spec), 2);
        assert_eq!(reporter.of_kind(EventKind::SuiteDone).len(), 1);
    }

    #[tokio::test]
    async fn test_describe_only_skips_other_suites() {
        let (mut engine, reporter) = recorded();
        let log: Log = Arc::default();
        engine
            .describe("A", |t| {
                t.describe_only("B", |t| {
                    t.test("b1", logged(&log, "b1"))?;
                    Ok(())
                })?;
                t.describe("B sibling", |t| {
                    t.test("s1", logged(&log, "s1"))?;
                    Ok(())
                })?;
                t.test("a1", logged(&log, "a1"))?;
                Ok(())
            })
            .unwrap();
        engine
            .describe("A sibling", |t| {
                t.test("x1", logged(&log, "x1"))?;
                Ok(())
            })
            .unwrap();

        engine.run().await.unwrap();

        // specs directly in A still run, A is kept alive by its only child
        assert_eq!(entries(&log), vec!["a1", "b1"]);
        let skipped: Vec<_> = reporter
            .of_kind(EventKind::SuiteStarted)
            .into_iter()
            .filter(|r| r.skipped)
            .map(|r| r.description)
            .collect();
        assert_eq!(skipped, vec!["B sibling", "A sibling"]);
    }

    #[tokio::test]
    async fn test_describe_only_requires_selection_below_it() {
        let (mut engine, _reporter) = recorded();
        let log: Log = Arc::default();
        engine
            .describe_only("only", |t| {
                t.test("direct", logged(&log, "direct"))?;
                t.describe("unmarked child", |t| {
                    t.test("nested", logged(&log, "nested"))?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        engine.run().await.unwrap();
        assert_eq!(entries(&log), vec!["direct"]);
    }

    #[tokio::test]
    async fn test_test_only_skips_sibling_specs_and_suites() {
        let (mut engine, reporter) = recorded();
        let log: Log = Arc::default();
        engine
            .describe("outer", |t| {
                t.describe("A", |t| {
                    t.test("a1", logged(&log, "a1"))?;
                    t.test_only("a2", logged(&log, "a2"))?;
                    t.test("a3", logged(&log, "a3"))?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();
        engine
            .describe("B", |t| {
                t.test("b1", logged(&log, "b1"))?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert_eq!(entries(&log), vec!["a2"]);
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
        assert_eq!(reporter.skipped(NodeKind::Spec), 2);
        assert_eq!(reporter.skipped(NodeKind::Suite), 1);
    }

    #[tokio::test]
    async fn test_reset_runs_everything_again() {
        let (mut engine, _reporter) = recorded();
        let log: Log = Arc::default();
        engine.before_all(boom);
        engine
            .describe("A", |t| {
                t.test_only("a1", logged(&log, "a1"))?;
                Ok(())
            })
            .unwrap();
        let results = engine.run().await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].failed);

        engine.reset();
        engine
            .describe("A", |t| {
                t.test("a1", logged(&log, "a1"))?;
                t.test("a2", logged(&log, "a2"))?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert!(results[0].passed);
        assert_eq!(entries(&log), vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn test_passed_payload_is_recorded() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("A", |t| {
                t.test("rows", || async { Ok(serde_json::json!({"rows": 3})) })?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        let spec = &results[0].tests[0];
        assert!(spec.passed);
        assert_eq!(spec.passed_expectations, vec![serde_json::json!({"rows": 3})]);
    }

    #[tokio::test]
    async fn test_results_serialize_as_tree() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("A", |t| {
                t.test("a1", pass)?;
                t.describe("B", |t| {
                    t.test("b1", pass)?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        let value = serde_json::to_value(&results).unwrap();
        assert_eq!(value[0]["type"], "suite");
        assert_eq!(value[0]["action"], "end");
        assert_eq!(value[0]["tests"][0]["action"], "test");
        assert_eq!(value[0]["describes"][0]["id"], "suite-0-0");
        assert_eq!(value[0]["describes"][0]["tests"][0]["fullName"], "B > b1");
    }

    #[tokio::test]
    async fn test_skip_wins_over_only() {
        let (mut engine, reporter) = recorded();
        let log: Log = Arc::default();
        let selected = engine
            .describe_only("selected", |t| {
                t.test("s1", logged(&log, "s1"))?;
                Ok(())
            })
            .unwrap();
        engine
            .describe("focused", |t| {
                let only = t.test_only("only", logged(&log, "only"))?;
                t.disable_spec(only)?;
                t.test("other", logged(&log, "other"))?;
                Ok(())
            })
            .unwrap();
        engine.disable_suite(selected).unwrap();

        let results = engine.run().await.unwrap();

        assert!(entries(&log).is_empty());
        assert_eq!(reporter.skipped(NodeKind::Suite), 1);
        assert_eq!(reporter.skipped(NodeKind::Spec), 2);
        assert_eq!(results.len(), 1);
        assert!(results[0].tests.is_empty());
    }

    #[tokio::test]
    async fn test_scope_after_each_failure_keeps_children() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("outer", |t| {
                t.after_each(boom);
                t.describe("inner", |t| {
                    t.test("i1", pass)?;
                    t.describe("deepest", |t| {
                        t.test("d1", pass)?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        let inner = &results[0].describes[0];
        assert!(inner.failed);
        assert_eq!(inner.id, "suite-0-0");
        assert_eq!(inner.action, ResultAction::Hook(HookKind::AfterEach));
        assert_eq!(inner.test_path, "/root/afterEach0");
        assert_eq!(inner.tests.len(), 1);
        assert!(inner.tests[0].passed);
        assert_eq!(inner.describes.len(), 1);
        assert!(inner.describes[0].passed);
    }

    #[tokio::test]
    async fn test_hook_group_members_run_concurrently() {
        let (mut engine, _reporter) = recorded();
        let notify = Arc::new(tokio::sync::Notify::new());
        let waiter = notify.clone();
        let signaller = notify.clone();
        engine
            .describe("A", move |t| {
                t.before_all(move || {
                    let waiter = waiter.clone();
                    async move {
                        waiter.notified().await;
                        anyhow::Ok(())
                    }
                });
                t.before_all(move || {
                    let signaller = signaller.clone();
                    async move {
                        signaller.notify_one();
                        anyhow::Ok(())
                    }
                });
                t.test("a1", pass)?;
                Ok(())
            })
            .unwrap();

        let results = tokio::time::timeout(std::time::Duration::from_secs(5), engine.run())
            .await
            .expect("hook group members should not run one after another")
            .unwrap();
        assert!(results[0].passed);
    }

    #[tokio::test]
    async fn test_boxed_action_runs() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("A", |t| {
                t.test_action(
                    "boxed",
                    make_spec_action(|| async { Ok(serde_json::json!({"ok": true})) }),
                    None,
                )?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert_eq!(
            results[0].tests[0].passed_expectations,
            vec![serde_json::json!({"ok": true})]
        );
    }

    #[tokio::test]
    async fn test_scalar_payloads_are_not_recorded() {
        let (mut engine, _reporter) = recorded();
        engine
            .describe("A", |t| {
                t.test("zero", || async { Ok(0) })?;
                t.test("empty", || async { Ok("") })?;
                t.test("count", || async { Ok(12) })?;
                Ok(())
            })
            .unwrap();

        let results = engine.run().await.unwrap();
        assert!(results[0]
            .tests
            .iter()
            .all(|r| r.passed && r.passed_expectations.is_empty()));
    }

    #[test]
    fn test_run_during_registration_fails() {
        let mut engine = Engine::default();
        let mut outcome = None;
        engine
            .describe("A", |t| {
                outcome = Some(t.run_blocking());
                Ok(())
            })
            .unwrap();

        let err = outcome.unwrap().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::RunDuringRegistration)
        );
    }

    #[test]
    fn test_run_blocking() {
        let mut engine = Engine::default();
        engine
            .describe("A", |t| {
                t.test("a1", pass)?;
                Ok(())
            })
            .unwrap();

        let results = engine.run_blocking().unwrap();
        assert!(results[0].passed);

        let again = tokio_test::block_on(engine.run()).unwrap();
        assert_eq!(again.len(), 1);
    }
}
