//! Bridge from parsed features to registered suites
//!
//! A feature becomes one suite and each of its scenarios one spec. The spec
//! runs the scenario's resolved steps in order and stops at the first
//! failing step.

mod short_id;
mod steps;

pub use short_id::{SeededShortId, ShortId};
pub use steps::{Scenario, StepAction, StepRegistry, StepResolver};

use anyhow::Context;
use std::sync::Arc;
use tracing::debug;

use crate::engine::{Engine, Registration};
use crate::error::ConfigurationError;
use crate::models::SuiteId;

type ResolvedSteps = Arc<Vec<(String, StepAction)>>;

fn resolve_steps(scenario: &Scenario, resolver: &dyn StepResolver) -> Registration<ResolvedSteps> {
    scenario
        .steps
        .iter()
        .map(|text| match resolver.resolve(text) {
            Some(action) => Ok((text.clone(), action)),
            None => Err(ConfigurationError::UnresolvedStep {
                scenario: scenario.description.clone(),
                step: text.clone(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Arc::new)
}

impl Engine {
    /// Register `feature` as a suite with one spec per scenario. Every step
    /// is resolved before anything is registered.
    pub fn register_feature(
        &mut self,
        feature: impl Into<String>,
        scenarios: &[Scenario],
        resolver: &dyn StepResolver,
    ) -> Registration<SuiteId> {
        let resolved = scenarios
            .iter()
            .map(|scenario| Ok((scenario, resolve_steps(scenario, resolver)?)))
            .collect::<Registration<Vec<_>>>()?;

        let feature = feature.into();
        debug!(
            "Registering feature \"{}\" with {} scenario(s)",
            feature,
            resolved.len()
        );

        self.describe(feature, |t| {
            for (scenario, steps) in resolved {
                t.test(scenario.description.clone(), move || {
                    let steps = steps.clone();
                    async move {
                        for (text, step) in steps.iter() {
                            step().await.with_context(|| format!("Step failed: {text}"))?;
                        }
                        anyhow::Ok(())
                    }
                })?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::models::Parent;
    use crate::reporter::{EventKind, RecordingReporter};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn steps(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn search_steps(log: &Log) -> StepRegistry {
        let mut registry = StepRegistry::new();
        for text in ["I open google", "I search for parkin", "I see results"] {
            let log = log.clone();
            registry.define(text, move || {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(text.to_string());
                    Ok(())
                }
            });
        }
        registry.define("the page is broken", || async {
            Err(ActionError::new("AssertionError", "page did not load").into())
        });
        registry
    }

    #[tokio::test]
    async fn test_feature_runs_scenarios() {
        let log: Log = Arc::default();
        let registry = search_steps(&log);
        let reporter = Arc::new(RecordingReporter::new());
        let mut engine = Engine::default().with_reporter(reporter.clone());

        let scenarios = vec![
            Scenario::new(
                3,
                "Search the web for parkin",
                steps(&["I open google", "I search for parkin", "I see results"]),
            ),
            Scenario::new(
                9,
                "Skip steps after a failure",
                steps(&["I open google", "the page is broken", "I see results"]),
            ),
        ];

        engine
            .register_feature("Google search", &scenarios, &registry)
            .unwrap();
        let results = engine.run().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "I open google",
                "I search for parkin",
                "I see results",
                "I open google",
            ]
        );

        let suite = &results[0];
        assert_eq!(suite.description, "Google search");
        assert!(suite.failed);
        assert!(suite.tests[0].passed);
        assert_eq!(suite.tests[0].full_name, "Google search > Search the web for parkin");

        let failure = suite.tests[1].first_failure().unwrap();
        assert_eq!(failure.name, "AssertionError");
        assert_eq!(failure.message, "page did not load");
        assert_eq!(reporter.of_kind(EventKind::SpecDone).len(), 2);
    }

    #[test]
    fn test_unresolved_step_registers_nothing() {
        let log: Log = Arc::default();
        let registry = search_steps(&log);
        let mut engine = Engine::default();

        let scenarios = vec![Scenario::new(
            2,
            "Search bing",
            steps(&["I open google", "I open bing"]),
        )];

        let err = engine
            .register_feature("Bing search", &scenarios, &registry)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnresolvedStep {
                scenario: "Search bing".to_string(),
                step: "I open bing".to_string(),
            }
        );
        assert_eq!(engine.tree().suite_count(), 0);
        assert_eq!(engine.active_parent(), Parent::Root);
    }

    #[test]
    fn test_feature_nests_under_active_suite() {
        let registry = StepRegistry::new();
        let mut engine = Engine::default();

        engine
            .describe("features", |t| {
                t.register_feature("empty", &[], &registry)?;
                Ok(())
            })
            .unwrap();

        assert_eq!(engine.tree().suite_count(), 2);
        assert_eq!(engine.tree().root().describes.len(), 1);
    }
}
