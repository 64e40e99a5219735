//! specrun - test registration and execution engine
//!
//! Suites and specs are registered with a `describe`/`test` API, decorated
//! with lifecycle hooks and `only`/`skip` selection, and then executed in
//! registration order. Every start and completion is reported through a
//! [`Reporter`], and the run returns a nested tree of [`RunResult`]s.
//!
//! ## Usage
//!
//! ```no_run
//! use specrun::{Engine, EngineConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut engine = Engine::new(EngineConfig::new().with_description("math"));
//! engine.describe("addition", |t| {
//!     t.before_each(|| async { Ok(()) });
//!     t.test("adds", || async {
//!         anyhow::ensure!(1 + 1 == 2, "math is broken");
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! let results = engine.run().await?;
//! assert!(results[0].passed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod feature;
pub mod models;
pub mod reporter;
pub mod utils;

pub use config::EngineConfig;
pub use engine::{Engine, Registration, Scheduler};
pub use error::{ActionError, ConfigurationError};
pub use feature::{Scenario, SeededShortId, ShortId, StepAction, StepRegistry, StepResolver};
pub use models::{Expectation, HookKind, NodeKind, ResultAction, RunResult, RunSummary, Status};
pub use reporter::{EventKind, NoopReporter, RecordingReporter, Reporter, TracingReporter};
