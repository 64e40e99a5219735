//! Test engine
//!
//! Registration builds the tree, the scheduler walks it.

mod hooks;
mod registry;
mod scheduler;

pub use registry::{Engine, Registration};
pub use scheduler::Scheduler;
