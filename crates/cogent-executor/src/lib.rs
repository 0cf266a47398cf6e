pub mod deadline;
pub mod engine;
pub mod executor;
pub mod guard;
pub mod shutdown;

pub use engine::WorkflowEngine;
pub use executor::TaskExecutor;
pub use guard::{GuardVerdict, IterationGuard, IterationState};
pub use shutdown::ShutdownController;
