pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use config::ExecutionConfig;
pub use error::{
    CogentError, ErrorKind, FailureReport, Result, ShutdownSignal, TimeoutScope,
};
pub use event::{EventBus, EventKind, ExecutionEvent};
pub use types::*;
