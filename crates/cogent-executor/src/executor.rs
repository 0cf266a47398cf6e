use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info};

use cogent_core::config::ExecutionConfig;
use cogent_core::error::{CogentError, FailureReport, Result, TimeoutScope};
use cogent_core::event::{EventBus, EventKind, ExecutionEvent};
use cogent_core::traits::{LlmClient, ToolDispatcher};
use cogent_core::types::{TaskRequest, TaskResult};

use crate::engine::{EngineReport, WorkflowEngine};
use crate::shutdown::ShutdownController;

/// Public entry point: owns one workflow run per request, supervises
/// it, publishes the run's event stream, and returns a terminal result.
///
/// Every exit path — success, timeout, iteration abort, shutdown,
/// panic — publishes exactly one terminal event and returns exactly one
/// `TaskResult`; no failure leaves this boundary unclassified.
pub struct TaskExecutor {
    config: ExecutionConfig,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolDispatcher>,
    bus: Arc<EventBus>,
    shutdown: ShutdownController,
}

impl TaskExecutor {
    /// Build an executor. Fails fast on invalid configuration, before
    /// any run starts.
    pub fn new(
        config: ExecutionConfig,
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolDispatcher>,
        bus: Arc<EventBus>,
        shutdown: ShutdownController,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            llm,
            tools,
            bus,
            shutdown,
        })
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Execute a full task, bounded by `task_timeout`.
    pub async fn execute(&self, request: TaskRequest) -> TaskResult {
        self.run(request, TimeoutScope::Task).await
    }

    /// Execute one interactive turn, bounded by `chat_timeout`.
    pub async fn execute_chat(&self, request: TaskRequest) -> TaskResult {
        self.run(request, TimeoutScope::Chat).await
    }

    async fn run(&self, request: TaskRequest, scope: TimeoutScope) -> TaskResult {
        let started = Instant::now();
        let request_id = request.id.to_string();

        self.bus.publish(ExecutionEvent::now(EventKind::TaskStarted {
            request_id: request_id.clone(),
        }));

        let engine = WorkflowEngine::new(
            self.config.clone(),
            Arc::clone(&self.llm),
            Arc::clone(&self.tools),
            Arc::clone(&self.bus),
            self.shutdown.clone(),
        );
        // Run on a separate task so a panicking collaborator is caught
        // at the join boundary instead of unwinding through the caller.
        let handle = tokio::spawn(async move { engine.run(request, scope).await });

        let report = match handle.await {
            Ok(report) => report,
            Err(join_err) => EngineReport {
                outcome: Err(classify_join_error(join_err)),
                iterations_completed: 0,
            },
        };

        match report.outcome {
            Ok(output) => {
                let duration = started.elapsed();
                info!(
                    request_id = %request_id,
                    iterations = report.iterations_completed,
                    duration_ms = duration.as_millis() as u64,
                    "task completed"
                );
                self.bus.publish(ExecutionEvent::now(EventKind::TaskCompleted {
                    output: output.clone(),
                    iterations_completed: report.iterations_completed,
                    duration_ms: duration.as_millis() as u64,
                }));
                TaskResult::Completed {
                    output,
                    iterations_completed: report.iterations_completed,
                    duration,
                }
            }
            Err(err) => {
                let failure =
                    FailureReport::classify(&err, report.iterations_completed, self.config.debug);
                error!(
                    request_id = %request_id,
                    error_type = %failure.kind,
                    message = %failure.message,
                    "task failed"
                );
                self.bus.publish(ExecutionEvent::now(EventKind::TaskFailed {
                    error_type: failure.kind,
                    message: failure.message.clone(),
                    iterations_completed: failure.iterations_completed,
                    timeout: failure.timeout,
                    shutdown_signal: failure.shutdown_signal,
                    trace: failure.trace.clone(),
                }));
                TaskResult::Failed(failure)
            }
        }
    }
}

/// Defensive catch-all: an engine task that panicked (or was aborted)
/// still terminates the run with a classified failure.
fn classify_join_error(err: tokio::task::JoinError) -> CogentError {
    if err.is_panic() {
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        CogentError::Unexpected {
            error_type: "panic".into(),
            message,
            trace: None,
        }
    } else {
        CogentError::unexpected("join", "engine task aborted before completion")
    }
}
