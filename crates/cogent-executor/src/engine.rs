use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use cogent_core::config::ExecutionConfig;
use cogent_core::error::{CogentError, ShutdownSignal, TimeoutScope};
use cogent_core::event::{EventBus, EventKind, ExecutionEvent};
use cogent_core::traits::{LlmClient, ToolDispatcher};
use cogent_core::types::{AgentAction, TaskRequest, ToolCall, ToolExchange, ToolResult};

use crate::deadline::{run_with_deadline, TaskDeadline};
use crate::guard::{GuardVerdict, IterationGuard, IterationState};
use crate::shutdown::ShutdownController;

const SUMMARY_MAX_CHARS: usize = 120;

/// Outcome of one engine run, with the iteration count at the point
/// the run ended.
#[derive(Debug)]
pub struct EngineReport {
    pub outcome: Result<String, CogentError>,
    pub iterations_completed: usize,
}

/// The step sequencer: drives model-decision / tool-dispatch cycles
/// until a final answer, a limit, a deadline, or shutdown ends the run.
///
/// One engine instance owns one run's `IterationState` and transcript;
/// nothing is shared across runs except the shutdown flag and the bus.
pub struct WorkflowEngine {
    config: ExecutionConfig,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolDispatcher>,
    bus: Arc<EventBus>,
    shutdown: ShutdownController,
}

impl WorkflowEngine {
    pub fn new(
        config: ExecutionConfig,
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolDispatcher>,
        bus: Arc<EventBus>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            config,
            llm,
            tools,
            bus,
            shutdown,
        }
    }

    /// Run the workflow loop. `scope` selects the whole-run budget:
    /// `Task` uses `task_timeout`, `Chat` uses `chat_timeout`.
    pub async fn run(&self, request: TaskRequest, scope: TimeoutScope) -> EngineReport {
        let budget = match scope {
            TimeoutScope::Chat => self.config.chat_timeout(),
            _ => self.config.task_timeout(),
        };
        let run_deadline = TaskDeadline::new(scope, budget);
        let guard = IterationGuard::new(self.config.max_iterations, self.config.safety_margin);
        let mut state = IterationState::new();
        let mut transcript: Vec<ToolExchange> = Vec::new();

        loop {
            match guard.check(&mut state) {
                GuardVerdict::Abort {
                    completed,
                    hard_limit,
                } => {
                    warn!(completed, hard_limit, "iteration hard limit reached");
                    return EngineReport {
                        outcome: Err(CogentError::MaxIterationsExceeded {
                            completed,
                            hard_limit,
                        }),
                        iterations_completed: completed,
                    };
                }
                GuardVerdict::Warn { completed, limit } => {
                    warn!(completed, limit, "past nominal iteration limit, inside safety margin");
                    self.bus
                        .publish(ExecutionEvent::now(EventKind::IterationLimitApproaching {
                            completed,
                            limit,
                        }));
                }
                GuardVerdict::Continue => {}
            }

            // Shutdown is observed only at step boundaries so an
            // in-flight tool call is never torn mid-effect.
            if self.shutdown.is_requested() {
                let signal = self.shutdown.signal().unwrap_or(ShutdownSignal::Interrupt);
                info!(%signal, completed = state.completed, "run stopping on shutdown request");
                return EngineReport {
                    outcome: Err(CogentError::Interrupted {
                        signal,
                        iterations_completed: state.completed,
                    }),
                    iterations_completed: state.completed,
                };
            }

            if run_deadline.expired() {
                return EngineReport {
                    outcome: Err(run_deadline.to_error()),
                    iterations_completed: state.completed,
                };
            }

            let iteration = state.completed + 1;
            debug!(iteration, "starting workflow step");

            let step = run_deadline.step_deadline(self.config.subtask_timeout());
            let action = match run_with_deadline(
                step,
                self.llm
                    .next_action(&request.goal, &transcript, request.context.as_ref()),
            )
            .await
            {
                Ok(action) => action,
                // Provider error or step/run deadline — fatal to the run
                Err(err) => {
                    return EngineReport {
                        outcome: Err(err),
                        iterations_completed: state.completed,
                    }
                }
            };

            match action {
                AgentAction::FinalAnswer { text } => {
                    self.bus.publish(ExecutionEvent::now(EventKind::LlmResponse {
                        iteration,
                        summary: summarize(&text),
                    }));
                    state.record();
                    info!(iterations = state.completed, "workflow produced final answer");
                    return EngineReport {
                        outcome: Ok(text),
                        iterations_completed: state.completed,
                    };
                }
                AgentAction::ToolCall(call) => {
                    self.bus.publish(ExecutionEvent::now(EventKind::LlmResponse {
                        iteration,
                        summary: format!("tool call: {}", call.name),
                    }));
                    let result = match self.dispatch_tool(&call, &run_deadline, iteration).await {
                        Ok(result) => result,
                        // Only deadline expiry is fatal here
                        Err(err) => {
                            return EngineReport {
                                outcome: Err(err),
                                iterations_completed: state.completed,
                            }
                        }
                    };
                    transcript.push(ToolExchange { call, result });
                    state.record();
                }
            }
        }
    }

    /// Dispatch one tool call under the step deadline. A failed call is
    /// folded back as an error result for the model to react to; when
    /// `retry_on_failure` is set the engine retries the same call up to
    /// `max_retry_attempts` first, with no backoff.
    async fn dispatch_tool(
        &self,
        call: &ToolCall,
        run_deadline: &TaskDeadline,
        iteration: usize,
    ) -> Result<ToolResult, CogentError> {
        let attempts = if self.config.retry_on_failure {
            self.config.max_retry_attempts.max(1)
        } else {
            1
        };

        let mut last = ToolResult::error("tool was never dispatched");
        for attempt in 1..=attempts {
            let step = run_deadline.step_deadline(self.config.subtask_timeout());
            let started = Instant::now();
            let result = match run_with_deadline(step, self.tools.invoke(call)).await {
                Ok(result) => result,
                Err(err @ CogentError::TimedOut { .. }) => return Err(err),
                Err(err) => {
                    error!(tool = %call.name, error = %err, "tool execution failed");
                    ToolResult::error(err.to_string())
                }
            };

            self.bus
                .publish(ExecutionEvent::now(EventKind::ToolCallCompleted {
                    tool: call.name.clone(),
                    success: !result.is_error,
                    duration_ms: started.elapsed().as_millis() as u64,
                    iteration,
                }));

            if !result.is_error {
                return Ok(result);
            }
            if attempt < attempts {
                debug!(tool = %call.name, attempt, "retrying failed tool call");
            }
            last = result;
        }
        Ok(last)
    }
}

/// First line of the model output, truncated for event payloads.
fn summarize(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= SUMMARY_MAX_CHARS {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{truncated}…")
    }
}
