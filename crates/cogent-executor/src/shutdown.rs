use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;
use tracing::info;

use cogent_core::error::ShutdownSignal;
use cogent_core::event::{EventBus, EventKind, ExecutionEvent};

static SIGNAL_LISTENER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Process-wide shutdown flag, threaded explicitly into every run.
///
/// Single-writer (the signal listener or a test trigger), multi-reader.
/// Once set it never resets for the controller's lifetime; tests build
/// a fresh controller instead of resetting. The controller only makes
/// the condition observable — it never terminates the process.
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
    signal: Arc<OnceLock<ShutdownSignal>>,
    bus: Option<Arc<EventBus>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bus to receive the `shutdown_requested` event.
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Spawn the OS signal listener. At most one listener is installed
    /// per process; later calls are no-ops.
    pub fn install(&self) {
        if SIGNAL_LISTENER_INSTALLED.swap(true, Ordering::SeqCst) {
            return;
        }
        let controller = self.clone();
        tokio::spawn(async move {
            let signal = wait_for_signal().await;
            controller.trigger(signal);
        });
    }

    /// Mark shutdown as requested. Also the test path for simulating a
    /// signal without touching the OS.
    pub fn trigger(&self, signal: ShutdownSignal) {
        if self.signal.set(signal).is_ok() {
            info!(%signal, "shutdown requested");
            if let Some(ref bus) = self.bus {
                bus.publish(ExecutionEvent::now(EventKind::ShutdownRequested { signal }));
            }
            self.token.cancel();
        }
    }

    /// Polled by the engine between steps — never inside a step, so an
    /// in-flight tool call is not torn.
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn signal(&self) -> Option<ShutdownSignal> {
        self.signal.get().copied()
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> ShutdownSignal {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
                _ = terminate.recv() => ShutdownSignal::Terminate,
            }
        }
        Err(_) => {
            tokio::signal::ctrl_c().await.ok();
            ShutdownSignal::Interrupt
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownSignal {
    tokio::signal::ctrl_c().await.ok();
    ShutdownSignal::Interrupt
}
