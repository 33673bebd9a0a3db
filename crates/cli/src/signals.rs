#![forbid(unsafe_code)]

use orchestrator::ControlEvent;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handlers for the signals the daemon reacts to.
///
/// - `SIGINT` and `SIGTERM` stop the poll loop.
/// - `SIGUSR1` logs the configuration and the last poll report.
pub struct Signals {
    interrupt: Signal,
    terminate: Signal,
    dump: Signal,
}

impl Signals {
    /// Install the handlers. Must be called from within a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            dump: signal(SignalKind::user_defined1())?,
        })
    }

    /// Translate signals until a shutdown is requested or the engine stops
    /// listening.
    pub async fn forward(
        mut self,
        cancel: CancellationToken,
        control_tx: mpsc::UnboundedSender<ControlEvent>,
    ) {
        loop {
            tokio::select! {
                _ = self.interrupt.recv() => {
                    debug!("received SIGINT");
                    break;
                }
                _ = self.terminate.recv() => {
                    debug!("received SIGTERM");
                    break;
                }
                _ = self.dump.recv() => {
                    debug!("received SIGUSR1");
                    if control_tx.send(ControlEvent::DumpStatus).is_err() {
                        return;
                    }
                }
            }
        }
        cancel.cancel();
    }
}
