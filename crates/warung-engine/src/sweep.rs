//! # Reconciliation Sweep
//!
//! Background task that periodically expires orders stuck in
//! AwaitingPayment past the configured window. The sweep owns no policy of
//! its own: the window, the interval and the capture-in-flight skip all live
//! in [`crate::orders::OrderEngine::expire_unpaid`] and [`crate::config`].

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::orders::OrderEngine;

// =============================================================================
// Sweep Task
// =============================================================================

/// Spawner for the periodic unpaid-order expiry task.
pub struct ReconciliationSweep;

impl ReconciliationSweep {
    /// Spawns the sweep on the current runtime. The task runs until the
    /// returned handle is shut down or dropped.
    pub fn spawn(engine: Arc<OrderEngine>) -> SweepHandle {
        let interval = engine.config().sweep_interval();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Reconciliation sweep started");
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh engine is
            // not swept before it has served a single request.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let expired = engine.expire_unpaid(Utc::now()).await;
                        if expired > 0 {
                            info!(expired, "Sweep expired unpaid orders");
                        } else {
                            debug!("Sweep pass, nothing to expire");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Reconciliation sweep stopping");
                        break;
                    }
                }
            }
        });

        SweepHandle {
            shutdown_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running sweep. Dropping it aborts the task; `shutdown` stops
/// it cleanly.
pub struct SweepHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Signals the sweep to stop and waits for the task to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
