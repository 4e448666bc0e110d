//! Background sweeping of expired sessions.

use crate::store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodically calls [`SessionStore::cleanup_expired`] until stopped.
///
/// ```ignore
/// let sweeper = SessionSweeper::spawn(store.clone(), config.cleanup_interval);
/// app.serve(listener, shutdown).await?;
/// sweeper.stop().await;
/// ```
pub struct SessionSweeper {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionSweeper {
    /// Start sweeping `store` every `every`. A zero interval is raised to one
    /// second.
    pub fn spawn<S: SessionStore + 'static>(store: Arc<S>, every: Duration) -> Self {
        let every = if every.is_zero() {
            Duration::from_secs(1)
        } else {
            every
        };
        let (stop, mut stopped) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => match store.cleanup_expired().await {
                        Ok(0) => {}
                        Ok(removed) => debug!(removed, "Swept expired sessions"),
                        Err(err) => warn!(error = %err, "Session sweep failed"),
                    },
                }
            }

            info!("Session sweeper stopped");
        });

        Self { stop, task }
    }

    /// Stop sweeping and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.task.await {
            warn!(error = %err, "Session sweeper task failed");
        }
    }
}
