//! Background settlement scheduler.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::deadline::DeadlineLoop;
use super::instant::InstantTargetLoop;
use crate::port::outbound::SessionStore;

/// Scheduler intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Deadline sweep interval.
    pub deadline_interval: Duration,
    /// Instant-target sweep interval.
    pub instant_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            deadline_interval: Duration::from_secs(5),
            instant_interval: Duration::from_secs(3),
        }
    }
}

/// Handle for stopping the scheduler.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal both loops and wait for in-flight passes to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Scheduler task ended abnormally");
            }
        }
        info!("Settlement scheduler stopped");
    }
}

/// Runs the deadline and instant-target loops on fixed intervals.
///
/// A pass that has started always runs to completion; shutdown is only
/// observed between passes.
pub struct SettlementScheduler {
    config: SchedulerConfig,
    deadline: Arc<DeadlineLoop>,
    instant: Arc<InstantTargetLoop>,
    sessions: Arc<dyn SessionStore>,
}

impl SettlementScheduler {
    pub fn new(
        config: SchedulerConfig,
        deadline: Arc<DeadlineLoop>,
        instant: Arc<InstantTargetLoop>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            deadline,
            instant,
            sessions,
        }
    }

    /// Spawn both loops. The first pass of each runs immediately.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        info!(
            deadline_secs = self.config.deadline_interval.as_secs(),
            instant_secs = self.config.instant_interval.as_secs(),
            "Settlement scheduler started"
        );

        let deadline = {
            let mut shutdown_rx = shutdown_rx.clone();
            let runner = Arc::clone(&self.deadline);
            let sessions = Arc::clone(&self.sessions);
            let mut ticker = tokio::time::interval(self.config.deadline_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            debug!("Deadline loop shutting down");
                            break;
                        }
                        _ = ticker.tick() => {
                            let now = Utc::now();
                            runner.run_pass(now).await;
                            match sessions.purge_expired(now).await {
                                Ok(0) => {}
                                Ok(n) => debug!(purged = n, "Expired sessions removed"),
                                Err(e) => warn!(error = %e, "Failed to purge sessions"),
                            }
                        }
                    }
                }
            })
        };

        let instant = {
            let mut shutdown_rx = shutdown_rx;
            let runner = Arc::clone(&self.instant);
            let mut ticker = tokio::time::interval(self.config.instant_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            debug!("Instant-target loop shutting down");
                            break;
                        }
                        _ = ticker.tick() => {
                            let settled = runner.run_pass().await;
                            if settled > 0 {
                                info!(settled, "Instant-target pass settled rooms");
                            }
                        }
                    }
                }
            })
        };

        SchedulerHandle {
            shutdown_tx,
            tasks: vec![deadline, instant],
        }
    }
}
