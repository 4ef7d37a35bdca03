//! Periodic housekeeping that runs beside the HTTP server.
//!
//! Two loops: one publishes connection pool gauges, the other forgets callers
//! whose analysis quota has fully replenished.

use std::sync::Arc;
use std::time::Duration;

use persistence::metrics::PoolSnapshot;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::middleware::RateLimiterState;

pub const POOL_GAUGE_PERIOD: Duration = Duration::from_secs(10);
pub const RATE_LIMIT_PRUNE_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Handle to the running housekeeping loops.
pub struct Maintenance {
    stop: watch::Sender<bool>,
    tasks: JoinSet<()>,
}

impl Maintenance {
    /// Starts the pool gauge loop, plus pruning when rate limiting is on.
    pub fn start(pool: PgPool, limiter: Option<Arc<RateLimiterState>>) -> Self {
        let (stop, _) = watch::channel(false);
        let mut tasks = JoinSet::new();

        tasks.spawn(every(
            "pool_gauges",
            POOL_GAUGE_PERIOD,
            stop.subscribe(),
            move || PoolSnapshot::of(&pool).publish(),
        ));

        if let Some(limiter) = limiter {
            tasks.spawn(every(
                "rate_limit_prune",
                RATE_LIMIT_PRUNE_PERIOD,
                stop.subscribe(),
                move || prune_idle_callers(&limiter),
            ));
        }

        info!(tasks = tasks.len(), "Maintenance started");
        Self { stop, tasks }
    }

    /// Signals every loop to stop and waits up to `grace` for them to exit.
    pub async fn stop(mut self, grace: Duration) {
        let _ = self.stop.send(true);

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = self.tasks.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "Maintenance task panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(grace = ?grace, "Maintenance did not stop in time, aborting");
            self.tasks.abort_all();
        }
    }
}

/// Runs `work` once per `period`, first after one full period, until `stop`
/// flips to true or its sender goes away.
async fn every<F>(
    task: &'static str,
    period: Duration,
    mut stop: watch::Receiver<bool>,
    mut work: F,
) where
    F: FnMut() + Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => work(),
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    debug!(task, "Maintenance task stopped");
                    break;
                }
            }
        }
    }
}

fn prune_idle_callers(limiter: &RateLimiterState) {
    let before = limiter.tracked_users();
    limiter.prune();
    debug!(
        before,
        after = limiter.tracked_users(),
        "Pruned rate limiter state"
    );
}
