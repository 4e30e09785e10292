// src/scheduler.rs
//! Sequential cycle loop with cooperative stop and a forced exit after a grace delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use metrics::counter;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::aggregator::{Aggregator, CycleResult};
use crate::error::classify;

/// Shutdown latch: set once, observed by the loop and the signal listener.
#[derive(Debug, Default)]
pub struct Shutdown {
    requested: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns `true` only for the call that flipped the latch.
    pub fn request(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `d` unless shutdown is requested first. `true` when the full delay elapsed.
    pub async fn sleep(&self, d: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_requested() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(d) => true,
            _ = notified => false,
        }
    }
}

/// First signal requests shutdown and schedules `exit(0)` after `grace`; later ones are ignored.
fn on_signal(shutdown: &Shutdown, signal: &'static str, grace: Duration) {
    if !shutdown.request() {
        debug!(signal, "shutdown already in progress");
        return;
    }
    info!(signal, grace_ms = grace.as_millis() as u64, "received signal, shutting down");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        info!("grace period over, exiting");
        std::process::exit(0);
    });
}

/// Listen for SIGINT and SIGTERM for the lifetime of the process.
#[cfg(unix)]
pub fn spawn_signal_listener(shutdown: Arc<Shutdown>, grace: Duration) -> Result<JoinHandle<()>> {
    use anyhow::Context;
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                r = tokio::signal::ctrl_c() => match r {
                    Ok(()) => "SIGINT",
                    Err(e) => {
                        warn!(error = %e, "ctrl_c listener failed");
                        return;
                    }
                },
                _ = term.recv() => "SIGTERM",
            };
            on_signal(&shutdown, name, grace);
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(shutdown: Arc<Shutdown>, grace: Duration) -> Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            on_signal(&shutdown, "ctrl_c", grace);
        }
    }))
}

pub struct Scheduler {
    aggregator: Aggregator,
    interval: Duration,
    shutdown: Arc<Shutdown>,
}

impl Scheduler {
    pub fn new(aggregator: Aggregator, interval: Duration, shutdown: Arc<Shutdown>) -> Self {
        Self {
            aggregator,
            interval,
            shutdown,
        }
    }

    /// Ensure today's partition and run one cycle. Errors are logged with their code, not returned.
    pub async fn tick(&self) -> Option<CycleResult> {
        let now = Local::now().naive_local();
        let outcome = match self.aggregator.ensure_partition(now.date()).await {
            Ok(()) => self.aggregator.run_cycle_at(now).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(res) => {
                info!(sections = res.sections.len(), "completed cycle");
                Some(res)
            }
            Err(e) => {
                let code = classify(&e);
                error!(code, error = ?e, "cycle failed");
                counter!("digest_cycle_failures_total", "code" => code).increment(1);
                None
            }
        }
    }

    /// Run until shutdown. Never starts a cycle after shutdown was requested.
    pub async fn run(&self) {
        info!(
            interval_secs = self.interval.as_secs(),
            "scheduler started"
        );
        while !self.shutdown.is_requested() {
            info!("starting cycle");
            self.tick().await;
            info!(interval_secs = self.interval.as_secs(), "waiting for next cycle");
            if !self.shutdown.sleep(self.interval).await {
                break;
            }
        }
        info!("scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_request_wins() {
        let s = Shutdown::new();
        assert!(!s.is_requested());
        assert!(s.request());
        assert!(!s.request());
        assert!(s.is_requested());
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_request() {
        let s = Shutdown::new();
        let s2 = Arc::clone(&s);
        let t0 = std::time::Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            s2.request();
        });
        assert!(!s.sleep(Duration::from_secs(30)).await);
        assert!(t0.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn sleep_after_request_returns_immediately() {
        let s = Shutdown::new();
        s.request();
        assert!(!s.sleep(Duration::from_secs(30)).await);
    }

    #[tokio::test]
    async fn full_sleep_reports_elapsed() {
        let s = Shutdown::new();
        assert!(s.sleep(Duration::from_millis(10)).await);
    }
}
