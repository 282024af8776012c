// src/tracker/scheduler.rs
//! The poll loop. An explicit interval loop bound to a shutdown channel, so
//! stopping never requires unwinding anything: the next select either ticks
//! or breaks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::bills::BillsTracker;
use super::divisions::DivisionsTracker;
use super::publications::PublicationsTracker;
use super::storage::{BillsStorage, DivisionStorage};
use crate::client::Parliament;
use crate::config::TrackerConfig;
use crate::error::Result;

/// One unit of recurring work for the driver.
#[async_trait]
pub trait PollCycle: Send {
    async fn poll_cycle(&mut self) -> Result<()>;
}

/// Handle used to stop a running driver. Dropping it also stops the driver.
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // Receiver may already be gone; nothing to do then.
        let _ = self.tx.send(true);
    }
}

pub fn shutdown_channel() -> (ShutdownHandle, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, rx)
}

/// Runs a `PollCycle` on a fixed interval until shut down. A failed cycle is
/// logged and the loop carries on; the cycle left its own state at the last
/// committed point and simply retries next tick.
pub struct PollDriver {
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl PollDriver {
    pub fn new(interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self { interval, shutdown }
    }

    pub async fn run<C: PollCycle>(mut self, cycle: &mut C) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = cycle.poll_cycle().await {
                        counter!("tracker_poll_failures_total").increment(1);
                        tracing::warn!(error = %e, "poll cycle failed, retrying next tick");
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        tracing::info!("poll driver stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Drive `cycle` on a background task; the cycle is handed back when the
    /// driver stops.
    pub fn spawn<C: PollCycle + 'static>(self, mut cycle: C) -> JoinHandle<C> {
        tokio::spawn(async move {
            self.run(&mut cycle).await;
            cycle
        })
    }
}

/// The three trackers wired to one facade, polled in sequence per tick. The
/// trackers make no cross-ordering promises; this order just keeps the
/// publication poller behind the bill list it snapshots.
pub struct TrackerSet {
    pub bills: BillsTracker,
    pub publications: PublicationsTracker,
    pub divisions: DivisionsTracker,
}

impl TrackerSet {
    pub fn new(
        parliament: Arc<Parliament>,
        bills_storage: Arc<dyn BillsStorage>,
        division_storage: Arc<dyn DivisionStorage>,
        config: &TrackerConfig,
    ) -> Self {
        let client = parliament.http().clone();
        let endpoints = parliament.endpoints().clone();
        Self {
            bills: BillsTracker::new(client.clone(), endpoints, bills_storage.clone()),
            publications: PublicationsTracker::new(
                client,
                bills_storage,
                config.publication_fetch_limit,
            ),
            divisions: DivisionsTracker::new(
                parliament,
                division_storage,
                config.division_search_limit,
            ),
        }
    }

    pub async fn poll_all(&mut self) -> Result<()> {
        self.bills.poll().await?;
        self.publications.poll(&self.bills).await?;
        self.divisions.poll().await
    }
}

#[async_trait]
impl PollCycle for TrackerSet {
    async fn poll_cycle(&mut self) -> Result<()> {
        self.poll_all().await
    }
}
