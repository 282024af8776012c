// src/tracker/bills.rs
//! Poller for the aggregate bills feed. Keeps one watermark for the channel
//! and one per tracked bill, deduplicates against storage, and fans each
//! surviving update out to the listeners whose conditions match.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use metrics::{counter, gauge};

use super::feed::{self, Feed, FeedDocument, FeedUpdate};
use super::storage::BillsStorage;
use super::{ensure_metrics_described, meets_conditions, BillUpdateListener, Condition};
use crate::config::Endpoints;
use crate::error::{Error, Result};
use crate::fetch;

struct ListenerRegistration {
    listener: Arc<dyn BillUpdateListener>,
    conditions: Vec<Condition>,
}

pub struct BillsTracker {
    client: reqwest::Client,
    endpoints: Endpoints,
    storage: Arc<dyn BillsStorage>,
    listeners: Vec<ListenerRegistration>,
    feeds: HashMap<u32, Feed>,
    last_update: Option<DateTime<Utc>>,
}

impl BillsTracker {
    pub fn new(
        client: reqwest::Client,
        endpoints: Endpoints,
        storage: Arc<dyn BillsStorage>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            client,
            endpoints,
            storage,
            listeners: Vec::new(),
            feeds: HashMap::new(),
            last_update: None,
        }
    }

    /// Register a listener for updates matching any of `conditions`.
    /// Registrations live for the tracker's lifetime.
    pub fn register(&mut self, listener: Arc<dyn BillUpdateListener>, conditions: Vec<Condition>) {
        self.listeners.push(ListenerRegistration {
            listener,
            conditions,
        });
    }

    /// Channel-level watermark of the aggregate feed.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn feeds(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.values()
    }

    pub fn feed(&self, bill_id: u32) -> Option<&Feed> {
        self.feeds.get(&bill_id)
    }

    /// One poll cycle: fetch the aggregate feed and run it through
    /// `ingest_document`. Any failure aborts the cycle; the scheduler retries
    /// on the next tick.
    pub async fn poll(&mut self) -> Result<()> {
        let url = self.endpoints.aggregate_bills_feed();
        let xml = fetch::get_text(&self.client, &url).await?;
        let doc = feed::parse_feed(&xml)?;
        self.ingest_document(doc).await
    }

    /// Process one parsed aggregate-feed document. Public so callers (and
    /// tests) can drive the tracker from fixtures.
    pub async fn ingest_document(&mut self, doc: FeedDocument) -> Result<()> {
        counter!("tracker_poll_cycles_total", "tracker" => "bills").increment(1);
        let build = doc
            .last_build
            .ok_or_else(|| Error::malformed("aggregate feed has no lastBuildDate"))?;

        if let Some(watermark) = self.last_update {
            if build <= watermark {
                tracing::debug!(%build, "aggregate feed unchanged, skipping cycle");
                return Ok(());
            }
        }
        self.last_update = Some(build);

        // Feed order is newest first; handle the backlog oldest first.
        for update in doc.items.into_iter().rev() {
            self.process_update(update).await?;
        }
        gauge!("tracker_last_poll_ts").set(Utc::now().timestamp() as f64);
        Ok(())
    }

    async fn process_update(&mut self, update: FeedUpdate) -> Result<()> {
        let bill_id = update.bill_id;
        let feed = match self.feeds.get(&bill_id) {
            Some(feed) => feed.clone(),
            None => {
                let feed = Feed::new(
                    bill_id,
                    update.guid.clone(),
                    self.endpoints.bill_feed(bill_id),
                );
                self.feeds.insert(bill_id, feed.clone());
                feed
            }
        };

        // Per-bill dedup by timestamp, independent of the storage dedup.
        if !feed.is_new(update.updated) {
            return Ok(());
        }

        let stored = self
            .storage
            .has_update_stored(bill_id, &update)
            .await
            .map_err(Error::Storage)?;
        if !stored {
            self.dispatch(&feed, &update).await?;
        }

        // The watermark moves only once the update is fully handled, so an
        // aborted cycle re-sees it on the next poll.
        if let Some(feed) = self.feeds.get_mut(&bill_id) {
            feed.commit(update.updated);
        }
        Ok(())
    }

    /// Deliver one update to every matching listener. Persistence happens per
    /// matching listener before the dispatches join; the redundant writes are
    /// the documented behavior and storage is required to be idempotent.
    async fn dispatch(&self, feed: &Feed, update: &FeedUpdate) -> Result<()> {
        let mut handlers = Vec::new();
        for registration in &self.listeners {
            if !meets_conditions(&registration.conditions, update) {
                continue;
            }
            handlers.push(registration.listener.on_update(feed, update));
            self.storage
                .add_feed_update(feed.bill_id(), update)
                .await
                .map_err(Error::Storage)?;
        }

        if handlers.is_empty() {
            return Ok(());
        }
        let dispatched = handlers.len();
        try_join_all(handlers).await.map_err(Error::Listener)?;
        counter!("tracker_updates_dispatched_total", "tracker" => "bills")
            .increment(dispatched as u64);
        tracing::info!(
            bill_id = feed.bill_id(),
            title = %update.title,
            stage = update.stage.as_deref().unwrap_or("-"),
            listeners = dispatched,
            "bill update dispatched"
        );
        Ok(())
    }
}
