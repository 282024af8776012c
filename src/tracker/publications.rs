// src/tracker/publications.rs
//! Poller for the per-bill publication feeds. The tracked-bill list is a
//! snapshot of the bills tracker's feeds; the publication watermarks are
//! owned here. The first cycle backfills up to a configured number of
//! historical publications per bill, later cycles fetch forward-only.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use metrics::{counter, gauge};

use super::bills::BillsTracker;
use super::feed::{self, PublicationFeedDocument, PublicationUpdate};
use super::storage::BillsStorage;
use super::{ensure_metrics_described, PublicationListener};
use crate::error::{Error, Result};
use crate::fetch;

pub struct PublicationsTracker {
    client: reqwest::Client,
    storage: Arc<dyn BillsStorage>,
    listeners: Vec<Arc<dyn PublicationListener>>,
    watermarks: HashMap<u32, DateTime<Utc>>,
    fetch_limit: usize,
    first_cycle: bool,
    last_polled: Option<DateTime<Utc>>,
}

impl PublicationsTracker {
    pub fn new(
        client: reqwest::Client,
        storage: Arc<dyn BillsStorage>,
        fetch_limit: usize,
    ) -> Self {
        ensure_metrics_described();
        Self {
            client,
            storage,
            listeners: Vec::new(),
            watermarks: HashMap::new(),
            fetch_limit,
            first_cycle: true,
            last_polled: None,
        }
    }

    /// Publication listeners are unconditional.
    pub fn register(&mut self, listener: Arc<dyn PublicationListener>) {
        self.listeners.push(listener);
    }

    pub fn last_polled(&self) -> Option<DateTime<Utc>> {
        self.last_polled
    }

    pub fn watermark(&self, bill_id: u32) -> Option<DateTime<Utc>> {
        self.watermarks.get(&bill_id).copied()
    }

    /// One poll cycle over every bill the bills tracker currently follows.
    /// Feed fetches fan out together; a single failure aborts the cycle.
    pub async fn poll(&mut self, bills: &BillsTracker) -> Result<()> {
        counter!("tracker_poll_cycles_total", "tracker" => "publications").increment(1);
        let tracked: Vec<(u32, String)> = bills
            .feeds()
            .map(|f| (f.bill_id(), f.feed_url().to_string()))
            .collect();

        let client = self.client.clone();
        let bodies = try_join_all(tracked.into_iter().map(|(bill_id, url)| {
            let client = client.clone();
            async move {
                let xml = fetch::get_text(&client, &url).await?;
                Ok::<_, Error>((bill_id, xml))
            }
        }))
        .await?;

        let limit = if self.first_cycle { self.fetch_limit } else { 1 };
        for (bill_id, xml) in bodies {
            let doc = feed::parse_publication_feed(&xml)?;
            self.ingest_publication_feed(bill_id, doc, limit).await?;
        }

        self.last_polled = Some(Utc::now());
        gauge!("tracker_last_poll_ts").set(Utc::now().timestamp() as f64);
        self.first_cycle = false;
        Ok(())
    }

    /// Process one parsed publication feed for one bill. Public so callers
    /// (and tests) can drive the tracker from fixtures.
    pub async fn ingest_publication_feed(
        &mut self,
        bill_id: u32,
        doc: PublicationFeedDocument,
        limit: usize,
    ) -> Result<()> {
        let build = doc
            .last_build
            .ok_or_else(|| Error::malformed("publication feed has no lastBuildDate"))?;
        let watermark = self.watermarks.get(&bill_id).copied();

        // Unchanged channel: nothing new behind it, skip without touching
        // the watermark.
        if let Some(watermark) = watermark {
            if build <= watermark {
                return Ok(());
            }
        }

        let fresh = select_new(watermark, &doc.items, limit);
        for update in fresh {
            let stored = self
                .storage
                .has_publication_update(bill_id, update)
                .await
                .map_err(Error::Storage)?;
            if stored {
                continue;
            }
            self.storage
                .add_publication_update(bill_id, update)
                .await
                .map_err(Error::Storage)?;
            self.dispatch(bill_id, update).await?;
        }

        self.watermarks.insert(bill_id, build);
        Ok(())
    }

    async fn dispatch(&self, bill_id: u32, update: &PublicationUpdate) -> Result<()> {
        if self.listeners.is_empty() {
            return Ok(());
        }
        try_join_all(
            self.listeners
                .iter()
                .map(|listener| listener.on_publication(bill_id, update)),
        )
        .await
        .map_err(Error::Listener)?;
        counter!("tracker_updates_dispatched_total", "tracker" => "publications").increment(1);
        tracing::info!(bill_id, title = %update.title, "publication dispatched");
        Ok(())
    }
}

/// Entries arrive reverse-chronological; take from the front until the first
/// entry strictly older than the watermark, or until the fetch limit. Entries
/// equal to the watermark pass through and fall to the storage dedup.
fn select_new(
    watermark: Option<DateTime<Utc>>,
    items: &[PublicationUpdate],
    limit: usize,
) -> Vec<&PublicationUpdate> {
    let mut fresh = Vec::new();
    for update in items {
        if let Some(watermark) = watermark {
            if update.published < watermark {
                break;
            }
        }
        if fresh.len() >= limit {
            break;
        }
        fresh.push(update);
    }
    fresh
}
