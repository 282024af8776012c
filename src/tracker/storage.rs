// src/tracker/storage.rs
//! The system of record for "has this update been delivered". Implemented
//! externally (database, file, whatever the embedding app records in); the
//! trackers only ever ask and tell, and never retry a failed call within a
//! cycle. Implementations must be idempotent.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::feed::{FeedUpdate, PublicationUpdate};
use crate::model::divisions::Division;

/// Dedup storage for bill-stage and publication updates.
#[async_trait]
pub trait BillsStorage: Send + Sync {
    async fn add_feed_update(&self, bill_id: u32, update: &FeedUpdate) -> anyhow::Result<()>;
    async fn has_update_stored(&self, bill_id: u32, update: &FeedUpdate) -> anyhow::Result<bool>;
    async fn add_publication_update(
        &self,
        bill_id: u32,
        update: &PublicationUpdate,
    ) -> anyhow::Result<()>;
    async fn has_publication_update(
        &self,
        bill_id: u32,
        update: &PublicationUpdate,
    ) -> anyhow::Result<bool>;
}

/// Dedup storage for divisions, standalone or associated with a bill.
#[async_trait]
pub trait DivisionStorage: Send + Sync {
    async fn add_division(&self, division: &Division) -> anyhow::Result<()>;
    async fn add_bill_division(&self, bill_id: u32, division: &Division) -> anyhow::Result<()>;
    async fn division_stored(&self, division: &Division) -> anyhow::Result<bool>;
    async fn bill_division_stored(
        &self,
        bill_id: u32,
        division: &Division,
    ) -> anyhow::Result<bool>;
    async fn get_bill_divisions(&self, bill_id: u32) -> anyhow::Result<Vec<u32>>;
}

/// In-memory reference implementation. Not durable; process restarts forget
/// everything. Handy for tests and throwaway embedding.
#[derive(Debug, Default)]
pub struct MemoryBillsStorage {
    feed_updates: Mutex<HashSet<(u32, String, DateTime<Utc>)>>,
    publication_updates: Mutex<HashSet<(u32, String)>>,
}

impl MemoryBillsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_update_count(&self) -> usize {
        self.feed_updates.lock().expect("storage mutex poisoned").len()
    }

    pub fn publication_update_count(&self) -> usize {
        self.publication_updates
            .lock()
            .expect("storage mutex poisoned")
            .len()
    }
}

#[async_trait]
impl BillsStorage for MemoryBillsStorage {
    async fn add_feed_update(&self, bill_id: u32, update: &FeedUpdate) -> anyhow::Result<()> {
        self.feed_updates
            .lock()
            .expect("storage mutex poisoned")
            .insert((bill_id, update.guid.clone(), update.updated));
        Ok(())
    }

    async fn has_update_stored(&self, bill_id: u32, update: &FeedUpdate) -> anyhow::Result<bool> {
        Ok(self
            .feed_updates
            .lock()
            .expect("storage mutex poisoned")
            .contains(&(bill_id, update.guid.clone(), update.updated)))
    }

    async fn add_publication_update(
        &self,
        bill_id: u32,
        update: &PublicationUpdate,
    ) -> anyhow::Result<()> {
        self.publication_updates
            .lock()
            .expect("storage mutex poisoned")
            .insert((bill_id, update.guid.clone()));
        Ok(())
    }

    async fn has_publication_update(
        &self,
        bill_id: u32,
        update: &PublicationUpdate,
    ) -> anyhow::Result<bool> {
        Ok(self
            .publication_updates
            .lock()
            .expect("storage mutex poisoned")
            .contains(&(bill_id, update.guid.clone())))
    }
}

#[derive(Debug, Default)]
pub struct MemoryDivisionStorage {
    divisions: Mutex<HashSet<u32>>,
    bill_divisions: Mutex<HashSet<(u32, u32)>>,
}

impl MemoryDivisionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DivisionStorage for MemoryDivisionStorage {
    async fn add_division(&self, division: &Division) -> anyhow::Result<()> {
        self.divisions
            .lock()
            .expect("storage mutex poisoned")
            .insert(division.id());
        Ok(())
    }

    async fn add_bill_division(&self, bill_id: u32, division: &Division) -> anyhow::Result<()> {
        self.bill_divisions
            .lock()
            .expect("storage mutex poisoned")
            .insert((bill_id, division.id()));
        Ok(())
    }

    async fn division_stored(&self, division: &Division) -> anyhow::Result<bool> {
        Ok(self
            .divisions
            .lock()
            .expect("storage mutex poisoned")
            .contains(&division.id()))
    }

    async fn bill_division_stored(
        &self,
        bill_id: u32,
        division: &Division,
    ) -> anyhow::Result<bool> {
        Ok(self
            .bill_divisions
            .lock()
            .expect("storage mutex poisoned")
            .contains(&(bill_id, division.id())))
    }

    async fn get_bill_divisions(&self, bill_id: u32) -> anyhow::Result<Vec<u32>> {
        Ok(self
            .bill_divisions
            .lock()
            .expect("storage mutex poisoned")
            .iter()
            .filter(|(b, _)| *b == bill_id)
            .map(|(_, d)| *d)
            .collect())
    }
}
