// src/tracker/divisions.rs
//! Poller for new divisions in both houses. Each cycle inspects the most
//! recent divisions from the two search endpoints, associates each with a
//! bill by title prefix when it can, and dispatches to the house's listeners.

use std::sync::Arc;

use futures::future::try_join_all;
use metrics::counter;

use super::storage::DivisionStorage;
use super::{ensure_metrics_described, DivisionListener};
use crate::client::Parliament;
use crate::error::{Error, Result};
use crate::model::bills::Bill;
use crate::model::divisions::{Division, House};
use crate::search::{BillSearchQuery, BillSortOrder};

pub struct DivisionsTracker {
    parliament: Arc<Parliament>,
    storage: Arc<dyn DivisionStorage>,
    commons_listeners: Vec<Arc<dyn DivisionListener>>,
    lords_listeners: Vec<Arc<dyn DivisionListener>>,
    search_limit: usize,
}

impl DivisionsTracker {
    pub fn new(
        parliament: Arc<Parliament>,
        storage: Arc<dyn DivisionStorage>,
        search_limit: usize,
    ) -> Self {
        ensure_metrics_described();
        Self {
            parliament,
            storage,
            commons_listeners: Vec::new(),
            lords_listeners: Vec::new(),
            search_limit,
        }
    }

    /// Division listeners are house-scoped and unconditional.
    pub fn register(&mut self, listener: Arc<dyn DivisionListener>, house: House) {
        match house {
            House::Commons => self.commons_listeners.push(listener),
            House::Lords => self.lords_listeners.push(listener),
        }
    }

    pub async fn poll(&mut self) -> Result<()> {
        counter!("tracker_poll_cycles_total", "tracker" => "divisions").increment(1);
        self.poll_commons().await?;
        self.poll_lords().await
    }

    pub async fn poll_commons(&mut self) -> Result<()> {
        let divisions = self
            .parliament
            .search_commons_divisions("", Some(self.search_limit))
            .await?;
        for division in divisions {
            self.process_division(Division::Commons(division)).await?;
        }
        Ok(())
    }

    pub async fn poll_lords(&mut self) -> Result<()> {
        let mut divisions = self
            .parliament
            .search_lords_divisions("", Some(self.search_limit))
            .await?;
        // Lords results are handled oldest first.
        divisions.reverse();
        for division in divisions {
            self.process_division(Division::Lords(division)).await?;
        }
        Ok(())
    }

    /// Handle one division: storage dedup, bill association, persist,
    /// dispatch. Public so callers (and tests) can feed divisions directly.
    pub async fn process_division(&self, division: Division) -> Result<()> {
        let stored = self
            .storage
            .division_stored(&division)
            .await
            .map_err(Error::Storage)?;
        if stored {
            return Ok(());
        }

        let bill = self.associate_bill(division.title()).await?;

        if let Some(bill) = &bill {
            let pair_stored = self
                .storage
                .bill_division_stored(bill.id, &division)
                .await
                .map_err(Error::Storage)?;
            if pair_stored {
                return Ok(());
            }
            self.storage
                .add_bill_division(bill.id, &division)
                .await
                .map_err(Error::Storage)?;
        } else {
            self.storage
                .add_division(&division)
                .await
                .map_err(Error::Storage)?;
        }

        let listeners = match division.house() {
            House::Commons => &self.commons_listeners,
            House::Lords => &self.lords_listeners,
        };
        if !listeners.is_empty() {
            try_join_all(
                listeners
                    .iter()
                    .map(|l| l.on_division(&division, bill.as_ref())),
            )
            .await
            .map_err(Error::Listener)?;
            counter!("tracker_updates_dispatched_total", "tracker" => "divisions").increment(1);
        }
        tracing::info!(
            division_id = division.id(),
            title = %division.title(),
            bill_id = bill.as_ref().map(|b| b.id),
            "division processed"
        );
        Ok(())
    }

    /// Search bills by the division title's bill prefix and take the first
    /// result whose title starts with it.
    async fn associate_bill(&self, title: &str) -> Result<Option<Bill>> {
        let Some(prefix) = bill_prefix(title) else {
            return Ok(None);
        };
        let bills = self
            .parliament
            .search_bills(
                BillSearchQuery::new()
                    .search_term(&prefix)
                    .sort_order(BillSortOrder::TitleDescending),
            )
            .await?;
        Ok(match_bill(&prefix, &bills).cloned())
    }
}

/// The candidate bill title: everything up to and including the first literal
/// "Bill" in the division title. Best effort by contract; titles sharing a
/// bill-name prefix with an unrelated bill can mis-associate.
pub fn bill_prefix(title: &str) -> Option<String> {
    title
        .find("Bill")
        .map(|idx| title[..idx + "Bill".len()].to_string())
}

/// First search result whose title starts with the candidate. First match
/// wins; there is no scoring.
pub fn match_bill<'a>(prefix: &str, bills: &'a [Bill]) -> Option<&'a Bill> {
    bills.iter().find(|b| b.title().starts_with(prefix))
}
