// src/tracker/mod.rs
//! The change-detection subsystem: three pollers that watch the upstream
//! feeds, deduplicate against external storage, and fan updates out to
//! registered listeners exactly once.

pub mod bills;
pub mod divisions;
pub mod feed;
pub mod publications;
pub mod scheduler;
pub mod storage;

use async_trait::async_trait;
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

use crate::model::bills::Bill;
use crate::model::divisions::Division;
use self::feed::{Feed, FeedUpdate, PublicationUpdate};

/// One-time metrics registration for the polling subsystem.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "tracker_poll_cycles_total",
            "Poll cycles started, per tracker."
        );
        describe_counter!(
            "tracker_updates_dispatched_total",
            "Updates delivered to at least one listener, per tracker."
        );
        describe_counter!(
            "tracker_poll_failures_total",
            "Poll cycles aborted by an error."
        );
        describe_gauge!(
            "tracker_last_poll_ts",
            "Unix ts of the last completed poll cycle."
        );
    });
}

/// Listener conditions. A listener fires when any of its conditions matches;
/// `All` short-circuits the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Publications,
    Lords,
    Commons,
    GovBill,
    PriBill,
    RoyalAssent,
    All,
}

fn has_category(update: &FeedUpdate, needle: &str) -> bool {
    // Categories are lowercased at parse time; membership is substring-based.
    update.categories.iter().any(|c| c.contains(needle))
}

pub(crate) fn meets_conditions(conditions: &[Condition], update: &FeedUpdate) -> bool {
    if conditions.contains(&Condition::All) {
        return true;
    }
    conditions.iter().any(|condition| match condition {
        Condition::All => true,
        Condition::Publications => has_category(update, "publication"),
        Condition::Lords => has_category(update, "lords"),
        Condition::Commons => has_category(update, "commons"),
        Condition::GovBill => has_category(update, "government bill"),
        Condition::PriBill => has_category(update, "private members"),
        Condition::RoyalAssent => update
            .stage
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains("royal assent")),
    })
}

/// Receives bill-stage updates from the aggregate feed.
#[async_trait]
pub trait BillUpdateListener: Send + Sync {
    async fn on_update(&self, feed: &Feed, update: &FeedUpdate) -> anyhow::Result<()>;
}

/// Receives publication updates from the per-bill feeds.
#[async_trait]
pub trait PublicationListener: Send + Sync {
    async fn on_publication(&self, bill_id: u32, update: &PublicationUpdate)
        -> anyhow::Result<()>;
}

/// Receives new divisions, with the bill they were associated to when the
/// title heuristic found one.
#[async_trait]
pub trait DivisionListener: Send + Sync {
    async fn on_division(&self, division: &Division, bill: Option<&Bill>) -> anyhow::Result<()>;
}
