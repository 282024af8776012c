// src/lib.rs
// Public library surface for integration tests (and embedding apps).

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
mod resolve;
pub mod search;

// Change-detection subsystem (feed parsing, trackers, scheduler, storage)
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::client::Parliament;
pub use crate::config::{CacheConfig, Config, Endpoints, TrackerConfig};
pub use crate::error::{Error, Result};
pub use crate::search::{BillSearchQuery, BillSortOrder};

// Model types most callers touch directly
pub use crate::model::bills::{Bill, BillStage, BillType};
pub use crate::model::divisions::{CommonsDivision, Division, House, LordsDivision};
pub use crate::model::members::{
    ElectionResult, GoverningCapacity, Party, PartyMember, VotingEntry,
};

// Tracker surface
pub use crate::tracker::bills::BillsTracker;
pub use crate::tracker::divisions::DivisionsTracker;
pub use crate::tracker::feed::{Feed, FeedUpdate, PublicationUpdate};
pub use crate::tracker::publications::PublicationsTracker;
pub use crate::tracker::scheduler::{
    shutdown_channel, PollCycle, PollDriver, ShutdownHandle, TrackerSet,
};
pub use crate::tracker::storage::{
    BillsStorage, DivisionStorage, MemoryBillsStorage, MemoryDivisionStorage,
};
pub use crate::tracker::{BillUpdateListener, Condition, DivisionListener, PublicationListener};
