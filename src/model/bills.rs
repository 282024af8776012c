// src/model/bills.rs
//! Bills, bill types, and bill stages from the bills service. Bill records
//! arrive inside a `value` envelope; types and stages come unwrapped.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::de;
use super::members::PartyMember;

#[derive(Debug, Clone, Deserialize)]
pub struct BillType {
    pub id: u32,
    pub category: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillStage {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
    pub stage_category: Option<String>,
    #[serde(default)]
    pub prominent_sort_order: i32,
    pub house: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillTypeRef {
    pub id: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStageRef {
    pub stage_id: u32,
    pub stage_sitting: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSession {
    pub id: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(rename = "billId", alias = "billID")]
    pub id: u32,
    pub short_title: String,
    pub current_house: Option<String>,
    pub originating_house: Option<String>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_defeated: bool,
    /// Withdrawal date when the bill was withdrawn, absent otherwise.
    pub bill_withdrawn: Option<String>,
    pub bill_type: Option<BillTypeRef>,
    #[serde(default)]
    pub sessions: Vec<BillSession>,
    pub current_stage: Option<CurrentStageRef>,
    #[serde(default)]
    pub is_act: bool,
    #[serde(default)]
    pub has_royal_assent: bool,
    /// Enriched from the bill-detail endpoint after the search/list fetch.
    #[serde(skip)]
    pub long_title: Option<String>,
    #[serde(skip)]
    pub sponsors: Vec<PartyMember>,
    /// Resolved against the loaded stage list.
    #[serde(skip)]
    pub stage: Option<BillStage>,
}

impl Bill {
    pub fn title(&self) -> &str {
        &self.short_title
    }

    pub fn was_withdrawn(&self) -> bool {
        self.bill_withdrawn.is_some()
    }

    pub fn date_introduced(&self) -> Option<DateTime<Utc>> {
        self.sessions.first().and_then(|s| s.start_date)
    }

    pub fn current_stage_id(&self) -> Option<u32> {
        self.current_stage.as_ref().map(|s| s.stage_id)
    }
}
