// src/model/divisions.rs
//! Recorded votes. The two votes services disagree on almost everything:
//! commons payloads are PascalCase and track non-voters, lords payloads are
//! camelCase and count through tellers. Both arrive unwrapped.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::de;
use super::members::PartyMember;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommonsDivision {
    pub division_id: u32,
    #[serde(deserialize_with = "de::datetime")]
    pub date: DateTime<Utc>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub publication_updated: Option<DateTime<Utc>>,
    pub number: i32,
    #[serde(default)]
    pub is_deferred: bool,
    #[serde(rename = "EVELType")]
    pub evel_type: Option<String>,
    #[serde(rename = "EVELCountry")]
    pub evel_country: Option<String>,
    pub title: String,
    pub aye_count: i32,
    pub no_count: i32,
    pub double_majority_aye_count: Option<i32>,
    pub double_majority_no_count: Option<i32>,
    #[serde(rename = "AyeTellers", default, deserialize_with = "de::member_ids")]
    pub aye_teller_ids: Vec<u32>,
    #[serde(rename = "NoTellers", default, deserialize_with = "de::member_ids")]
    pub no_teller_ids: Vec<u32>,
    #[serde(rename = "Ayes", default, deserialize_with = "de::member_ids")]
    pub aye_ids: Vec<u32>,
    #[serde(rename = "Noes", default, deserialize_with = "de::member_ids")]
    pub no_ids: Vec<u32>,
    #[serde(rename = "NoVoteRecorded", default, deserialize_with = "de::member_ids")]
    pub no_vote_ids: Vec<u32>,
    /// Populated by division resolution; empty until then.
    #[serde(skip)]
    pub ayes: Vec<PartyMember>,
    #[serde(skip)]
    pub noes: Vec<PartyMember>,
    #[serde(skip)]
    pub didnt_vote: Vec<PartyMember>,
    #[serde(skip)]
    pub aye_tellers: Vec<PartyMember>,
    #[serde(skip)]
    pub no_tellers: Vec<PartyMember>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LordsDivision {
    pub division_id: u32,
    #[serde(deserialize_with = "de::datetime")]
    pub date: DateTime<Utc>,
    pub number: i32,
    pub notes: Option<String>,
    pub title: String,
    #[serde(default)]
    pub is_whipped: bool,
    #[serde(default)]
    pub is_government_content: bool,
    /// The lords service reports totals as teller counts.
    pub teller_content_count: i32,
    pub teller_not_content_count: i32,
    pub sponsoring_member_id: Option<u32>,
    #[serde(default)]
    pub is_house: Option<bool>,
    #[serde(default, deserialize_with = "de::clean_text_opt")]
    pub amendment_motion_notes: Option<String>,
    #[serde(default)]
    pub is_government_win: Option<bool>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub remote_voting_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub remote_voting_end: Option<DateTime<Utc>>,
    #[serde(rename = "contentTellers", default, deserialize_with = "de::member_ids")]
    pub aye_teller_ids: Vec<u32>,
    #[serde(
        rename = "notContentTellers",
        default,
        deserialize_with = "de::member_ids"
    )]
    pub no_teller_ids: Vec<u32>,
    #[serde(rename = "contents", default, deserialize_with = "de::member_ids")]
    pub aye_ids: Vec<u32>,
    #[serde(rename = "notContents", default, deserialize_with = "de::member_ids")]
    pub no_ids: Vec<u32>,
    #[serde(skip)]
    pub ayes: Vec<PartyMember>,
    #[serde(skip)]
    pub noes: Vec<PartyMember>,
    #[serde(skip)]
    pub aye_tellers: Vec<PartyMember>,
    #[serde(skip)]
    pub no_tellers: Vec<PartyMember>,
    #[serde(skip)]
    pub sponsoring_member: Option<PartyMember>,
}

impl CommonsDivision {
    pub fn ayes(&self) -> i32 {
        self.aye_count
    }

    pub fn noes(&self) -> i32 {
        self.no_count
    }
}

impl LordsDivision {
    pub fn ayes(&self) -> i32 {
        self.teller_content_count
    }

    pub fn noes(&self) -> i32 {
        self.teller_not_content_count
    }
}

/// Which chamber a division was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum House {
    Commons,
    Lords,
}

/// A division of either house, as handed to division listeners.
#[derive(Debug, Clone)]
pub enum Division {
    Commons(CommonsDivision),
    Lords(LordsDivision),
}

impl Division {
    pub fn id(&self) -> u32 {
        match self {
            Division::Commons(d) => d.division_id,
            Division::Lords(d) => d.division_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Division::Commons(d) => &d.title,
            Division::Lords(d) => &d.title,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Division::Commons(d) => d.date,
            Division::Lords(d) => d.date,
        }
    }

    pub fn house(&self) -> House {
        match self {
            Division::Commons(_) => House::Commons,
            Division::Lords(_) => House::Lords,
        }
    }
}
