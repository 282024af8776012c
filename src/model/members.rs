// src/model/members.rs
//! Parties, members, election results, and voting history as reported by the
//! members service. Members and parties arrive inside a `value` envelope.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::de;
use crate::error::{Error, Result};

/// House id used by the members service for the Lords.
pub const HOUSE_LORDS: u8 = 2;

/// What kind of block a governing (or opposing) party is. The upstream
/// payload encodes this positionally; unknown codes are a hard error rather
/// than a silent misclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoverningCapacity {
    SinglePartyGovernment,
    CoalitionGovernment,
    OppositionCaretaker,
    OfficialOpposition,
}

impl GoverningCapacity {
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::SinglePartyGovernment),
            1 => Ok(Self::CoalitionGovernment),
            2 => Ok(Self::OppositionCaretaker),
            3 => Ok(Self::OfficialOpposition),
            other => Err(Error::malformed(format!(
                "unknown governing-capacity code {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartyRef {
    pub id: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseMembership {
    pub house: u8,
    /// Constituency name for MPs, title for peers.
    pub membership_from: Option<String>,
    pub membership_from_id: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_datetime")]
    pub membership_start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMember {
    pub id: u32,
    pub name_full_title: String,
    pub name_address_as: Option<String>,
    pub name_display_as: String,
    pub name_list_as: String,
    pub gender: String,
    pub thumbnail_url: Option<String>,
    pub latest_party: PartyRef,
    pub latest_house_membership: HouseMembership,
    /// Filled in during `Parliament::load` for sitting MPs.
    #[serde(skip)]
    pub latest_election_result: Option<ElectionResult>,
}

impl PartyMember {
    pub fn party_id(&self) -> u32 {
        self.latest_party.id
    }

    pub fn is_mp(&self) -> bool {
        self.latest_house_membership.house != HOUSE_LORDS
    }

    pub fn constituency_id(&self) -> Option<u32> {
        self.latest_house_membership.membership_from_id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PartyValue {
    pub id: u32,
    pub name: String,
    pub abbreviation: Option<String>,
    pub background_colour: Option<String>,
    pub foreground_colour: Option<String>,
    #[serde(default)]
    pub is_lords_main_party: bool,
    #[serde(default)]
    pub is_lords_spiritual_party: bool,
    pub government_type: Option<i64>,
    #[serde(default)]
    pub is_independent_party: bool,
}

/// A party with its member rosters, split by house. Rosters are populated by
/// `Parliament::load`.
#[derive(Debug, Clone)]
pub struct Party {
    pub id: u32,
    pub name: String,
    pub abbreviation: Option<String>,
    pub primary_colour: Option<String>,
    pub secondary_colour: Option<String>,
    pub lords_party: bool,
    pub lords_spiritual_party: bool,
    pub independent_group: bool,
    pub governing_capacity: Option<GoverningCapacity>,
    commons: Vec<PartyMember>,
    lords: Vec<PartyMember>,
}

impl Party {
    pub(crate) fn from_value(v: PartyValue) -> Result<Self> {
        let governing_capacity = v
            .government_type
            .map(GoverningCapacity::from_code)
            .transpose()?;
        Ok(Self {
            id: v.id,
            name: v.name,
            abbreviation: v.abbreviation,
            primary_colour: v.background_colour,
            secondary_colour: v.foreground_colour,
            lords_party: v.is_lords_main_party,
            lords_spiritual_party: v.is_lords_spiritual_party,
            independent_group: v.is_independent_party,
            governing_capacity,
            commons: Vec::new(),
            lords: Vec::new(),
        })
    }

    pub fn is_governing(&self) -> bool {
        matches!(
            self.governing_capacity,
            Some(GoverningCapacity::SinglePartyGovernment)
                | Some(GoverningCapacity::CoalitionGovernment)
        )
    }

    pub(crate) fn set_lords_party(&mut self) {
        self.lords_party = true;
    }

    pub(crate) fn add_member(&mut self, member: PartyMember) {
        if member.is_mp() {
            self.commons.push(member);
        } else {
            self.lords.push(member);
        }
    }

    pub fn mps(&self) -> &[PartyMember] {
        &self.commons
    }

    pub fn lords_members(&self) -> &[PartyMember] {
        &self.lords
    }

    pub fn all_members(&self) -> impl Iterator<Item = &PartyMember> {
        self.commons.iter().chain(self.lords.iter())
    }

    pub fn find_member_by_name(&self, name: &str) -> Option<&PartyMember> {
        self.all_members().find(|m| {
            m.name_display_as.contains(name)
                || m.name_full_title.contains(name)
                || m.name_address_as
                    .as_deref()
                    .is_some_and(|n| n.contains(name))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionCandidate {
    pub name: String,
    pub party: Option<CandidatePartyRef>,
    pub result_change: Option<f64>,
    pub rank_order: i32,
    pub votes: i64,
    pub vote_share: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePartyRef {
    pub id: Option<u32>,
    pub name: Option<String>,
}

/// One constituency election result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResult {
    /// Winning party name.
    pub result: String,
    pub is_notional: bool,
    pub electorate: i64,
    pub turnout: i64,
    #[serde(deserialize_with = "de::datetime")]
    pub election_date: DateTime<Utc>,
    pub majority: i64,
    #[serde(default)]
    pub candidates: Vec<ElectionCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VotingValue {
    id: u32,
    house: u8,
    in_affirmative_lobby: bool,
    acted_as_teller: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct VotingLink {
    href: String,
}

#[derive(Debug, Clone, Deserialize)]
struct VotingItem {
    value: VotingValue,
    #[serde(default)]
    links: Vec<VotingLink>,
}

/// One entry of a member's voting history.
#[derive(Debug, Clone)]
pub struct VotingEntry {
    pub id: u32,
    pub house: u8,
    pub voted_aye: bool,
    pub was_teller: bool,
    pub division_url: Option<String>,
}

impl VotingEntry {
    pub fn from_json(item: serde_json::Value) -> Result<Self> {
        let item: VotingItem = serde_json::from_value(item)?;
        Ok(Self {
            id: item.value.id,
            house: item.value.house,
            voted_aye: item.value.in_affirmative_lobby,
            was_teller: item.value.acted_as_teller,
            division_url: item.links.into_iter().next().map(|l| l.href),
        })
    }

    /// Division id parsed off the tail of the link, when one was provided.
    pub fn division_id(&self) -> Option<u32> {
        self.division_url
            .as_deref()?
            .rsplit('/')
            .next()?
            .trim_end_matches(".json")
            .parse()
            .ok()
    }
}
