// src/client.rs
//! The `Parliament` facade: owns the HTTP client, the loaded reference data
//! (parties, rosters, bill types, bill stages), and one cache per entity
//! kind. Everything the trackers resolve goes through here.

use std::time::Duration;

use futures::future::try_join_all;
use serde_json::Value;

use crate::cache::TtlCache;
use crate::config::{Config, Endpoints};
use crate::error::{Error, Result};
use crate::fetch::{self, fetch_paginated, SkipStyle};
use crate::model::bills::{Bill, BillStage, BillType};
use crate::model::divisions::{CommonsDivision, Division, House, LordsDivision};
use crate::model::members::{ElectionResult, Party, PartyMember, PartyValue, VotingEntry};
use crate::model::Envelope;
use crate::resolve;
use crate::search::BillSearchQuery;

pub struct Parliament {
    client: reqwest::Client,
    endpoints: Endpoints,
    page_size: usize,
    parties: Vec<Party>,
    bill_types: Vec<BillType>,
    bill_stages: Vec<BillStage>,
    member_cache: TtlCache<u32, PartyMember>,
    bills_cache: TtlCache<u32, Bill>,
    bill_search_cache: TtlCache<String, Vec<Bill>>,
    division_cache: TtlCache<(House, u32), Division>,
    commons_search_cache: TtlCache<String, Vec<CommonsDivision>>,
    lords_search_cache: TtlCache<String, Vec<LordsDivision>>,
    voting_history_cache: TtlCache<u32, Vec<VotingEntry>>,
    election_result_cache: TtlCache<u32, Vec<ElectionResult>>,
}

impl Parliament {
    pub fn new(config: Config) -> Self {
        let c = &config.caches;
        let secs = Duration::from_secs;
        Self {
            client: reqwest::Client::new(),
            endpoints: config.endpoints.clone(),
            page_size: config.tracker.page_size,
            parties: Vec::new(),
            bill_types: Vec::new(),
            bill_stages: Vec::new(),
            member_cache: TtlCache::new("members", secs(c.member_ttl_secs), c.member_capacity),
            bills_cache: TtlCache::new("bills", secs(c.bill_ttl_secs), c.bill_capacity),
            bill_search_cache: TtlCache::new(
                "bill_search",
                secs(c.bill_search_ttl_secs),
                c.bill_search_capacity,
            ),
            division_cache: TtlCache::new(
                "divisions",
                secs(c.division_ttl_secs),
                c.division_capacity,
            ),
            commons_search_cache: TtlCache::new(
                "division_search_commons",
                secs(c.division_search_ttl_secs),
                c.division_search_capacity,
            ),
            lords_search_cache: TtlCache::new(
                "division_search_lords",
                secs(c.division_search_ttl_secs),
                c.division_search_capacity,
            ),
            voting_history_cache: TtlCache::new(
                "voting_history",
                secs(c.voting_history_ttl_secs),
                c.voting_history_capacity,
            ),
            election_result_cache: TtlCache::new(
                "election_results",
                secs(c.election_result_ttl_secs),
                c.election_result_capacity,
            ),
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Index the slow-moving reference data: active parties of both houses,
    /// the current member rosters (with each MP's latest election result),
    /// bill types, and bill stages. Call once before handing the client to
    /// the trackers.
    pub async fn load(&mut self) -> Result<()> {
        let commons_url = format!("{}/Parties/GetActive/Commons", self.endpoints.members_api);
        let body = fetch::get_json(&self.client, &commons_url).await?;
        for item in fetch::extract_items(body)? {
            let env: Envelope<PartyValue> = serde_json::from_value(item)?;
            self.parties.push(Party::from_value(env.value)?);
        }

        let lords_url = format!("{}/Parties/GetActive/Lords", self.endpoints.members_api);
        let body = fetch::get_json(&self.client, &lords_url).await?;
        for item in fetch::extract_items(body)? {
            let env: Envelope<PartyValue> = serde_json::from_value(item)?;
            match self.parties.iter_mut().find(|p| p.id == env.value.id) {
                Some(party) => party.set_lords_party(),
                None => self.parties.push(Party::from_value(env.value)?),
            }
        }

        let members_url = format!(
            "{}/Members/Search?IsCurrentMember=true",
            self.endpoints.members_api
        );
        let items = fetch_paginated(
            &self.client,
            &members_url,
            self.page_size,
            SkipStyle::Bare,
            None,
        )
        .await?;
        let mut members = Vec::with_capacity(items.len());
        for item in items {
            let env: Envelope<PartyMember> = serde_json::from_value(item)?;
            members.push(env.value);
        }

        let this: &Parliament = &*self;
        let latest = try_join_all(members.iter().map(|m| async move {
            if !m.is_mp() {
                return Ok::<_, Error>(None);
            }
            let results = this.election_results(m).await?;
            Ok(results.into_iter().max_by_key(|r| r.election_date))
        }))
        .await?;
        for (member, result) in members.iter_mut().zip(latest) {
            member.latest_election_result = result;
        }

        for member in members {
            match self
                .parties
                .iter_mut()
                .find(|p| p.id == member.party_id())
            {
                Some(party) => party.add_member(member),
                None => tracing::warn!(
                    member = %member.name_display_as,
                    member_id = member.id,
                    party_id = member.party_id(),
                    "member references an unknown party, skipping"
                ),
            }
        }

        let types_url = format!("{}/BillTypes", self.endpoints.bills_api);
        let body = fetch::get_json(&self.client, &types_url).await?;
        for item in fetch::extract_items(body)? {
            self.bill_types.push(serde_json::from_value(item)?);
        }

        let stages_url = format!("{}/Stages", self.endpoints.bills_api);
        let items = fetch_paginated(
            &self.client,
            &stages_url,
            self.page_size,
            SkipStyle::Bare,
            None,
        )
        .await?;
        for item in items {
            self.bill_stages.push(serde_json::from_value(item)?);
        }

        tracing::info!(
            parties = self.parties.len(),
            bill_types = self.bill_types.len(),
            bill_stages = self.bill_stages.len(),
            "reference data loaded"
        );
        Ok(())
    }

    // ---- roster lookups (loaded data only, no I/O) ----

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn party_by_id(&self, party_id: u32) -> Option<&Party> {
        self.parties.iter().find(|p| p.id == party_id)
    }

    pub fn party_by_name(&self, name: &str) -> Option<&Party> {
        self.parties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn commons_members(&self) -> impl Iterator<Item = &PartyMember> {
        self.parties.iter().flat_map(|p| p.mps().iter())
    }

    pub fn lords_members(&self) -> impl Iterator<Item = &PartyMember> {
        self.parties.iter().flat_map(|p| p.lords_members().iter())
    }

    pub fn member_by_id(&self, member_id: u32) -> Option<&PartyMember> {
        self.commons_members()
            .chain(self.lords_members())
            .find(|m| m.id == member_id)
    }

    pub fn member_by_name(&self, name: &str) -> Option<&PartyMember> {
        self.commons_members()
            .chain(self.lords_members())
            .find(|m| m.name_display_as == name)
    }

    pub fn bill_types(&self) -> &[BillType] {
        &self.bill_types
    }

    pub fn bill_stages(&self) -> &[BillStage] {
        &self.bill_stages
    }

    // ---- members ----

    /// Roster, then cache, then the member-detail endpoint. Any failure is a
    /// member-resolution failure for the caller.
    pub async fn resolve_member(&self, member_id: u32) -> Result<PartyMember> {
        if let Some(member) = self.member_by_id(member_id) {
            return Ok(member.clone());
        }
        if let Some(member) = self.member_cache.get(&member_id) {
            return Ok(member);
        }

        let url = format!("{}/Members/{}", self.endpoints.members_api, member_id);
        let fetched: Result<PartyMember> = async {
            let body = fetch::get_json(&self.client, &url).await?;
            let env: Envelope<PartyMember> = serde_json::from_value(body)?;
            Ok(env.value)
        }
        .await;
        match fetched {
            Ok(member) => {
                self.member_cache.insert(member_id, member.clone());
                Ok(member)
            }
            Err(e) => Err(Error::MemberResolution {
                member_id,
                source: Some(Box::new(e)),
            }),
        }
    }

    /// Full voting history for a member, newest first as upstream reports it.
    pub async fn voting_history(&self, member: &PartyMember) -> Result<Vec<VotingEntry>> {
        if let Some(hit) = self.voting_history_cache.get(&member.id) {
            return Ok(hit);
        }
        let house = if member.is_mp() { "Commons" } else { "Lords" };
        let url = format!(
            "{}/Members/{}/Voting?house={}",
            self.endpoints.members_api, member.id, house
        );
        let items =
            fetch_paginated(&self.client, &url, self.page_size, SkipStyle::Bare, None).await?;
        let entries = items
            .into_iter()
            .map(VotingEntry::from_json)
            .collect::<Result<Vec<_>>>()?;
        self.voting_history_cache.insert(member.id, entries.clone());
        Ok(entries)
    }

    /// Election results for the member's constituency. Peers have no
    /// constituency and resolve to an empty list.
    pub async fn election_results(&self, member: &PartyMember) -> Result<Vec<ElectionResult>> {
        let Some(constituency_id) = member.constituency_id() else {
            return Ok(Vec::new());
        };
        if let Some(hit) = self.election_result_cache.get(&constituency_id) {
            return Ok(hit);
        }

        let list_url = format!(
            "{}/Location/Constituency/{}/ElectionResults",
            self.endpoints.members_api, constituency_id
        );
        let body = fetch::get_json(&self.client, &list_url).await?;
        let elections = body
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::malformed("election results response has no value array"))?;
        let election_ids: Vec<u64> = elections
            .iter()
            .filter_map(|e| e.get("electionId").and_then(Value::as_u64))
            .collect();

        let results = try_join_all(election_ids.into_iter().map(|election_id| async move {
            let url = format!(
                "{}/Location/Constituency/{}/ElectionResult/{}",
                self.endpoints.members_api, constituency_id, election_id
            );
            let body = fetch::get_json(&self.client, &url).await?;
            let value = body
                .get("value")
                .cloned()
                .ok_or_else(|| Error::malformed("election result response has no value"))?;
            Ok::<ElectionResult, Error>(serde_json::from_value(value)?)
        }))
        .await?;

        self.election_result_cache
            .insert(constituency_id, results.clone());
        Ok(results)
    }

    // ---- bills ----

    /// One bill by id, enriched with its resolved stage, long title, and
    /// sponsor members.
    pub async fn bill(&self, bill_id: u32) -> Result<Bill> {
        if let Some(hit) = self.bills_cache.get(&bill_id) {
            return Ok(hit);
        }
        let url = format!("{}/Bills/{}", self.endpoints.bills_api, bill_id);
        let body = fetch::get_json(&self.client, &url).await?;
        let env: Envelope<Bill> = serde_json::from_value(body.clone())?;
        let mut bill = env.value;
        self.enrich_bill_from_value(&mut bill, &body).await?;
        self.bills_cache.insert(bill_id, bill.clone());
        Ok(bill)
    }

    /// Bill search; every returned bill is enriched the same way `bill` does
    /// it, concurrently across the result set.
    pub async fn search_bills(&self, query: BillSearchQuery) -> Result<Vec<Bill>> {
        let url = query.build(&self.endpoints.bills_api);
        if let Some(hit) = self.bill_search_cache.get(&url) {
            return Ok(hit);
        }

        let items =
            fetch_paginated(&self.client, &url, self.page_size, SkipStyle::Bare, None).await?;
        let mut bills = Vec::with_capacity(items.len());
        for item in items {
            let env: Envelope<Bill> = serde_json::from_value(item)?;
            bills.push(env.value);
        }

        try_join_all(bills.iter_mut().map(|bill| self.enrich_bill(bill))).await?;

        self.bill_search_cache.insert(url, bills.clone());
        Ok(bills)
    }

    async fn enrich_bill(&self, bill: &mut Bill) -> Result<()> {
        let url = format!("{}/Bills/{}", self.endpoints.bills_api, bill.id);
        let body = fetch::get_json(&self.client, &url).await?;
        self.enrich_bill_from_value(bill, &body).await
    }

    /// Resolve the current stage against the loaded stage list and pull long
    /// title + sponsors out of a bill-detail body.
    async fn enrich_bill_from_value(&self, bill: &mut Bill, body: &Value) -> Result<()> {
        bill.stage = bill
            .current_stage_id()
            .and_then(|id| self.bill_stages.iter().find(|s| s.id == id).cloned());

        let value = body
            .get("value")
            .ok_or_else(|| Error::malformed("bill detail response has no value"))?;
        bill.long_title = value
            .get("longTitle")
            .and_then(Value::as_str)
            .map(str::to_string);

        let sponsor_ids: Vec<u32> = value
            .get("sponsors")
            .and_then(Value::as_array)
            .map(|sponsors| {
                sponsors
                    .iter()
                    .filter_map(|s| s.get("memberId").and_then(Value::as_u64))
                    .map(|id| id as u32)
                    .collect()
            })
            .unwrap_or_default();
        bill.sponsors = resolve::resolve_members(self, &sponsor_ids).await?;
        Ok(())
    }

    // ---- divisions ----

    pub async fn commons_division(&self, division_id: u32) -> Result<CommonsDivision> {
        let key = (House::Commons, division_id);
        if let Some(Division::Commons(hit)) = self.division_cache.get(&key) {
            return Ok(hit);
        }
        let url = format!(
            "{}/division/{}.json",
            self.endpoints.commons_votes_api, division_id
        );
        let body = fetch::get_json(&self.client, &url).await?;
        let mut division: CommonsDivision = serde_json::from_value(body)?;
        resolve::populate_commons_division(self, &mut division).await?;
        self.division_cache
            .insert(key, Division::Commons(division.clone()));
        Ok(division)
    }

    pub async fn lords_division(&self, division_id: u32) -> Result<LordsDivision> {
        let key = (House::Lords, division_id);
        if let Some(Division::Lords(hit)) = self.division_cache.get(&key) {
            return Ok(hit);
        }
        let url = format!("{}/Divisions/{}", self.endpoints.lords_votes_api, division_id);
        let body = fetch::get_json(&self.client, &url).await?;
        let mut division: LordsDivision = serde_json::from_value(body)?;
        resolve::populate_lords_division(self, &mut division).await?;
        self.division_cache
            .insert(key, Division::Lords(division.clone()));
        Ok(division)
    }

    /// Most recent commons divisions matching `term` (all divisions when the
    /// term is empty), at most `limit` when given. Members are resolved for
    /// every returned division.
    pub async fn search_commons_divisions(
        &self,
        term: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CommonsDivision>> {
        let cache_key = search_cache_key(term, limit);
        if let Some(hit) = self.commons_search_cache.get(&cache_key) {
            return Ok(hit);
        }

        let query = search_term_query(term, "queryParameters.searchTerm");
        let total_url = format!(
            "{}/divisions.json/searchTotalResults{}",
            self.endpoints.commons_votes_api, query
        );
        let total = fetch::get_json(&self.client, &total_url)
            .await?
            .as_u64()
            .ok_or_else(|| Error::malformed("division search total is not a number"))?
            as usize;

        let search_url = format!(
            "{}/divisions.json/search{}",
            self.endpoints.commons_votes_api, query
        );
        let capped = limit.map_or(total, |l| total.min(l));
        let items = fetch_paginated(
            &self.client,
            &search_url,
            self.page_size,
            SkipStyle::QueryParameters,
            Some(capped),
        )
        .await?;

        let mut divisions = Vec::with_capacity(items.len());
        for item in items {
            divisions.push(serde_json::from_value::<CommonsDivision>(item)?);
        }
        try_join_all(
            divisions
                .iter_mut()
                .map(|d| resolve::populate_commons_division(self, d)),
        )
        .await?;

        self.commons_search_cache
            .insert(cache_key, divisions.clone());
        Ok(divisions)
    }

    pub async fn search_lords_divisions(
        &self,
        term: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LordsDivision>> {
        let cache_key = search_cache_key(term, limit);
        if let Some(hit) = self.lords_search_cache.get(&cache_key) {
            return Ok(hit);
        }

        let query = search_term_query(term, "SearchTerm");
        let total_url = format!(
            "{}/Divisions/searchTotalResults{}",
            self.endpoints.lords_votes_api, query
        );
        let total = fetch::get_json(&self.client, &total_url)
            .await?
            .as_u64()
            .ok_or_else(|| Error::malformed("division search total is not a number"))?
            as usize;

        let search_url = format!(
            "{}/Divisions/search{}",
            self.endpoints.lords_votes_api, query
        );
        let capped = limit.map_or(total, |l| total.min(l));
        let items = fetch_paginated(
            &self.client,
            &search_url,
            self.page_size,
            SkipStyle::Bare,
            Some(capped),
        )
        .await?;

        let mut divisions = Vec::with_capacity(items.len());
        for item in items {
            divisions.push(serde_json::from_value::<LordsDivision>(item)?);
        }
        try_join_all(
            divisions
                .iter_mut()
                .map(|d| resolve::populate_lords_division(self, d)),
        )
        .await?;

        self.lords_search_cache.insert(cache_key, divisions.clone());
        Ok(divisions)
    }
}

fn search_cache_key(term: &str, limit: Option<usize>) -> String {
    format!("{}|{}", term.to_lowercase(), limit.unwrap_or(0))
}

fn search_term_query(term: &str, param: &str) -> String {
    if term.is_empty() {
        return String::new();
    }
    format!(
        "?{}={}",
        param,
        term.split(' ').collect::<Vec<_>>().join("%20")
    )
}
