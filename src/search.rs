// src/search.rs
//! Query builder for the bills search endpoint.

use crate::model::bills::{BillStage, BillType};

/// Sort orders accepted by the bills service. The serialized values carry the
/// upstream's own spelling, misspellings included; they are the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillSortOrder {
    TitleAscending,
    TitleDescending,
    DateUpdatedAscending,
    DateUpdatedDescending,
}

impl BillSortOrder {
    fn as_query_value(self) -> &'static str {
        match self {
            BillSortOrder::TitleAscending => "TitleAscending",
            BillSortOrder::TitleDescending => "TitleDesending",
            BillSortOrder::DateUpdatedAscending => "DateUpdatedAscending",
            BillSortOrder::DateUpdatedDescending => "DateUpdatedDescending",
        }
    }
}

/// Builds the query string for `/Bills`. Parameters are appended in call
/// order.
#[derive(Debug, Clone, Default)]
pub struct BillSearchQuery {
    bits: Vec<String>,
}

impl BillSearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_term(mut self, term: &str) -> Self {
        self.bits
            .push(format!("SearchTerm={}", term.split(' ').collect::<Vec<_>>().join("%20")));
        self
    }

    pub fn session(mut self, session: u32) -> Self {
        self.bits.push(format!("Session={session}"));
        self
    }

    pub fn member_id(mut self, member_id: u32) -> Self {
        self.bits.push(format!("MemberId={member_id}"));
        self
    }

    pub fn department_id(mut self, department_id: u32) -> Self {
        self.bits.push(format!("DepartmentId={department_id}"));
        self
    }

    pub fn stages(mut self, stages: &[BillStage]) -> Self {
        self.bits.extend(
            stages
                .iter()
                .map(|stage| format!("BillStage={}", stage.id)),
        );
        self
    }

    pub fn bill_types(mut self, types: &[BillType]) -> Self {
        self.bits
            .extend(types.iter().map(|t| format!("BillType={}", t.id)));
        self
    }

    pub fn sort_order(mut self, order: BillSortOrder) -> Self {
        self.bits
            .push(format!("SortOrder={}", order.as_query_value()));
        self
    }

    pub fn current_house(mut self, house: &str) -> Self {
        self.bits.push(format!("CurrentHouse={house}"));
        self
    }

    pub fn originating_house(mut self, house: &str) -> Self {
        self.bits.push(format!("OriginatingHouse={house}"));
        self
    }

    /// Render the full URL against a bills-API base.
    pub fn build(self, bills_api: &str) -> String {
        if self.bits.is_empty() {
            return format!("{bills_api}/Bills");
        }
        format!("{}/Bills?{}", bills_api, self.bits.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://bills-api.parliament.uk/api/v1";

    #[test]
    fn empty_query_is_the_bare_endpoint() {
        assert_eq!(
            BillSearchQuery::new().build(BASE),
            "https://bills-api.parliament.uk/api/v1/Bills"
        );
    }

    #[test]
    fn search_term_is_percent_joined() {
        let url = BillSearchQuery::new()
            .search_term("Example Act 2020 Bill")
            .sort_order(BillSortOrder::TitleDescending)
            .build(BASE);
        assert_eq!(
            url,
            "https://bills-api.parliament.uk/api/v1/Bills?SearchTerm=Example%20Act%202020%20Bill&SortOrder=TitleDesending"
        );
    }

    #[test]
    fn parameters_accumulate_in_call_order() {
        let url = BillSearchQuery::new()
            .session(38)
            .member_id(1423)
            .current_house("Commons")
            .build(BASE);
        assert!(url.ends_with("/Bills?Session=38&MemberId=1423&CurrentHouse=Commons"));
    }
}
