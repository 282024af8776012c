// src/resolve.rs
//! Member population for divisions: every id list fans out to cache-or-fetch
//! member lookups, and the lists resolve as a unit. One failed lookup fails
//! the whole division; listeners never see a partially populated one.

use futures::future::try_join_all;
use futures::try_join;

use crate::client::Parliament;
use crate::error::Result;
use crate::model::divisions::{CommonsDivision, LordsDivision};
use crate::model::members::PartyMember;

pub(crate) async fn resolve_members(
    parliament: &Parliament,
    member_ids: &[u32],
) -> Result<Vec<PartyMember>> {
    try_join_all(
        member_ids
            .iter()
            .map(|&id| parliament.resolve_member(id)),
    )
    .await
}

pub(crate) async fn populate_commons_division(
    parliament: &Parliament,
    division: &mut CommonsDivision,
) -> Result<()> {
    let (ayes, noes, didnt_vote, aye_tellers, no_tellers) = try_join!(
        resolve_members(parliament, &division.aye_ids),
        resolve_members(parliament, &division.no_ids),
        resolve_members(parliament, &division.no_vote_ids),
        resolve_members(parliament, &division.aye_teller_ids),
        resolve_members(parliament, &division.no_teller_ids),
    )?;
    division.ayes = ayes;
    division.noes = noes;
    division.didnt_vote = didnt_vote;
    division.aye_tellers = aye_tellers;
    division.no_tellers = no_tellers;
    Ok(())
}

pub(crate) async fn populate_lords_division(
    parliament: &Parliament,
    division: &mut LordsDivision,
) -> Result<()> {
    let sponsor = async {
        match division.sponsoring_member_id {
            Some(id) => parliament.resolve_member(id).await.map(Some),
            None => Ok(None),
        }
    };
    let (ayes, noes, aye_tellers, no_tellers, sponsoring_member) = try_join!(
        resolve_members(parliament, &division.aye_ids),
        resolve_members(parliament, &division.no_ids),
        resolve_members(parliament, &division.aye_teller_ids),
        resolve_members(parliament, &division.no_teller_ids),
        sponsor,
    )?;
    division.ayes = ayes;
    division.noes = noes;
    division.aye_tellers = aye_tellers;
    division.no_tellers = no_tellers;
    division.sponsoring_member = sponsoring_member;
    Ok(())
}
