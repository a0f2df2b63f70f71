//! Vote tally and ranking.
//!
//! Results are a pure function of the costumes and the two vote
//! collections and are recomputed from scratch on every change.
//!
//! Ranking is competition style: an entry's rank is one plus the position
//! of the first entry sharing its vote count, so `[3, 3, 1]` ranks as
//! `[1, 1, 3]`. An entry is tied when any other entry has the same count.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Costume, CostumeResult, RevoteScope, Vote};

/// Votes per costume id. Votes for unknown costumes are counted too and
/// simply never looked up.
pub fn tally(votes: &[Vote]) -> HashMap<Uuid, u32> {
    votes.iter().fold(HashMap::new(), |mut counts, vote| {
        *counts.entry(vote.costume_id).or_insert(0) += 1;
        counts
    })
}

pub fn compute_results(costumes: &[Costume], initial_votes: &[Vote], revote_votes: &[Vote]) -> Vec<CostumeResult> {
    let initial = tally(initial_votes);
    let revote = tally(revote_votes);

    let mut results: Vec<CostumeResult> = costumes.iter()
        .map(|costume| {
            let initial_vote_count = initial.get(&costume.id).copied().unwrap_or(0);
            let revote_vote_count = revote.get(&costume.id).copied().unwrap_or(0);
            CostumeResult {
                costume: costume.clone(),
                vote_count: initial_vote_count + revote_vote_count,
                initial_vote_count,
                revote_vote_count,
                rank: 0,
                is_tied: false,
            }
        })
        .collect();

    // Stable: equal counts keep input order.
    results.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
    assign_ranks(&mut results);
    results
}

fn assign_ranks(results: &mut [CostumeResult]) {
    let mut group_start = 0;
    while group_start < results.len() {
        let count = results[group_start].vote_count;
        let group_end = results[group_start..].iter()
            .position(|r| r.vote_count != count)
            .map_or(results.len(), |offset| group_start + offset);

        let tied = group_end - group_start > 1;
        for result in &mut results[group_start..group_end] {
            result.rank = group_start as u32 + 1;
            result.is_tied = tied;
        }
        group_start = group_end;
    }
}

/// The costumes sharing first place, and their owners, when first place is
/// contested by two or more costumes that have received votes.
pub fn leading_tie(results: &[CostumeResult]) -> Option<RevoteScope> {
    let leaders: Vec<&CostumeResult> = results.iter()
        .take_while(|r| r.rank == 1)
        .collect();

    if leaders.len() < 2 || leaders[0].vote_count == 0 {
        return None;
    }

    Some(RevoteScope {
        costume_ids: leaders.iter().map(|r| r.costume.id).collect(),
        excluded_user_ids: leaders.iter().map(|r| r.costume.user_id.clone()).collect(),
    })
}

pub fn total_votes(results: &[CostumeResult]) -> u32 {
    results.iter().map(|r| r.vote_count).sum()
}
