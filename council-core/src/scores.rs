//! Cross-conversation model leaderboard.
//!
//! A pure read-and-reduce pass over conversations: every assistant
//! turn with a stage2 round contributes points to the labels each
//! judge ranked. First place in a round earns one point per judge in
//! that round, descending by one per position. Malformed or missing
//! ranking data is skipped, never an error.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;

/// Aggregate standing of one ranked label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub model: String,
    pub total_points: i64,
    pub rankings_received: u64,
    pub first_places: u64,
    pub second_places: u64,
    pub third_places: u64,
    pub average_position: f64,
    pub average_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(rename = "leaderboard")]
    pub entries: Vec<ScoreEntry>,
    pub total_conversations_analyzed: u64,
    pub total_rankings_processed: u64,
}

/// Running tally for one label while the scan is in flight.
/// Placements are kept 1-indexed and collapsed into averages at the
/// end; the raw history never leaves this module.
#[derive(Debug, Default)]
struct Tally {
    model: String,
    total_points: i64,
    rankings_received: u64,
    first_places: u64,
    second_places: u64,
    third_places: u64,
    placements: Vec<u64>,
}

/// Reduce every stage2 round in `conversations` into a leaderboard.
///
/// Callers pass non-archived conversations only; the store layer owns
/// that filter. Entries are sorted by total points descending, with
/// ties keeping the order in which a label was first ranked.
pub fn compute_leaderboard<'a, I>(conversations: I) -> Leaderboard
where
    I: IntoIterator<Item = &'a Conversation>,
{
    let mut tallies: Vec<Tally> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut total_conversations = 0u64;
    let mut total_rankings = 0u64;

    for conversation in conversations {
        for message in &conversation.messages {
            let Some(turn) = message.as_assistant() else {
                continue;
            };
            if turn.stage2.is_empty() {
                continue;
            }
            total_conversations += 1;

            // Point scale for this round: one point per judge.
            let num_models = turn.stage2.len() as i64;

            for result in &turn.stage2 {
                if result.parsed_ranking.is_empty() {
                    continue;
                }
                total_rankings += 1;

                for (position, label) in result.parsed_ranking.iter().enumerate() {
                    // Goes to zero or below when a judge ranked more
                    // labels than the round has judges. Kept unguarded.
                    let points = num_models - position as i64;

                    let slot = *slots.entry(label.clone()).or_insert_with(|| {
                        tallies.push(Tally {
                            model: label.clone(),
                            ..Tally::default()
                        });
                        tallies.len() - 1
                    });
                    let tally = &mut tallies[slot];
                    tally.total_points += points;
                    tally.rankings_received += 1;
                    tally.placements.push(position as u64 + 1);
                    match position {
                        0 => tally.first_places += 1,
                        1 => tally.second_places += 1,
                        2 => tally.third_places += 1,
                        _ => {}
                    }
                }
            }
        }
    }

    let mut entries: Vec<ScoreEntry> = tallies
        .into_iter()
        .filter(|tally| tally.rankings_received > 0)
        .map(|tally| ScoreEntry {
            average_position: tally.placements.iter().sum::<u64>() as f64
                / tally.placements.len() as f64,
            average_points: tally.total_points as f64 / tally.rankings_received as f64,
            model: tally.model,
            total_points: tally.total_points,
            rankings_received: tally.rankings_received,
            first_places: tally.first_places,
            second_places: tally.second_places,
            third_places: tally.third_places,
        })
        .collect();

    // Stable sort over first-appearance order, so equal totals keep
    // the order the labels were first ranked in.
    entries.sort_by_key(|entry| Reverse(entry.total_points));

    tracing::debug!(
        models = entries.len(),
        conversations = total_conversations,
        rankings = total_rankings,
        "leaderboard computed"
    );

    Leaderboard {
        entries,
        total_conversations_analyzed: total_conversations,
        total_rankings_processed: total_rankings,
    }
}
