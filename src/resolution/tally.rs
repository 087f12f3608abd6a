//! Vote aggregation — raw reactions to a validated [`VoteTally`].

use crate::error::ResolutionError;
use crate::resolution::types::{Reaction, VoteTally};

/// Which vote bucket a reaction name falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Yes,
    No,
    Stop,
}

/// Classify a reaction name into a vote bucket, or `None` if it isn't a vote.
///
/// Checked in priority order so a name can land in at most one bucket:
/// - yes: starts with `+1` (covers every skin-tone suffix) or contains
///   `thumbsup` in any case
/// - no: starts with `-1` or contains `thumbsdown` in any case
/// - stop: equals `stop` or `octagonal_sign`, case-insensitively
pub fn classify_reaction(name: &str) -> Option<VoteKind> {
    let lower = name.to_lowercase();
    if name.starts_with("+1") || lower.contains("thumbsup") {
        Some(VoteKind::Yes)
    } else if name.starts_with("-1") || lower.contains("thumbsdown") {
        Some(VoteKind::No)
    } else if lower == "stop" || lower == "octagonal_sign" {
        Some(VoteKind::Stop)
    } else {
        None
    }
}

/// Sum reactions into a tally. No reactions means the zero tally.
///
/// A vote-classified reaction whose count is not a usable nonnegative
/// integer is a contract violation: the error aborts this thread's
/// processing, and the caller continues the batch. Counts on unrecognized
/// reactions are never inspected.
///
/// A voter using several variants of the same semantic vote (skin tones,
/// `+1` plus `thumbsup`) is counted once per variant used.
pub fn tally_votes(reactions: &[Reaction]) -> Result<VoteTally, ResolutionError> {
    let mut tally = VoteTally::ZERO;

    for reaction in reactions {
        let Some(kind) = classify_reaction(&reaction.name) else {
            continue;
        };

        let count =
            reaction
                .count
                .as_u64()
                .ok_or_else(|| ResolutionError::InvalidVoteCount {
                    name: reaction.name.clone(),
                    reason: format!("expected a nonnegative integer, got {}", reaction.count),
                })?;

        match kind {
            VoteKind::Yes => tally.yes += count,
            VoteKind::No => tally.no += count,
            VoteKind::Stop => tally.stop += count,
        }
    }

    Ok(tally)
}
