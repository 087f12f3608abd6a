//! Due-thread filter — the sole idempotence guard of the pipeline.

use chrono::NaiveDateTime;

use crate::resolution::types::ProposalThread;

/// Keep only threads whose voting window has elapsed and that carry no
/// resolution reply yet.
///
/// The closure time must be *strictly* before the reference instant. Once
/// a resolution reply is posted, `resolved` is true on every later run and
/// the thread never reappears here — which is what makes overlapping
/// schedules of the resolution run safe.
pub fn due_threads(threads: Vec<ProposalThread>, reference: NaiveDateTime) -> Vec<ProposalThread> {
    threads
        .into_iter()
        .filter(|t| t.closes_at < reference && !t.resolved)
        .collect()
}
