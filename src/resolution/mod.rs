//! Resolution pipeline — tallies due proposal threads and dispatches each
//! outcome exactly once per thread.
//!
//! The pipeline holds no state between runs. Idempotence comes from
//! re-deriving everything from already-posted artifacts: a thread with a
//! resolution reply never re-enters the candidate set (see [`filter`]).
//!
//! Flow per run:
//! 1. fetch open channel messages (the only per-run blocking fetch)
//! 2. parse → typed [`types::ProposalThread`]s (non-proposals drop out)
//! 3. filter to due, unresolved threads
//! 4. per thread: tally → outcome → optional document → handles → record
//! 5. dispatch every record

pub mod filter;
pub mod outcome;
pub mod tally;
pub mod types;

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::dispatch::DispatchSink;
use crate::error::Result;
use crate::resolution::outcome::Outcome;
use crate::resolution::types::{
    DocumentResolver, OutcomeRecord, ProposalThread, ThreadSource,
};
use crate::slack::parse::AnnouncementParser;

/// Runs the resolution pipeline against the proposals channel.
pub struct ResolutionRunner {
    source: Arc<dyn ThreadSource>,
    resolver: Arc<dyn DocumentResolver>,
    sink: Arc<dyn DispatchSink>,
    parser: AnnouncementParser,
    proposals_channel: String,
    timezone: chrono_tz::Tz,
}

impl ResolutionRunner {
    pub fn new(
        source: Arc<dyn ThreadSource>,
        resolver: Arc<dyn DocumentResolver>,
        sink: Arc<dyn DispatchSink>,
        parser: AnnouncementParser,
        proposals_channel: &str,
        timezone: chrono_tz::Tz,
    ) -> Self {
        Self {
            source,
            resolver,
            sink,
            parser,
            proposals_channel: proposals_channel.to_string(),
            timezone,
        }
    }

    /// Execute one full run: collect records for every due thread, then
    /// dispatch them all. Returns the number of threads resolved.
    ///
    /// A dispatch failure fails the run; nothing was posted for the failed
    /// thread, so the next run picks it up again (at-least-once).
    pub async fn run_once(&self) -> Result<usize> {
        let reference = crate::clock::now_in(self.timezone);
        let records = self.collect_due_records(reference).await?;
        let count = records.len();

        for record in &records {
            self.sink.dispatch(record).await?;
        }

        info!(resolved = count, "Resolution run complete");
        Ok(count)
    }

    /// Fetch, parse, filter, and assemble one [`OutcomeRecord`] per due
    /// thread. Pure composition over data fetched up front, except for the
    /// single document lookup per thread.
    pub async fn collect_due_records(
        &self,
        reference: NaiveDateTime,
    ) -> Result<Vec<OutcomeRecord>> {
        let messages = self
            .source
            .list_open_threads(&self.proposals_channel)
            .await?;
        debug!(count = messages.len(), "Fetched channel messages");

        let threads: Vec<ProposalThread> = messages
            .iter()
            .filter_map(|m| self.parser.parse_thread(m))
            .collect();

        let due = filter::due_threads(threads, reference);
        debug!(due = due.len(), "Threads past their voting window");

        let mut records = Vec::with_capacity(due.len());
        for thread in due {
            match self.assemble_record(thread).await {
                Some(record) => records.push(record),
                // Contract violation on this thread only; the batch goes on.
                None => continue,
            }
        }

        Ok(records)
    }

    /// Build the outcome record for one due thread.
    ///
    /// Returns `None` when the thread's reactions violate the tally
    /// contract — that thread is skipped, never resolved with a wrong
    /// classification. Document failures degrade to "no document".
    async fn assemble_record(&self, thread: ProposalThread) -> Option<OutcomeRecord> {
        let tally = match tally::tally_votes(&thread.reactions) {
            Ok(tally) => tally,
            Err(e) => {
                error!(
                    thread_ts = %thread.thread_ts,
                    error = %e,
                    "Skipping thread with malformed vote counts"
                );
                return None;
            }
        };

        let outcome = Outcome::classify(&tally);

        let document = match &thread.linked_document_url {
            Some(url) => match self.resolver.resolve(url).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(
                        thread_ts = %thread.thread_ts,
                        url = %url,
                        error = %e,
                        "Document resolution failed, continuing without it"
                    );
                    None
                }
            },
            None => None,
        };

        let organizer_handles = document
            .as_ref()
            .map(|doc| crate::docs::extract_organizer_handles(&doc.body))
            .unwrap_or_default();

        Some(OutcomeRecord {
            thread_ts: thread.thread_ts,
            tally,
            outcome,
            sentence: outcome.sentence(),
            linked_document_url: thread.linked_document_url,
            organizer_handles,
            document,
        })
    }
}
