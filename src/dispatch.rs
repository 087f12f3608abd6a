//! Result dispatch — posts the outcome reply and closes out the document.

use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;

use crate::clock;
use crate::error::ResolutionError;
use crate::resolution::types::{DocumentWriter, OutcomeRecord};
use crate::slack::SlackClient;

/// One outgoing threaded reply. Built fresh per record — payloads are never
/// reused or mutated between sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsPayload {
    pub channel: String,
    pub thread_ts: String,
    pub text: String,
}

impl ResultsPayload {
    /// Build the reply for one outcome record.
    ///
    /// Format: `*<sentence>* (<yes> yes, <no> no, <stop> stop) @a @b`,
    /// the handle suffix present only when organizers were found.
    pub fn for_record(channel: &str, record: &OutcomeRecord) -> Self {
        let results = format!(
            "*{}* ({} yes, {} no, {} stop)",
            record.sentence, record.tally.yes, record.tally.no, record.tally.stop
        );
        let text = format!("{} {}", results, record.organizer_handles.join(" "))
            .trim_end()
            .to_string();

        Self {
            channel: channel.to_string(),
            thread_ts: record.thread_ts.clone(),
            text,
        }
    }

    /// The reply text with Slack bold markers stripped, for documents.
    pub fn plain_text(&self) -> String {
        self.text.replace('*', "")
    }
}

/// Sink consuming outcome records. A failure here is a run failure — the
/// unresolved thread is retried on the next scheduled run.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn dispatch(&self, record: &OutcomeRecord) -> Result<(), ResolutionError>;
}

/// Production sink: threaded Slack reply, then document close-out.
pub struct ResultsDispatcher {
    slack: Arc<SlackClient>,
    doc_writer: Arc<dyn DocumentWriter>,
    proposals_channel: String,
    timezone: Tz,
}

impl ResultsDispatcher {
    pub fn new(
        slack: Arc<SlackClient>,
        doc_writer: Arc<dyn DocumentWriter>,
        proposals_channel: &str,
        timezone: Tz,
    ) -> Self {
        Self {
            slack,
            doc_writer,
            proposals_channel: proposals_channel.to_string(),
            timezone,
        }
    }
}

#[async_trait]
impl DispatchSink for ResultsDispatcher {
    async fn dispatch(&self, record: &OutcomeRecord) -> Result<(), ResolutionError> {
        let payload = ResultsPayload::for_record(&self.proposals_channel, record);

        self.slack
            .post_message(&payload.channel, &payload.text, Some(&payload.thread_ts))
            .await
            .map_err(|e| ResolutionError::DispatchFailed {
                thread_ts: record.thread_ts.clone(),
                reason: e.to_string(),
            })?;

        if let Some(doc) = &record.document {
            let results_line =
                format!("{}: {}", clock::short_date(self.timezone), payload.plain_text());
            let new_title = format!("{}: {}", record.outcome.past_tense(), doc.title);

            let close_out = async {
                self.doc_writer.append_results(doc, &results_line).await?;
                self.doc_writer.retitle(doc, &new_title).await?;
                self.doc_writer.revoke_public_edit(doc).await
            };
            close_out
                .await
                .map_err(|e| ResolutionError::DispatchFailed {
                    thread_ts: record.thread_ts.clone(),
                    reason: format!("document close-out: {e}"),
                })?;
        }

        tracing::info!(
            thread_ts = %record.thread_ts,
            outcome = record.outcome.label(),
            text = %payload.text,
            "Dispatched result"
        );
        Ok(())
    }
}
