//! Shared types for the resolution pipeline.
//!
//! The pipeline operates on already-typed [`ProposalThread`] values — all
//! regex scraping of chat text lives in the boundary adapter
//! (`slack::parse`), never here.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{DocumentError, ResolutionError};
use crate::resolution::outcome::Outcome;

// ── Raw channel message ─────────────────────────────────────────────

/// A message as fetched from the chat channel, before parsing.
///
/// The thread source returns these verbatim; the parsing adapter decides
/// which of them are proposal threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Message timestamp — doubles as the thread id when replying.
    pub ts: String,
    /// Raw message text, containing the announcement markers.
    #[serde(default)]
    pub text: String,
    /// Emoji reactions on the message, if any.
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Threaded replies, if any.
    #[serde(default)]
    pub replies: Vec<ThreadReply>,
}

/// One emoji reaction type on a message.
///
/// `count` is kept as raw JSON: the tally validator decides whether it is a
/// usable nonnegative number, so a malformed payload skips one thread
/// instead of failing deserialization of the whole history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub count: serde_json::Value,
}

impl Reaction {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count: serde_json::Value::from(count),
        }
    }
}

/// A reply inside a thread. Only authorship matters to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadReply {
    /// Author identity (Slack user/bot id).
    pub user: String,
    #[serde(default)]
    pub ts: String,
}

// ── Typed proposal thread ───────────────────────────────────────────

/// A discussion thread anchored to one proposal.
///
/// Constructed only by the parsing adapter, and only when the announcement
/// text carries a parseable closure marker.
#[derive(Debug, Clone)]
pub struct ProposalThread {
    /// Stable thread identifier (the announcement message ts).
    pub thread_ts: String,
    /// When the voting window closes, in naive civil time.
    pub closes_at: NaiveDateTime,
    /// Reactions observed at resolution time.
    pub reactions: Vec<Reaction>,
    /// True iff a resolution-bot reply already exists on the thread.
    pub resolved: bool,
    /// Link to the underlying proposal document, if the announcement had one.
    pub linked_document_url: Option<String>,
}

// ── Vote tally ──────────────────────────────────────────────────────

/// Validated vote counts for one thread. Recomputed every run, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub yes: u64,
    pub no: u64,
    pub stop: u64,
}

impl VoteTally {
    pub const ZERO: VoteTally = VoteTally {
        yes: 0,
        no: 0,
        stop: 0,
    };

    /// Total votes cast, including stop votes.
    pub fn total(&self) -> u64 {
        self.yes + self.no + self.stop
    }
}

// ── Outcome record ──────────────────────────────────────────────────

/// Everything the dispatcher needs to resolve one thread.
///
/// Produced once per qualifying thread per run; never retried within a run.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub thread_ts: String,
    pub tally: VoteTally,
    pub outcome: Outcome,
    /// The fixed human-readable sentence for the outcome.
    pub sentence: &'static str,
    pub linked_document_url: Option<String>,
    /// Ordered, de-duplicated organizer handles from the proposal document.
    pub organizer_handles: Vec<String>,
    /// The resolved document, carried so dispatch needn't re-resolve it.
    pub document: Option<Document>,
}

// ── Collaborator traits ─────────────────────────────────────────────

/// A resolved proposal document.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// Source of open proposal threads — pure I/O, no business logic.
#[async_trait]
pub trait ThreadSource: Send + Sync {
    /// Fetch all open messages in the named channel, replies included.
    async fn list_open_threads(
        &self,
        channel: &str,
    ) -> Result<Vec<ChannelMessage>, ResolutionError>;
}

/// Resolves a proposal document behind a (possibly shortened) URL.
#[async_trait]
pub trait DocumentResolver: Send + Sync {
    /// Fetch the document, or `None` if the URL does not lead to one.
    async fn resolve(&self, url: &str) -> Result<Option<Document>, DocumentError>;
}

/// Write access to a resolved document, used only at dispatch time.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Insert a `Results` section with the dated outcome line.
    async fn append_results(
        &self,
        doc: &Document,
        results_line: &str,
    ) -> Result<(), DocumentError>;

    /// Retitle the document to reflect its outcome.
    async fn retitle(&self, doc: &Document, new_title: &str) -> Result<(), DocumentError>;

    /// Remove public edit access now that voting is over.
    async fn revoke_public_edit(&self, doc: &Document) -> Result<(), DocumentError>;
}
