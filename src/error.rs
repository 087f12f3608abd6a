//! Error types for the proposal bot.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Slack Web API errors.
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("Slack request {method} failed: {reason}")]
    RequestFailed { method: String, reason: String },

    #[error("Slack API {method} returned an error: {error}")]
    Api { method: String, error: String },

    #[error("Channel not found: #{0}")]
    ChannelNotFound(String),

    #[error("Failed to post message to {channel}: {reason}")]
    PostFailed { channel: String, reason: String },
}

/// Document store (Docs/Drive) errors.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document request failed: {0}")]
    RequestFailed(String),

    #[error("Document not found at {0}")]
    NotFound(String),

    #[error("Not a recognizable document URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to update document {id}: {reason}")]
    UpdateFailed { id: String, reason: String },

    #[error("URL shortener error: {0}")]
    Shortener(String),
}

/// Resolution pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Invalid vote count for reaction {name:?}: {reason}")]
    InvalidVoteCount { name: String, reason: String },

    #[error("Thread fetch failed: {0}")]
    ThreadFetch(String),

    #[error("Result dispatch failed for thread {thread_ts}: {reason}")]
    DispatchFailed { thread_ts: String, reason: String },
}

/// Intake pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Empty submission: no answered questions")]
    EmptySubmission,

    #[error("Template copy failed: {0}")]
    TemplateCopy(String),

    #[error("Document population failed: {0}")]
    Population(String),

    #[error("Announcement failed: {0}")]
    Announcement(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
