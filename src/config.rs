//! Configuration types.
//!
//! All settings are read from the environment exactly once at startup and
//! carried in a single flat [`BotConfig`] that is passed by reference into
//! every component. No component performs its own environment lookups.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Service configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_token: SecretString,
    /// bit.ly access token (`BITLY_TOKEN`).
    pub bitly_token: SecretString,
    /// bit.ly group GUID for shortened links (`BITLY_GROUP_GUID`).
    pub bitly_group_guid: String,
    /// Google API bearer token for Docs/Drive access (`GOOGLE_API_TOKEN`).
    pub google_token: SecretString,
    /// Channel where voting posts live.
    pub proposals_channel: String,
    /// Channel for new-proposal announcements.
    pub announcements_channel: String,
    /// Channel for questions and not-ready submissions.
    pub inbox_channel: String,
    /// Bot user id whose replies mark a thread as resolved.
    pub resolution_bot_id: String,
    /// Display name used when posting results.
    pub bot_username: String,
    /// Emoji icon used when posting results.
    pub bot_icon_emoji: String,
    /// Length of the comment/voting window in days.
    pub voting_days: i64,
    /// Seconds between resolution runs.
    pub resolution_interval_secs: u64,
    /// IANA timezone the closure timestamps are rendered in.
    pub timezone: chrono_tz::Tz,
    /// Human label trailing the closure timestamp (e.g. "Pacific Time").
    pub timezone_label: String,
    /// Drive file id of the proposal document template.
    pub template_file_id: String,
    /// Port for the intake webhook server.
    pub intake_port: u16,
}

impl BotConfig {
    /// Build the configuration from environment variables.
    ///
    /// Tokens are required; everything else has a sensible default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let slack_token = require_env("SLACK_BOT_TOKEN")?;
        let bitly_token = require_env("BITLY_TOKEN")?;
        let google_token = require_env("GOOGLE_API_TOKEN")?;
        let template_file_id = require_env("PROPOSAL_TEMPLATE_FILE_ID")?;

        let timezone_name =
            std::env::var("PROPOSAL_TIMEZONE").unwrap_or_else(|_| "US/Pacific".to_string());
        let timezone: chrono_tz::Tz =
            timezone_name
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "PROPOSAL_TIMEZONE".into(),
                    message: format!("unknown timezone {timezone_name:?}"),
                })?;

        let voting_days: i64 = parse_env("PROPOSAL_VOTING_DAYS", 7)?;
        if voting_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "PROPOSAL_VOTING_DAYS".into(),
                message: "must be a positive number of days".into(),
            });
        }

        Ok(Self {
            slack_token: SecretString::from(slack_token),
            bitly_token: SecretString::from(bitly_token),
            bitly_group_guid: std::env::var("BITLY_GROUP_GUID").unwrap_or_default(),
            google_token: SecretString::from(google_token),
            proposals_channel: std::env::var("PROPOSALS_CHANNEL")
                .unwrap_or_else(|_| "proposals".to_string()),
            announcements_channel: std::env::var("ANNOUNCEMENTS_CHANNEL")
                .unwrap_or_else(|_| "announcements".to_string()),
            inbox_channel: std::env::var("INBOX_CHANNEL")
                .unwrap_or_else(|_| "proposal-inbox".to_string()),
            resolution_bot_id: require_env("RESOLUTION_BOT_ID")?,
            bot_username: std::env::var("BOT_USERNAME")
                .unwrap_or_else(|_| "proposal-bot".to_string()),
            bot_icon_emoji: std::env::var("BOT_ICON_EMOJI")
                .unwrap_or_else(|_| ":fist:".to_string()),
            voting_days,
            resolution_interval_secs: parse_env("RESOLUTION_INTERVAL_SECS", 600)?,
            timezone,
            timezone_label: std::env::var("PROPOSAL_TIMEZONE_LABEL")
                .unwrap_or_else(|_| "Pacific Time".to_string()),
            template_file_id,
            intake_port: parse_env("INTAKE_PORT", 8080)?,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_uses_default_when_unset() {
        let v: u64 = parse_env("PROPOSAL_BOT_TEST_UNSET_VAR", 600).unwrap();
        assert_eq!(v, 600);
    }

    #[test]
    fn require_env_reports_missing_key() {
        let err = require_env("PROPOSAL_BOT_TEST_MISSING_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(k) if k == "PROPOSAL_BOT_TEST_MISSING_VAR"));
    }
}
