//! Slack Web API client — the concrete thread source and dispatch sink.

pub mod parse;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::config::BotConfig;
use crate::error::{ResolutionError, SlackError};
use crate::resolution::types::{ChannelMessage, ThreadReply, ThreadSource};

/// Slack Web API client.
pub struct SlackClient {
    token: secrecy::SecretString,
    bot_username: String,
    bot_icon_emoji: String,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            token: config.slack_token.clone(),
            bot_username: config.bot_username.clone(),
            bot_icon_emoji: config.bot_icon_emoji.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(method: &str) -> String {
        format!("https://slack.com/api/{method}")
    }

    /// GET a read API method and return the parsed envelope.
    async fn get(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, SlackError> {
        let resp = self
            .client
            .get(Self::api_url(method))
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| SlackError::RequestFailed {
                method: method.into(),
                reason: e.to_string(),
            })?;

        Self::check_envelope(method, resp).await
    }

    /// POST a write API method with a JSON body.
    async fn post(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, SlackError> {
        let resp = self
            .client
            .post(Self::api_url(method))
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| SlackError::RequestFailed {
                method: method.into(),
                reason: e.to_string(),
            })?;

        Self::check_envelope(method, resp).await
    }

    /// Every Slack response carries `ok`; a false `ok` names the error.
    async fn check_envelope(
        method: &str,
        resp: reqwest::Response,
    ) -> Result<serde_json::Value, SlackError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SlackError::RequestFailed {
                method: method.into(),
                reason: format!("HTTP {status}: {text}"),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| SlackError::RequestFailed {
                method: method.into(),
                reason: e.to_string(),
            })?;

        if data.get("ok").and_then(serde_json::Value::as_bool) != Some(true) {
            let error = data
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown_error");
            return Err(SlackError::Api {
                method: method.into(),
                error: error.to_string(),
            });
        }

        Ok(data)
    }

    /// Look up a channel id by name.
    pub async fn channel_id(&self, name: &str) -> Result<String, SlackError> {
        let data = self
            .get(
                "conversations.list",
                &[("exclude_archived", "true"), ("limit", "1000")],
            )
            .await?;

        data.get("channels")
            .and_then(serde_json::Value::as_array)
            .and_then(|channels| {
                channels.iter().find(|c| {
                    c.get("name").and_then(serde_json::Value::as_str) == Some(name)
                })
            })
            .and_then(|c| c.get("id").and_then(serde_json::Value::as_str))
            .map(String::from)
            .ok_or_else(|| SlackError::ChannelNotFound(name.to_string()))
    }

    /// Fetch the channel's message history, with replies populated for any
    /// message that has them.
    pub async fn channel_history(
        &self,
        channel_id: &str,
    ) -> Result<Vec<ChannelMessage>, SlackError> {
        let data = self
            .get("conversations.history", &[("channel", channel_id)])
            .await?;

        let raw_messages = data
            .get("messages")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut messages = Vec::with_capacity(raw_messages.len());
        for raw in raw_messages {
            let mut message: ChannelMessage = serde_json::from_value(raw.clone())
                .map_err(|e| SlackError::RequestFailed {
                    method: "conversations.history".into(),
                    reason: format!("unexpected message shape: {e}"),
                })?;

            // Replies are not embedded in history; fetch them only for
            // messages that actually have a thread.
            let reply_count = raw
                .get("reply_count")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            if reply_count > 0 {
                message.replies = self.thread_replies(channel_id, &message.ts).await?;
            }

            messages.push(message);
        }

        Ok(messages)
    }

    /// Fetch replies for one thread, excluding the parent message itself.
    async fn thread_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<ThreadReply>, SlackError> {
        let data = self
            .get(
                "conversations.replies",
                &[("channel", channel_id), ("ts", thread_ts)],
            )
            .await?;

        let replies = data
            .get("messages")
            .and_then(serde_json::Value::as_array)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| {
                        m.get("ts").and_then(serde_json::Value::as_str) != Some(thread_ts)
                    })
                    .map(|m| ThreadReply {
                        // Result replies are posted by a bot, so prefer the
                        // bot identity over the (absent) user field.
                        user: m
                            .get("bot_id")
                            .or_else(|| m.get("user"))
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        ts: m
                            .get("ts")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(replies)
    }

    /// Post a message to a channel, optionally threaded under `thread_ts`,
    /// with the bot's identity and `link_names` so handle mentions notify.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), SlackError> {
        let mut body = serde_json::json!({
            "channel": channel,
            "text": text,
            "link_names": true,
            "username": self.bot_username,
            "icon_emoji": self.bot_icon_emoji,
        });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = serde_json::Value::String(ts.to_string());
        }

        self.post("chat.postMessage", &body)
            .await
            .map_err(|e| SlackError::PostFailed {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(channel, threaded = thread_ts.is_some(), "Posted message");
        Ok(())
    }
}

#[async_trait]
impl ThreadSource for SlackClient {
    async fn list_open_threads(
        &self,
        channel: &str,
    ) -> Result<Vec<ChannelMessage>, ResolutionError> {
        let channel_id = self
            .channel_id(channel)
            .await
            .map_err(|e| ResolutionError::ThreadFetch(e.to_string()))?;
        self.channel_history(&channel_id)
            .await
            .map_err(|e| ResolutionError::ThreadFetch(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_is_well_formed() {
        assert_eq!(
            SlackClient::api_url("chat.postMessage"),
            "https://slack.com/api/chat.postMessage"
        );
    }

    #[test]
    fn history_message_shape_deserializes() {
        let raw = serde_json::json!({
            "ts": "1529982000.000100",
            "text": "*Comment period closes:* Mon, Jun 25, 2018, 9:00 PM Pacific Time",
            "reactions": [{"name": "+1", "count": 2, "users": ["U1", "U2"]}],
            "reply_count": 1,
            "type": "message"
        });
        let message: ChannelMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(message.ts, "1529982000.000100");
        assert_eq!(message.reactions.len(), 1);
        assert_eq!(message.reactions[0].count.as_u64(), Some(2));
    }
}
