//! Announcement-text parsing adapter.
//!
//! All regex scraping of chat text is contained here: the resolution
//! pipeline receives already-typed [`ProposalThread`] values, so template
//! fragility stays in one translation layer testable against literal
//! fixtures.

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::debug;

use crate::resolution::types::{ChannelMessage, ProposalThread};

/// Format the announcement template renders closure timestamps in,
/// e.g. `Mon, Jun 25, 2018, 9:00 PM`.
pub const CLOSURE_DATETIME_FORMAT: &str = "%a, %b %d, %Y, %I:%M %p";

/// Converts raw channel messages into typed proposal threads.
pub struct AnnouncementParser {
    closure_re: Regex,
    link_re: Regex,
    resolution_bot_id: String,
}

impl AnnouncementParser {
    /// Build a parser for announcements carrying the given timezone label
    /// (stripped before parsing — the timestamp itself is naive civil time)
    /// and the given resolution-bot identity.
    pub fn new(timezone_label: &str, resolution_bot_id: &str) -> Self {
        let closure_re = Regex::new(&format!(
            r"\*Comment period closes:\* (.+?) {}",
            regex::escape(timezone_label)
        ))
        .expect("closure marker regex");
        let link_re =
            Regex::new(r"\*Link to proposal:\* <?([^|>\s]+)").expect("proposal link regex");

        Self {
            closure_re,
            link_re,
            resolution_bot_id: resolution_bot_id.to_string(),
        }
    }

    /// Parse one message into a proposal thread.
    ///
    /// Returns `None` when no closure timestamp can be extracted — such
    /// messages are not proposal threads and are silently excluded.
    pub fn parse_thread(&self, message: &ChannelMessage) -> Option<ProposalThread> {
        let closes_at = self.closure_time(&message.text)?;

        let resolved = message
            .replies
            .iter()
            .any(|r| r.user == self.resolution_bot_id);

        Some(ProposalThread {
            thread_ts: message.ts.clone(),
            closes_at,
            reactions: message.reactions.clone(),
            resolved,
            linked_document_url: self.proposal_link(&message.text),
        })
    }

    /// Extract and parse the closure timestamp from announcement text.
    pub fn closure_time(&self, text: &str) -> Option<NaiveDateTime> {
        let raw = self.closure_re.captures(text)?.get(1)?.as_str().trim();
        match NaiveDateTime::parse_from_str(raw, CLOSURE_DATETIME_FORMAT) {
            Ok(dt) => Some(dt),
            Err(e) => {
                debug!(raw, error = %e, "Unparseable closure timestamp, skipping message");
                None
            }
        }
    }

    /// Extract the proposal document URL, tolerating Slack's `<url|label>`
    /// bracket syntax.
    pub fn proposal_link(&self, text: &str) -> Option<String> {
        self.link_re
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::types::{Reaction, ThreadReply};
    use chrono::NaiveDate;

    fn parser() -> AnnouncementParser {
        AnnouncementParser::new("Pacific Time", "B00")
    }

    fn announcement(ts: &str) -> ChannelMessage {
        ChannelMessage {
            ts: ts.into(),
            text: "Some text and then *Comment period closes:* \
                   Mon, Jun 25, 2018, 9:00 PM Pacific Time and then more text"
                .into(),
            reactions: vec![],
            replies: vec![],
        }
    }

    #[test]
    fn parses_closure_timestamp_from_literal_template() {
        let thread = parser().parse_thread(&announcement("123")).unwrap();
        assert_eq!(
            thread.closes_at,
            NaiveDate::from_ymd_opt(2018, 6, 25)
                .unwrap()
                .and_hms_opt(21, 0, 0)
                .unwrap()
        );
        assert_eq!(thread.thread_ts, "123");
    }

    #[test]
    fn message_without_marker_is_not_a_thread() {
        let msg = ChannelMessage {
            ts: "1".into(),
            text: "just chatting about proposals".into(),
            reactions: vec![],
            replies: vec![],
        };
        assert!(parser().parse_thread(&msg).is_none());
    }

    #[test]
    fn garbled_timestamp_is_not_a_thread() {
        let msg = ChannelMessage {
            ts: "1".into(),
            text: "*Comment period closes:* sometime soon Pacific Time".into(),
            reactions: vec![],
            replies: vec![],
        };
        assert!(parser().parse_thread(&msg).is_none());
    }

    #[test]
    fn bot_reply_marks_thread_resolved() {
        let mut msg = announcement("123");
        msg.replies = vec![ThreadReply {
            user: "B00".into(),
            ts: "234".into(),
        }];
        assert!(parser().parse_thread(&msg).unwrap().resolved);
    }

    #[test]
    fn human_reply_does_not_mark_thread_resolved() {
        let mut msg = announcement("123");
        msg.replies = vec![ThreadReply {
            user: "U42".into(),
            ts: "234".into(),
        }];
        assert!(!parser().parse_thread(&msg).unwrap().resolved);
    }

    #[test]
    fn reactions_are_carried_through() {
        let mut msg = announcement("123");
        msg.reactions = vec![Reaction::new("+1", 2)];
        let thread = parser().parse_thread(&msg).unwrap();
        assert_eq!(thread.reactions.len(), 1);
    }

    #[test]
    fn extracts_plain_proposal_link() {
        let link = parser().proposal_link("*Link to proposal:* https://bit.ly/abc123");
        assert_eq!(link.as_deref(), Some("https://bit.ly/abc123"));
    }

    #[test]
    fn extracts_bracketed_proposal_link() {
        let link =
            parser().proposal_link("*Link to proposal:* <https://bit.ly/abc123|the proposal>");
        assert_eq!(link.as_deref(), Some("https://bit.ly/abc123"));
    }

    #[test]
    fn missing_link_is_none() {
        let thread = parser().parse_thread(&announcement("123")).unwrap();
        assert!(thread.linked_document_url.is_none());
    }

    #[test]
    fn custom_timezone_label_is_honored() {
        let parser = AnnouncementParser::new("Eastern Time", "B00");
        let text = "*Comment period closes:* Mon, Jun 25, 2018, 9:00 PM Eastern Time";
        assert!(parser.closure_time(text).is_some());
        assert!(
            parser
                .closure_time("*Comment period closes:* Mon, Jun 25, 2018, 9:00 PM Pacific Time")
                .is_none()
        );
    }
}
