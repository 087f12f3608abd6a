//! Intake pipeline — receives a submitted proposal form response, prepares
//! the proposal document, and either opens voting or routes the submission
//! to manual review.

pub mod routes;

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::clock;
use crate::config::BotConfig;
use crate::docs::GoogleDocsClient;
use crate::error::{Error, IntakeError, Result};
use crate::resolution::types::{Document, DocumentResolver, DocumentWriter};
use crate::shorten::UrlShortener;
use crate::slack::SlackClient;

/// Question-title fragment identifying the readiness question.
const READY_QUESTION_FRAGMENT: &str = "are you ready to submit a final version";

/// Question-title fragment identifying the organizer-emails question.
const EMAILS_QUESTION_FRAGMENT: &str = "emails of all organizers";

/// Placeholder in the template body replaced by the proposal text.
const PROPOSAL_PLACEHOLDER: &str = "[insert proposal here]";

/// Placeholder in the template body replaced by organizer emails.
const EMAILS_PLACEHOLDER: &str = "[end emails]";

/// How closure timestamps are rendered in announcements (non-padded, so it
/// matches the template's human-readable style and still round-trips
/// through the parsing adapter).
const CLOSURE_RENDER_FORMAT: &str = "%a, %b %-d, %Y, %-I:%M %p";

// ── Submission ──────────────────────────────────────────────────────

/// One answered question from the proposal form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

/// A submitted form response, as delivered to the intake webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSubmission {
    /// Generated when the webhook payload doesn't carry one.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Question/answer pairs in form order; the first answer is the title.
    pub answers: Vec<QuestionAnswer>,
    /// URL where the submitter can edit and resubmit the response.
    #[serde(default)]
    pub edit_url: Option<String>,
}

/// Decide whether a submission is ready to go to a vote.
///
/// Finds the answer to the question whose title contains the readiness
/// phrase (case-insensitive, first match wins) and compares it, trimmed
/// and lowercased, against `"yes"`. Fails closed: no such question, or no
/// answer, means not ready — ambiguous submissions go to manual review.
pub fn is_ready_to_submit(submission: &FormSubmission) -> bool {
    submission
        .answers
        .iter()
        .find(|qa| {
            !qa.question.is_empty()
                && !qa.answer.is_empty()
                && qa.question.to_lowercase().contains(READY_QUESTION_FRAGMENT)
        })
        .is_some_and(|qa| qa.answer.trim().to_lowercase() == "yes")
}

/// The proposal title is the first non-empty answer.
pub fn proposal_title(submission: &FormSubmission) -> String {
    submission
        .answers
        .first()
        .map(|qa| qa.answer.trim())
        .filter(|a| !a.is_empty())
        .map(String::from)
        .unwrap_or_else(|| "Untitled".to_string())
}

/// What happened to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum IntakeDisposition {
    /// Announced for voting; the comment window is open.
    Announced { document_url: String },
    /// Routed to the inbox channel for manual help before announcing.
    SentForReview { document_url: String },
}

// ── Pipeline ────────────────────────────────────────────────────────

/// Processes one submission end to end.
pub struct IntakePipeline {
    slack: Arc<SlackClient>,
    docs: Arc<GoogleDocsClient>,
    shortener: Arc<UrlShortener>,
    config: BotConfig,
}

impl IntakePipeline {
    pub fn new(
        slack: Arc<SlackClient>,
        docs: Arc<GoogleDocsClient>,
        shortener: Arc<UrlShortener>,
        config: BotConfig,
    ) -> Self {
        Self {
            slack,
            docs,
            shortener,
            config,
        }
    }

    /// Handle one submission: populate a fresh document copy, then announce
    /// or route for review.
    pub async fn process(&self, submission: FormSubmission) -> Result<IntakeDisposition> {
        if submission.answers.is_empty() {
            return Err(IntakeError::EmptySubmission.into());
        }

        let title = proposal_title(&submission);
        info!(id = %submission.id, title, "Processing proposal submission");

        let doc = self.prepare_document(&submission, &title).await?;
        let doc_url = GoogleDocsClient::edit_url(&doc.id);
        let short_url = self
            .shortener
            .shorten(&doc_url)
            .await
            .map_err(|e| Error::Intake(IntakeError::Announcement(e.to_string())))?;

        if is_ready_to_submit(&submission) {
            self.announce(&title, &short_url).await?;
            Ok(IntakeDisposition::Announced {
                document_url: short_url,
            })
        } else {
            self.route_for_review(&submission, &title, &doc, &short_url)
                .await?;
            Ok(IntakeDisposition::SentForReview {
                document_url: short_url,
            })
        }
    }

    /// Copy the template and fill in title, proposal body, and emails.
    async fn prepare_document(
        &self,
        submission: &FormSubmission,
        title: &str,
    ) -> Result<Document> {
        let doc = self
            .docs
            .copy_template(&self.config.template_file_id)
            .await
            .map_err(|e| Error::Intake(IntakeError::TemplateCopy(e.to_string())))?;

        self.docs
            .share_for_editing(&doc.id)
            .await
            .map_err(|e| Error::Intake(IntakeError::TemplateCopy(e.to_string())))?;

        let population = async {
            self.docs
                .retitle(&doc, &format!("Accepting Comments: {title}"))
                .await?;
            self.docs.replace_text(&doc.id, "Proposal Title", title).await?;
            self.docs
                .replace_text(&doc.id, PROPOSAL_PLACEHOLDER, &proposal_body(submission))
                .await?;
            self.docs
                .replace_text(
                    &doc.id,
                    EMAILS_PLACEHOLDER,
                    &organizer_emails(submission).unwrap_or_default(),
                )
                .await
        };
        population
            .await
            .map_err(|e| Error::Intake(IntakeError::Population(e.to_string())))?;

        Ok(doc)
    }

    /// Post the announcement and the voting post.
    async fn announce(&self, title: &str, link: &str) -> Result<()> {
        let closes_at = clock::now_in(self.config.timezone) + Duration::days(self.config.voting_days);
        let due_str = format!(
            "{} {}",
            closes_at.format(CLOSURE_RENDER_FORMAT),
            self.config.timezone_label
        );

        let announcement = announcement_text(
            title,
            &due_str,
            &self.config.proposals_channel,
            &self.config.inbox_channel,
        );
        self.slack
            .post_message(&self.config.announcements_channel, &announcement, None)
            .await
            .map_err(|e| Error::Intake(IntakeError::Announcement(e.to_string())))?;

        let voting_post = voting_post_text(title, &due_str, link, &self.config.inbox_channel);
        self.slack
            .post_message(&self.config.proposals_channel, &voting_post, None)
            .await
            .map_err(|e| Error::Intake(IntakeError::Announcement(e.to_string())))?;

        Ok(())
    }

    /// Ask for help in the inbox channel instead of announcing.
    async fn route_for_review(
        &self,
        submission: &FormSubmission,
        title: &str,
        doc: &Document,
        doc_link: &str,
    ) -> Result<()> {
        // The freshly populated document may already name organizers.
        let handles = match self
            .docs
            .resolve(&GoogleDocsClient::edit_url(&doc.id))
            .await
        {
            Ok(Some(populated)) => crate::docs::extract_organizer_handles(&populated.body),
            _ => Vec::new(),
        };

        let edit_link = match &submission.edit_url {
            Some(url) => Some(
                self.shortener
                    .shorten(url)
                    .await
                    .map_err(|e| Error::Intake(IntakeError::Announcement(e.to_string())))?,
            ),
            None => None,
        };

        let text = not_ready_text(title, doc_link, edit_link.as_deref(), &handles);
        self.slack
            .post_message(&self.config.inbox_channel, &text, None)
            .await
            .map_err(|e| Error::Intake(IntakeError::Announcement(e.to_string())))?;

        Ok(())
    }
}

// ── Message and body templates ──────────────────────────────────────

/// Question/answer block inserted into the document body. The first answer
/// is the title and is excluded; blank pairs are dropped.
fn proposal_body(submission: &FormSubmission) -> String {
    submission
        .answers
        .iter()
        .skip(1)
        .filter(|qa| !qa.question.is_empty() && !qa.answer.is_empty())
        .map(|qa| format!("{}\n{}", qa.question, qa.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The organizer-emails answer, if the form carried one.
fn organizer_emails(submission: &FormSubmission) -> Option<String> {
    submission
        .answers
        .iter()
        .find(|qa| {
            !qa.question.is_empty()
                && !qa.answer.is_empty()
                && qa.question.to_lowercase().contains(EMAILS_QUESTION_FRAGMENT)
        })
        .map(|qa| qa.answer.clone())
}

fn announcement_text(title: &str, due_str: &str, proposals_channel: &str, inbox_channel: &str) -> String {
    format!(
        "A new proposal has been posted!\n\n\
         *Name:* _{title}_\n\n\
         *Comment period closes*: {due_str}\n\n\
         *How can you participate in the proposal process?*\n\n\
         Head over to #{proposals_channel} and follow the quick directions. I expect it'll \
         take less than 5 mins to read, comment (if you want), and vote on the proposal. \
         Head to #{inbox_channel} if you have any questions or problems."
    )
}

fn voting_post_text(title: &str, due_str: &str, link: &str, inbox_channel: &str) -> String {
    format!(
        "A new proposal has been posted!\n\n\
         Place your emoji vote (:+1: / :-1: / :stop:) on this post. Please do not comment \
         in this channel. Comment in the *Comments* section at the bottom of the Google Doc \
         linked below. Please head over to #{inbox_channel} if you have any questions about \
         this process.\n\n\
         *Name:* _{title}_\n\n\
         *Comment period closes:* {due_str}\n\n\
         *Link to proposal:* {link}"
    )
}

fn not_ready_text(
    title: &str,
    doc_link: &str,
    edit_link: Option<&str>,
    handles: &[String],
) -> String {
    let mut text = format!(
        "@channel Someone posted a proposal but would like some help before announcing it \
         officially.\n\n\
         *Name:* _{title}_\n\n\
         *Link to tentative proposal:* {doc_link}"
    );
    if let Some(edit_link) = edit_link {
        text.push_str(&format!("\n\n*Link to edit and resubmit:* {edit_link}"));
    }
    if !handles.is_empty() {
        text.push_str(&format!("\n\n*Organizers:* {}", handles.join(" ")));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(answers: &[(&str, &str)]) -> FormSubmission {
        FormSubmission {
            id: Uuid::new_v4(),
            answers: answers
                .iter()
                .map(|(q, a)| QuestionAnswer {
                    question: q.to_string(),
                    answer: a.to_string(),
                })
                .collect(),
            edit_url: None,
        }
    }

    // ── Readiness classifier ────────────────────────────────────────

    #[test]
    fn ready_when_answer_is_yes() {
        let s = submission(&[
            ("Proposal title", "Community garden"),
            ("Are you ready to submit a final version?", "Yes"),
        ]);
        assert!(is_ready_to_submit(&s));
    }

    #[test]
    fn readiness_question_match_is_case_insensitive_substring() {
        let s = submission(&[
            ("Title", "X"),
            ("ARE YOU READY TO SUBMIT A FINAL VERSION of this?", "yes"),
        ]);
        assert!(is_ready_to_submit(&s));
    }

    #[test]
    fn readiness_answer_is_trimmed_and_case_normalized() {
        let s = submission(&[("Title", "X"), ("Are you ready to submit a final version?", "  YES  ")]);
        assert!(is_ready_to_submit(&s));
    }

    #[test]
    fn not_ready_when_answer_is_anything_else() {
        let s = submission(&[
            ("Title", "X"),
            ("Are you ready to submit a final version?", "yes please"),
        ]);
        assert!(!is_ready_to_submit(&s));
    }

    #[test]
    fn not_ready_when_question_absent() {
        let s = submission(&[("Title", "X"), ("Anything else?", "yes")]);
        assert!(!is_ready_to_submit(&s));
    }

    #[test]
    fn not_ready_when_no_answers_at_all() {
        let s = submission(&[]);
        assert!(!is_ready_to_submit(&s));
    }

    #[test]
    fn first_matching_readiness_question_wins() {
        let s = submission(&[
            ("Title", "X"),
            ("Are you ready to submit a final version?", "no"),
            ("Really, are you ready to submit a final version?", "yes"),
        ]);
        assert!(!is_ready_to_submit(&s));
    }

    // ── Title ───────────────────────────────────────────────────────

    #[test]
    fn title_is_first_answer() {
        let s = submission(&[("Proposal title", "Community garden")]);
        assert_eq!(proposal_title(&s), "Community garden");
    }

    #[test]
    fn blank_title_defaults_to_untitled() {
        let s = submission(&[("Proposal title", "")]);
        assert_eq!(proposal_title(&s), "Untitled");
        assert_eq!(proposal_title(&submission(&[])), "Untitled");
    }

    // ── Document body ───────────────────────────────────────────────

    #[test]
    fn proposal_body_skips_title_and_blank_pairs() {
        let s = submission(&[
            ("Proposal title", "Garden"),
            ("What is it?", "A garden"),
            ("", "orphan answer"),
            ("Unanswered question", ""),
            ("Why?", "Vegetables"),
        ]);
        assert_eq!(
            proposal_body(&s),
            "What is it?\nA garden\n\nWhy?\nVegetables"
        );
    }

    #[test]
    fn organizer_emails_found_by_question_fragment() {
        let s = submission(&[
            ("Title", "X"),
            ("Emails of all organizers (comma separated)", "a@x.com, b@x.com"),
        ]);
        assert_eq!(organizer_emails(&s).as_deref(), Some("a@x.com, b@x.com"));
        assert!(organizer_emails(&submission(&[("Title", "X")])).is_none());
    }

    // ── Announcement templates ──────────────────────────────────────

    #[test]
    fn voting_post_round_trips_through_the_parsing_adapter() {
        let text = voting_post_text(
            "Garden",
            "Mon, Jun 25, 2018, 9:00 PM Pacific Time",
            "https://bit.ly/abc",
            "inbox",
        );
        let parser = crate::slack::parse::AnnouncementParser::new("Pacific Time", "B00");
        assert!(parser.closure_time(&text).is_some());
        assert_eq!(parser.proposal_link(&text).as_deref(), Some("https://bit.ly/abc"));
    }

    #[test]
    fn closure_render_format_is_parseable() {
        let rendered = chrono::NaiveDate::from_ymd_opt(2018, 6, 25)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap()
            .format(CLOSURE_RENDER_FORMAT)
            .to_string();
        assert_eq!(rendered, "Mon, Jun 25, 2018, 9:00 PM");
        assert!(
            chrono::NaiveDateTime::parse_from_str(
                &rendered,
                crate::slack::parse::CLOSURE_DATETIME_FORMAT
            )
            .is_ok()
        );
    }

    #[test]
    fn not_ready_text_includes_optional_sections() {
        let text = not_ready_text(
            "Garden",
            "https://bit.ly/doc",
            Some("https://bit.ly/edit"),
            &["@alice".to_string()],
        );
        assert!(text.contains("*Link to edit and resubmit:* https://bit.ly/edit"));
        assert!(text.contains("*Organizers:* @alice"));

        let bare = not_ready_text("Garden", "https://bit.ly/doc", None, &[]);
        assert!(!bare.contains("edit and resubmit"));
        assert!(!bare.contains("Organizers"));
    }
}
