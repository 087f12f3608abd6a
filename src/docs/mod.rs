//! Google Docs/Drive client — document resolution and post-vote writes.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use secrecy::ExposeSecret;

use crate::config::BotConfig;
use crate::error::DocumentError;
use crate::resolution::types::{Document, DocumentResolver, DocumentWriter};
use crate::shorten::UrlShortener;

static DOC_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/document/d/([A-Za-z0-9_-]+)").expect("doc id regex"));

/// Marker line in the proposal template; the line after it lists handles.
static ORGANIZERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Slacks of all organizers.*\n(.+)").expect("organizers regex"));

/// Mention-style handle: leading `@`, then lowercase alphanumerics/`.`/`_`/`-`.
static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@[a-z0-9][a-z0-9._-]*$").expect("handle regex"));

/// Extract the document id from a Google Docs URL.
pub fn doc_id_from_url(url: &str) -> Option<String> {
    DOC_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the ordered, de-duplicated organizer handles from a document body.
///
/// Handles live on the single line after the `Slacks of all organizers`
/// marker, delimited by commas or spaces. Anything failing the handle
/// syntax check is dropped.
pub fn extract_organizer_handles(body: &str) -> Vec<String> {
    let Some(line) = ORGANIZERS_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    let mut handles = Vec::new();
    for candidate in line.split([',', ' ', '\n']) {
        let candidate = candidate.trim();
        if HANDLE_RE.is_match(candidate) && !handles.iter().any(|h| h == candidate) {
            handles.push(candidate.to_string());
        }
    }
    handles
}

// ── Client ──────────────────────────────────────────────────────────

/// Google Docs/Drive REST client.
pub struct GoogleDocsClient {
    token: secrecy::SecretString,
    client: reqwest::Client,
    shortener: Arc<UrlShortener>,
}

impl GoogleDocsClient {
    pub fn new(config: &BotConfig, shortener: Arc<UrlShortener>) -> Self {
        Self {
            token: config.google_token.clone(),
            client: reqwest::Client::new(),
            shortener,
        }
    }

    fn drive_url(path: &str) -> String {
        format!("https://www.googleapis.com/drive/v3/files/{path}")
    }

    /// Copy the proposal template, returning the new document.
    pub async fn copy_template(&self, template_file_id: &str) -> Result<Document, DocumentError> {
        let resp = self
            .client
            .post(Self::drive_url(&format!("{template_file_id}/copy")))
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({"name": "Untitled"}))
            .send()
            .await
            .map_err(|e| DocumentError::RequestFailed(e.to_string()))?;

        let data = Self::check_json(resp).await?;
        let id = data
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| DocumentError::RequestFailed("copy response missing id".into()))?;

        Ok(Document {
            id: id.to_string(),
            title: "Untitled".to_string(),
            body: String::new(),
        })
    }

    /// Grant anyone-with-the-link edit access (used while comments are open).
    pub async fn share_for_editing(&self, doc_id: &str) -> Result<(), DocumentError> {
        let resp = self
            .client
            .post(Self::drive_url(&format!("{doc_id}/permissions")))
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({"type": "anyone", "role": "writer"}))
            .send()
            .await
            .map_err(|e| DocumentError::RequestFailed(e.to_string()))?;

        Self::check_json(resp).await.map(|_| ())
    }

    /// The canonical edit URL for a document id.
    pub fn edit_url(doc_id: &str) -> String {
        format!("https://docs.google.com/document/d/{doc_id}/edit")
    }

    /// Replace every occurrence of `placeholder` in the document body.
    pub async fn replace_text(
        &self,
        doc_id: &str,
        placeholder: &str,
        replacement: &str,
    ) -> Result<(), DocumentError> {
        self.batch_update(
            doc_id,
            vec![serde_json::json!({
                "replaceAllText": {
                    "containsText": {"text": placeholder, "matchCase": true},
                    "replaceText": replacement,
                }
            })],
        )
        .await
    }

    /// Fetch a document's title and plain-text body.
    async fn fetch(&self, doc_id: &str) -> Result<Option<Document>, DocumentError> {
        let meta_resp = self
            .client
            .get(Self::drive_url(&format!("{doc_id}?fields=name")))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| DocumentError::RequestFailed(e.to_string()))?;

        if meta_resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let meta = Self::check_json(meta_resp).await?;
        let title = meta
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        // Plain-text export is all the pipeline needs; the structured
        // document JSON stays out of the picture.
        let body_resp = self
            .client
            .get(Self::drive_url(&format!(
                "{doc_id}/export?mimeType=text/plain"
            )))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| DocumentError::RequestFailed(e.to_string()))?;

        if body_resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !body_resp.status().is_success() {
            let status = body_resp.status();
            let text = body_resp.text().await.unwrap_or_default();
            return Err(DocumentError::RequestFailed(format!(
                "export returned HTTP {status}: {text}"
            )));
        }

        let body = body_resp
            .text()
            .await
            .map_err(|e| DocumentError::RequestFailed(e.to_string()))?;

        Ok(Some(Document {
            id: doc_id.to_string(),
            title,
            body,
        }))
    }

    async fn batch_update(
        &self,
        doc_id: &str,
        requests: Vec<serde_json::Value>,
    ) -> Result<(), DocumentError> {
        let resp = self
            .client
            .post(format!(
                "https://docs.googleapis.com/v1/documents/{doc_id}:batchUpdate"
            ))
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({"requests": requests}))
            .send()
            .await
            .map_err(|e| DocumentError::UpdateFailed {
                id: doc_id.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DocumentError::UpdateFailed {
                id: doc_id.to_string(),
                reason: format!("HTTP {status}: {text}"),
            });
        }
        Ok(())
    }

    async fn check_json(resp: reqwest::Response) -> Result<serde_json::Value, DocumentError> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(DocumentError::RequestFailed(format!(
                "HTTP {status}: {text}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| DocumentError::RequestFailed(e.to_string()))
    }
}

#[async_trait]
impl DocumentResolver for GoogleDocsClient {
    async fn resolve(&self, url: &str) -> Result<Option<Document>, DocumentError> {
        let url = if UrlShortener::is_shortened(url) {
            self.shortener.expand(url).await?
        } else {
            url.to_string()
        };

        let Some(doc_id) = doc_id_from_url(&url) else {
            // Whatever the announcement linked to, it isn't a document.
            return Ok(None);
        };

        self.fetch(&doc_id).await
    }
}

#[async_trait]
impl DocumentWriter for GoogleDocsClient {
    async fn append_results(
        &self,
        doc: &Document,
        results_line: &str,
    ) -> Result<(), DocumentError> {
        let heading = "Results\n";
        let inserted = format!("{heading}{results_line}\n");
        self.batch_update(
            doc.id.as_str(),
            vec![
                serde_json::json!({
                    "insertText": {
                        "location": {"index": 1},
                        "text": inserted,
                    }
                }),
                serde_json::json!({
                    "updateParagraphStyle": {
                        "range": {"startIndex": 1, "endIndex": 1 + heading.len()},
                        "paragraphStyle": {"namedStyleType": "HEADING_1"},
                        "fields": "namedStyleType",
                    }
                }),
            ],
        )
        .await
    }

    async fn retitle(&self, doc: &Document, new_title: &str) -> Result<(), DocumentError> {
        let resp = self
            .client
            .patch(Self::drive_url(&doc.id))
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({"name": new_title}))
            .send()
            .await
            .map_err(|e| DocumentError::UpdateFailed {
                id: doc.id.clone(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DocumentError::UpdateFailed {
                id: doc.id.clone(),
                reason: format!("retitle returned HTTP {status}"),
            });
        }
        Ok(())
    }

    async fn revoke_public_edit(&self, doc: &Document) -> Result<(), DocumentError> {
        let resp = self
            .client
            .get(Self::drive_url(&format!("{}/permissions", doc.id)))
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| DocumentError::UpdateFailed {
                id: doc.id.clone(),
                reason: e.to_string(),
            })?;

        let data = Self::check_json(resp).await?;
        let public_permission_ids: Vec<String> = data
            .get("permissions")
            .and_then(serde_json::Value::as_array)
            .map(|perms| {
                perms
                    .iter()
                    .filter(|p| {
                        p.get("type").and_then(serde_json::Value::as_str) == Some("anyone")
                    })
                    .filter_map(|p| p.get("id").and_then(serde_json::Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        for permission_id in public_permission_ids {
            let resp = self
                .client
                .delete(Self::drive_url(&format!(
                    "{}/permissions/{permission_id}",
                    doc.id
                )))
                .bearer_auth(self.token.expose_secret())
                .send()
                .await
                .map_err(|e| DocumentError::UpdateFailed {
                    id: doc.id.clone(),
                    reason: e.to_string(),
                })?;

            if !resp.status().is_success() {
                let status = resp.status();
                return Err(DocumentError::UpdateFailed {
                    id: doc.id.clone(),
                    reason: format!("permission delete returned HTTP {status}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_doc_id_from_edit_url() {
        let id = doc_id_from_url("https://docs.google.com/document/d/1AbC_d-9xYz/edit#heading=h");
        assert_eq!(id.as_deref(), Some("1AbC_d-9xYz"));
    }

    #[test]
    fn non_document_url_has_no_id() {
        assert!(doc_id_from_url("https://example.com/whatever").is_none());
    }

    #[test]
    fn reads_only_the_line_after_the_marker() {
        let body = "Proposal text\nSlacks of all organizers:\n@alice\n@bob\n";
        // handles are expected on one line; later lines are not scanned
        assert_eq!(extract_organizer_handles(body), vec!["@alice"]);
    }

    #[test]
    fn extracts_comma_and_space_delimited_handles() {
        let body = "Slacks of all organizers:\n@alice, @bob @carol.d\n";
        assert_eq!(
            extract_organizer_handles(body),
            vec!["@alice", "@bob", "@carol.d"]
        );
    }

    #[test]
    fn invalid_handles_are_dropped() {
        let body = "Slacks of all organizers:\n@alice @Bob @-dash alice @_x\n";
        // uppercase, leading dash/underscore, and missing @ all fail the syntax check
        assert_eq!(extract_organizer_handles(body), vec!["@alice"]);
    }

    #[test]
    fn duplicate_handles_are_deduplicated_in_order() {
        let body = "Slacks of all organizers:\n@bob @alice @bob\n";
        assert_eq!(extract_organizer_handles(body), vec!["@bob", "@alice"]);
    }

    #[test]
    fn body_without_marker_has_no_handles() {
        assert!(extract_organizer_handles("just a proposal body").is_empty());
    }

    #[test]
    fn edit_url_round_trips_through_id_extraction() {
        let url = GoogleDocsClient::edit_url("1AbC");
        assert_eq!(doc_id_from_url(&url).as_deref(), Some("1AbC"));
    }
}
