//! bit.ly link shortening and single-hop expansion.

use secrecy::ExposeSecret;

use crate::config::BotConfig;
use crate::error::DocumentError;

const BITLY_SHORTEN_URL: &str = "https://api-ssl.bitly.com/v4/shorten";

/// bit.ly v4 client.
pub struct UrlShortener {
    token: secrecy::SecretString,
    group_guid: String,
    client: reqwest::Client,
    /// Client that does not follow redirects, for expansion.
    no_redirect_client: reqwest::Client,
}

impl UrlShortener {
    pub fn new(config: &BotConfig) -> Result<Self, DocumentError> {
        let no_redirect_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| DocumentError::Shortener(e.to_string()))?;

        Ok(Self {
            token: config.bitly_token.clone(),
            group_guid: config.bitly_group_guid.clone(),
            client: reqwest::Client::new(),
            no_redirect_client,
        })
    }

    /// Shorten a long URL, returning the bit.ly link.
    pub async fn shorten(&self, long_url: &str) -> Result<String, DocumentError> {
        let body = serde_json::json!({
            "long_url": long_url,
            "group_guid": self.group_guid,
        });

        let resp = self
            .client
            .post(BITLY_SHORTEN_URL)
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| DocumentError::Shortener(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DocumentError::Shortener(format!(
                "shorten returned HTTP {status}: {text}"
            )));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| DocumentError::Shortener(e.to_string()))?;

        data.get("id")
            .and_then(serde_json::Value::as_str)
            .map(String::from)
            .ok_or_else(|| DocumentError::Shortener("shorten response missing id".into()))
    }

    /// Whether a URL points at the shortener rather than the destination.
    pub fn is_shortened(url: &str) -> bool {
        url.contains("bit.ly")
    }

    /// Follow one redirect hop and return the destination URL.
    ///
    /// One hop is contractually sufficient for bit.ly links; no loop
    /// handling is attempted.
    pub async fn expand(&self, short_url: &str) -> Result<String, DocumentError> {
        let resp = self
            .no_redirect_client
            .get(short_url)
            .send()
            .await
            .map_err(|e| DocumentError::Shortener(e.to_string()))?;

        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                DocumentError::Shortener(format!("no redirect location from {short_url}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_shortened_urls() {
        assert!(UrlShortener::is_shortened("https://bit.ly/abc123"));
        assert!(!UrlShortener::is_shortened(
            "https://docs.google.com/document/d/xyz/edit"
        ));
    }
}
