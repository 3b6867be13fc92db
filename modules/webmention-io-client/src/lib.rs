pub mod error;
pub mod types;

pub use error::{Result, WebmentionIoError};
pub use types::{ApiErrorBody, MentionsFeed};

use std::time::Duration;

const BASE_URL: &str = "https://webmention.io";

/// Largest page webmention.io serves.
const PER_PAGE: u32 = 1000;

pub struct WebmentionIoClient {
    client: reqwest::Client,
    base_url: String,
}

impl WebmentionIoClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch every mention the account holds, as raw jf2 entries.
    pub async fn fetch_mentions(&self, token: &str) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/api/mentions.jf2", self.base_url);
        let per_page = PER_PAGE.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[("token", token), ("per-page", per_page.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(WebmentionIoError::Api {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }

        let feed: MentionsFeed = resp.json().await?;
        tracing::info!(count = feed.children.len(), "Fetched webmention.io mentions");
        Ok(feed.children)
    }
}

/// Prefer the upstream `error_description`; otherwise report the status.
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error_description.filter(|d| !d.is_empty()))
        .unwrap_or_else(|| format!("Received {status} from webmention.io"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_uses_description() {
        let body = r#"{"error":"forbidden","error_description":"The token provided is not valid"}"#;
        assert_eq!(error_message(403, body), "The token provided is not valid");
    }

    #[test]
    fn error_message_falls_back_to_status() {
        assert_eq!(error_message(502, "<html>bad gateway</html>"), "Received 502 from webmention.io");
        assert_eq!(error_message(401, r#"{"error":"unauthorized"}"#), "Received 401 from webmention.io");
    }

    #[test]
    fn feed_defaults_to_no_children() {
        let feed: MentionsFeed = serde_json::from_str(r#"{"type":"feed","name":"Webmentions"}"#).unwrap();
        assert!(feed.children.is_empty());
    }

    #[test]
    fn base_url_is_trimmed() {
        let client = WebmentionIoClient::with_base_url("http://localhost:9999/").unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
