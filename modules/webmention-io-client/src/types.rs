use serde::Deserialize;

/// `GET /api/mentions.jf2` response. Entries are kept as raw JSON so one
/// malformed entry can be skipped without failing the whole feed.
#[derive(Debug, Clone, Deserialize)]
pub struct MentionsFeed {
    #[serde(default)]
    pub children: Vec<serde_json::Value>,
}

/// Error body returned on non-200 responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<String>,
    pub error_description: Option<String>,
}
