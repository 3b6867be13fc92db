// Test mocks for the receiver pipeline.
//
// One mock per trait boundary:
// - MockVerifier (Verifier): source URL → scripted VerifiedMention
// - RecordingNotifier (Notifier): records every call, optionally fails
// - MockFeed (MentionFeed): canned aggregator entries or an upstream error

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use webmention_common::{MentionContent, MentionType, Result, WebmentionError};

use crate::notify::{Notifier, NotifyEvent};
use crate::queue::Disposition;
use crate::receiver::MentionFeed;
use crate::verifier::{VerifiedMention, Verifier};

// ---------------------------------------------------------------------------
// MockVerifier
// ---------------------------------------------------------------------------

enum Scripted {
    Verified(VerifiedMention),
    Hang(Duration, VerifiedMention),
}

/// HashMap-based verifier keyed by source URL. Unregistered sources fail
/// verification. Builder pattern: `.on_verify()`, `.on_slow()`,
/// `.with_admission()`.
pub struct MockVerifier {
    responses: Mutex<HashMap<String, Scripted>>,
    admission: Disposition,
}

impl MockVerifier {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            admission: Disposition::Accepted,
        }
    }

    pub fn on_verify(self, source: &str, verified: VerifiedMention) -> Self {
        self.set(source, verified);
        self
    }

    /// Shorthand for a plain `mention` with the given content text.
    pub fn on_mention(self, source: &str, text: &str) -> Self {
        let mut verified = VerifiedMention::of_type(MentionType::Mention);
        verified.content = Some(MentionContent::text(text));
        self.on_verify(source, verified)
    }

    /// Verifies successfully, but only after `delay`.
    pub fn on_slow(self, source: &str, delay: Duration, verified: VerifiedMention) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(source.to_string(), Scripted::Hang(delay, verified));
        self
    }

    pub fn with_admission(mut self, admission: Disposition) -> Self {
        self.admission = admission;
        self
    }

    /// Replace the scripted response for `source` after construction, so a
    /// test can simulate the source page changing between cycles.
    pub fn set(&self, source: &str, verified: VerifiedMention) {
        self.responses
            .lock()
            .unwrap()
            .insert(source.to_string(), Scripted::Verified(verified));
    }
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Verifier for MockVerifier {
    async fn verify(&self, source: &str, _target: &str) -> Result<VerifiedMention> {
        let scripted = {
            let responses = self.responses.lock().unwrap();
            match responses.get(source) {
                Some(Scripted::Verified(v)) => (Duration::ZERO, v.clone()),
                Some(Scripted::Hang(d, v)) => (*d, v.clone()),
                None => {
                    return Err(WebmentionError::Verification(format!(
                        "MockVerifier: no response for {source}"
                    )))
                }
            }
        };
        let (delay, verified) = scripted;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(verified)
    }

    fn admission(&self, _source: &Url, _target: &Url) -> Disposition {
        self.admission
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Records `(source, target, event)` for every call. `failing()` makes every
/// call return an error after recording it.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<(String, String, NotifyEvent)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<(String, String, NotifyEvent)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.calls().into_iter().map(|(_, _, e)| e).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, source: &str, target: &str, event: NotifyEvent) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((source.to_string(), target.to_string(), event));
        if self.fail {
            anyhow::bail!("RecordingNotifier: configured to fail");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockFeed
// ---------------------------------------------------------------------------

/// Aggregator feed returning canned jf2 entries, or an upstream error.
pub struct MockFeed {
    entries: Vec<serde_json::Value>,
    error: Option<String>,
}

impl MockFeed {
    pub fn new(entries: Vec<serde_json::Value>) -> Self {
        Self {
            entries,
            error: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            entries: Vec::new(),
            error: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl MentionFeed for MockFeed {
    async fn fetch(&self, _token: &str) -> Result<Vec<serde_json::Value>> {
        match &self.error {
            Some(message) => Err(WebmentionError::Upstream(message.clone())),
            None => Ok(self.entries.clone()),
        }
    }
}

/// A jf2 entry as webmention.io returns it.
pub fn aggregator_entry(
    id: u64,
    source: &str,
    target: &str,
    property: &str,
    text: &str,
) -> serde_json::Value {
    serde_json::json!({
        "type": "entry",
        "wm-id": id,
        "wm-source": source,
        "wm-target": target,
        "wm-property": property,
        "wm-received": "2024-03-01T12:00:00Z",
        "url": source,
        "content": { "text": text },
        "author": { "type": "card", "name": "Ada", "photo": "", "url": "https://a.example/" }
    })
}
