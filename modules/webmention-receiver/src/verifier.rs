// Verification boundary.
//
// The processor only needs to know whether a source page links to a target
// and what kind of mention it is. HttpVerifier is a lightweight link checker:
// it fetches the page, finds an anchor pointing at the target, and reads
// microformats class hints off that anchor. It is not a microformats parser.

use std::net::IpAddr;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use webmention_common::{Author, MentionContent, MentionType, Result, WebmentionError};

use crate::queue::Disposition;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_BODY_BYTES: usize = 1_000_000;
const MAX_REDIRECTS: usize = 5;
const USER_AGENT: &str = "webmention-receiver (+https://www.w3.org/TR/webmention/)";

/// What verification learned about a source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMention {
    pub mention_type: MentionType,
    pub url: Option<String>,
    pub content: Option<MentionContent>,
    pub author: Option<Author>,
}

impl VerifiedMention {
    pub fn of_type(mention_type: MentionType) -> Self {
        Self {
            mention_type,
            url: None,
            content: None,
            author: None,
        }
    }
}

#[async_trait]
pub trait Verifier: Send + Sync {
    /// Confirm `source` exists and references `target`, and classify it.
    /// Any failure means the pending mention is dropped.
    async fn verify(&self, source: &str, target: &str) -> Result<VerifiedMention>;

    /// Disposition returned to the submitter at enqueue time. Verification
    /// always happens later, so the default is 202 Accepted.
    fn admission(&self, _source: &Url, _target: &Url) -> Disposition {
        Disposition::Accepted
    }
}

// ---------------------------------------------------------------------------
// HttpVerifier (production)
// ---------------------------------------------------------------------------

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\s[^>]*>").expect("valid regex"));
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)class\s*=\s*["']([^"']*)["']"#).expect("valid regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>([^<]+)</title>").expect("valid regex"));

pub struct HttpVerifier {
    client: reqwest::Client,
}

impl HttpVerifier {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::custom(|attempt| {
                if redirect_allowed(attempt.url(), attempt.previous().len()) {
                    attempt.follow()
                } else {
                    attempt.error("redirect refused")
                }
            }))
            .build()
            .map_err(|e| WebmentionError::Verification(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(&self, source: &str, target: &str) -> Result<VerifiedMention> {
        let source_url = Url::parse(source)
            .map_err(|_| WebmentionError::Verification(format!("invalid source {source}")))?;
        let target_url = Url::parse(target)
            .map_err(|_| WebmentionError::Verification(format!("invalid target {target}")))?;
        if is_internal_host(&source_url) {
            return Err(WebmentionError::Verification(format!(
                "refusing to fetch internal host {source}"
            )));
        }

        let mut resp = self
            .client
            .get(source_url.as_str())
            .send()
            .await
            .map_err(|e| WebmentionError::Verification(format!("fetch failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WebmentionError::Verification(format!(
                "source returned {status}"
            )));
        }

        // Read body with size limit; anything past the cap is never buffered
        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| WebmentionError::Verification(format!("unreadable body: {e}")))?
        {
            if append_capped(&mut body, &chunk, MAX_BODY_BYTES) {
                break;
            }
        }
        let html = String::from_utf8_lossy(&body);

        classify_page(&html, &source_url, &target_url).ok_or_else(|| {
            WebmentionError::Verification(format!("{source} does not link to {target}"))
        })
    }
}

/// Find an anchor in `html` pointing at `target` and classify the mention.
/// Returns `None` when the page does not link to the target.
pub fn classify_page(html: &str, source: &Url, target: &Url) -> Option<VerifiedMention> {
    let mut linked = false;
    let mut mention_type = MentionType::Mention;

    for anchor in ANCHOR_RE.find_iter(html) {
        let tag = anchor.as_str();
        let Some(href) = HREF_RE.captures(tag).map(|c| c[1].trim().to_string()) else {
            continue;
        };
        let Ok(resolved) = source.join(&href) else {
            continue;
        };
        if !same_resource(&resolved, target) {
            continue;
        }

        linked = true;
        let classes = CLASS_RE
            .captures(tag)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        if let Some(t) = type_from_classes(&classes) {
            mention_type = t;
            break;
        }
    }

    if !linked {
        return None;
    }

    let content = TITLE_RE
        .captures(html)
        .map(|c| c[1].trim().to_string())
        .and_then(|title| MentionContent::text(title).normalized());

    Some(VerifiedMention {
        mention_type,
        url: None,
        content,
        author: None,
    })
}

fn type_from_classes(classes: &str) -> Option<MentionType> {
    classes.split_whitespace().find_map(|class| match class {
        "u-in-reply-to" => Some(MentionType::Reply),
        "u-like-of" => Some(MentionType::Like),
        "u-repost-of" => Some(MentionType::Repost),
        "u-bookmark-of" => Some(MentionType::Bookmark),
        _ => None,
    })
}

/// Compare ignoring fragment and a trailing slash.
fn same_resource(a: &Url, b: &Url) -> bool {
    fn normalize(u: &Url) -> String {
        let mut u = u.clone();
        u.set_fragment(None);
        u.as_str().trim_end_matches('/').to_string()
    }
    normalize(a) == normalize(b)
}

fn is_internal_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_private_ip(ip);
    }
    let lower = host.to_lowercase();
    lower == "localhost" || lower.ends_with(".local") || lower.ends_with(".internal")
}

/// Loopback, link-local and RFC 1918 / RFC 4193 ranges.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_link_local()
                || v4.is_private()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

/// Each redirect hop must stay on http(s) and off internal hosts.
fn redirect_allowed(next: &Url, hops_so_far: usize) -> bool {
    hops_so_far < MAX_REDIRECTS
        && matches!(next.scheme(), "http" | "https")
        && !is_internal_host(next)
}

/// Append up to `max` bytes total. Returns true once the cap is reached.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], max: usize) -> bool {
    let room = max.saturating_sub(body.len());
    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    body.len() >= max
}
