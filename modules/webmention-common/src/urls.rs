use url::Url;

use crate::error::{Result, WebmentionError};

/// Parse a submitted URL field. Must be an absolute http(s) URL with a host.
pub fn parse_mention_url(field: &str, value: &str) -> Result<Url> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WebmentionError::validation(format!("Missing \"{field}\"")));
    }
    let url = Url::parse(value)
        .map_err(|_| WebmentionError::validation(format!("\"{field}\" is not a valid URL")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(WebmentionError::validation(format!(
            "\"{field}\" must use http or https"
        )));
    }
    if url.host_str().is_none() {
        return Err(WebmentionError::validation(format!(
            "\"{field}\" must include a host"
        )));
    }
    Ok(url)
}

/// The set of hosts this receiver accepts mentions for.
#[derive(Debug, Clone, Default)]
pub struct SupportedHosts {
    hosts: Vec<String>,
}

impl SupportedHosts {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { hosts }
    }

    /// Parse a comma-separated list, e.g. `example.com,www.example.com`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn contains(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.hosts.iter().any(|h| *h == host)
    }

    /// Reject targets outside the monitored site(s).
    pub fn check(&self, target: &Url) -> Result<()> {
        if self.contains(target) {
            Ok(())
        } else {
            Err(WebmentionError::NotSupported(target.to_string()))
        }
    }
}
