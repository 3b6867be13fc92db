use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use webmention_common::{parse_mention_url, PendingMention, Result, SupportedHosts, WebmentionError};
use webmention_store::MentionStore;

use crate::verifier::Verifier;

/// Provisional status returned at submission time, before verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Disposition {
    Ok,
    Created,
    Accepted,
}

impl Disposition {
    pub fn code(&self) -> u16 {
        match self {
            Disposition::Ok => 200,
            Disposition::Created => 201,
            Disposition::Accepted => 202,
        }
    }
}

/// Admission for new submissions. Validates, appends a pending mention and
/// returns immediately; verification happens in a later processing cycle.
///
/// Holds no mutable state of its own: the store serializes concurrent appends.
#[derive(Clone)]
pub struct PendingQueue {
    store: Arc<dyn MentionStore>,
    verifier: Arc<dyn Verifier>,
    supported_hosts: SupportedHosts,
}

impl PendingQueue {
    pub fn new(
        store: Arc<dyn MentionStore>,
        verifier: Arc<dyn Verifier>,
        supported_hosts: SupportedHosts,
    ) -> Self {
        Self {
            store,
            verifier,
            supported_hosts,
        }
    }

    pub async fn enqueue(&self, source: Option<&str>, target: Option<&str>) -> Result<Disposition> {
        let source = parse_mention_url("source", source.unwrap_or_default())?;
        let target = parse_mention_url("target", target.unwrap_or_default())?;
        if source == target {
            return Err(WebmentionError::validation(
                "\"source\" and \"target\" must be different",
            ));
        }
        self.supported_hosts.check(&target)?;

        let disposition = self.verifier.admission(&source, &target);
        let pending = PendingMention::new(source.as_str(), target.as_str());
        self.store.add_pending_mention(pending).await?;

        info!(
            source = %source,
            page = %target,
            code = disposition.code(),
            "Webmention queued"
        );
        Ok(disposition)
    }
}
