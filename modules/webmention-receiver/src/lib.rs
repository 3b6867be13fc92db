pub mod dedup;
pub mod notify;
pub mod processor;
pub mod queue;
pub mod receiver;
pub mod verifier;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use dedup::is_equivalent;
pub use notify::{NoopNotifier, Notifier, NotifyEvent, WebhookNotifier};
pub use processor::{CycleSummary, ItemOutcome, MentionProcessor};
pub use queue::{Disposition, PendingQueue};
pub use receiver::{ImportSummary, MentionFeed, ReceiverDeps, WebmentionReceiver};
pub use verifier::{classify_page, HttpVerifier, VerifiedMention, Verifier};
