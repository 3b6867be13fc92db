//! Storage contract for webmentions.
//!
//! Mentions are partitioned by target page. Each page holds one slot per
//! `(source, type)`; writing the same slot again replaces it. Pending
//! submissions live in a separate FIFO list that the processor drains.

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::MemoryStore;
pub use postgres::PgMentionStore;
pub use traits::{page_key, BulkStoreReport, MentionStore};
