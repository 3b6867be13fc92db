pub mod auth;
pub mod config;
pub mod error;
pub mod translate;
pub mod types;
pub mod urls;

pub use auth::authorize;
pub use config::AppConfig;
pub use error::{AuthError, Result, WebmentionError};
pub use translate::translate;
pub use types::*;
pub use urls::{parse_mention_url, SupportedHosts};
