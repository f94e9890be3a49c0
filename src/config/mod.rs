//! Configuration, settings and secrets.
//!
//! Settings are stored in the user's config directory as JSON. Secrets come
//! from a [`SecretSource`], normally the OS keychain.

mod error;
mod secrets;
mod settings;

pub use error::ConfigError;
pub use secrets::{
    names, parse_endpoint, EwsCredentials, GmailCredentials, GraphCredentials, SecretSource,
    StaticSecrets,
};
pub use settings::{RateLimitSettings, RetrievalSettings, Settings};
