//! Credential storage.
//!
//! Provider secrets live in the OS keychain. Keychain calls are blocking and
//! run via `tokio::task::spawn_blocking`.

mod keychain;

pub use keychain::{KeychainAccess, KeychainError};
