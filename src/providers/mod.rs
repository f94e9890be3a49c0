//! Remote mail provider implementations.
//!
//! - [`email`] - Mail backend adapters (Gmail REST, Microsoft Graph, EWS)

pub mod email;
