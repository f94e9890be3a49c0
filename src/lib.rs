//! mailnorm - Provider-agnostic mail retrieval
//!
//! This crate reads mail from Gmail REST, Microsoft Graph and Exchange Web
//! Services and normalizes every message into one [`domain::Email`] model.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;
