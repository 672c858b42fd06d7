//! The `tasknest` library crate.
//!
//! Accounts, revocable session tokens, avatar handling, task ownership, and
//! the HTTP routes that expose them. The binary in `main.rs` reads the
//! configuration and wires these modules into a running server.

pub mod accounts;
pub mod auth;
pub mod avatar;
pub mod config;
pub mod error;
pub mod mailer;
pub mod models;
pub mod routes;
