//! Core library for kidgroups.
//!
//! Talks to the hosted gateway (table queries, remote procedures, password
//! auth) and holds the UI-independent state of the group transfer console:
//!
//! - `api`: `GatewayClient`, the `Gateway` trait and the `Query` builder
//! - `auth`: persisted sessions, keychain credentials and the auth guard
//! - `models`: `Group`, `GroupDraft`, `RosterEntry`
//! - `roster`: directory cache, roster cache, transfer operation and the
//!   group management modal
//! - `config`: on-disk configuration with environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod roster;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
