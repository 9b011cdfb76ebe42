//! Gateway client module.
//!
//! The gateway exposes PostgREST-style table queries under `/rest/v1`,
//! remote procedures under `/rest/v1/rpc` and password authentication under
//! `/auth/v1`. Every request carries the project `apikey`; authenticated
//! requests also carry the session's bearer token.

pub mod client;
pub mod error;
pub mod gateway;
pub mod query;

pub use client::{AuthResponse, AuthUser, GatewayClient};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use query::{Order, Query};
