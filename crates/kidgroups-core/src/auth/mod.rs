//! Authentication module for gateway sessions.
//!
//! This module provides:
//! - `Session`: persisted access/refresh tokens with expiry tracking
//! - `CredentialStore`: OS keychain storage for the login password
//! - `require_session`: the guard every protected surface runs first
//! - `refresh`: renew the access token from the stored refresh token

pub mod credentials;
pub mod guard;
pub mod session;

pub use credentials::CredentialStore;
pub use guard::{refresh, require_session, sign_in, sign_out, AuthStatus};
pub use session::{Session, SessionData};
