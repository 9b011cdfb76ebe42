//! Session guard shared by every protected surface.

use tracing::{debug, info, warn};

use crate::api::{GatewayClient, GatewayError};

use super::{Session, SessionData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// Session verified by the gateway
    Authenticated { email: Option<String> },
    /// No usable session; route the user to login
    NeedsLogin,
}

/// Require an authenticated session, refreshing it when close to expiry.
///
/// On success the client carries the session's bearer token. Rejected or
/// unrefreshable sessions are cleared and reported as `NeedsLogin`; network
/// trouble is returned as an error so the caller can tell the two apart.
pub async fn require_session(
    session: &mut Session,
    client: &mut GatewayClient,
) -> Result<AuthStatus, GatewayError> {
    let Some(data) = session.data.clone() else {
        debug!("No session on disk");
        client.clear_token();
        return Ok(AuthStatus::NeedsLogin);
    };

    if data.needs_refresh() {
        debug!(minutes_left = data.minutes_until_expiry(), "Refreshing session");
        match refresh(session, client).await {
            Ok(()) => {}
            Err(GatewayError::NetworkError(e)) => return Err(GatewayError::NetworkError(e)),
            Err(e) => {
                info!(error = %e, "Session refresh refused");
                return discard(session, client);
            }
        }
    }

    if let Some(token) = session.token() {
        client.set_token(token);
    }

    match client.get_user().await {
        Ok(user) => Ok(AuthStatus::Authenticated { email: user.email }),
        Err(GatewayError::Unauthorized) | Err(GatewayError::AccessDenied(_)) => {
            info!("Gateway rejected stored session");
            discard(session, client)
        }
        Err(e) => Err(e),
    }
}

/// Trade the stored refresh token for a new access token, persist it and
/// arm the client. Without a stored session this is `Unauthorized`.
pub async fn refresh(session: &mut Session, client: &mut GatewayClient) -> Result<(), GatewayError> {
    let Some(refresh_token) = session.data.as_ref().map(|d| d.refresh_token.clone()) else {
        return Err(GatewayError::Unauthorized);
    };
    let auth = client.refresh_session(&refresh_token).await?;
    let data = SessionData::from_auth(&auth);
    client.set_token(&data.access_token);
    session.update(data);
    if let Err(e) = session.save() {
        warn!(error = %e, "Failed to save refreshed session");
    }
    debug!("Session refreshed");
    Ok(())
}

fn discard(session: &mut Session, client: &mut GatewayClient) -> Result<AuthStatus, GatewayError> {
    if let Err(e) = session.clear() {
        warn!(error = %e, "Failed to clear session file");
    }
    client.clear_token();
    Ok(AuthStatus::NeedsLogin)
}

/// Sign in with email and password, persist the session and arm the client
pub async fn sign_in(
    session: &mut Session,
    client: &mut GatewayClient,
    email: &str,
    password: &str,
) -> Result<SessionData, GatewayError> {
    let auth = client.sign_in_with_password(email, password).await?;
    let data = SessionData::from_auth(&auth);

    session.update(data.clone());
    if let Err(e) = session.save() {
        warn!(error = %e, "Failed to save session");
    }
    client.set_token(&data.access_token);
    info!(user_id = %data.user_id, "Signed in");
    Ok(data)
}

/// Revoke the session on the gateway (best effort) and forget it locally
pub async fn sign_out(session: &mut Session, client: &mut GatewayClient) {
    if let Err(e) = client.sign_out().await {
        warn!(error = %e, "Gateway sign-out failed");
    }
    if let Err(e) = session.clear() {
        warn!(error = %e, "Failed to clear session file");
    }
    client.clear_token();
}
