use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::AuthResponse;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Refresh this long before the access token expires
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn from_auth(auth: &AuthResponse) -> Self {
        let now = Utc::now();
        let expires_at = auth
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| now + Duration::seconds(auth.expires_in));

        Self {
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
            user_id: auth.user.id.clone(),
            email: auth.user.email.clone(),
            expires_at,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Expired sessions are kept: their refresh
    /// token usually outlives the access token.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;
            self.data = Some(data);
            return Ok(true);
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Update session with new data
    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Get the bearer token if a session exists
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.access_token.as_str())
    }

    /// Stored session that should be refreshed before the next gateway call
    pub fn needs_refresh(&self) -> bool {
        self.data.as_ref().is_some_and(SessionData::needs_refresh)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthUser;

    fn sample(expires_in_minutes: i64) -> SessionData {
        SessionData {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            user_id: "u-1".to_string(),
            email: Some("head@sadok.ua".to_string()),
            expires_at: Utc::now() + Duration::minutes(expires_in_minutes),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_expiry_and_refresh_window() {
        let fresh = sample(60);
        assert!(!fresh.is_expired());
        assert!(!fresh.needs_refresh());

        let closing = sample(3);
        assert!(!closing.is_expired());
        assert!(closing.needs_refresh());

        let gone = sample(-1);
        assert!(gone.is_expired());
        assert_eq!(gone.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_from_auth_prefers_absolute_expiry() {
        let auth = AuthResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: 3600,
            expires_at: Some(1_900_000_000),
            user: AuthUser {
                id: "u-1".to_string(),
                email: None,
            },
        };
        let data = SessionData::from_auth(&auth);
        assert_eq!(data.expires_at.timestamp(), 1_900_000_000);

        let relative = AuthResponse {
            expires_at: None,
            ..auth
        };
        let data = SessionData::from_auth(&relative);
        assert!(data.minutes_until_expiry() >= 59);
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut session = Session::new(dir.path().join("nested"));
        assert!(!session.load().expect("load missing"));

        session.update(sample(-10));
        session.save().expect("save");

        let mut reloaded = Session::new(dir.path().join("nested"));
        assert!(reloaded.load().expect("load"));
        assert_eq!(reloaded.token(), Some("access"));
        assert!(reloaded.data.as_ref().is_some_and(|d| d.is_expired()));
        assert!(reloaded.needs_refresh());

        reloaded.clear().expect("clear");
        assert!(reloaded.data.is_none());
        assert!(!reloaded.needs_refresh());
        assert!(!Session::new(dir.path().join("nested")).load().expect("load cleared"));
    }
}
