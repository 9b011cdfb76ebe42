//! HTTP client for the hosted gateway.
//!
//! One `GatewayClient` is built per process; clones share the connection
//! pool and differ only in the bearer token they carry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::models::child::ROSTER_COLUMNS;
use crate::models::group::GROUP_COLUMNS;
use crate::models::{Group, GroupDraft, RosterEntry};

use super::{Gateway, GatewayError, Order, Query};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Accept header that makes the table API return one object instead of an array
const SINGLE_OBJECT_ACCEPT: &str = "application/vnd.pgrst.object+json";

const GROUPS_TABLE: &str = "groups";
const ROSTER_VIEW: &str = "children_current_groups";

/// Successful token grant from the auth API
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Arc<str>,
    anon_key: Arc<str>,
    token: Option<Arc<str>>,
}

impl GatewayClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            anon_key: Arc::from(anon_key),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(Arc::from(token));
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Attach the project key and the bearer token. Without a session the
    /// project key doubles as the bearer, which is what the gateway expects.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.token.as_deref().unwrap_or(&*self.anon_key);
        request.header("apikey", &*self.anon_key).bearer_auth(bearer)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, GatewayError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, what = what, "Failed to parse gateway response");
            GatewayError::InvalidResponse(format!("{}: {}", what, e))
        })
    }

    // ===== Auth =====

    /// Exchange email and password for a session
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, GatewayError> {
        let url = self.auth_url("token");
        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", &*self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, "auth token").await
    }

    /// Trade a refresh token for a fresh session
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthResponse, GatewayError> {
        let url = self.auth_url("token");
        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &*self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, "refreshed token").await
    }

    /// The user behind the current bearer token
    pub async fn get_user(&self) -> Result<AuthUser, GatewayError> {
        if self.token.is_none() {
            return Err(GatewayError::Unauthorized);
        }
        let response = self
            .authorize(self.client.get(self.auth_url("user")))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, "user").await
    }

    /// Revoke the current session on the gateway
    pub async fn sign_out(&self) -> Result<(), GatewayError> {
        if self.token.is_none() {
            return Ok(());
        }
        let response = self
            .authorize(self.client.post(self.auth_url("logout")))
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Table queries =====

    /// Run a query returning every matching row
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, GatewayError> {
        self.fetch(query).await
    }

    /// Run a query that must match exactly one row
    pub async fn select_single<T: DeserializeOwned>(&self, query: &Query) -> Result<T, GatewayError> {
        self.fetch(&query.clone().single()).await
    }

    async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<T, GatewayError> {
        debug!(
            table = query.table_name(),
            params = ?query.params(),
            single = query.is_single(),
            "select"
        );
        let mut request = self.authorize(self.client.get(self.rest_url(query.table_name())));
        if query.is_single() {
            request = request.header(header::ACCEPT, SINGLE_OBJECT_ACCEPT);
        }
        let response = request.query(&query.params()).send().await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, query.table_name()).await
    }

    // ===== Remote procedures =====

    /// Call a named remote procedure. Void procedures yield `Value::Null`.
    pub async fn rpc<B: Serialize + ?Sized>(
        &self,
        name: &str,
        args: &B,
    ) -> Result<serde_json::Value, GatewayError> {
        debug!(procedure = name, "rpc");
        let response = self
            .authorize(self.client.post(self.rest_url(&format!("rpc/{}", name))))
            .json(args)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| GatewayError::InvalidResponse(format!("rpc {}: {}", name, e)))
    }

    // ===== Lookups used by the CLI utilities =====

    /// Fetch one group by id
    pub async fn fetch_group(&self, group_id: &str) -> Result<Group, GatewayError> {
        let query = Query::table(GROUPS_TABLE)
            .select(GROUP_COLUMNS)
            .eq("id", group_id)
            .single();
        self.select_single(&query).await
    }

    /// Children whose last name contains `needle`, case-insensitively
    pub async fn find_children(
        &self,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<RosterEntry>, GatewayError> {
        let query = Query::table(ROSTER_VIEW)
            .select(ROSTER_COLUMNS)
            .ilike("last_name", needle)
            .order("last_name", Order::Asc)
            .order("first_name", Order::Asc)
            .limit(limit);
        self.select(&query).await
    }
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn fetch_groups(&self) -> Result<Vec<Group>, GatewayError> {
        let query = Query::table(GROUPS_TABLE)
            .select(GROUP_COLUMNS)
            .order("year_start", Order::Asc)
            .order("name", Order::Asc);
        self.select(&query).await
    }

    async fn fetch_roster(&self) -> Result<Vec<RosterEntry>, GatewayError> {
        let query = Query::table(ROSTER_VIEW).select(ROSTER_COLUMNS);
        self.select(&query).await
    }

    async fn transfer_child(&self, child_id: &str, group_id: &str) -> Result<(), GatewayError> {
        self.rpc(
            "transfer_child_to_group",
            &json!({ "p_child_id": child_id, "p_group_id": group_id }),
        )
        .await?;
        Ok(())
    }

    async fn create_group(&self, draft: &GroupDraft) -> Result<(), GatewayError> {
        self.rpc("groups_create", draft).await?;
        Ok(())
    }

    async fn update_group(&self, group_id: &str, draft: &GroupDraft) -> Result<(), GatewayError> {
        let mut args = serde_json::to_value(draft)
            .map_err(|e| GatewayError::InvalidResponse(format!("group arguments: {}", e)))?;
        if let serde_json::Value::Object(ref mut map) = args {
            map.insert("p_group_id".to_string(), json!(group_id));
        }
        self.rpc("groups_update", &args).await?;
        Ok(())
    }

    async fn delete_group_if_empty(&self, group_id: &str) -> Result<(), GatewayError> {
        self.rpc("groups_delete_if_empty", &json!({ "p_group_id": group_id }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = GatewayClient::new("https://example.supabase.co/", "anon").expect("client");
        assert_eq!(
            client.rest_url("groups"),
            "https://example.supabase.co/rest/v1/groups"
        );
        assert_eq!(
            client.auth_url("token"),
            "https://example.supabase.co/auth/v1/token"
        );
    }

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"access_token":"a","token_type":"bearer","expires_in":3600,"expires_at":1760000000,"refresh_token":"r","user":{"id":"u-1","email":"head@sadok.ua","role":"authenticated"}}"#;
        let auth: AuthResponse = serde_json::from_str(json).expect("auth response");
        assert_eq!(auth.access_token, "a");
        assert_eq!(auth.expires_at, Some(1_760_000_000));
        assert_eq!(auth.user.email.as_deref(), Some("head@sadok.ua"));
    }
}
