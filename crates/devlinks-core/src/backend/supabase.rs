//! Supabase client implementation
//!
//! HTTP client for the three Supabase services devlinks uses:
//! - PostgREST (`/rest/v1`) for the `profiles` and `links` tables
//! - GoTrue (`/auth/v1`) for sign-in, sign-up and password recovery
//! - Storage (`/storage/v1`) for avatar images
//!
//! Every request carries the project's anon key as `apikey`. Table and
//! storage requests are authorised with the session's access token when
//! signed in; an expired token is refreshed before the request is sent.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    avatar_path, AuthProvider, AvatarStorage, BackendError, BackendResult, LinkStore,
    ProfileStore, SignUpOutcome,
};
use crate::config::Config;
use crate::models::{AuthUser, Link, LinkId, LinkUpdate, NewLink, Profile};
use crate::session::{Session, SessionStore};

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 15;

/// Fallback token lifetime when the auth service omits it
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";
const PREFER_REPRESENTATION: &str = "return=representation";

/// Token grant as returned by `/auth/v1/token` and auto-confirmed sign-ups
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self.expires_at.unwrap_or_else(|| {
            Utc::now().timestamp() + self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Client for a Supabase project
///
/// Owned by the application root and shared (behind an `Arc`) with every
/// editor that needs the backend.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    avatar_bucket: String,
    session: Mutex<Option<Session>>,
    session_store: Option<SessionStore>,
}

impl SupabaseClient {
    /// Create a client for the project at `base_url`
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .user_agent(concat!("devlinks/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            avatar_bucket: "avatar".to_string(),
            session: Mutex::new(None),
            session_store: None,
        })
    }

    /// Create a client from configuration, restoring any stored session
    pub fn from_config(config: &Config) -> BackendResult<Self> {
        let url = config
            .supabase_url
            .as_deref()
            .ok_or_else(|| BackendError::NotConfigured("supabase_url is not set".to_string()))?;
        let key = config.supabase_anon_key.as_deref().ok_or_else(|| {
            BackendError::NotConfigured("supabase_anon_key is not set".to_string())
        })?;

        let store = SessionStore::new(config.session_path());
        let session = match store.load() {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring unreadable session file: {:#}", e);
                None
            }
        };

        let mut client = Self::new(url, key)?
            .with_avatar_bucket(config.avatar_bucket.clone())
            .with_session_store(store);
        client.session = Mutex::new(session);
        Ok(client)
    }

    /// Persist session changes through `store`
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_avatar_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.avatar_bucket = bucket.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The current session, if signed in
    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Id of the signed-in user
    pub async fn user_id(&self) -> BackendResult<Uuid> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.user.id)
            .ok_or(BackendError::NotAuthenticated)
    }

    async fn set_session(&self, session: Option<Session>) {
        if let Some(store) = &self.session_store {
            let result = match &session {
                Some(s) => store.save(s),
                None => store.clear(),
            };
            if let Err(e) = result {
                warn!("Failed to persist session: {:#}", e);
            }
        }
        *self.session.lock().await = session;
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.avatar_bucket, path
        )
    }

    /// Request to the auth service (anon key only)
    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.auth_url(path))
            .header("apikey", &self.anon_key)
    }

    /// Request authorised as the signed-in user (or anonymously)
    async fn authed_request(&self, method: Method, url: String) -> BackendResult<RequestBuilder> {
        let token = self.bearer().await?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token))
    }

    /// Token for the Authorization header, refreshing an expired session first
    async fn bearer(&self) -> BackendResult<String> {
        let current = self.session.lock().await.clone();
        match current {
            None => Ok(self.anon_key.clone()),
            Some(session) if !session.is_expired(Utc::now()) => Ok(session.access_token),
            Some(session) => {
                let refreshed = self.refresh(&session.refresh_token).await?;
                let token = refreshed.access_token.clone();
                self.set_session(Some(refreshed)).await;
                Ok(token)
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<Session> {
        debug!("Refreshing expired session");
        let req = self
            .auth_request(Method::POST, "token?grant_type=refresh_token")
            .json(&serde_json::json!({ "refresh_token": refresh_token }));

        match send_json::<TokenResponse>(req, "auth/v1/token").await {
            Ok(grant) => Ok(grant.into_session()),
            Err(e) if matches!(e.status(), Some(400) | Some(401) | Some(403)) => {
                warn!("Session refresh rejected: {}", e);
                self.set_session(None).await;
                Err(BackendError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }
}

/// Send a request and turn non-success statuses into errors
async fn send(req: RequestBuilder, endpoint: &str) -> BackendResult<Response> {
    let response = req.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::from_response(endpoint, status.as_u16(), &body))
}

/// Send a request and decode the JSON body
async fn send_json<T: DeserializeOwned>(req: RequestBuilder, endpoint: &str) -> BackendResult<T> {
    let response = send(req, endpoint).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| BackendError::Decode {
        endpoint: endpoint.to_string(),
        details: e.to_string(),
    })
}

/// Decode link rows one at a time, skipping rows this client cannot represent
///
/// Other clients may have stored a `type` outside the platform set; one such
/// row must not hide the rest.
fn decode_links(rows: Vec<serde_json::Value>) -> Vec<Link> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned();
            match serde_json::from_value::<Link>(row) {
                Ok(link) => Some(link),
                Err(e) => {
                    warn!("Skipping unreadable link row {:?}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        debug!("Signing in {}", email);
        let req = self
            .auth_request(Method::POST, "token?grant_type=password")
            .json(&serde_json::json!({ "email": email, "password": password }));
        let grant: TokenResponse = send_json(req, "auth/v1/token").await?;
        let session = grant.into_session();
        self.set_session(Some(session.clone())).await;
        info!("Signed in as {}", session.user.id);
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome> {
        let req = self
            .auth_request(Method::POST, "signup")
            .json(&serde_json::json!({ "email": email, "password": password }));
        let body: serde_json::Value = send_json(req, "auth/v1/signup").await?;

        // Projects without email confirmation answer with a full token grant
        if body.get("access_token").is_some() {
            let grant: TokenResponse =
                serde_json::from_value(body).map_err(|e| BackendError::Decode {
                    endpoint: "auth/v1/signup".to_string(),
                    details: e.to_string(),
                })?;
            let session = grant.into_session();
            self.set_session(Some(session.clone())).await;
            return Ok(SignUpOutcome::SignedIn(session));
        }

        Ok(SignUpOutcome::ConfirmationSent {
            email: email.to_string(),
        })
    }

    async fn sign_out(&self) -> BackendResult<()> {
        if let Some(session) = self.session().await {
            let req = self
                .auth_request(Method::POST, "logout")
                .bearer_auth(&session.access_token);
            if let Err(e) = send(req, "auth/v1/logout").await {
                warn!("Remote sign-out failed: {}", e);
            }
        }
        self.set_session(None).await;
        Ok(())
    }

    async fn send_recovery(&self, email: &str, redirect_to: Option<&str>) -> BackendResult<()> {
        let mut req = self
            .auth_request(Method::POST, "recover")
            .json(&serde_json::json!({ "email": email }));
        if let Some(redirect) = redirect_to {
            req = req.query(&[("redirect_to", redirect)]);
        }
        send(req, "auth/v1/recover").await?;
        Ok(())
    }

    async fn update_password(&self, token: &str, password: &str) -> BackendResult<()> {
        let req = self
            .auth_request(Method::PUT, "user")
            .bearer_auth(token)
            .json(&serde_json::json!({ "password": password }));
        send(req, "auth/v1/user").await?;
        Ok(())
    }

    async fn current_user(&self) -> BackendResult<Option<AuthUser>> {
        if self.session().await.is_none() {
            return Ok(None);
        }
        let token = match self.bearer().await {
            Ok(token) => token,
            Err(BackendError::NotAuthenticated) => return Ok(None),
            Err(e) => return Err(e),
        };

        let req = self.auth_request(Method::GET, "user").bearer_auth(token);
        match send_json::<AuthUser>(req, "auth/v1/user").await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_auth_error() => {
                warn!("Stored session rejected: {}", e);
                self.set_session(None).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl LinkStore for SupabaseClient {
    async fn list_links(&self, user_id: Uuid) -> BackendResult<Vec<Link>> {
        let req = self
            .authed_request(Method::GET, self.rest_url("links"))
            .await?
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.asc".to_string()),
            ]);
        let rows: Vec<serde_json::Value> = send_json(req, "rest/v1/links").await?;
        let links = decode_links(rows);
        debug!("Fetched {} link(s) for {}", links.len(), user_id);
        Ok(links)
    }

    async fn upsert_links(&self, rows: &[LinkUpdate]) -> BackendResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let req = self
            .authed_request(Method::POST, self.rest_url("links"))
            .await?
            .query(&[("on_conflict", "id")])
            .header("Prefer", PREFER_UPSERT)
            .json(rows);
        send(req, "rest/v1/links").await?;
        Ok(())
    }

    async fn insert_links(&self, rows: &[NewLink]) -> BackendResult<Vec<Link>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let req = self
            .authed_request(Method::POST, self.rest_url("links"))
            .await?
            .header("Prefer", PREFER_REPRESENTATION)
            .json(rows);
        send_json(req, "rest/v1/links").await
    }

    async fn delete_link(&self, id: LinkId) -> BackendResult<()> {
        let req = self
            .authed_request(Method::DELETE, self.rest_url("links"))
            .await?
            .query(&[("id", format!("eq.{}", id))]);
        send(req, "rest/v1/links").await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SupabaseClient {
    async fn fetch_profile(&self, user_id: Uuid) -> BackendResult<Option<Profile>> {
        let req = self
            .authed_request(Method::GET, self.rest_url("profiles"))
            .await?
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", user_id)),
            ]);
        let rows: Vec<Profile> = send_json(req, "rest/v1/profiles").await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_profile(&self, profile: &Profile) -> BackendResult<()> {
        let req = self
            .authed_request(Method::POST, self.rest_url("profiles"))
            .await?
            .query(&[("on_conflict", "id")])
            .header("Prefer", PREFER_UPSERT)
            .json(profile);
        send(req, "rest/v1/profiles").await?;
        Ok(())
    }
}

#[async_trait]
impl AvatarStorage for SupabaseClient {
    async fn upload_avatar(
        &self,
        user_id: Uuid,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> BackendResult<()> {
        let path = avatar_path(user_id);
        debug!("Uploading {} bytes to {}", bytes.len(), path);
        let req = self
            .authed_request(Method::POST, self.object_url(&path))
            .await?
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .header("Cache-Control", "max-age=3600")
            .body(bytes);
        send(req, "storage/v1/object").await?;
        Ok(())
    }

    fn avatar_public_url(&self, user_id: Uuid) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.avatar_bucket,
            avatar_path(user_id)
        )
    }

    async fn probe(&self, url: &str) -> bool {
        match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map_or(true, |ct| ct.starts_with("image/")),
            Ok(response) => {
                debug!("Avatar probe {} returned {}", url, response.status());
                false
            }
            Err(e) => {
                debug!("Avatar probe {} failed: {}", url, e);
                false
            }
        }
    }
}
