//! Backend boundaries
//!
//! The hosted backend provides authentication, two tables (`profiles`,
//! `links`) and an object store for avatars. Each concern is a trait so the
//! editors can be driven by the HTTP client in production and by an
//! in-memory double in tests.
//!
//! ## Implementations
//!
//! - `SupabaseClient`: REST/HTTP client for a Supabase project

mod error;
#[cfg(test)]
pub(crate) mod memory;
pub mod supabase;

pub use error::{BackendError, BackendResult};
pub use supabase::SupabaseClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AuthUser, Link, LinkId, LinkUpdate, NewLink, Profile};
use crate::session::Session;

/// Result of a sign-up request
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The project requires email confirmation before the first sign-in
    ConfirmationSent { email: String },
    /// The project auto-confirms and returned a live session
    SignedIn(Session),
}

/// Credential/session provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session>;

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome>;

    /// End the current session; local state is cleared even if the remote call fails
    async fn sign_out(&self) -> BackendResult<()>;

    /// Email a password-recovery link
    async fn send_recovery(&self, email: &str, redirect_to: Option<&str>) -> BackendResult<()>;

    /// Set a new password using the token from a recovery link
    async fn update_password(&self, token: &str, password: &str) -> BackendResult<()>;

    /// The signed-in user, or `None` when there is no valid session
    async fn current_user(&self) -> BackendResult<Option<AuthUser>>;
}

/// The `links` table
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// All links of a user, oldest first
    async fn list_links(&self, user_id: Uuid) -> BackendResult<Vec<Link>>;

    /// Insert-or-update by primary key
    async fn upsert_links(&self, rows: &[LinkUpdate]) -> BackendResult<()>;

    /// Insert new rows; the created rows are returned in input order
    async fn insert_links(&self, rows: &[NewLink]) -> BackendResult<Vec<Link>>;

    async fn delete_link(&self, id: LinkId) -> BackendResult<()>;
}

/// The `profiles` table
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The profile row of a user; a missing row is `None`, not an error
    async fn fetch_profile(&self, user_id: Uuid) -> BackendResult<Option<Profile>>;

    async fn upsert_profile(&self, profile: &Profile) -> BackendResult<()>;
}

/// Object storage for avatar images
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Upload, overwriting any existing avatar
    async fn upload_avatar(
        &self,
        user_id: Uuid,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> BackendResult<()>;

    /// Public address of the avatar (the object may not exist)
    fn avatar_public_url(&self, user_id: Uuid) -> String;

    /// Whether an image can actually be loaded from `url`
    async fn probe(&self, url: &str) -> bool;
}

/// Object key of a user's avatar
pub fn avatar_path(user_id: Uuid) -> String {
    format!("public/{}/avatar.png", user_id)
}

/// Append a timestamp query so caches fetch the latest image
pub fn cache_busted(url: &str, at: DateTime<Utc>) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, sep, at.timestamp_millis())
}
