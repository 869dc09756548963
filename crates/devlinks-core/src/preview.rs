//! Public profile preview
//!
//! Read-only view of a user's profile, avatar and links as shown on the
//! public page. Fetch failures degrade to an empty state; nothing here
//! writes to the backend.

use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::backend::{cache_busted, AvatarStorage, LinkStore, ProfileStore};
use crate::models::{Link, Profile};

pub const NAME_PLACEHOLDER: &str = "Full name not set";
pub const EMAIL_PLACEHOLDER: &str = "Email not set";

/// What to show in the avatar slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "url", rename_all = "lowercase")]
pub enum AvatarDisplay {
    Image(String),
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicProfile {
    pub user_id: Uuid,
    pub profile: Option<Profile>,
    pub avatar: AvatarDisplay,
    /// Oldest first
    pub links: Vec<Link>,
}

impl PublicProfile {
    fn full_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .map(|p| p.full_name.trim())
            .filter(|n| !n.is_empty())
    }

    fn email(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .map(|p| p.email.trim())
            .filter(|e| !e.is_empty())
    }

    /// Placeholder text when no name is stored
    pub fn placeholder_name(&self) -> Option<&'static str> {
        self.full_name().is_none().then_some(NAME_PLACEHOLDER)
    }

    pub fn placeholder_email(&self) -> Option<&'static str> {
        self.email().is_none().then_some(EMAIL_PLACEHOLDER)
    }

    /// The name, or its placeholder
    pub fn display_name(&self) -> &str {
        self.full_name().unwrap_or(NAME_PLACEHOLDER)
    }

    pub fn display_email(&self) -> &str {
        self.email().unwrap_or(EMAIL_PLACEHOLDER)
    }
}

/// Fetch everything the public page of `user_id` shows
pub async fn load_public_profile<B>(backend: &B, user_id: Uuid) -> PublicProfile
where
    B: ProfileStore + LinkStore + AvatarStorage + ?Sized,
{
    let (profile, links) = tokio::join!(
        backend.fetch_profile(user_id),
        backend.list_links(user_id)
    );

    let profile = profile.unwrap_or_else(|e| {
        error!("Failed to fetch profile of {}: {}", user_id, e);
        None
    });
    let links = links.unwrap_or_else(|e| {
        error!("Failed to fetch links of {}: {}", user_id, e);
        Vec::new()
    });

    let url = cache_busted(&backend.avatar_public_url(user_id), chrono::Utc::now());
    let avatar = if backend.probe(&url).await {
        AvatarDisplay::Image(url)
    } else {
        debug!("No loadable avatar for {}", user_id);
        AvatarDisplay::Placeholder
    };

    PublicProfile {
        user_id,
        profile,
        avatar,
        links,
    }
}
