//! Data models for devlinks
//!
//! Defines the persisted rows (`Link`, `Profile`), the editable form of a
//! link (`LinkEntry`), the payloads sent on save, and the closed set of
//! supported platforms.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-assigned identifier of a `links` row
pub type LinkId = i64;

/// A social platform a link can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    GitHub,
    Facebook,
    Instagram,
    YouTube,
    LinkedIn,
}

impl Platform {
    /// Every platform, in the order they are offered to the user
    pub const ALL: [Platform; 5] = [
        Platform::GitHub,
        Platform::Facebook,
        Platform::Instagram,
        Platform::YouTube,
        Platform::LinkedIn,
    ];

    /// Display name, also the value stored in the `type` and `icon` columns
    pub fn name(self) -> &'static str {
        match self {
            Platform::GitHub => "GitHub",
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
            Platform::YouTube => "YouTube",
            Platform::LinkedIn => "LinkedIn",
        }
    }

    /// Brand color used as the link's background
    pub fn color(self) -> &'static str {
        match self {
            Platform::GitHub => "#333",
            Platform::Facebook => "#4267B2",
            Platform::Instagram => "#C13584",
            Platform::YouTube => "#FF0000",
            Platform::LinkedIn => "#0077B5",
        }
    }

    /// Icon key for renderers
    pub fn icon(self) -> &'static str {
        self.name()
    }

    /// The platform after this one, wrapping around
    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no known platform
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown platform: '{0}'. Expected one of GitHub, Facebook, Instagram, YouTube, LinkedIn")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

/// A persisted link row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub link_type: Platform,
    pub url: String,
    /// Background color; rows written by this crate always derive it from the type
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Color to render with, falling back to the platform color
    pub fn display_color(&self) -> &str {
        self.color
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.link_type.color())
    }
}

/// One entry of the local edit buffer
///
/// `id` is `None` until the entry has been saved once; `link_type` is
/// `None` while the user has not picked a platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub id: Option<LinkId>,
    pub link_type: Option<Platform>,
    pub url: String,
}

impl LinkEntry {
    /// A blank, unsaved entry
    pub fn blank() -> Self {
        Self::default()
    }

    /// An unsaved entry with the given platform and URL
    pub fn new(link_type: Platform, url: impl Into<String>) -> Self {
        Self {
            id: None,
            link_type: Some(link_type),
            url: url.into(),
        }
    }

    /// Whether this entry exists in the remote store
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl From<&Link> for LinkEntry {
    fn from(link: &Link) -> Self {
        Self {
            id: Some(link.id),
            link_type: Some(link.link_type),
            url: link.url.clone(),
        }
    }
}

/// Update-path payload for an entry that already has an id
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinkUpdate {
    pub id: LinkId,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub link_type: Platform,
    pub url: String,
    pub color: String,
    pub icon: String,
}

impl LinkUpdate {
    pub fn new(id: LinkId, user_id: Uuid, link_type: Platform, url: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            link_type,
            url: url.into(),
            color: link_type.color().to_string(),
            icon: link_type.icon().to_string(),
        }
    }
}

/// Insert-path payload for an entry without an id
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewLink {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub link_type: Platform,
    pub url: String,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

impl NewLink {
    pub fn new(
        user_id: Uuid,
        link_type: Platform,
        url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            link_type,
            url: url.into(),
            color: link_type.color().to_string(),
            icon: link_type.icon().to_string(),
            created_at,
        }
    }
}

/// A `profiles` row; `id` is the auth user id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

/// The authenticated identity as reported by the auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}
