//! Profile editor
//!
//! Edits the single `profiles` row of a user together with the avatar image
//! kept in object storage. Names are edited as first/last and stored joined
//! as `full_name`.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{cache_busted, AvatarStorage, BackendError, ProfileStore};
use crate::forms::{FieldErrors, ProfileForm, INVALID_AVATAR};
use crate::models::Profile;
use crate::validation::{validate_avatar, ImageFormat};

/// A validated image waiting to be uploaded
#[derive(Clone, PartialEq, Eq)]
pub struct AvatarUpload {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl fmt::Debug for AvatarUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarUpload")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvatarChoice {
    /// No avatar stored
    #[default]
    None,
    /// The stored avatar, by (cache-busted) public URL
    Remote(String),
    /// A new image chosen but not saved yet
    Pending(AvatarUpload),
}

/// Editable state of a profile
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar: AvatarChoice,
}

impl ProfileDraft {
    fn from_profile(profile: Option<Profile>, avatar: AvatarChoice) -> Self {
        let (full_name, email) = profile
            .map(|p| (p.full_name, p.email))
            .unwrap_or_default();
        let (first_name, last_name) = split_full_name(&full_name);
        Self {
            first_name,
            last_name,
            email,
            avatar,
        }
    }

    pub fn form(&self) -> ProfileForm {
        ProfileForm {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Split a stored full name into first name and the rest
pub fn split_full_name(full: &str) -> (String, String) {
    let mut parts = full.trim().splitn(2, ' ');
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.next().unwrap_or_default().trim().to_string();
    (first, rest)
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Invalid profile: {0}")]
    Invalid(FieldErrors),

    #[error("Failed to load profile: {0}")]
    Load(#[source] BackendError),

    #[error("Failed to save profile: {0}")]
    Save(#[source] BackendError),

    #[error("Profile saved, but the avatar upload failed: {0}")]
    Upload(#[source] BackendError),
}

/// Result of a successful profile save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSaveOutcome {
    /// Fresh public URL when an avatar is stored
    pub avatar_url: Option<String>,
}

/// Editor for one user's profile
pub struct ProfileEditor<B: ProfileStore + AvatarStorage + ?Sized> {
    backend: Arc<B>,
    user_id: Uuid,
    draft: ProfileDraft,
    snapshot: ProfileDraft,
    /// Whether `load` found a profile row
    stored: bool,
}

impl<B: ProfileStore + AvatarStorage + ?Sized> ProfileEditor<B> {
    pub fn new(backend: Arc<B>, user_id: Uuid) -> Self {
        Self {
            backend,
            user_id,
            draft: ProfileDraft::default(),
            snapshot: ProfileDraft::default(),
            stored: false,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    /// Fetch the profile row and locate the avatar
    ///
    /// A user without a profile row gets an empty draft.
    pub async fn load(&mut self) -> Result<(), ProfileError> {
        let profile = self
            .backend
            .fetch_profile(self.user_id)
            .await
            .map_err(ProfileError::Load)?;
        self.stored = profile.is_some();
        if !self.stored {
            debug!("No profile row for {}", self.user_id);
        }

        let url = cache_busted(&self.backend.avatar_public_url(self.user_id), Utc::now());
        let avatar = if self.backend.probe(&url).await {
            AvatarChoice::Remote(url)
        } else {
            AvatarChoice::None
        };

        self.draft = ProfileDraft::from_profile(profile, avatar);
        self.snapshot = self.draft.clone();

        let issues = self.stored_issues();
        if !issues.is_empty() {
            warn!(
                "Stored profile of {} fails validation: {}",
                self.user_id, issues
            );
        }
        Ok(())
    }

    /// Fields of the loaded profile row that would not pass validation
    ///
    /// A stored name with more than two words loads with the extra words in
    /// the last name, which then has to be corrected before any save. Empty
    /// when there was no row.
    pub fn stored_issues(&self) -> FieldErrors {
        if !self.stored {
            return FieldErrors::new();
        }
        self.snapshot.form().validate()
    }

    pub fn set_first_name(&mut self, value: impl Into<String>) {
        self.draft.first_name = value.into();
    }

    pub fn set_last_name(&mut self, value: impl Into<String>) {
        self.draft.last_name = value.into();
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.draft.email = value.into();
    }

    /// Stage a new avatar image
    ///
    /// Rejected images leave the draft as it was.
    pub fn choose_avatar(&mut self, bytes: Vec<u8>) -> Result<ImageFormat, FieldErrors> {
        match validate_avatar(&bytes) {
            Ok(format) => {
                self.draft.avatar = AvatarChoice::Pending(AvatarUpload { bytes, format });
                Ok(format)
            }
            Err(e) => {
                warn!("Rejected avatar: {}", e);
                let mut errors = FieldErrors::new();
                errors.insert("avatar", INVALID_AVATAR);
                Err(errors)
            }
        }
    }

    pub fn has_changes(&self) -> bool {
        self.draft != self.snapshot
    }

    pub fn validate(&self) -> FieldErrors {
        self.draft.form().validate()
    }

    /// Upsert the profile row, then upload a pending avatar
    pub async fn save(&mut self) -> Result<ProfileSaveOutcome, ProfileError> {
        self.validate().into_result().map_err(ProfileError::Invalid)?;

        let profile = Profile {
            id: self.user_id,
            full_name: self.draft.full_name(),
            email: self.draft.email.clone(),
        };
        self.backend
            .upsert_profile(&profile)
            .await
            .map_err(ProfileError::Save)?;

        if let AvatarChoice::Pending(upload) = &self.draft.avatar {
            self.backend
                .upload_avatar(
                    self.user_id,
                    upload.bytes.clone(),
                    upload.format.content_type(),
                )
                .await
                .map_err(ProfileError::Upload)?;
            let url = cache_busted(&self.backend.avatar_public_url(self.user_id), Utc::now());
            self.draft.avatar = AvatarChoice::Remote(url);
        }

        self.snapshot = self.draft.clone();
        info!("Saved profile for {}", self.user_id);

        Ok(ProfileSaveOutcome {
            avatar_url: match &self.draft.avatar {
                AvatarChoice::Remote(url) => Some(url.clone()),
                _ => None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryBackend, Op};
    use crate::forms::{INVALID_FIRST_NAME, INVALID_LAST_NAME, INVALID_PROFILE_EMAIL};
    use crate::validation::tests::png_header;

    async fn loaded(backend: &Arc<MemoryBackend>, user: Uuid) -> ProfileEditor<MemoryBackend> {
        let mut editor = ProfileEditor::new(backend.clone(), user);
        editor.load().await.unwrap();
        backend.clear_calls();
        editor
    }

    fn fill_valid(editor: &mut ProfileEditor<MemoryBackend>) {
        editor.set_first_name("Alex");
        editor.set_last_name("Rivera");
        editor.set_email("alex@email.com");
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(split_full_name("Ben Wright"), ("Ben".into(), "Wright".into()));
        assert_eq!(
            split_full_name("Mary Ann Smith"),
            ("Mary".into(), "Ann Smith".into())
        );
        assert_eq!(split_full_name("Cher"), ("Cher".into(), String::new()));
        assert_eq!(split_full_name(""), (String::new(), String::new()));
    }

    #[tokio::test]
    async fn test_load_missing_profile_is_empty() {
        let backend = Arc::new(MemoryBackend::new());
        let editor = loaded(&backend, Uuid::new_v4()).await;
        assert_eq!(editor.draft(), &ProfileDraft::default());
        assert!(!editor.has_changes());
    }

    #[tokio::test]
    async fn test_load_existing_profile_and_avatar() {
        let backend = Arc::new(MemoryBackend::new());
        let user = Uuid::new_v4();
        backend.seed_profile(Profile {
            id: user,
            full_name: "Ben Wright".to_string(),
            email: "ben@example.com".to_string(),
        });
        backend.seed_avatar(user);

        let editor = loaded(&backend, user).await;
        let draft = editor.draft();
        assert_eq!(draft.first_name, "Ben");
        assert_eq!(draft.last_name, "Wright");
        assert_eq!(draft.email, "ben@example.com");
        match &draft.avatar {
            AvatarChoice::Remote(url) => assert!(url.contains("avatar.png?t=")),
            other => panic!("expected remote avatar, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_three_word_name_is_reported_at_load() {
        let backend = Arc::new(MemoryBackend::new());
        let user = Uuid::new_v4();
        backend.seed_profile(Profile {
            id: user,
            full_name: "Mary Ann Smith".to_string(),
            email: "mary@example.com".to_string(),
        });

        let mut editor = loaded(&backend, user).await;
        let issues = editor.stored_issues();
        assert_eq!(issues.get("last_name"), Some(INVALID_LAST_NAME));
        assert_eq!(issues.get("first_name"), None);
        assert_eq!(issues.len(), 1);

        editor.set_last_name("Smith");
        assert!(editor.validate().is_empty());
    }

    #[tokio::test]
    async fn test_missing_profile_has_no_stored_issues() {
        let backend = Arc::new(MemoryBackend::new());
        let editor = loaded(&backend, Uuid::new_v4()).await;
        assert!(editor.stored_issues().is_empty());
        assert!(!editor.validate().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail(Op::FetchProfile);
        let mut editor = ProfileEditor::new(backend, Uuid::new_v4());
        assert!(matches!(editor.load().await, Err(ProfileError::Load(_))));
    }

    #[tokio::test]
    async fn test_invalid_fields_block_save() {
        let backend = Arc::new(MemoryBackend::new());
        let mut editor = loaded(&backend, Uuid::new_v4()).await;
        editor.set_first_name("Al");
        editor.set_last_name("Rivera");
        editor.set_email("alex@");
        assert!(editor.has_changes());

        match editor.save().await {
            Err(ProfileError::Invalid(errors)) => {
                assert_eq!(errors.get("first_name"), Some(INVALID_FIRST_NAME));
                assert_eq!(errors.get("email"), Some(INVALID_PROFILE_EMAIL));
                assert_eq!(errors.get("last_name"), None);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_save_profile_without_avatar() {
        let backend = Arc::new(MemoryBackend::new());
        let user = Uuid::new_v4();
        let mut editor = loaded(&backend, user).await;
        fill_valid(&mut editor);

        let outcome = editor.save().await.unwrap();
        assert_eq!(outcome.avatar_url, None);
        assert_eq!(backend.calls(), vec![Op::UpsertProfile]);
        let stored = backend.profile(user).unwrap();
        assert_eq!(stored.full_name, "Alex Rivera");
        assert_eq!(stored.email, "alex@email.com");
        assert!(!editor.has_changes());
    }

    #[tokio::test]
    async fn test_save_uploads_pending_avatar() {
        let backend = Arc::new(MemoryBackend::new());
        let user = Uuid::new_v4();
        let mut editor = loaded(&backend, user).await;
        fill_valid(&mut editor);
        let format = editor.choose_avatar(png_header(512, 512)).unwrap();
        assert_eq!(format, ImageFormat::Png);

        let outcome = editor.save().await.unwrap();
        assert_eq!(backend.calls(), vec![Op::UpsertProfile, Op::UploadAvatar]);
        let (_, content_type) = backend.avatar(user).unwrap();
        assert_eq!(content_type, "image/png");
        let url = outcome.avatar_url.unwrap();
        assert!(url.contains(&user.to_string()));
        assert!(url.contains("?t="));
        assert!(matches!(editor.draft().avatar, AvatarChoice::Remote(_)));
    }

    #[tokio::test]
    async fn test_rejected_avatar_leaves_draft() {
        let backend = Arc::new(MemoryBackend::new());
        let mut editor = loaded(&backend, Uuid::new_v4()).await;

        let errors = editor.choose_avatar(png_header(2048, 100)).unwrap_err();
        assert_eq!(errors.get("avatar"), Some(INVALID_AVATAR));
        assert!(editor.choose_avatar(b"GIF89a".to_vec()).is_err());
        assert_eq!(editor.draft().avatar, AvatarChoice::None);
        assert!(!editor.has_changes());
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_pending_avatar() {
        let backend = Arc::new(MemoryBackend::new());
        let user = Uuid::new_v4();
        let mut editor = loaded(&backend, user).await;
        fill_valid(&mut editor);
        editor.choose_avatar(png_header(64, 64)).unwrap();
        backend.fail(Op::UploadAvatar);

        assert!(matches!(editor.save().await, Err(ProfileError::Upload(_))));
        assert!(backend.profile(user).is_some());
        assert!(matches!(editor.draft().avatar, AvatarChoice::Pending(_)));
        assert!(editor.has_changes());
    }
}
