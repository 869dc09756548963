//! devlinks core library
//!
//! This crate provides the core functionality for devlinks, a link-in-bio
//! profile service: a user keeps a profile (name, email, avatar) and a list
//! of social links, and shares them on a public preview page.
//!
//! # Architecture
//!
//! - **Backend**: a hosted Supabase project provides auth, the `profiles` and
//!   `links` tables, and avatar storage. Each concern is a trait; the
//!   editors receive the backend as an injected `Arc`.
//! - **Editors**: local edit state is loaded from the backend, edited in
//!   memory and written back on save.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let client = Arc::new(SupabaseClient::from_config(&config)?);
//! let user = client.user_id().await?;
//!
//! let mut links = LinkEditor::new(client.clone(), user);
//! links.load().await?;
//! let i = links.add_entry()?;
//! links.edit_entry(i, LinkField::Type, "GitHub")?;
//! links.edit_entry(i, LinkField::Url, "github.com/alice")?;
//! if links.is_dirty() {
//!     links.save().await?;
//! }
//! ```
//!
//! # Modules
//!
//! - `links`: link edit buffer and reconciliation engine (main entry point)
//! - `profile`: profile and avatar editor
//! - `preview`: read-only public profile
//! - `backend`: backend traits and the Supabase client
//! - `models`: rows, payloads and the platform set
//! - `validation`, `forms`: field validation
//! - `session`: persisted sign-in session
//! - `config`: application configuration

pub mod backend;
pub mod config;
pub mod forms;
pub mod links;
pub mod models;
pub mod preview;
pub mod profile;
pub mod session;
pub mod validation;

pub use backend::{
    AuthProvider, AvatarStorage, BackendError, BackendResult, LinkStore, ProfileStore,
    SignUpOutcome, SupabaseClient,
};
pub use config::Config;
pub use forms::FieldErrors;
pub use links::{EditorError, LinkEditor, LinkField, SaveOutcome};
pub use models::{AuthUser, Link, LinkEntry, LinkId, Platform, Profile};
pub use preview::{load_public_profile, AvatarDisplay, PublicProfile};
pub use profile::{ProfileEditor, ProfileError};
pub use session::{Session, SessionStore};
