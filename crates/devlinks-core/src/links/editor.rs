//! Link reconciliation engine
//!
//! Loads a user's links into a [`LinkBuffer`], applies local edits and
//! writes them back to the store on save. Deletions of persisted links are
//! sent immediately; additions and edits wait for [`LinkEditor::save`].
//!
//! ```text
//! Loading -> Ready(clean) <-> Ready(dirty) -> Saving -> Ready(clean)
//!                                               \-> Ready(dirty) on failure
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::buffer::{BufferAction, BufferError, LinkBuffer, LinkField, SavePlan};
use crate::backend::{BackendError, LinkStore};
use crate::models::{LinkEntry, LinkId, NewLink};
use crate::validation::LinkIssue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Loading,
    Ready,
    Saving,
}

/// Step of a save that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Update,
    Insert,
    Reload,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStage::Update => write!(f, "updating existing links"),
            SaveStage::Insert => write!(f, "inserting new links"),
            SaveStage::Reload => write!(f, "reloading links"),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error("{} link(s) need attention before saving", .0.len())]
    Invalid(Vec<(usize, Vec<LinkIssue>)>),

    #[error("A save is already in progress")]
    Busy,

    #[error("Failed to load links: {0}")]
    Load(#[source] BackendError),

    #[error("Save failed while {stage}: {source}")]
    Save {
        stage: SaveStage,
        #[source]
        source: BackendError,
    },
}

/// Result of a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing differed from the loaded state; no remote call was made
    Unchanged,
    Saved { updated: usize, inserted: usize },
}

/// An entry taken out of the buffer
#[derive(Debug)]
pub struct RemovedEntry {
    pub entry: LinkEntry,
    /// Set when the remote delete failed; the entry is gone locally anyway
    pub remote_error: Option<BackendError>,
}

/// Editor for one user's links
pub struct LinkEditor<S: LinkStore + ?Sized> {
    store: Arc<S>,
    user_id: Uuid,
    buffer: LinkBuffer,
    state: EditorState,
    last_error: Option<String>,
}

impl<S: LinkStore + ?Sized> LinkEditor<S> {
    /// Create an editor; call [`load`](Self::load) before editing
    pub fn new(store: Arc<S>, user_id: Uuid) -> Self {
        Self {
            store,
            user_id,
            buffer: LinkBuffer::new(),
            state: EditorState::Loading,
            last_error: None,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn buffer(&self) -> &LinkBuffer {
        &self.buffer
    }

    pub fn entries(&self) -> &[LinkEntry] {
        self.buffer.entries()
    }

    /// Message of the most recent load or save failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetch the user's links, replacing the buffer
    ///
    /// On failure the buffer is left empty and the error is both recorded and
    /// returned; there is no retry.
    pub async fn load(&mut self) -> Result<(), EditorError> {
        self.state = EditorState::Loading;
        match self.store.list_links(self.user_id).await {
            Ok(links) => {
                info!("Loaded {} link(s) for {}", links.len(), self.user_id);
                self.buffer.apply(BufferAction::Reset(links))?;
                self.last_error = None;
                self.state = EditorState::Ready;
                Ok(())
            }
            Err(e) => {
                error!("Failed to load links for {}: {}", self.user_id, e);
                self.buffer = LinkBuffer::new();
                self.last_error = Some(e.to_string());
                self.state = EditorState::Ready;
                Err(EditorError::Load(e))
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), EditorError> {
        if self.state == EditorState::Saving {
            return Err(EditorError::Busy);
        }
        Ok(())
    }

    /// Append a blank entry, returning its index
    pub fn add_entry(&mut self) -> Result<usize, EditorError> {
        self.ensure_idle()?;
        self.buffer.apply(BufferAction::Add)?;
        Ok(self.buffer.len() - 1)
    }

    pub fn edit_entry(
        &mut self,
        index: usize,
        field: LinkField,
        value: impl Into<String>,
    ) -> Result<(), EditorError> {
        self.ensure_idle()?;
        self.buffer.apply(BufferAction::Edit {
            index,
            field,
            value: value.into(),
        })?;
        Ok(())
    }

    /// Remove an entry, deleting it remotely first when it was persisted
    pub async fn remove_entry(&mut self, index: usize) -> Result<RemovedEntry, EditorError> {
        self.ensure_idle()?;
        let id = self
            .buffer
            .get(index)
            .ok_or(BufferError::IndexOutOfRange {
                index,
                len: self.buffer.len(),
            })?
            .id;

        let remote_error = match id {
            Some(id) => match self.store.delete_link(id).await {
                Ok(()) => {
                    debug!("Deleted link {}", id);
                    None
                }
                Err(e) => {
                    warn!("Failed to delete link {}: {}", id, e);
                    Some(e)
                }
            },
            None => None,
        };

        let entry = self.buffer.remove(index)?;
        Ok(RemovedEntry {
            entry,
            remote_error,
        })
    }

    /// Whether there are valid unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }

    /// Persist the buffer
    ///
    /// Existing entries are upserted, then new ones inserted; the ids of the
    /// inserted rows are written back before the final reload, so retrying
    /// after a failed reload never inserts the same entry twice.
    pub async fn save(&mut self) -> Result<SaveOutcome, EditorError> {
        self.ensure_idle()?;
        if !self.buffer.has_changes() {
            debug!("No link changes to save");
            return Ok(SaveOutcome::Unchanged);
        }
        let issues = self.buffer.issues();
        if !issues.is_empty() {
            return Err(EditorError::Invalid(issues));
        }

        let plan = self.buffer.plan_save(self.user_id, Utc::now());
        self.state = EditorState::Saving;
        let result = self.execute(plan).await;
        self.state = EditorState::Ready;

        match result {
            Ok(outcome) => {
                info!("Saved links for {}: {:?}", self.user_id, outcome);
                self.last_error = None;
                Ok(outcome)
            }
            Err(e) => {
                error!("{}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(&mut self, plan: SavePlan) -> Result<SaveOutcome, EditorError> {
        let updated = plan.updates.len();
        if !plan.updates.is_empty() {
            self.store
                .upsert_links(&plan.updates)
                .await
                .map_err(|source| EditorError::Save {
                    stage: SaveStage::Update,
                    source,
                })?;
        }

        let inserted = plan.inserts.len();
        if !plan.inserts.is_empty() {
            let (indices, rows): (Vec<usize>, Vec<NewLink>) = plan.inserts.into_iter().unzip();
            let created = self
                .store
                .insert_links(&rows)
                .await
                .map_err(|source| EditorError::Save {
                    stage: SaveStage::Insert,
                    source,
                })?;
            let ids: Vec<(usize, LinkId)> = indices
                .into_iter()
                .zip(created.iter().map(|link| link.id))
                .collect();
            self.buffer.assign_ids(&ids);
        }

        let links = self
            .store
            .list_links(self.user_id)
            .await
            .map_err(|source| EditorError::Save {
                stage: SaveStage::Reload,
                source,
            })?;
        self.buffer.apply(BufferAction::Reset(links))?;

        Ok(SaveOutcome::Saved { updated, inserted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryBackend, Op};
    use crate::models::{NewLink, Platform};
    use chrono::Duration;

    fn seeded(backend: &MemoryBackend, user: Uuid, items: &[(Platform, &str)]) {
        let base = Utc::now() - Duration::hours(1);
        for (i, (platform, url)) in items.iter().enumerate() {
            backend.seed_link(NewLink::new(
                user,
                *platform,
                *url,
                base + Duration::seconds(i as i64),
            ));
        }
    }

    async fn editor_with(
        items: &[(Platform, &str)],
    ) -> (Arc<MemoryBackend>, LinkEditor<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let user = Uuid::new_v4();
        seeded(&backend, user, items);
        let mut editor = LinkEditor::new(backend.clone(), user);
        editor.load().await.unwrap();
        backend.clear_calls();
        (backend, editor)
    }

    fn fill(editor: &mut LinkEditor<MemoryBackend>, platform: &str, url: &str) -> usize {
        let index = editor.add_entry().unwrap();
        editor.edit_entry(index, LinkField::Type, platform).unwrap();
        editor.edit_entry(index, LinkField::Url, url).unwrap();
        index
    }

    #[tokio::test]
    async fn test_load_orders_by_creation() {
        let (_, editor) = editor_with(&[
            (Platform::GitHub, "github.com/a"),
            (Platform::YouTube, "youtube.com/b"),
        ])
        .await;

        assert_eq!(editor.state(), EditorState::Ready);
        let urls: Vec<&str> = editor.entries().iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["github.com/a", "youtube.com/b"]);
        assert!(!editor.is_dirty());
    }

    #[tokio::test]
    async fn test_load_failure_leaves_empty_ready_buffer() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail(Op::ListLinks);
        let mut editor = LinkEditor::new(backend, Uuid::new_v4());

        let err = editor.load().await.unwrap_err();
        assert!(matches!(err, EditorError::Load(_)));
        assert_eq!(editor.state(), EditorState::Ready);
        assert!(editor.entries().is_empty());
        assert!(editor.last_error().is_some());
    }

    #[tokio::test]
    async fn test_save_new_entry_sends_derived_fields() {
        let (backend, mut editor) = editor_with(&[]).await;
        fill(&mut editor, "GitHub", "https://github.com/a");
        assert!(editor.is_dirty());

        let outcome = editor.save().await.unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Saved {
                updated: 0,
                inserted: 1
            }
        );

        let inserted = backend.inserted();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].color, "#333");
        assert_eq!(inserted[0].icon, "GitHub");
        assert_eq!(inserted[0].user_id, editor.user_id());
        assert!(backend.upserted().is_empty());
        assert_eq!(backend.calls(), vec![Op::InsertLinks, Op::ListLinks]);
    }

    #[tokio::test]
    async fn test_save_round_trip_assigns_ids_in_order() {
        let (backend, mut editor) = editor_with(&[]).await;
        fill(&mut editor, "GitHub", "github.com/one");
        fill(&mut editor, "YouTube", "youtube.com/two");
        fill(&mut editor, "LinkedIn", "linkedin.com/three");

        editor.save().await.unwrap();

        let entries = editor.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.id.is_some()));
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["github.com/one", "youtube.com/two", "linkedin.com/three"]);
        assert_eq!(backend.links_of(editor.user_id()).len(), 3);
        assert!(!editor.is_dirty());
        assert!(!editor.buffer().has_changes());
    }

    #[tokio::test]
    async fn test_second_save_is_noop() {
        let (backend, mut editor) = editor_with(&[(Platform::GitHub, "github.com/a")]).await;
        editor.edit_entry(0, LinkField::Url, "github.com/b").unwrap();

        editor.save().await.unwrap();
        backend.clear_calls();

        assert_eq!(editor.save().await.unwrap(), SaveOutcome::Unchanged);
        assert!(backend.calls().is_empty());
        assert!(!editor.is_dirty());
    }

    #[tokio::test]
    async fn test_save_updates_existing_and_inserts_new() {
        let (backend, mut editor) = editor_with(&[(Platform::GitHub, "github.com/a")]).await;
        let id = editor.entries()[0].id.unwrap();
        editor.edit_entry(0, LinkField::Type, "Facebook").unwrap();
        editor.edit_entry(0, LinkField::Url, "facebook.com/a").unwrap();
        fill(&mut editor, "Instagram", "instagram.com/a");

        editor.save().await.unwrap();

        let upserted = backend.upserted();
        assert_eq!(upserted.len(), 1);
        assert_eq!(upserted[0].id, id);
        assert_eq!(upserted[0].color, "#4267B2");
        assert_eq!(upserted[0].icon, "Facebook");
        assert_eq!(
            backend.calls(),
            vec![Op::UpsertLinks, Op::InsertLinks, Op::ListLinks]
        );
        assert_eq!(editor.entries()[0].id, Some(id));
        assert_eq!(editor.entries()[1].link_type, Some(Platform::Instagram));
    }

    #[tokio::test]
    async fn test_invalid_buffer_blocks_save() {
        let (backend, mut editor) = editor_with(&[]).await;
        let index = editor.add_entry().unwrap();
        editor.edit_entry(index, LinkField::Url, "not a url").unwrap();
        assert!(!editor.is_dirty());

        match editor.save().await {
            Err(EditorError::Invalid(issues)) => {
                assert_eq!(
                    issues,
                    vec![(0, vec![LinkIssue::MissingType, LinkIssue::InvalidUrl])]
                );
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_persisted_entry_deletes_exactly_that_id() {
        let (backend, mut editor) = editor_with(&[
            (Platform::GitHub, "github.com/a"),
            (Platform::YouTube, "youtube.com/b"),
        ])
        .await;
        let target = editor.entries()[1].id.unwrap();

        let removed = editor.remove_entry(1).await.unwrap();
        assert_eq!(removed.entry.id, Some(target));
        assert!(removed.remote_error.is_none());
        assert_eq!(backend.deleted(), vec![target]);
        assert_eq!(editor.entries().len(), 1);

        let remaining = backend.links_of(editor.user_id());
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, target);
    }

    #[tokio::test]
    async fn test_remove_unsaved_entry_is_local_only() {
        let (backend, mut editor) = editor_with(&[(Platform::GitHub, "github.com/a")]).await;
        let index = fill(&mut editor, "YouTube", "youtube.com/b");

        let removed = editor.remove_entry(index).await.unwrap();
        assert_eq!(removed.entry.id, None);
        assert!(backend.calls().is_empty());
        assert_eq!(editor.entries().len(), 1);
        assert!(!editor.buffer().has_changes());
    }

    #[tokio::test]
    async fn test_remove_with_remote_failure_still_removes_locally() {
        let (backend, mut editor) = editor_with(&[(Platform::GitHub, "github.com/a")]).await;
        backend.fail(Op::DeleteLink);

        let removed = editor.remove_entry(0).await.unwrap();
        assert!(removed.remote_error.is_some());
        assert!(editor.entries().is_empty());
        assert_eq!(backend.links_of(editor.user_id()).len(), 1);
    }

    #[tokio::test]
    async fn test_remove_out_of_range() {
        let (_, mut editor) = editor_with(&[]).await;
        let err = editor.remove_entry(0).await.unwrap_err();
        assert!(matches!(
            err,
            EditorError::Buffer(BufferError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[tokio::test]
    async fn test_failed_insert_stays_dirty_and_retries() {
        let (backend, mut editor) = editor_with(&[(Platform::GitHub, "github.com/a")]).await;
        editor.edit_entry(0, LinkField::Url, "github.com/changed").unwrap();
        fill(&mut editor, "YouTube", "youtube.com/b");
        backend.fail(Op::InsertLinks);

        let err = editor.save().await.unwrap_err();
        assert!(matches!(
            err,
            EditorError::Save {
                stage: SaveStage::Insert,
                ..
            }
        ));
        assert_eq!(editor.state(), EditorState::Ready);
        assert!(editor.is_dirty());
        assert!(editor.last_error().is_some());

        backend.heal(Op::InsertLinks);
        editor.save().await.unwrap();
        assert_eq!(backend.links_of(editor.user_id()).len(), 2);
        assert!(!editor.is_dirty());
        assert!(editor.last_error().is_none());
    }

    #[tokio::test]
    async fn test_retry_after_failed_reload_does_not_duplicate() {
        let (backend, mut editor) = editor_with(&[]).await;
        fill(&mut editor, "GitHub", "github.com/a");
        backend.fail(Op::ListLinks);

        let err = editor.save().await.unwrap_err();
        assert!(matches!(
            err,
            EditorError::Save {
                stage: SaveStage::Reload,
                ..
            }
        ));
        assert!(editor.entries()[0].id.is_some());

        backend.heal(Op::ListLinks);
        editor.save().await.unwrap();
        assert_eq!(backend.inserted().len(), 1);
        assert_eq!(backend.links_of(editor.user_id()).len(), 1);
    }

    #[tokio::test]
    async fn test_mutations_rejected_while_saving() {
        let (_, mut editor) = editor_with(&[]).await;
        editor.state = EditorState::Saving;
        assert!(matches!(editor.add_entry(), Err(EditorError::Busy)));
        assert!(matches!(
            editor.edit_entry(0, LinkField::Url, "x.com"),
            Err(EditorError::Busy)
        ));
        assert!(matches!(editor.save().await, Err(EditorError::Busy)));

        // A reload always recovers
        editor.load().await.unwrap();
        assert_eq!(editor.state(), EditorState::Ready);
    }
}
