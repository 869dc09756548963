//! In-memory backend for tests
//!
//! Implements the table and storage traits over plain collections. Every
//! call is recorded so tests can assert exactly which remote operations an
//! editor issued, and any operation can be made to fail.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{avatar_path, AvatarStorage, BackendError, BackendResult, LinkStore, ProfileStore};
use crate::models::{Link, LinkId, LinkUpdate, NewLink, Profile};

/// A remote operation, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListLinks,
    UpsertLinks,
    InsertLinks,
    DeleteLink,
    FetchProfile,
    UpsertProfile,
    UploadAvatar,
}

#[derive(Default)]
struct State {
    links: Vec<Link>,
    next_id: LinkId,
    profiles: HashMap<Uuid, Profile>,
    avatars: HashMap<Uuid, (Vec<u8>, String)>,
    calls: Vec<Op>,
    failing: HashSet<Op>,
    inserted: Vec<NewLink>,
    upserted: Vec<LinkUpdate>,
    deleted: Vec<LinkId>,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a persisted link, returning it with its assigned id
    pub fn seed_link(&self, link: NewLink) -> Link {
        self.state.lock().unwrap().store(link)
    }

    pub fn seed_profile(&self, profile: Profile) {
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(profile.id, profile);
    }

    pub fn seed_avatar(&self, user_id: Uuid) {
        self.state
            .lock()
            .unwrap()
            .avatars
            .insert(user_id, (vec![0x89, b'P', b'N', b'G'], "image/png".into()));
    }

    /// Make every later call of `op` fail with a 500
    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.state.lock().unwrap().failing.remove(&op);
    }

    pub fn calls(&self) -> Vec<Op> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Every row that was ever passed to `insert_links`
    pub fn inserted(&self) -> Vec<NewLink> {
        self.state.lock().unwrap().inserted.clone()
    }

    pub fn upserted(&self) -> Vec<LinkUpdate> {
        self.state.lock().unwrap().upserted.clone()
    }

    pub fn deleted(&self) -> Vec<LinkId> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn links_of(&self, user_id: Uuid) -> Vec<Link> {
        self.state.lock().unwrap().sorted_links(user_id)
    }

    pub fn profile(&self, user_id: Uuid) -> Option<Profile> {
        self.state.lock().unwrap().profiles.get(&user_id).cloned()
    }

    pub fn avatar(&self, user_id: Uuid) -> Option<(Vec<u8>, String)> {
        self.state.lock().unwrap().avatars.get(&user_id).cloned()
    }

    fn record(&self, op: Op) -> BackendResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        if state.failing.contains(&op) {
            return Err(BackendError::from_response(
                format!("memory/{:?}", op),
                500,
                "injected failure",
            ));
        }
        Ok(state)
    }
}

impl State {
    fn store(&mut self, link: NewLink) -> Link {
        self.next_id += 1;
        let row = Link {
            id: self.next_id,
            user_id: link.user_id,
            link_type: link.link_type,
            url: link.url,
            color: Some(link.color),
            icon: Some(link.icon),
            created_at: link.created_at,
        };
        self.links.push(row.clone());
        row
    }

    fn sorted_links(&self, user_id: Uuid) -> Vec<Link> {
        let mut links: Vec<Link> = self
            .links
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        links.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        links
    }
}

#[async_trait]
impl LinkStore for MemoryBackend {
    async fn list_links(&self, user_id: Uuid) -> BackendResult<Vec<Link>> {
        let state = self.record(Op::ListLinks)?;
        Ok(state.sorted_links(user_id))
    }

    async fn upsert_links(&self, rows: &[LinkUpdate]) -> BackendResult<()> {
        let mut state = self.record(Op::UpsertLinks)?;
        for row in rows {
            state.upserted.push(row.clone());
            match state.links.iter_mut().find(|l| l.id == row.id) {
                Some(link) => {
                    link.user_id = row.user_id;
                    link.link_type = row.link_type;
                    link.url = row.url.clone();
                    link.color = Some(row.color.clone());
                    link.icon = Some(row.icon.clone());
                }
                None => {
                    state.links.push(Link {
                        id: row.id,
                        user_id: row.user_id,
                        link_type: row.link_type,
                        url: row.url.clone(),
                        color: Some(row.color.clone()),
                        icon: Some(row.icon.clone()),
                        created_at: Utc::now(),
                    });
                    state.next_id = state.next_id.max(row.id);
                }
            }
        }
        Ok(())
    }

    async fn insert_links(&self, rows: &[NewLink]) -> BackendResult<Vec<Link>> {
        let mut state = self.record(Op::InsertLinks)?;
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            state.inserted.push(row.clone());
            created.push(state.store(row.clone()));
        }
        Ok(created)
    }

    async fn delete_link(&self, id: LinkId) -> BackendResult<()> {
        let mut state = self.record(Op::DeleteLink)?;
        state.deleted.push(id);
        state.links.retain(|l| l.id != id);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn fetch_profile(&self, user_id: Uuid) -> BackendResult<Option<Profile>> {
        let state = self.record(Op::FetchProfile)?;
        Ok(state.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> BackendResult<()> {
        let mut state = self.record(Op::UpsertProfile)?;
        state.profiles.insert(profile.id, profile.clone());
        Ok(())
    }
}

#[async_trait]
impl AvatarStorage for MemoryBackend {
    async fn upload_avatar(
        &self,
        user_id: Uuid,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> BackendResult<()> {
        let mut state = self.record(Op::UploadAvatar)?;
        state
            .avatars
            .insert(user_id, (bytes, content_type.to_string()));
        Ok(())
    }

    fn avatar_public_url(&self, user_id: Uuid) -> String {
        format!("memory://avatar/{}", avatar_path(user_id))
    }

    async fn probe(&self, url: &str) -> bool {
        let base = url.split('?').next().unwrap_or(url);
        let state = self.state.lock().unwrap();
        state
            .avatars
            .keys()
            .any(|id| self.avatar_public_url(*id) == base)
    }
}
