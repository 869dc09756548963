//! The link edit buffer
//!
//! A plain value holding the entries being edited and the snapshot they were
//! loaded from. All changes go through [`LinkBuffer::apply`]; dirty tracking
//! and the save plan are derived from the two lists on demand.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Link, LinkEntry, LinkId, LinkUpdate, NewLink, Platform};
use crate::validation::{validate_entry, LinkIssue};

/// Editable field of a link entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkField {
    Type,
    Url,
}

/// A transition of the edit buffer
#[derive(Debug, Clone, PartialEq)]
pub enum BufferAction {
    /// Replace entries and snapshot with freshly loaded rows
    Reset(Vec<Link>),
    /// Append a blank entry
    Add,
    Edit {
        index: usize,
        field: LinkField,
        value: String,
    },
    Remove {
        index: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("No link at position {index} (there are {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Remote writes needed to persist the buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavePlan {
    /// Entries that already have an id
    pub updates: Vec<LinkUpdate>,
    /// Entries without an id, with their buffer position
    pub inserts: Vec<(usize, NewLink)>,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkBuffer {
    entries: Vec<LinkEntry>,
    snapshot: Vec<LinkEntry>,
}

impl LinkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clean buffer mirroring `links`
    pub fn from_links(links: &[Link]) -> Self {
        let entries: Vec<LinkEntry> = links.iter().map(LinkEntry::from).collect();
        Self {
            snapshot: entries.clone(),
            entries,
        }
    }

    pub fn entries(&self) -> &[LinkEntry] {
        &self.entries
    }

    /// The state last loaded from the store
    pub fn snapshot(&self) -> &[LinkEntry] {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LinkEntry> {
        self.entries.get(index)
    }

    /// Apply a transition
    ///
    /// `Remove` yields the removed entry; every other action yields `None`.
    pub fn apply(&mut self, action: BufferAction) -> Result<Option<LinkEntry>, BufferError> {
        match action {
            BufferAction::Reset(links) => {
                *self = Self::from_links(&links);
                Ok(None)
            }
            BufferAction::Add => {
                self.entries.push(LinkEntry::blank());
                Ok(None)
            }
            BufferAction::Edit {
                index,
                field,
                value,
            } => {
                let len = self.entries.len();
                let entry = self
                    .entries
                    .get_mut(index)
                    .ok_or(BufferError::IndexOutOfRange { index, len })?;
                match field {
                    LinkField::Type => entry.link_type = value.parse::<Platform>().ok(),
                    LinkField::Url => entry.url = value,
                }
                Ok(None)
            }
            BufferAction::Remove { index } => self.remove(index).map(Some),
        }
    }

    /// Remove and return the entry at `index`
    pub fn remove(&mut self, index: usize) -> Result<LinkEntry, BufferError> {
        if index < self.entries.len() {
            Ok(self.entries.remove(index))
        } else {
            Err(BufferError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }

    /// Whether the entries differ from the snapshot
    pub fn has_changes(&self) -> bool {
        self.entries != self.snapshot
    }

    /// Problems per entry, only for entries that have any
    pub fn issues(&self) -> Vec<(usize, Vec<LinkIssue>)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let issues = validate_entry(entry);
                (!issues.is_empty()).then_some((i, issues))
            })
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.entries.iter().all(|e| validate_entry(e).is_empty())
    }

    /// Changed and valid; saving is only offered in this state
    pub fn is_dirty(&self) -> bool {
        self.has_changes() && self.is_valid()
    }

    /// Split the entries into the update and insert paths
    ///
    /// New rows are stamped `now` plus their position in microseconds so a
    /// batch sorts back in buffer order. Entries without a platform are
    /// skipped; callers check [`is_valid`](Self::is_valid) first.
    pub fn plan_save(&self, user_id: Uuid, now: DateTime<Utc>) -> SavePlan {
        let mut plan = SavePlan::default();
        for (index, entry) in self.entries.iter().enumerate() {
            let Some(platform) = entry.link_type else {
                continue;
            };
            match entry.id {
                Some(id) => plan
                    .updates
                    .push(LinkUpdate::new(id, user_id, platform, entry.url.clone())),
                None => {
                    let created_at = now + Duration::microseconds(index as i64);
                    plan.inserts.push((
                        index,
                        NewLink::new(user_id, platform, entry.url.clone(), created_at),
                    ));
                }
            }
        }
        plan
    }

    /// Record server-assigned ids for entries saved on the insert path
    pub fn assign_ids(&mut self, ids: &[(usize, LinkId)]) {
        for &(index, id) in ids {
            if let Some(entry) = self.entries.get_mut(index) {
                entry.id = Some(id);
            }
        }
    }
}
