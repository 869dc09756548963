//! Application state and logic

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use devlinks_core::links::{LinkEditor, LinkField, SaveOutcome};
use devlinks_core::validation::{absolute_url, validate_entry, LinkIssue};
use devlinks_core::{load_public_profile, LinkEntry, Platform, PublicProfile, SupabaseClient};

/// Which view fills the main area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Link list with inline validation
    Edit,
    /// The public page as visitors see it
    Preview,
}

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Typing the URL of the selected link
    Url,
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    pub mode: Mode,
    pub input_mode: InputMode,
    /// URL input buffer
    pub url_input: String,
    /// Cursor position in the URL input, in characters
    pub url_cursor: usize,
    /// Selected entry in the edit view
    pub link_index: usize,
    /// Selected link in the preview
    pub preview_index: usize,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Set after a first `q` with unsaved changes
    pub confirm_quit: bool,
    /// Whether a remote call is in flight
    pub is_loading: bool,
    /// Last loaded public page
    pub preview: Option<PublicProfile>,
    client: Arc<SupabaseClient>,
    editor: LinkEditor<SupabaseClient>,
}

impl App {
    /// Create an app for `user_id`; call [`load`](Self::load) before drawing
    pub fn new(client: Arc<SupabaseClient>, user_id: Uuid) -> Self {
        Self {
            should_quit: false,
            mode: Mode::Edit,
            input_mode: InputMode::Normal,
            url_input: String::new(),
            url_cursor: 0,
            link_index: 0,
            preview_index: 0,
            status_message: None,
            status_message_time: None,
            show_help: false,
            confirm_quit: false,
            is_loading: false,
            preview: None,
            editor: LinkEditor::new(client.clone(), user_id),
            client,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.editor.user_id()
    }

    pub fn entries(&self) -> &[LinkEntry] {
        self.editor.entries()
    }

    /// Validation problems of the entry at `index`
    pub fn issues_for(&self, index: usize) -> Vec<LinkIssue> {
        self.entries().get(index).map(validate_entry).unwrap_or_default()
    }

    /// Whether the entries differ from what was loaded
    pub fn has_changes(&self) -> bool {
        self.editor.buffer().has_changes()
    }

    /// Changed and valid, so Save is enabled
    pub fn is_dirty(&self) -> bool {
        self.editor.is_dirty()
    }

    /// Fetch links and the public page
    pub async fn load(&mut self) {
        if let Err(e) = self.editor.load().await {
            self.set_status(e.to_string());
        }
        self.clamp_selection();
        self.refresh_preview().await;
    }

    /// Discard local edits and fetch the links again
    pub async fn reload(&mut self) {
        let discarded = self.has_changes();
        match self.editor.load().await {
            Ok(()) if discarded => self.set_status("Reloaded, local changes discarded"),
            Ok(()) => self.set_status("Reloaded"),
            Err(e) => self.set_status(e.to_string()),
        }
        self.confirm_quit = false;
        self.clamp_selection();
    }

    pub async fn refresh_preview(&mut self) {
        self.preview = Some(load_public_profile(self.client.as_ref(), self.user_id()).await);
        let len = self.preview_links_len();
        if self.preview_index >= len {
            self.preview_index = len.saturating_sub(1);
        }
    }

    fn preview_links_len(&self) -> usize {
        self.preview.as_ref().map(|p| p.links.len()).unwrap_or(0)
    }

    fn clamp_selection(&mut self) {
        let len = self.entries().len();
        if self.link_index >= len {
            self.link_index = len.saturating_sub(1);
        }
    }

    /// Set a status message (will auto-dismiss after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Switch between the edit and preview views
    ///
    /// Returns true when the preview needs refreshing.
    pub fn toggle_mode(&mut self) -> bool {
        self.mode = match self.mode {
            Mode::Edit => Mode::Preview,
            Mode::Preview => Mode::Edit,
        };
        self.mode == Mode::Preview
    }

    pub fn move_up(&mut self) {
        let index = match self.mode {
            Mode::Edit => &mut self.link_index,
            Mode::Preview => &mut self.preview_index,
        };
        *index = index.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let len = match self.mode {
            Mode::Edit => self.entries().len(),
            Mode::Preview => self.preview_links_len(),
        };
        let index = match self.mode {
            Mode::Edit => &mut self.link_index,
            Mode::Preview => &mut self.preview_index,
        };
        if *index + 1 < len {
            *index += 1;
        }
    }

    /// Append a blank entry and select it
    pub fn add_link(&mut self) {
        match self.editor.add_entry() {
            Ok(index) => {
                self.link_index = index;
                self.confirm_quit = false;
                self.set_status("New link: t to pick a platform, e to set the URL");
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    /// Move the selected entry to the next platform
    pub fn cycle_type(&mut self) {
        let Some(entry) = self.entries().get(self.link_index) else {
            return;
        };
        let next = entry.link_type.map(Platform::next).unwrap_or(Platform::GitHub);
        if let Err(e) = self
            .editor
            .edit_entry(self.link_index, LinkField::Type, next.name())
        {
            self.set_status(e.to_string());
        }
        self.confirm_quit = false;
    }

    /// Start typing the URL of the selected entry
    pub fn start_url_edit(&mut self) {
        let Some(entry) = self.entries().get(self.link_index) else {
            self.set_status("No link selected");
            return;
        };
        self.url_input = entry.url.clone();
        self.url_cursor = self.url_input.chars().count();
        self.input_mode = InputMode::Url;
    }

    /// Store the typed URL in the selected entry
    pub fn confirm_url_edit(&mut self) {
        let url = self.url_input.trim().to_string();
        if let Err(e) = self.editor.edit_entry(self.link_index, LinkField::Url, url) {
            self.set_status(e.to_string());
        }
        self.confirm_quit = false;
        self.exit_input_mode();
    }

    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.url_input.clear();
        self.url_cursor = 0;
    }

    fn byte_offset(&self, cursor: usize) -> usize {
        self.url_input
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.url_input.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_offset(self.url_cursor);
        self.url_input.insert(at, c);
        self.url_cursor += 1;
    }

    pub fn delete_char(&mut self) {
        if self.url_cursor == 0 {
            return;
        }
        self.url_cursor -= 1;
        let at = self.byte_offset(self.url_cursor);
        self.url_input.remove(at);
    }

    pub fn cursor_left(&mut self) {
        self.url_cursor = self.url_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.url_cursor < self.url_input.chars().count() {
            self.url_cursor += 1;
        }
    }

    /// Remove the selected entry, deleting it remotely when it was saved
    pub async fn remove_current(&mut self) {
        if self.entries().is_empty() {
            self.set_status("No link selected");
            return;
        }
        match self.editor.remove_entry(self.link_index).await {
            Ok(removed) => match removed.remote_error {
                Some(e) => self.set_status(format!("Removed locally; remote delete failed: {}", e)),
                None => self.set_status("Link removed"),
            },
            Err(e) => self.set_status(e.to_string()),
        }
        self.clamp_selection();
    }

    /// Save when dirty, explaining why not otherwise
    ///
    /// Returns true when links were written.
    pub async fn save(&mut self) -> bool {
        if !self.has_changes() {
            self.set_status("Nothing to save");
            return false;
        }
        self.is_loading = true;
        let result = self.editor.save().await;
        self.is_loading = false;
        self.clamp_selection();

        match result {
            Ok(SaveOutcome::Saved { updated, inserted }) => {
                self.confirm_quit = false;
                self.set_status(format!(
                    "Saved: {} updated, {} added",
                    updated, inserted
                ));
                true
            }
            Ok(SaveOutcome::Unchanged) => {
                self.set_status("Nothing to save");
                false
            }
            Err(e) => {
                self.set_status(e.to_string());
                false
            }
        }
    }

    /// URL of the selected link, ready for a browser
    pub fn current_url(&self) -> Option<String> {
        let url = match self.mode {
            Mode::Edit => self.entries().get(self.link_index).map(|e| e.url.as_str()),
            Mode::Preview => self
                .preview
                .as_ref()
                .and_then(|p| p.links.get(self.preview_index))
                .map(|l| l.url.as_str()),
        }?;
        let url = url.trim();
        (!url.is_empty()).then(|| absolute_url(url))
    }

    /// Quit, asking once more when there are unsaved changes
    pub fn request_quit(&mut self) {
        if self.has_changes() && !self.confirm_quit {
            self.confirm_quit = true;
            self.set_status("Unsaved changes. Press q again to quit, s to save.");
        } else {
            self.should_quit = true;
        }
    }
}
