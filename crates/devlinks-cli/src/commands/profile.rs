//! Profile command handlers

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use devlinks_core::{ProfileEditor, ProfileError, SupabaseClient};

use super::ensure_valid;
use crate::output::Output;
use crate::prompt;

async fn open_editor(client: &Arc<SupabaseClient>) -> Result<ProfileEditor<SupabaseClient>> {
    let user_id = client.user_id().await?;
    let mut editor = ProfileEditor::new(client.clone(), user_id);
    editor.load().await?;
    Ok(editor)
}

/// Point out stored values that must be corrected before a save
fn warn_stored_issues(editor: &ProfileEditor<SupabaseClient>, output: &Output) {
    for (field, message) in editor.stored_issues().iter() {
        output.warn(&format!("Stored {}: {}", field.replace('_', " "), message));
    }
}

pub async fn show(client: &Arc<SupabaseClient>, output: &Output) -> Result<()> {
    let editor = open_editor(client).await?;
    output.print_profile(editor.draft());
    warn_stored_issues(&editor, output);
    Ok(())
}

/// Fields passed on the command line
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<PathBuf>,
}

impl ProfileChanges {
    fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.avatar.is_none()
    }
}

/// Edit the profile, interactively when no field was given
pub async fn edit(
    client: &Arc<SupabaseClient>,
    mut changes: ProfileChanges,
    output: &Output,
) -> Result<()> {
    let mut editor = open_editor(client).await?;
    warn_stored_issues(&editor, output);

    if changes.is_empty() && output.should_prompt() {
        println!("Press Enter to keep current value, or type new value.\n");
        let draft = editor.draft().clone();
        changes.first_name = prompt::with_default("First name", &draft.first_name)?;
        changes.last_name = prompt::with_default("Last name", &draft.last_name)?;
        changes.email = prompt::with_default("Email", &draft.email)?;
        changes.avatar = prompt::with_default("Avatar image (path)", "")?.map(PathBuf::from);
    }

    if let Some(first) = changes.first_name {
        editor.set_first_name(first);
    }
    if let Some(last) = changes.last_name {
        editor.set_last_name(last);
    }
    if let Some(email) = changes.email {
        editor.set_email(email);
    }
    if let Some(path) = changes.avatar {
        let bytes =
            fs::read(&path).with_context(|| format!("Failed to read image: {:?}", path))?;
        if let Err(errors) = editor.choose_avatar(bytes) {
            ensure_valid(errors, output)?;
        }
    }

    if !editor.has_changes() {
        output.message("Nothing changed.");
        return Ok(());
    }

    match editor.save().await {
        Ok(outcome) => {
            output.success("Profile saved");
            if let Some(url) = outcome.avatar_url {
                output.message(&format!("Avatar: {}", url));
            }
            Ok(())
        }
        Err(ProfileError::Invalid(errors)) => ensure_valid(errors, output),
        Err(e) => Err(e.into()),
    }
}
