//! Link command handlers
//!
//! Links are addressed by their 1-based position in creation order, as
//! printed by `devlinks links list`.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use devlinks_core::links::{EditorError, LinkEditor, LinkField, SaveOutcome};
use devlinks_core::{Platform, SupabaseClient};

use crate::output::Output;
use crate::prompt::confirm;

async fn open_editor(client: &Arc<SupabaseClient>) -> Result<LinkEditor<SupabaseClient>> {
    let user_id = client.user_id().await?;
    let mut editor = LinkEditor::new(client.clone(), user_id);
    editor.load().await?;
    Ok(editor)
}

/// Turn a 1-based position into a buffer index
fn position_to_index(position: usize, len: usize) -> Result<usize> {
    if position == 0 || position > len {
        bail!(
            "No link at position {} (there are {}). See `devlinks links list`.",
            position,
            len
        );
    }
    Ok(position - 1)
}

/// Save, printing validation problems inline
async fn save(editor: &mut LinkEditor<SupabaseClient>, output: &Output) -> Result<SaveOutcome> {
    match editor.save().await {
        Ok(outcome) => Ok(outcome),
        Err(EditorError::Invalid(issues)) => {
            output.print_link_issues(&issues);
            Err(anyhow!("Links not saved: {} link(s) need attention", issues.len()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn list(client: &Arc<SupabaseClient>, output: &Output) -> Result<()> {
    let editor = open_editor(client).await?;
    output.print_links(editor.entries());
    Ok(())
}

/// Add a link and save it
pub async fn add(
    client: &Arc<SupabaseClient>,
    platform: Platform,
    url: String,
    output: &Output,
) -> Result<()> {
    let mut editor = open_editor(client).await?;
    let index = editor.add_entry()?;
    editor.edit_entry(index, LinkField::Type, platform.name())?;
    editor.edit_entry(index, LinkField::Url, url.trim())?;

    save(&mut editor, output).await?;

    output.success(&format!("Added {} link", platform));
    output.print_links(editor.entries());
    Ok(())
}

/// Change the platform and/or URL of a link
pub async fn edit(
    client: &Arc<SupabaseClient>,
    position: usize,
    platform: Option<Platform>,
    url: Option<String>,
    output: &Output,
) -> Result<()> {
    if platform.is_none() && url.is_none() {
        bail!("Nothing to change. Pass --type and/or --url.");
    }

    let mut editor = open_editor(client).await?;
    let index = position_to_index(position, editor.entries().len())?;
    if let Some(platform) = platform {
        editor.edit_entry(index, LinkField::Type, platform.name())?;
    }
    if let Some(url) = url {
        editor.edit_entry(index, LinkField::Url, url.trim())?;
    }

    match save(&mut editor, output).await? {
        SaveOutcome::Unchanged => output.message("Nothing changed."),
        SaveOutcome::Saved { .. } => {
            output.success(&format!("Updated link {}", position));
            output.print_links(editor.entries());
        }
    }
    Ok(())
}

/// Delete a link immediately
pub async fn remove(client: &Arc<SupabaseClient>, position: usize, output: &Output) -> Result<()> {
    let mut editor = open_editor(client).await?;
    let index = position_to_index(position, editor.entries().len())?;

    if output.should_prompt() {
        let entry = &editor.entries()[index];
        println!(
            "Delete link {}: {} {}",
            position,
            entry.link_type.map(|p| p.name()).unwrap_or("(none)"),
            entry.url
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let removed = editor.remove_entry(index).await?;
    if let Some(e) = removed.remote_error {
        return Err(e).context("Failed to delete link");
    }

    output.success(&format!("Deleted link {}", position));
    Ok(())
}
