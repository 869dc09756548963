//! Preview command handler

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use devlinks_core::validation::absolute_url;
use devlinks_core::{load_public_profile, SupabaseClient};

use crate::output::Output;

/// Show the public profile of `user_id` (default: the signed-in user)
pub async fn show(
    client: &SupabaseClient,
    user_id: Option<Uuid>,
    open: Option<usize>,
    output: &Output,
) -> Result<()> {
    let user_id = match user_id {
        Some(id) => id,
        None => client.user_id().await?,
    };

    let preview = load_public_profile(client, user_id).await;
    output.print_preview(&preview);

    if let Some(position) = open {
        let Some(link) = position
            .checked_sub(1)
            .and_then(|i| preview.links.get(i))
        else {
            bail!(
                "No link at position {} (there are {})",
                position,
                preview.links.len()
            );
        };
        let url = absolute_url(&link.url);
        open::that(&url).with_context(|| format!("Failed to open {}", url))?;
        output.message(&format!("Opened {}", url));
    }

    Ok(())
}
