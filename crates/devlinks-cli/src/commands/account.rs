//! Account command handlers: sign-in, sign-up, recovery

use anyhow::{Context, Result};

use devlinks_core::forms::{LoginForm, RecoveryForm, RegisterForm, ResetForm};
use devlinks_core::{AuthProvider, Config, SignUpOutcome, SupabaseClient};

use super::ensure_valid;
use crate::output::{Output, OutputFormat};
use crate::prompt;

fn email_or_prompt(email: Option<String>) -> Result<String> {
    match email {
        Some(email) => Ok(email.trim().to_string()),
        None => prompt::line("Email"),
    }
}

/// Sign in with email and password
pub async fn login(client: &SupabaseClient, email: Option<String>, output: &Output) -> Result<()> {
    let form = LoginForm {
        email: email_or_prompt(email)?,
        password: prompt::password("Password")?,
    };
    ensure_valid(form.validate(), output)?;

    let session = client
        .sign_in(&form.email, &form.password)
        .await
        .context("Sign-in failed")?;

    output.success(&format!(
        "Signed in as {}",
        session.user.email.as_deref().unwrap_or(&form.email)
    ));
    Ok(())
}

/// Create an account
pub async fn register(
    client: &SupabaseClient,
    email: Option<String>,
    output: &Output,
) -> Result<()> {
    let form = RegisterForm {
        email: email_or_prompt(email)?,
        password: prompt::password("Password")?,
        confirm_password: prompt::password("Confirm password")?,
    };
    ensure_valid(form.validate(), output)?;

    match client
        .sign_up(&form.email, &form.password)
        .await
        .context("Registration failed")?
    {
        SignUpOutcome::ConfirmationSent { email } => {
            output.success(&format!(
                "Account created. Check {} for a confirmation link, then run `devlinks login`.",
                email
            ));
        }
        SignUpOutcome::SignedIn(session) => {
            output.success(&format!(
                "Account created and signed in as {}",
                session.user.email.as_deref().unwrap_or(&form.email)
            ));
        }
    }
    Ok(())
}

pub async fn logout(client: &SupabaseClient, output: &Output) -> Result<()> {
    client.sign_out().await?;
    output.success("Signed out");
    Ok(())
}

/// Email a password-recovery link
pub async fn recover(
    client: &SupabaseClient,
    config: &Config,
    email: String,
    output: &Output,
) -> Result<()> {
    let form = RecoveryForm {
        email: email.trim().to_string(),
    };
    ensure_valid(form.validate(), output)?;

    client
        .send_recovery(&form.email, config.recovery_redirect.as_deref())
        .await
        .context("Failed to send recovery email")?;

    output.success(&format!(
        "Password recovery email sent to {}. Follow the link, then run `devlinks reset --token <token>`.",
        form.email
    ));
    Ok(())
}

/// Set a new password with the token from a recovery link
pub async fn reset(client: &SupabaseClient, token: Option<String>, output: &Output) -> Result<()> {
    let token = match token {
        Some(token) => Some(token),
        None => Some(prompt::line("Reset token")?),
    }
    .filter(|t| !t.trim().is_empty());

    let form = ResetForm {
        token,
        new_password: prompt::password("New password")?,
        confirm_password: prompt::password("Confirm new password")?,
    };
    ensure_valid(form.validate(), output)?;

    // Validation guarantees the token is present
    let token = form.token.as_deref().unwrap_or_default();
    client
        .update_password(token.trim(), &form.new_password)
        .await
        .context("Failed to update password")?;

    output.success("Password updated. Sign in with `devlinks login`.");
    Ok(())
}

/// Show the signed-in user
pub async fn whoami(client: &SupabaseClient, output: &Output) -> Result<()> {
    let user = client.current_user().await?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "signed_in": user.is_some(),
                    "id": user.as_ref().map(|u| u.id),
                    "email": user.as_ref().and_then(|u| u.email.clone())
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(user) = user {
                println!("{}", user.id);
            }
        }
        OutputFormat::Human => match user {
            Some(user) => {
                println!("Signed in as {}", user.email.as_deref().unwrap_or("(no email)"));
                println!("User ID: {}", user.id);
            }
            None => println!("Not signed in. Run `devlinks login`."),
        },
    }
    Ok(())
}
