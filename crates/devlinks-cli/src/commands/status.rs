//! Status command handler

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};

use devlinks_core::{Config, Session, SessionStore};

use crate::output::{Output, OutputFormat};

/// Show configuration and session status
pub fn show(config: &Config, config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config_file = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    let store = SessionStore::new(config.session_path());
    let session = match store.load() {
        Ok(session) => session,
        Err(e) => {
            output.warn(&format!("Ignoring unreadable session: {:#}", e));
            None
        }
    };
    let now = Utc::now();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_file,
                    "data_dir": config.data_dir,
                    "backend": {
                        "configured": config.is_backend_configured(),
                        "url": config.supabase_url,
                    },
                    "session": session.as_ref().map(|s| serde_json::json!({
                        "user_id": s.user.id,
                        "email": s.user.email,
                        "expires_at": expiry(s).map(|t| t.to_rfc3339()),
                        "expired": s.is_expired(now),
                    })),
                })
            );
        }
        OutputFormat::Quiet => {
            if let Some(session) = &session {
                println!("{}", session.user.id);
            }
        }
        OutputFormat::Human => {
            println!("devlinks Status");
            println!("===============");
            println!();
            println!("Config:");
            println!("  File:     {}", config_file.display());
            println!("  Data dir: {}", config.data_dir.display());
            println!();
            println!("Backend:");
            match (&config.supabase_url, config.is_backend_configured()) {
                (Some(url), true) => println!("  URL:    {}", url),
                _ => {
                    println!("  Status: not configured");
                    println!("  Set supabase_url and supabase_anon_key with `devlinks config set`.");
                }
            }
            println!();
            println!("Session:");
            match &session {
                Some(session) => {
                    println!(
                        "  User:    {}",
                        session.user.email.as_deref().unwrap_or("(no email)")
                    );
                    println!("  ID:      {}", session.user.id);
                    println!("  Expires: {}", describe_expiry(session, now));
                }
                None => println!("  Not signed in"),
            }
        }
    }

    Ok(())
}

fn expiry(session: &Session) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(session.expires_at, 0)
}

fn describe_expiry(session: &Session, now: DateTime<Utc>) -> String {
    let Some(at) = expiry(session) else {
        return "unknown".to_string();
    };
    let stamp = at.format("%Y-%m-%d %H:%M UTC");
    if session.is_expired(now) {
        format!("{} (expired, refreshed on next use)", stamp)
    } else {
        format!("{}", stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlinks_core::AuthUser;
    use uuid::Uuid;

    fn session(expires_at: i64) -> Session {
        Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at,
            user: AuthUser {
                id: Uuid::new_v4(),
                email: None,
            },
        }
    }

    #[test]
    fn test_describe_expiry() {
        let now = Utc::now();
        let fresh = describe_expiry(&session(now.timestamp() + 3600), now);
        assert!(fresh.ends_with("UTC"));

        let stale = describe_expiry(&session(now.timestamp() - 10), now);
        assert!(stale.contains("expired"));
    }
}
