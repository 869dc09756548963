//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use devlinks_core::Config;

use crate::output::{Output, OutputFormat};

/// Anon keys are long JWTs; show only the start
fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    if prefix.len() < key.len() {
        format!("{}…", prefix)
    } else {
        prefix
    }
}

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "supabase_url": config.supabase_url,
                    "supabase_anon_key": config.supabase_anon_key.as_deref().map(mask_key),
                    "avatar_bucket": config.avatar_bucket,
                    "recovery_redirect": config.recovery_redirect,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:          {}", config.data_dir.display());
            println!(
                "  supabase_url:      {}",
                config.supabase_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  supabase_anon_key: {}",
                config
                    .supabase_anon_key
                    .as_deref()
                    .map(mask_key)
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  avatar_bucket:     {}", config.avatar_bucket);
            println!(
                "  recovery_redirect: {}",
                config.recovery_redirect.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  log_file:          {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "supabase_url" => {
            config.supabase_url = optional(value.trim_end_matches('/'));
        }
        "supabase_anon_key" => {
            config.supabase_anon_key = optional(&value);
        }
        "avatar_bucket" => {
            if value.is_empty() {
                bail!("avatar_bucket cannot be empty");
            }
            config.avatar_bucket = value.clone();
        }
        "recovery_redirect" => {
            config.recovery_redirect = optional(&value);
        }
        "log_file" => {
            config.log_file = optional(&value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, supabase_url, supabase_anon_key, avatar_bucket, \
                 recovery_redirect, log_file",
                key
            );
        }
    }

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "supabase_anon_key" {
        mask_key(&value)
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("eyJhbGciOiJIUzI1NiJ9.x.y"), "eyJhbGci…");
        assert_eq!(mask_key("short"), "short");
    }

    #[test]
    fn test_set_writes_to_cli_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);
        let data_dir = temp_dir.path().join("data");

        set(
            "data_dir".to_string(),
            data_dir.display().to_string(),
            Some(&path),
            &output,
        )
        .unwrap();
        set(
            "supabase_url".to_string(),
            "https://demo.supabase.co/".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();
        set(
            "recovery_redirect".to_string(),
            "none".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(
            config.supabase_url.as_deref(),
            Some("https://demo.supabase.co")
        );
        assert!(config.recovery_redirect.is_none());
        assert_eq!(config.data_dir, data_dir);
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);
        assert!(set("sync_url".into(), "x".into(), Some(&path), &output).is_err());
    }
}
