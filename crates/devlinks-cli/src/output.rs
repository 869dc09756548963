//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use devlinks_core::forms::FieldErrors;
use devlinks_core::profile::{AvatarChoice, ProfileDraft};
use devlinks_core::validation::LinkIssue;
use devlinks_core::{AvatarDisplay, LinkEntry, PublicProfile};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print the link list, numbered from 1 in creation order
    pub fn print_links(&self, entries: &[LinkEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No links yet. Add one with `devlinks links add <platform> <url>`.");
                    return;
                }
                for (i, entry) in entries.iter().enumerate() {
                    let (name, color) = entry
                        .link_type
                        .map(|p| (p.name(), p.color()))
                        .unwrap_or(("(none)", "-"));
                    println!(
                        "{:>2}. {:<10} {:<8} {}",
                        i + 1,
                        name,
                        color,
                        truncate(&entry.url, 60)
                    );
                }
                println!("\n{} link(s)", entries.len());
            }
            OutputFormat::Json => print_json(&entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.url);
                }
            }
        }
    }

    /// Print per-link validation problems
    pub fn print_link_issues(&self, issues: &[(usize, Vec<LinkIssue>)]) {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<_> = issues
                    .iter()
                    .map(|(i, list)| {
                        serde_json::json!({
                            "position": i + 1,
                            "issues": list.iter().map(|issue| issue.message()).collect::<Vec<_>>()
                        })
                    })
                    .collect();
                println!("{}", serde_json::json!({"status": "invalid", "links": json}));
            }
            _ => {
                for (i, list) in issues {
                    for issue in list {
                        eprintln!("  link {}: {}", i + 1, issue.message());
                    }
                }
            }
        }
    }

    /// Print form errors next to their field names
    pub fn print_field_errors(&self, errors: &FieldErrors) {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "invalid", "fields": errors})
                );
            }
            _ => {
                for (field, message) in errors.iter() {
                    eprintln!("  {}: {}", field, message);
                }
            }
        }
    }

    /// Print the profile being edited
    pub fn print_profile(&self, draft: &ProfileDraft) {
        let avatar = match &draft.avatar {
            AvatarChoice::Remote(url) => Some(url.as_str()),
            _ => None,
        };
        match self.format {
            OutputFormat::Human => {
                println!("First name: {}", or_unset(&draft.first_name));
                println!("Last name:  {}", or_unset(&draft.last_name));
                println!("Email:      {}", or_unset(&draft.email));
                println!("Avatar:     {}", avatar.unwrap_or("(none)"));
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "first_name": draft.first_name,
                        "last_name": draft.last_name,
                        "email": draft.email,
                        "avatar_url": avatar
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", draft.full_name().trim());
            }
        }
    }

    /// Print a public profile the way the preview page shows it
    pub fn print_preview(&self, preview: &PublicProfile) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", preview.display_name());
                println!("{}", preview.display_email());
                match &preview.avatar {
                    AvatarDisplay::Image(url) => println!("Avatar: {}", url),
                    AvatarDisplay::Placeholder => println!("Avatar: (placeholder)"),
                }
                println!();
                if preview.links.is_empty() {
                    println!("No links.");
                }
                for (i, link) in preview.links.iter().enumerate() {
                    println!(
                        "{:>2}. {:<10} {}",
                        i + 1,
                        link.link_type.name(),
                        truncate(&link.url, 60)
                    );
                }
            }
            OutputFormat::Json => print_json(preview),
            OutputFormat::Quiet => {
                for link in &preview.links {
                    println!("{}", link.url);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", msg);
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
