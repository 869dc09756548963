//! Interactive prompts
//!
//! Line, password and yes/no prompts for the account and profile commands.
//! When stdin is not a terminal, values are read as plain lines so the
//! commands can be scripted.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

fn read_line() -> Result<String> {
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let input = read_line()?.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Prompt for a value
pub fn line(prompt: &str) -> Result<String> {
    print!("{}: ", prompt);
    io::stdout().flush()?;
    Ok(read_line()?.trim().to_string())
}

/// Prompt with a default value, returns None if user keeps default
pub fn with_default(prompt: &str, default: &str) -> Result<Option<String>> {
    if default.is_empty() {
        print!("{}: ", prompt);
    } else {
        print!("{} [{}]: ", prompt, default);
    }
    io::stdout().flush()?;

    let input = read_line()?;
    let input = input.trim();
    if input.is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.to_string()))
    }
}

/// Prompt for a secret without echoing it
pub fn password(prompt: &str) -> Result<String> {
    print!("{}: ", prompt);
    io::stdout().flush()?;

    if !is_interactive() {
        return read_line();
    }

    enable_raw_mode()?;
    let result = read_hidden();
    disable_raw_mode()?;
    println!();
    result
}

fn read_hidden() -> Result<String> {
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(secret),
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    bail!("Cancelled");
                }
                KeyCode::Esc => bail!("Cancelled"),
                KeyCode::Char(c) => secret.push(c),
                _ => {}
            }
        }
    }
}
