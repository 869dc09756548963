//! Command handlers

pub mod account;
pub mod config;
pub mod links;
pub mod preview;
pub mod profile;
pub mod status;

use anyhow::{bail, Result};
use devlinks_core::forms::FieldErrors;

use crate::output::Output;

/// Stop with the field messages when a form did not validate
pub(crate) fn ensure_valid(errors: FieldErrors, output: &Output) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    output.print_field_errors(&errors);
    bail!("{} field(s) need attention", errors.len());
}
