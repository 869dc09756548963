//! Account and profile form validation
//!
//! Each form collects every problem at once so callers can show the
//! messages inline next to the offending fields.

use serde::Serialize;

use crate::validation::{is_valid_email, is_valid_name, is_valid_password};

/// Field name → message, in the order the fields were checked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field (the first message per field wins)
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field, message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, msg)| msg.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(name, msg)| (*name, msg.as_str()))
    }

    /// `Ok(())` when no field failed
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msg)| format!("{}: {}", field, msg))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

pub const INVALID_EMAIL: &str = "Invalid email format.";
pub const INVALID_PASSWORD: &str =
    "Password must contain at least 8 characters, including letters and numbers.";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match.";
pub const INVALID_RECOVERY_EMAIL: &str = "Please enter a valid email address.";
pub const INVALID_NEW_PASSWORD: &str =
    "Password must be at least 8 characters long and contain both letters and numbers.";
pub const MISSING_RESET_TOKEN: &str = "Missing or invalid reset token.";

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !is_valid_email(&self.email) {
            errors.insert("email", INVALID_EMAIL);
        }
        if !is_valid_password(&self.password) {
            errors.insert("password", INVALID_PASSWORD);
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !is_valid_email(&self.email) {
            errors.insert("email", INVALID_EMAIL);
        }
        if !is_valid_password(&self.password) {
            errors.insert("password", INVALID_PASSWORD);
        }
        if self.password != self.confirm_password {
            errors.insert("confirm_password", PASSWORD_MISMATCH);
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryForm {
    pub email: String,
}

impl RecoveryForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !is_valid_email(&self.email) {
            errors.insert("email", INVALID_RECOVERY_EMAIL);
        }
        errors
    }
}

/// Password reset from an emailed recovery token
#[derive(Debug, Clone, Default)]
pub struct ResetForm {
    pub token: Option<String>,
    pub new_password: String,
    pub confirm_password: String,
}

impl ResetForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            errors.insert("token", MISSING_RESET_TOKEN);
        }
        if !is_valid_password(&self.new_password) {
            errors.insert("new_password", INVALID_NEW_PASSWORD);
        } else if self.new_password != self.confirm_password {
            errors.insert("confirm_password", PASSWORD_MISMATCH);
        }
        errors
    }
}

pub const INVALID_FIRST_NAME: &str =
    "First name must be at least 3 letters long and contain only letters.";
pub const INVALID_LAST_NAME: &str =
    "Last name must be at least 3 letters long and contain only letters.";
pub const INVALID_PROFILE_EMAIL: &str = "Please enter a valid email address.";
pub const INVALID_AVATAR: &str = "Image must be below 1024x1024px and in PNG or JPG format.";

/// Profile details as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ProfileForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !is_valid_name(&self.first_name) {
            errors.insert("first_name", INVALID_FIRST_NAME);
        }
        if !is_valid_name(&self.last_name) {
            errors.insert("last_name", INVALID_LAST_NAME);
        }
        if !is_valid_email(&self.email) {
            errors.insert("email", INVALID_PROFILE_EMAIL);
        }
        errors
    }
}
