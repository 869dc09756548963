//! Backend error handling
//!
//! Typed errors for calls against the hosted backend (auth, tables and
//! object storage), with a classification of the common failure kinds.

use thiserror::Error;

/// Errors that can occur while talking to the backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend answered with a non-success status
    #[error("{endpoint} returned {status}: {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The request never completed (DNS, TLS, connection reset, timeout)
    #[error("Could not reach backend: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape
    #[error("Unexpected response from {endpoint}: {details}")]
    Decode { endpoint: String, details: String },

    /// The call needs a signed-in user and there is none
    #[error("Not signed in. Run `devlinks login` first.")]
    NotAuthenticated,

    /// Backend URL or key missing from configuration
    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

impl BackendError {
    /// Build an HTTP error from a status and raw response body
    pub fn from_response(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        BackendError::Http {
            endpoint: endpoint.into(),
            status,
            message: extract_message(body),
        }
    }

    /// HTTP status, when the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Http { status, .. } => Some(*status),
            BackendError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Missing row or object; callers usually treat this as an empty state
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Credentials rejected or session expired
    pub fn is_auth_error(&self) -> bool {
        matches!(self, BackendError::NotAuthenticated)
            || matches!(self.status(), Some(401) | Some(403))
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            _ if self.is_auth_error() => Some("Sign in again with `devlinks login`."),
            BackendError::Transport(_) => {
                Some("Check your network connection and the configured supabase_url.")
            }
            BackendError::NotConfigured(_) => Some(
                "Set supabase_url and supabase_anon_key with `devlinks config set`, \
                 or export DEVLINKS_SUPABASE_URL and DEVLINKS_SUPABASE_ANON_KEY.",
            ),
            _ => None,
        }
    }
}

/// Pull a human-readable message out of a backend error body
///
/// The table, auth and storage services each use a different JSON shape;
/// anything unrecognised is returned verbatim.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "(empty response)".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_shapes() {
        assert_eq!(
            extract_message(r#"{"code":"23505","message":"duplicate key","details":null}"#),
            "duplicate key"
        );
        assert_eq!(
            extract_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(extract_message(r#"{"code":400,"msg":"Signups not allowed"}"#), "Signups not allowed");
        assert_eq!(extract_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(extract_message(""), "(empty response)");
    }

    #[test]
    fn test_classification() {
        let err = BackendError::from_response("links", 404, "{}");
        assert!(err.is_not_found());
        assert!(!err.is_auth_error());

        let err = BackendError::from_response("auth/v1/user", 401, r#"{"msg":"JWT expired"}"#);
        assert!(err.is_auth_error());
        assert!(err.recovery_suggestion().is_some());
        assert!(err.to_string().contains("JWT expired"));

        assert!(BackendError::NotAuthenticated.is_auth_error());
        assert!(BackendError::NotConfigured("x".into()).recovery_suggestion().is_some());
    }
}
