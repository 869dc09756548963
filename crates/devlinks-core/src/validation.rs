//! Input validation
//!
//! Liberal, regex-based checks for user input. These are heuristics for
//! catching typos before a save, not strict grammar validation.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::LinkEntry;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i-u:https?://)?[A-Za-z0-9_.-]+(\.[A-Za-z]{2,})+([/?#].*)?$")
        .expect("valid URL regex")
});

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3,}$").expect("valid name regex"));

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PASSWORD_CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\d]{8,}$").expect("valid password regex"));

/// Largest accepted avatar edge, in pixels
pub const MAX_AVATAR_DIMENSION: u32 = 1024;

/// Check a link URL. Scheme-less hostnames are accepted.
pub fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

/// A URL that can be opened, adding `https://` to scheme-less input
pub fn absolute_url(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Check a first or last name: letters only, at least three
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Check a password: at least 8 letters/digits with at least one of each
pub fn is_valid_password(password: &str) -> bool {
    PASSWORD_CHARSET_RE.is_match(password)
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// A problem with a single link entry that blocks saving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkIssue {
    /// No platform picked
    MissingType,
    /// URL does not look like a URL
    InvalidUrl,
}

impl LinkIssue {
    /// Inline message for the offending field
    pub fn message(self) -> &'static str {
        match self {
            LinkIssue::MissingType => "Please choose a platform.",
            LinkIssue::InvalidUrl => "Please check the URL.",
        }
    }
}

/// Collect the issues of one entry (empty when the entry can be saved)
pub fn validate_entry(entry: &LinkEntry) -> Vec<LinkIssue> {
    let mut issues = Vec::new();
    if entry.link_type.is_none() {
        issues.push(LinkIssue::MissingType);
    }
    if !is_valid_url(&entry.url) {
        issues.push(LinkIssue::InvalidUrl);
    }
    issues
}

/// Image formats accepted for avatars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Why an avatar image was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvatarError {
    #[error("Image must be in PNG or JPG format.")]
    UnsupportedFormat,

    #[error("Image must be below 1024x1024px (got {width}x{height}).")]
    TooLarge { width: u32, height: u32 },

    #[error("Image header could not be read.")]
    Unreadable,
}

/// Validate avatar bytes: PNG or JPEG, at most 1024px on each edge
pub fn validate_avatar(bytes: &[u8]) -> Result<ImageFormat, AvatarError> {
    let (format, (width, height)) = if bytes.starts_with(PNG_SIGNATURE) {
        (ImageFormat::Png, png_dimensions(bytes)?)
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        (ImageFormat::Jpeg, jpeg_dimensions(bytes)?)
    } else {
        return Err(AvatarError::UnsupportedFormat);
    };

    if width > MAX_AVATAR_DIMENSION || height > MAX_AVATAR_DIMENSION {
        return Err(AvatarError::TooLarge { width, height });
    }
    Ok(format)
}

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Width and height from the IHDR chunk, which must come first
fn png_dimensions(bytes: &[u8]) -> Result<(u32, u32), AvatarError> {
    if bytes.len() < 24 || &bytes[12..16] != b"IHDR" {
        return Err(AvatarError::Unreadable);
    }
    Ok((read_u32_be(&bytes[16..20]), read_u32_be(&bytes[20..24])))
}

/// Width and height from the first start-of-frame marker
fn jpeg_dimensions(bytes: &[u8]) -> Result<(u32, u32), AvatarError> {
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(AvatarError::Unreadable);
        }
        let marker = bytes[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // Standalone markers carry no length
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 {
            return Err(AvatarError::Unreadable);
        }
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            // length(2) precision(1) height(2) width(2)
            if pos + 9 > bytes.len() {
                return Err(AvatarError::Unreadable);
            }
            let height = u16::from_be_bytes([bytes[pos + 5], bytes[pos + 6]]) as u32;
            let width = u16::from_be_bytes([bytes[pos + 7], bytes[pos + 8]]) as u32;
            return Ok((width, height));
        }
        pos += 2 + len;
    }
    Err(AvatarError::Unreadable)
}

fn read_u32_be(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Platform;

    /// Minimal PNG header with the given dimensions
    pub(crate) fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes
    }

    /// Minimal JPEG header: SOI, an APP0 segment, then SOF0
    fn jpeg_header(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00]);
        bytes
    }

    #[test]
    fn test_url_examples() {
        assert!(is_valid_url("github.com/alice"));
        assert!(is_valid_url("https://github.com/a"));
        assert!(is_valid_url("http://www.youtube.com/watch?v=abc"));
        assert!(is_valid_url("HTTPS://LinkedIn.COM/in/bob"));
        assert!(is_valid_url("instagram.com#top"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("localhost"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("ftp://github.com"));
        assert!(!is_valid_url("github.c"));
    }

    #[test]
    fn test_url_hostnames_are_ascii() {
        assert!(!is_valid_url("bücher.de"));
        assert!(!is_valid_url("пример.com"));
        // Kelvin sign folds to 'k' under Unicode case folding
        assert!(!is_valid_url("github.\u{212A}z"));
        assert!(is_valid_url("github.com/ünïcode-path"));
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("github.com/alice"), "https://github.com/alice");
        assert_eq!(absolute_url("http://x.io"), "http://x.io");
        assert_eq!(absolute_url("HTTPS://X.io"), "HTTPS://X.io");
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("Alice"));
        assert!(is_valid_name("Bob"));
        assert!(!is_valid_name("Al"));
        assert!(!is_valid_name("Mary-Jane"));
        assert!(!is_valid_name("Zoë"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alex@email.com"));
        assert!(!is_valid_email("alex@email"));
        assert!(!is_valid_email("alex email@x.com"));
        assert!(!is_valid_email("@x.com"));
    }

    #[test]
    fn test_password_validation() {
        assert!(is_valid_password("abcdefg1"));
        assert!(is_valid_password("1234567a"));
        assert!(!is_valid_password("abcdefgh"));
        assert!(!is_valid_password("12345678"));
        assert!(!is_valid_password("abc1"));
        assert!(!is_valid_password("abcdefg1!"));
    }

    #[test]
    fn test_validate_entry() {
        assert!(validate_entry(&LinkEntry::new(Platform::GitHub, "github.com/a")).is_empty());
        assert_eq!(
            validate_entry(&LinkEntry::blank()),
            vec![LinkIssue::MissingType, LinkIssue::InvalidUrl]
        );
        assert_eq!(
            validate_entry(&LinkEntry::new(Platform::YouTube, "not a url")),
            vec![LinkIssue::InvalidUrl]
        );
    }

    #[test]
    fn test_avatar_png() {
        assert_eq!(validate_avatar(&png_header(512, 512)), Ok(ImageFormat::Png));
        assert_eq!(validate_avatar(&png_header(1024, 1024)), Ok(ImageFormat::Png));
        assert_eq!(
            validate_avatar(&png_header(2048, 100)),
            Err(AvatarError::TooLarge {
                width: 2048,
                height: 100
            })
        );
    }

    #[test]
    fn test_avatar_jpeg() {
        assert_eq!(validate_avatar(&jpeg_header(800, 600)), Ok(ImageFormat::Jpeg));
        assert!(matches!(
            validate_avatar(&jpeg_header(640, 1200)),
            Err(AvatarError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_avatar_rejects_other_formats() {
        assert_eq!(validate_avatar(b"GIF89a...."), Err(AvatarError::UnsupportedFormat));
        assert_eq!(validate_avatar(&PNG_SIGNATURE[..]), Err(AvatarError::Unreadable));
        assert_eq!(validate_avatar(&[0xFF, 0xD8, 0xFF]), Err(AvatarError::Unreadable));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(ImageFormat::Png.content_type(), "image/png");
        assert_eq!(ImageFormat::Jpeg.content_type(), "image/jpeg");
    }
}
