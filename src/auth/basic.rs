//! Basic-credential parsing and verification.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;

/// A username/secret pair for `Authorization: Basic` verification.
///
/// Comparison runs in constant time over both halves so a mismatched
/// username cannot be told apart from a mismatched secret by timing.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    secret: String,
}

impl BasicCredentials {
    /// Create a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Username half (safe to log).
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Parse an `Authorization` header value of the form
    /// `Basic <base64(username:secret)>`.
    ///
    /// Returns `None` for any other scheme or a malformed payload.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let encoded = value
            .strip_prefix("Basic ")
            .or_else(|| value.strip_prefix("basic "))?;
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        // The first colon terminates the username; the secret may contain more.
        let (username, secret) = decoded.split_once(':')?;
        Some(Self::new(username, secret))
    }

    /// Compare against a presented pair in constant time.
    #[must_use]
    pub fn matches(&self, presented: &Self) -> bool {
        let user_ok = self.username.as_bytes().ct_eq(presented.username.as_bytes());
        let secret_ok = self.secret.as_bytes().ct_eq(presented.secret.as_bytes());
        bool::from(user_ok & secret_ok)
    }
}

// Hand-written so the secret never reaches logs through `{:?}`.
impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}
