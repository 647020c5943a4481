//! API keys held in `secrecy` boxes so they never reach a log line.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// A credential that formats as `[REDACTED]`.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// Borrow the raw value. Only for building an outbound auth header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// True for an empty or whitespace-only key.
    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_redacted_in_debug() {
        let key = SecretString::new("sk-live-123");
        assert_eq!(format!("{:?}", key), "[REDACTED]");
        assert_eq!(key.expose(), "sk-live-123");
        assert!(!key.is_blank());
        assert!(SecretString::new(" \n").is_blank());
    }
}
