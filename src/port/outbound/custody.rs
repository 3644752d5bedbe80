//! Custody service port.
//!
//! Key generation and encryption are delegated to an external service. The
//! core stores the encrypted blob and the public handle, nothing else.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

/// Plaintext key material. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the plaintext.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// A freshly generated credential.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Public identifier (e.g. a deposit address).
    pub handle: String,
    pub secret: Secret,
}

#[async_trait]
pub trait Custody: Send + Sync {
    async fn generate_credential(&self) -> Result<Credential>;

    /// Encrypt key material into an opaque blob.
    async fn encrypt(&self, secret: &Secret) -> Result<String>;

    async fn decrypt(&self, blob: &str) -> Result<Secret>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret([REDACTED])");
        assert_eq!(secret.expose(), "hunter2");
    }
}
