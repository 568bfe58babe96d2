use std::fmt;
use std::sync::Arc;

use rand::RngCore as _;

use crate::Error;

/// The process-wide signing key.
///
/// Fixed at startup and injected explicitly wherever signing happens; never a hidden global.
/// Anyone holding this value can forge session cookies, so it must not be transmitted, logged,
/// or checked into source control. The `Debug` impl is redacted accordingly.
#[derive(Clone)]
pub struct Secret {
    bytes: Arc<[u8]>,
}

impl Secret {
    /// Create a secret from raw bytes. An empty secret is rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::MissingSecret);
        }
        Ok(Self {
            bytes: bytes.into(),
        })
    }

    /// Read the secret from an environment variable.
    ///
    /// An unset or empty variable is [`Error::MissingSecret`]; treat that as fatal at startup
    /// rather than falling back to a built-in default.
    pub fn from_env(var: &str) -> Result<Self, Error> {
        match std::env::var(var) {
            Ok(value) => Self::new(value.into_bytes()),
            Err(_) => Err(Error::MissingSecret),
        }
    }

    /// Generate a random 64-byte secret.
    ///
    /// Useful for tests and demos. A generated secret invalidates all previously issued
    /// cookies on restart, so real deployments should configure a stable one.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; 64];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            bytes: bytes.into(),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}
