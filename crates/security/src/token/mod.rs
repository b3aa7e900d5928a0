//! Deterministic token derivation from the application secret.
//!
//! Two families of token come out of [`TokenDeriver`]:
//!
//! - **Static tokens** key the field cipher. They are never compared against
//!   user input. The raw 32 bytes are the AES key; the string form is hex.
//! - **Verifiable tokens** are handed out and later checked, optionally scoped
//!   to the current day or hour. Checking recomputes the expected tag and
//!   compares in constant time, so a token stops verifying once its bucket
//!   rolls over.
//!
//! # Derivation (scheme `v1`)
//!
//! ```text
//! HMAC-SHA256(key = app secret,
//!             msg = label || lp(context) || lp(suffix) [|| lp(bucket)])
//! ```
//!
//! `lp(x)` is `x` prefixed by its length as a big-endian `u64`, which keeps
//! `("ab", "c")` and `("a", "bc")` apart. Labels separate the two families.

pub mod clock;
pub mod secret;

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::NaiveDateTime;
use common::SecurityError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::crypto::KeyBytes;

pub use clock::{Clock, FixedClock, SystemClock};
pub use secret::ApplicationSecret;

type HmacSha256 = Hmac<Sha256>;

/// Domain label for static (key-derivation) tokens.
const STATIC_LABEL: &[u8] = b"phlexus.static-token.v1";

/// Domain label for verifiable user tokens.
const USER_LABEL: &[u8] = b"phlexus.user-token.v1";

/// Validity window of a verifiable token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    /// No time component; valid until the secret rotates.
    Unbounded,
    /// Valid for the current local calendar day (`%Y-%m-%d`).
    Day,
    /// Valid for the current local hour (`%Y-%m-%d %H`).
    Hour,
}

impl TokenScope {
    /// The time bucket appended to the derivation input, if any.
    pub fn bucket(self, now: NaiveDateTime) -> Option<String> {
        match self {
            TokenScope::Unbounded => None,
            TokenScope::Day => Some(now.format("%Y-%m-%d").to_string()),
            TokenScope::Hour => Some(now.format("%Y-%m-%d %H").to_string()),
        }
    }
}

/// Derives static keys and verifiable tokens from the application secret.
///
/// Holds no mutable state; share it behind an `Arc` between threads.
pub struct TokenDeriver {
    secret: ApplicationSecret,
    clock: Arc<dyn Clock>,
}

impl TokenDeriver {
    /// Create a deriver reading time from `clock`.
    pub fn new(secret: ApplicationSecret, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }

    /// Create a deriver on the host's local clock.
    pub fn with_system_clock(secret: ApplicationSecret) -> Self {
        Self::new(secret, Arc::new(SystemClock))
    }

    /// Raw 32-byte key for `(secret, context, suffix)`.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::ConfigurationMissing`] if `context` is blank.
    pub fn static_key(&self, context: &str, suffix: &str) -> Result<KeyBytes, SecurityError> {
        let context = require_context(context)?;
        let tag = self
            .keyed(STATIC_LABEL, &[context.as_bytes(), suffix.as_bytes()])?
            .finalize()
            .into_bytes();
        KeyBytes::from_slice(&tag)
    }

    /// Hex form of [`static_key`](Self::static_key): 64 lowercase characters.
    pub fn static_token(&self, context: &str, suffix: &str) -> Result<String, SecurityError> {
        self.static_key(context, suffix)
            .map(|key| hex::encode(key.as_bytes()))
    }

    /// Verifiable token scoped by `scope`, encoded as unpadded base64url.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::ConfigurationMissing`] if `context` is blank.
    pub fn token(
        &self,
        scope: TokenScope,
        context: &str,
        suffix: &str,
    ) -> Result<String, SecurityError> {
        let context = require_context(context)?;
        let tag = self
            .user_mac(scope, context, suffix)?
            .finalize()
            .into_bytes();
        Ok(URL_SAFE_NO_PAD.encode(tag))
    }

    /// Check `candidate` against the token for `(scope, context, suffix)` at
    /// the current time.
    ///
    /// Returns `false` on any mismatch, including a token minted in an
    /// earlier day or hour bucket.
    pub fn check(&self, scope: TokenScope, context: &str, suffix: &str, candidate: &str) -> bool {
        let Ok(context) = require_context(context) else {
            warn!(?scope, "token check with blank context hash");
            return false;
        };
        let Ok(presented) = URL_SAFE_NO_PAD.decode(candidate) else {
            return false;
        };
        match self.user_mac(scope, context, suffix) {
            Ok(mac) => mac.verify_slice(&presented).is_ok(),
            Err(_) => false,
        }
    }

    /// Token with no time component.
    pub fn verifiable_token(&self, context: &str, suffix: &str) -> Result<String, SecurityError> {
        self.token(TokenScope::Unbounded, context, suffix)
    }

    /// Token valid for the current local day.
    pub fn verifiable_token_for_date(
        &self,
        context: &str,
        suffix: &str,
    ) -> Result<String, SecurityError> {
        self.token(TokenScope::Day, context, suffix)
    }

    /// Token valid for the current local hour.
    pub fn verifiable_token_for_hour(
        &self,
        context: &str,
        suffix: &str,
    ) -> Result<String, SecurityError> {
        self.token(TokenScope::Hour, context, suffix)
    }

    /// Check a token minted by [`verifiable_token`](Self::verifiable_token).
    pub fn check_token(&self, context: &str, suffix: &str, candidate: &str) -> bool {
        self.check(TokenScope::Unbounded, context, suffix, candidate)
    }

    /// Check a token minted by
    /// [`verifiable_token_for_date`](Self::verifiable_token_for_date).
    pub fn check_token_for_date(&self, context: &str, suffix: &str, candidate: &str) -> bool {
        self.check(TokenScope::Day, context, suffix, candidate)
    }

    /// Check a token minted by
    /// [`verifiable_token_for_hour`](Self::verifiable_token_for_hour).
    pub fn check_token_for_hour(&self, context: &str, suffix: &str, candidate: &str) -> bool {
        self.check(TokenScope::Hour, context, suffix, candidate)
    }

    fn user_mac(
        &self,
        scope: TokenScope,
        context: &str,
        suffix: &str,
    ) -> Result<HmacSha256, SecurityError> {
        match scope.bucket(self.clock.now()) {
            Some(bucket) => self.keyed(
                USER_LABEL,
                &[context.as_bytes(), suffix.as_bytes(), bucket.as_bytes()],
            ),
            None => self.keyed(USER_LABEL, &[context.as_bytes(), suffix.as_bytes()]),
        }
    }

    fn keyed(&self, label: &[u8], parts: &[&[u8]]) -> Result<HmacSha256, SecurityError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.expose())
            .map_err(|e| SecurityError::InvalidKey(e.to_string()))?;
        mac.update(label);
        for part in parts {
            mac.update(&(part.len() as u64).to_be_bytes());
            mac.update(part);
        }
        Ok(mac)
    }
}

impl std::fmt::Debug for TokenDeriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDeriver")
            .field("secret", &self.secret)
            .finish_non_exhaustive()
    }
}

fn require_context(context: &str) -> Result<&str, SecurityError> {
    if context.trim().is_empty() {
        return Err(SecurityError::ConfigurationMissing("context hash is unset".into()));
    }
    Ok(context)
}
