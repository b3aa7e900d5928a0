//! AES-256-GCM-SIV field encryption primitives.
//!
//! This module has no knowledge of records or models. It seals and opens
//! single values under a [`KeyBytes`] handed in by the caller.
//!
//! # Ciphertext format
//!
//! ```text
//! v1.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext+tag)>
//! ```
//!
//! Associated data is the field name. The `v1` tag pins the whole scheme:
//! algorithm, key derivation label and associated data.

pub mod cipher;
pub mod key;

pub use cipher::{CipherError, SealedValue, SCHEME_VERSION};
pub use key::{KeyBytes, KEY_LEN};
