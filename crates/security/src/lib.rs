//! Token derivation and transparent per-field model encryption.
//!
//! - [`token`] derives static keys and time-scoped verifiable tokens from the
//!   application secret.
//! - [`crypto`] seals single values with AES-256-GCM-SIV.
//! - [`model`] applies the cipher to declared record fields at the
//!   persist / load boundary.
//! - [`context`] wires the three together from [`config`].

pub mod config;
pub mod context;
pub mod crypto;
pub mod model;
pub mod token;

pub use common::{RecordLine, SecurityError};
pub use config::SecurityConfig;
pub use context::SecurityContext;
pub use model::{FieldCipher, Model, Record};
pub use token::{TokenDeriver, TokenScope};
