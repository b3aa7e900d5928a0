//! Common types and errors shared across `phlexus-security` crates.

pub mod error;
pub mod protocol;

pub use error::SecurityError;
pub use protocol::RecordLine;
