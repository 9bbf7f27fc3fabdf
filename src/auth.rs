//! Credential domain models: redacted secrets and the persisted record.

pub mod record;
pub mod secret;

pub use record::*;
pub use secret::*;
