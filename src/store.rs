//! Storage contracts and built-in store implementations for the credential record.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::CredentialRecord};

/// Boxed future returned by [`CredentialStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the singleton credential record.
///
/// A store holds at most one record per installation. Absence is a valid,
/// expected state (unauthenticated) and is never reported as an error.
/// `save` replaces the record wholesale; implementations must guarantee that
/// no concurrent reader ever observes a half-written record.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the persisted record, if present and well-formed.
	///
	/// A corrupted payload counts as absent rather than raising, so a damaged
	/// snapshot degrades to the unauthenticated state instead of wedging the
	/// caller.
	fn load(&self) -> StoreFuture<'_, Option<CredentialRecord>>;

	/// Persists the record, atomically replacing any previous one.
	fn save(&self, record: CredentialRecord) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_renders_message() {
		let err = StoreError::Serialization { message: "unexpected EOF".into() };

		assert_eq!(err.to_string(), "Serialization error: unexpected EOF.");
	}
}
