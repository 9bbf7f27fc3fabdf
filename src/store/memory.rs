//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::CredentialRecord,
	store::{CredentialStore, StoreError, StoreFuture},
};

type Slot = Arc<RwLock<Option<CredentialRecord>>>;

/// Keeps the credential record in-process; contents are lost on drop.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	fn load_now(slot: Slot) -> Option<CredentialRecord> {
		slot.read().clone()
	}

	fn save_now(slot: Slot, record: CredentialRecord) -> Result<(), StoreError> {
		*slot.write() = Some(record);

		Ok(())
	}
}
impl CredentialStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<CredentialRecord>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::load_now(slot)) })
	}

	fn save(&self, record: CredentialRecord) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::save_now(slot, record) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record(access: &str, refresh: &str) -> CredentialRecord {
		CredentialRecord::builder()
			.access_token(access)
			.refresh_token(refresh)
			.access_expires_in(Duration::minutes(5))
			.refresh_expires_in(Duration::days(31))
			.build()
			.expect("Memory store fixture record should build.")
	}

	#[tokio::test]
	async fn empty_store_loads_none() {
		let store = MemoryStore::default();

		assert!(
			store.load().await.expect("Load should succeed on an empty store.").is_none(),
			"A fresh store must report the unauthenticated state.",
		);
	}

	#[tokio::test]
	async fn save_replaces_the_record_wholesale() {
		let store = MemoryStore::default();

		store.save(record("first-access", "first-refresh")).await.expect("First save should succeed.");
		store
			.save(record("second-access", "second-refresh"))
			.await
			.expect("Second save should succeed.");

		let loaded = store
			.load()
			.await
			.expect("Load should succeed after saves.")
			.expect("Record should be present after saves.");

		assert_eq!(loaded.access_token.expose(), "second-access");
		assert_eq!(loaded.refresh_token.expose(), "second-refresh");
	}
}
