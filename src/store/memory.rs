//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::Credentials,
	store::{CredentialStore, StoreFuture},
};

/// Thread-safe storage backend that keeps credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<Credentials>>>);
impl MemoryStore {
	/// Creates a store pre-populated with `credentials`.
	pub fn with_credentials(credentials: Credentials) -> Self {
		Self(Arc::new(RwLock::new(Some(credentials))))
	}

	/// Returns the stored credentials without going through the async contract.
	pub fn snapshot(&self) -> Option<Credentials> {
		self.0.read().clone()
	}
}
impl CredentialStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<Credentials>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, credentials: Credentials) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(credentials);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, Option<Credentials>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.write().take()) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::TokenSecret;

	#[tokio::test]
	async fn latest_write_wins() {
		let store = MemoryStore::default();

		assert!(store.load().await.expect("Empty store load should succeed.").is_none());

		store
			.save(Credentials::new(TokenSecret::new("first")))
			.await
			.expect("First save should succeed.");
		store
			.save(Credentials::new(TokenSecret::new("second")))
			.await
			.expect("Second save should succeed.");

		let loaded = store
			.load()
			.await
			.expect("Store load should succeed.")
			.expect("Credentials should be present after save.");

		assert_eq!(loaded.access_token.expose(), "second");

		let cleared = store.clear().await.expect("Clearing the store should succeed.");

		assert!(cleared.is_some());
		assert!(store.snapshot().is_none());
	}
}
