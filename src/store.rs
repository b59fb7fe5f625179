//! Credential storage contract and built-in store implementations.
//!
//! Only the refresh orchestrator writes credentials; the authenticated client reads them once
//! per dispatch. Implementations must make the latest write visible to every subsequent read
//! in the same process.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::Credentials};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key-value persistence for the current credential pair.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored credentials, if any.
	fn load(&self) -> StoreFuture<'_, Option<Credentials>>;

	/// Persists or replaces the stored credentials.
	fn save(&self, credentials: Credentials) -> StoreFuture<'_, ()>;

	/// Removes the stored credentials, returning the previous value.
	fn clear(&self) -> StoreFuture<'_, Option<Credentials>>;
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
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("disk unavailable"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
