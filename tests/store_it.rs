// std
use std::{env, fs, process, sync::Arc};
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use refresh_gate::{
	auth::{Credentials, TokenSecret},
	store::{CredentialStore, FileStore, MemoryStore},
};

fn build_credentials(access: &str, refresh: Option<&str>) -> Credentials {
	let issued = macros::datetime!(2025-11-10 12:00 UTC);
	let mut credentials = Credentials::new(TokenSecret::new(access))
		.with_issued_at(issued)
		.expires_in(Duration::hours(1))
		.expect("A one-hour lifetime should be representable.");

	if let Some(value) = refresh {
		credentials = credentials.with_refresh_token(TokenSecret::new(value));
	}

	credentials
}

#[tokio::test]
async fn memory_store_clones_share_latest_write() {
	let store = MemoryStore::default();
	let reader = store.clone();

	assert!(reader.load().await.expect("Empty store should load.").is_none());

	store
		.save(build_credentials("access-1", Some("refresh-1")))
		.await
		.expect("Saving credentials into memory store should succeed.");
	store
		.save(build_credentials("access-2", None))
		.await
		.expect("Overwriting credentials should succeed.");

	let fetched = reader
		.load()
		.await
		.expect("Loading credentials should succeed.")
		.expect("Stored credentials should remain present.");

	assert_eq!(fetched.access_token.expose(), "access-2");
	assert!(fetched.refresh_token.is_none());
	assert_eq!(fetched.expires_at, Some(macros::datetime!(2025-11-10 13:00 UTC)));

	let cleared = store.clear().await.expect("Clearing should succeed.");

	assert_eq!(cleared.map(|c| c.access_token.expose().to_owned()).as_deref(), Some("access-2"));
	assert!(reader.snapshot().is_none());
}

#[tokio::test]
async fn stores_work_behind_trait_objects() {
	let path = env::temp_dir().join(format!(
		"refresh_gate_store_it_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	));
	let stores: Vec<Arc<dyn CredentialStore>> = vec![
		Arc::new(MemoryStore::default()),
		Arc::new(FileStore::open(&path).expect("File store should open in the temp dir.")),
	];

	for store in &stores {
		store
			.save(build_credentials("access-dyn", Some("refresh-dyn")))
			.await
			.expect("Saving through the trait object should succeed.");

		let fetched = store
			.load()
			.await
			.expect("Loading through the trait object should succeed.")
			.expect("Credentials should be present after save.");

		assert_eq!(fetched.bearer(), "Bearer access-dyn");
		assert_eq!(fetched.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-dyn"));
	}

	let reopened = FileStore::open(&path).expect("File store should reopen.");

	assert_eq!(
		reopened
			.load()
			.await
			.expect("Reopened store should load.")
			.map(|c| c.access_token.expose().to_owned())
			.as_deref(),
		Some("access-dyn")
	);

	fs::remove_file(&path).expect("Temporary store file should be removable.");
}
