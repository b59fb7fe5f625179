//! JSON-file [`CredentialStore`] for CLIs, bots, and other single-process deployments.
//!
//! The file holds a versioned snapshot. Every write goes to a sibling `.tmp` file that is synced
//! and renamed over the snapshot, so readers never observe a torn write. On Unix the snapshot is
//! created with mode `0600`.

// std
use std::{
	fs::{self, OpenOptions},
	io::{self, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	store::{CredentialStore, StoreError, StoreFuture},
};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Deserialize)]
struct VersionProbe {
	version: u32,
}

#[derive(Deserialize)]
struct Snapshot {
	credentials: Option<Credentials>,
}

/// Persists credentials to a JSON file after each mutation, serving reads from memory.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	cached: Arc<RwLock<Option<Credentials>>>,
}
impl FileStore {
	/// Opens the snapshot at `path`, creating parent directories as needed.
	///
	/// A missing or empty file yields an empty store.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		create_parent(&path)?;

		let cached = read_snapshot(&path)?;

		Ok(Self { path, cached: Arc::new(RwLock::new(cached)) })
	}

	/// Path of the backing JSON file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn write(&self, credentials: Option<&Credentials>) -> Result<(), StoreError> {
		let snapshot = SnapshotRef {
			version: SNAPSHOT_VERSION,
			saved_at: OffsetDateTime::now_utc(),
			credentials,
		};
		let bytes = serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
			message: format!("Failed to encode credential snapshot: {e}"),
		})?;
		let staging = self.path.with_extension("tmp");

		create_parent(&self.path)?;
		write_synced(&staging, &bytes).map_err(|e| backend("write", &staging, e))?;

		fs::rename(&staging, &self.path).map_err(|e| backend("replace", &self.path, e))
	}
}
impl CredentialStore for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<Credentials>> {
		Box::pin(async move { Ok(self.cached.read().clone()) })
	}

	fn save(&self, credentials: Credentials) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut cached = self.cached.write();

			self.write(Some(&credentials))?;
			*cached = Some(credentials);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, Option<Credentials>> {
		Box::pin(async move {
			let mut cached = self.cached.write();

			self.write(None)?;

			Ok(cached.take())
		})
	}
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
	version: u32,
	saved_at: OffsetDateTime,
	credentials: Option<&'a Credentials>,
}

fn read_snapshot(path: &Path) -> Result<Option<Credentials>, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(backend("read", path, e)),
	};

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(None);
	}

	let parse_error = |e: serde_json::Error| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	};
	let probe: VersionProbe = serde_json::from_slice(&bytes).map_err(parse_error)?;

	if probe.version != SNAPSHOT_VERSION {
		return Err(StoreError::Serialization {
			message: format!(
				"Unsupported snapshot version {} in {}",
				probe.version,
				path.display()
			),
		});
	}

	let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(parse_error)?;

	Ok(snapshot.credentials)
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
	match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		Some(parent) => fs::create_dir_all(parent).map_err(|e| backend("create", parent, e)),
		None => Ok(()),
	}
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
	let mut options = OpenOptions::new();

	options.write(true).create(true).truncate(true);

	#[cfg(unix)]
	{
		use std::os::unix::fs::OpenOptionsExt;

		options.mode(0o600);
	}

	let mut file = options.open(path)?;

	file.write_all(bytes)?;
	file.sync_all()
}

fn backend(action: &str, path: &Path, e: io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}
