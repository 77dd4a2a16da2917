//! Durable storage of per-user usage counters.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::error::{ImpostorError, Result};
use crate::model::user::PersistedUserStats;

/// Counter state keyed by canonical nick.
pub type UsageSnapshot = BTreeMap<String, PersistedUserStats>;

/// Where usage counters are loaded from and flushed to.
///
/// The registry treats failures as non-fatal: a failed `load` leaves every
/// counter at zero, a failed `save` is logged and retried at the next flush.
pub trait UsageStore: Send + std::fmt::Debug {
	fn load(&self) -> Result<UsageSnapshot>;
	fn save(&self, snapshot: &UsageSnapshot) -> Result<()>;
}

/// Snapshot stored as a postcard file.
#[derive(Clone, Debug)]
pub struct FileUsageStore {
	path: PathBuf,
}

impl FileUsageStore {
	pub fn new<P: Into<PathBuf>>(path: P) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl UsageStore for FileUsageStore {
	/// Loads the snapshot; a missing file is an empty snapshot.
	fn load(&self) -> Result<UsageSnapshot> {
		if !self.path.exists() {
			return Ok(UsageSnapshot::new());
		}
		let bytes = std::fs::read(&self.path).map_err(|e| ImpostorError::io(e, &self.path))?;
		Ok(postcard::from_bytes(&bytes)?)
	}

	/// Writes the snapshot through a temporary file, then renames it in place.
	fn save(&self, snapshot: &UsageSnapshot) -> Result<()> {
		let bytes = postcard::to_stdvec(snapshot)?;
		let parent = match self.path.parent() {
			Some(p) if !p.as_os_str().is_empty() => p,
			_ => Path::new("."),
		};

		let mut temp = NamedTempFile::new_in(parent).map_err(|e| ImpostorError::io(e, parent))?;
		temp.write_all(&bytes).map_err(|e| ImpostorError::io(e, temp.path()))?;
		temp.persist(&self.path).map_err(|e| ImpostorError::io(e.error, &self.path))?;
		Ok(())
	}
}

#[derive(Debug, Default)]
struct MemoryState {
	snapshot: UsageSnapshot,
	saves: usize,
}

/// In-memory store; clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct MemoryUsageStore {
	state: Arc<Mutex<MemoryState>>,
}

impl MemoryUsageStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store pre-filled with `snapshot`.
	pub fn with_snapshot(snapshot: UsageSnapshot) -> Self {
		let store = Self::default();
		store.state.lock().unwrap_or_else(PoisonError::into_inner).snapshot = snapshot;
		store
	}

	pub fn snapshot(&self) -> UsageSnapshot {
		self.state.lock().unwrap_or_else(PoisonError::into_inner).snapshot.clone()
	}

	/// Number of successful `save` calls so far.
	pub fn save_count(&self) -> usize {
		self.state.lock().unwrap_or_else(PoisonError::into_inner).saves
	}
}

impl UsageStore for MemoryUsageStore {
	fn load(&self) -> Result<UsageSnapshot> {
		Ok(self.snapshot())
	}

	fn save(&self, snapshot: &UsageSnapshot) -> Result<()> {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		state.snapshot = snapshot.clone();
		state.saves += 1;
		Ok(())
	}
}
