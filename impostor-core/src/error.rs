//! Error type shared by the loaders and the usage store.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = ImpostorError> = std::result::Result<T, E>;

/// Failures that can surface while loading sources, metadata or usage snapshots.
///
/// Generation itself never fails: unknown nicks, exhausted walks and
/// unsatisfiable constraints are all reported as empty results.
#[derive(Debug, Error)]
pub enum ImpostorError {
	/// Configuration rejected by `GeneratorConfig::validate`.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
	/// Filesystem error, with the path involved when known.
	#[error("io error while processing {path:?}: {source}")]
	Io {
		source: std::io::Error,
		path: Option<PathBuf>,
	},
	/// A persisted snapshot could not be encoded or decoded.
	#[error("serialization error: {0}")]
	Serialization(String),
}

impl ImpostorError {
	/// Wraps an IO error together with the path that caused it.
	pub fn io<P: Into<PathBuf>>(source: std::io::Error, path: P) -> Self {
		Self::Io { source, path: Some(path.into()) }
	}
}

impl From<std::io::Error> for ImpostorError {
	fn from(source: std::io::Error) -> Self {
		Self::Io { source, path: None }
	}
}

impl From<postcard::Error> for ImpostorError {
	fn from(err: postcard::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}
