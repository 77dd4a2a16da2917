use crate::error::{ImpostorError, Result};

/// Static configuration of the generator.
///
/// Fields are public so callers can tweak individual values after
/// `GeneratorConfig::default()`; call `validate` before handing it to a loader.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
	/// Number of predecessor words in an n-gram key (L).
	pub lookback_len: usize,

	/// Maximum number of words in a generated line, starter included.
	pub max_words: usize,

	/// Size of the "biggest users" aggregate.
	pub biggest_users_count: usize,

	/// Size of the "most quoted" aggregate.
	pub most_quoted_count: usize,

	/// Number of usage increments between two counter flushes.
	pub changes_between_persistence: usize,

	/// Extension of per-user source files (without the dot).
	pub source_extension: String,

	/// Metadata file inside the source directory.
	pub meta_file_name: String,

	/// Alias file inside the source directory.
	pub merge_file_name: String,

	/// Usage snapshot file inside the source directory.
	pub usage_file_name: String,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			lookback_len: 2,
			max_words: 200,
			biggest_users_count: 3,
			most_quoted_count: 3,
			changes_between_persistence: 5,
			source_extension: "src".to_owned(),
			meta_file_name: "meta.info".to_owned(),
			merge_file_name: "merge.lst".to_owned(),
			usage_file_name: "users.bin".to_owned(),
		}
	}
}

impl GeneratorConfig {
	/// Checks the relations between fields.
	///
	/// # Errors
	/// - `lookback_len` is zero
	/// - `max_words` is smaller than `lookback_len` (a starter would not fit)
	/// - `changes_between_persistence` is zero
	pub fn validate(&self) -> Result<()> {
		if self.lookback_len == 0 {
			return Err(ImpostorError::InvalidConfig("lookback_len must be >= 1".to_owned()));
		}
		if self.max_words < self.lookback_len {
			return Err(ImpostorError::InvalidConfig(format!(
				"max_words ({}) must be >= lookback_len ({})",
				self.max_words, self.lookback_len
			)));
		}
		if self.changes_between_persistence == 0 {
			return Err(ImpostorError::InvalidConfig(
				"changes_between_persistence must be >= 1".to_owned(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_is_valid() {
		assert!(GeneratorConfig::default().validate().is_ok());
	}

	#[test]
	fn rejects_budget_smaller_than_key() {
		let config = GeneratorConfig { lookback_len: 3, max_words: 2, ..GeneratorConfig::default() };
		assert!(matches!(config.validate(), Err(ImpostorError::InvalidConfig(_))));
	}

	#[test]
	fn rejects_zero_lookback() {
		let config = GeneratorConfig { lookback_len: 0, ..GeneratorConfig::default() };
		assert!(config.validate().is_err());
	}
}
