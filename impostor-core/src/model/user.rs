use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::source::SourceTables;

/// Aliases of a user, as reported in statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasInfo {
	/// Every alias attached to the user.
	pub aliases: Vec<String>,
	/// The name the caller asked for, when it differs from the canonical nick.
	pub requested_nick: Option<String>,
}

/// Snapshot of one user's statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatistics {
	pub nick: String,
	/// `None` when the user has no aliases.
	pub aliases: Option<AliasInfo>,
	pub production_count: usize,
	pub quotes_requested: u64,
}

/// Persisted part of a user's state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedUserStats {
	pub quotes_requested: u64,
}

/// One chat participant: learned tables plus usage bookkeeping.
///
/// # Invariants
/// - `tables` and `production_count` never change after construction
/// - `quotes_requested` only grows through `increment_quotes_requested`
///   (or is restored once from a snapshot)
#[derive(Debug)]
pub struct UserRecord {
	nick: String,
	tables: SourceTables,
	production_count: usize,
	quotes_requested: u64,
	aliases: BTreeSet<String>,
}

impl UserRecord {
	pub fn new(nick: &str, tables: SourceTables) -> Self {
		let production_count = tables.production_count();
		Self {
			nick: nick.to_owned(),
			tables,
			production_count,
			quotes_requested: 0,
			aliases: BTreeSet::new(),
		}
	}

	pub fn nick(&self) -> &str {
		&self.nick
	}

	pub fn tables(&self) -> &SourceTables {
		&self.tables
	}

	pub fn starter_count(&self) -> usize {
		self.tables.starters.len()
	}

	pub fn production_count(&self) -> usize {
		self.production_count
	}

	pub fn quotes_requested(&self) -> u64 {
		self.quotes_requested
	}

	pub fn aliases(&self) -> impl Iterator<Item = &str> {
		self.aliases.iter().map(String::as_str)
	}

	/// Attaches aliases. Calling it again with the same names changes nothing.
	pub fn init_aliases<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.aliases.extend(names.into_iter().map(Into::into));
	}

	pub fn increment_quotes_requested(&mut self) {
		self.quotes_requested += 1;
	}

	pub fn set_persisted(&mut self, stats: PersistedUserStats) {
		self.quotes_requested = stats.quotes_requested;
	}

	pub fn persisted(&self) -> PersistedUserStats {
		PersistedUserStats { quotes_requested: self.quotes_requested }
	}

	/// Builds a statistics snapshot for a lookup made under `requested_nick`.
	pub fn statistics(&self, requested_nick: &str) -> UserStatistics {
		let aliases = if self.aliases.is_empty() {
			None
		} else {
			Some(AliasInfo {
				aliases: self.aliases.iter().cloned().collect(),
				requested_nick: (requested_nick != self.nick).then(|| requested_nick.to_owned()),
			})
		};

		UserStatistics {
			nick: self.nick.clone(),
			aliases,
			production_count: self.production_count,
			quotes_requested: self.quotes_requested,
		}
	}
}
