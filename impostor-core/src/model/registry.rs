use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::picker::Picker;
use super::source::SourceTables;
use super::user::{UserRecord, UserStatistics};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::io;
use crate::usage::{UsageSnapshot, UsageStore};

/// How a requested author is selected.
///
/// # Variants
/// - `Explicit(name)`: a nick or alias; must exist.
/// - `Random`: any user not already selected in the same request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NickSpec {
	Explicit(String),
	Random,
}

impl NickSpec {
	pub fn explicit<S: Into<String>>(name: S) -> Self {
		NickSpec::Explicit(name.into())
	}
}

/// A nick with an associated count (productions or quotes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NickAndCount {
	pub nick: String,
	pub count: u64,
}

/// Owner of every `UserRecord`.
///
/// # Responsibilities
/// - Resolve nick requests (explicit names, aliases, random picks) to canonical nicks
/// - Maintain the biggest-users and most-quoted aggregates
/// - Count usage and flush counters to the `UsageStore` in batches
///
/// # Invariants
/// - Every alias maps to an existing canonical nick
/// - No alias shadows a canonical nick
#[derive(Debug)]
pub struct UserRegistry {
	users: HashMap<String, UserRecord>,
	aliases: HashMap<String, String>,
	biggest_users: Vec<NickAndCount>,
	pending_changes: usize,
	biggest_users_count: usize,
	most_quoted_count: usize,
	changes_between_persistence: usize,
	store: Box<dyn UsageStore>,
}

impl UserRegistry {
	/// Creates an empty registry.
	pub fn new(config: &GeneratorConfig, store: Box<dyn UsageStore>) -> Self {
		Self {
			users: HashMap::new(),
			aliases: HashMap::new(),
			biggest_users: Vec::new(),
			pending_changes: 0,
			biggest_users_count: config.biggest_users_count,
			most_quoted_count: config.most_quoted_count,
			changes_between_persistence: config.changes_between_persistence.max(1),
			store,
		}
	}

	/// Builds a registry from a source directory.
	///
	/// # Behavior
	/// - Ingests every `*.<source_extension>` file in parallel; the nick is the file stem.
	/// - Computes the biggest-users aggregate (before aliases are attached).
	/// - Applies the alias file, then restores counters from `store`.
	///
	/// # Errors
	/// - Invalid configuration, or the directory cannot be listed.
	///
	/// # Notes
	/// - Unreadable source files, a malformed alias file or a malformed usage
	///   snapshot are logged and skipped.
	pub fn load<P: AsRef<Path>>(source_dir: P, config: &GeneratorConfig, store: Box<dyn UsageStore>) -> Result<Self> {
		config.validate()?;
		let folder = io::normalize_folder(source_dir.as_ref());
		let files = io::list_files(&folder, &config.source_extension)?;

		let mut registry = Self::new(config, store);
		for (nick, tables) in Self::ingest_files(files, config.lookback_len) {
			if !registry.add_source(&nick, tables) {
				debug!("source for {nick} has no usable lines, skipped");
			}
		}
		registry.finish_ingestion();

		match io::read_merge_info(folder.join(&config.merge_file_name)) {
			Ok(lines) => registry.apply_merge_info(lines),
			Err(e) => warn!("could not read alias file, continuing without aliases: {e}"),
		}
		registry.restore_counters();

		info!(
			"loaded {} users ({} aliases) from {}",
			registry.user_count(),
			registry.aliases.len(),
			folder.display()
		);
		Ok(registry)
	}

	/// Reads and ingests files on worker threads.
	///
	/// Files are split into chunks (CPU count * factor); each thread sends its
	/// results over a channel. The output is sorted by nick.
	fn ingest_files(files: Vec<PathBuf>, lookback_len: usize) -> Vec<(String, SourceTables)> {
		if files.is_empty() {
			return Vec::new();
		}
		let chunks = num_cpus::get() * 2;
		let chunk_size = files.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		for chunk in files.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<PathBuf> = chunk.to_vec();

			thread::spawn(move || {
				for path in chunk {
					let outcome = io::get_filename(&path).and_then(|nick| {
						let lines = io::read_file(&path)?;
						Ok((nick, SourceTables::ingest(lines, lookback_len)))
					});
					if tx.send((path, outcome)).is_err() {
						return;
					}
				}
			});
		}
		drop(tx);

		let mut sources = Vec::new();
		for (path, outcome) in rx.iter() {
			match outcome {
				Ok((nick, tables)) => {
					debug!(
						"ingested {nick}: {} starters, {} productions",
						tables.starters.len(),
						tables.production_count()
					);
					sources.push((nick, tables));
				}
				Err(e) => warn!("skipping source {}: {e}", path.display()),
			}
		}
		sources.sort_by(|a, b| a.0.cmp(&b.0));
		sources
	}

	/// Registers a user built from `tables`.
	///
	/// Returns false (and registers nothing) when the tables hold no transitions.
	pub fn add_source(&mut self, nick: &str, tables: SourceTables) -> bool {
		if tables.transitions.is_empty() {
			return false;
		}
		self.insert_record(UserRecord::new(nick, tables));
		true
	}

	/// Registers a record as-is, replacing any user with the same nick.
	pub fn insert_record(&mut self, record: UserRecord) {
		self.users.insert(record.nick().to_owned(), record);
	}

	/// Computes the aggregates that do not change after startup.
	pub fn finish_ingestion(&mut self) {
		let mut ordered: Vec<&UserRecord> = self.users.values().collect();
		ordered.sort_by(|a, b| b.production_count().cmp(&a.production_count()).then_with(|| a.nick().cmp(b.nick())));

		self.biggest_users = ordered
			.into_iter()
			.take(self.biggest_users_count)
			.map(|u| NickAndCount { nick: u.nick().to_owned(), count: u.production_count() as u64 })
			.collect();
	}

	/// Attaches aliases from `canonical alias alias...` lines.
	///
	/// Lines with fewer than two names or an unknown first name are skipped.
	/// An alias that is itself a canonical nick, or already belongs to another
	/// user, is ignored.
	pub fn apply_merge_info<I, S>(&mut self, lines: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		for line in lines {
			let names: Vec<&str> = line.as_ref().split_whitespace().collect();
			if names.len() < 2 {
				continue;
			}
			let Some(canonical) = self.canonical(names[0]).map(str::to_owned) else {
				continue;
			};

			let mut accepted = Vec::new();
			for alias in &names[1..] {
				if self.users.contains_key(*alias) {
					if *alias != canonical {
						warn!("alias {alias} of {canonical} is already a user, ignored");
					}
					continue;
				}
				if let Some(owner) = self.aliases.get(*alias).filter(|owner| **owner != canonical) {
					warn!("alias {alias} of {canonical} already belongs to {owner}, ignored");
					continue;
				}
				self.aliases.insert((*alias).to_owned(), canonical.clone());
				accepted.push(*alias);
			}

			if let Some(user) = self.users.get_mut(&canonical) {
				user.init_aliases(accepted);
			}
		}
	}

	/// Restores usage counters from the store; failures leave counters untouched.
	pub fn restore_counters(&mut self) {
		match self.store.load() {
			Ok(snapshot) => self.apply_snapshot(&snapshot),
			Err(e) => warn!("could not load usage counters, starting from zero: {e}"),
		}
	}

	/// Applies persisted counters; unknown nicks are ignored.
	pub fn apply_snapshot(&mut self, snapshot: &UsageSnapshot) {
		for (nick, stats) in snapshot {
			if let Some(user) = self.users.get_mut(nick) {
				user.set_persisted(*stats);
			}
		}
	}

	/// Writes every counter to the store. A failure is logged, never returned.
	pub fn flush(&mut self) {
		let snapshot: UsageSnapshot = self.users.values().map(|u| (u.nick().to_owned(), u.persisted())).collect();
		if let Err(e) = self.store.save(&snapshot) {
			warn!("could not persist usage counters: {e}");
		}
		self.pending_changes = 0;
	}

	fn record_usage(&mut self, canonical: &str) {
		if let Some(user) = self.users.get_mut(canonical) {
			user.increment_quotes_requested();
			self.pending_changes += 1;
			if self.pending_changes >= self.changes_between_persistence {
				self.flush();
			}
		}
	}

	/// Canonical nick for a nick or alias.
	pub fn canonical(&self, name: &str) -> Option<&str> {
		if let Some((nick, _)) = self.users.get_key_value(name) {
			return Some(nick.as_str());
		}
		self.aliases.get(name).map(String::as_str)
	}

	/// Record for a nick or alias.
	pub fn get(&self, name: &str) -> Option<&UserRecord> {
		self.users.get(self.canonical(name)?)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.canonical(name).is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.users.is_empty()
	}

	/// Number of distinct users (aliases not counted).
	pub fn user_count(&self) -> usize {
		self.users.len()
	}

	pub fn pending_changes(&self) -> usize {
		self.pending_changes
	}

	/// Picks a random canonical nick not in `exclude` with at least `min_starters` starters.
	pub fn random_nick<P: Picker>(&self, exclude: &[String], min_starters: usize, picker: &mut P) -> Option<String> {
		let mut candidates: Vec<&str> = self
			.users
			.values()
			.filter(|u| u.starter_count() >= min_starters && !exclude.iter().any(|e| e == u.nick()))
			.map(UserRecord::nick)
			.collect();
		candidates.sort_unstable();
		picker.pick(&candidates).map(|nick| (*nick).to_owned())
	}

	/// Resolves nick requests to canonical nicks.
	///
	/// # Behavior
	/// - Explicit names that are unknown are dropped.
	/// - Each `Random` entry draws among users not yet resolved in this call.
	/// - The result has no duplicates and keeps first-resolution order.
	/// - With `increment_usage`, every explicit entry bumps its user's counter;
	///   random picks never do.
	pub fn real_nicks<P: Picker>(
		&mut self,
		specs: &[NickSpec],
		random_min_starters: usize,
		increment_usage: bool,
		picker: &mut P,
	) -> Vec<String> {
		let mut resolved: Vec<String> = Vec::new();

		for spec in specs {
			let nick = match spec {
				NickSpec::Explicit(name) => {
					let Some(canonical) = self.canonical(name).map(str::to_owned) else {
						continue;
					};
					if increment_usage {
						self.record_usage(&canonical);
					}
					canonical
				}
				NickSpec::Random => match self.random_nick(&resolved, random_min_starters, picker) {
					Some(nick) => nick,
					None => continue,
				},
			};

			if !resolved.contains(&nick) {
				resolved.push(nick);
			}
		}

		resolved
	}

	/// Tables for the given canonical nicks.
	///
	/// A single user is borrowed as-is; several users are merged into a new copy,
	/// so stored tables are never modified. Unknown nicks are skipped.
	pub fn corpus(&self, nicks: &[String]) -> Option<Cow<'_, SourceTables>> {
		let mut records = nicks.iter().filter_map(|nick| self.get(nick)).peekable();
		let first = records.next()?;
		if records.peek().is_none() {
			return Some(Cow::Borrowed(first.tables()));
		}

		let mut merged = first.tables().clone();
		for record in records {
			merged.merge_from(record.tables());
		}
		Some(Cow::Owned(merged))
	}

	pub fn biggest_users(&self) -> &[NickAndCount] {
		&self.biggest_users
	}

	/// Users with the most quote requests, zero counts excluded.
	pub fn most_quoted(&self) -> Vec<NickAndCount> {
		let mut quoted: Vec<&UserRecord> = self.users.values().filter(|u| u.quotes_requested() > 0).collect();
		quoted.sort_by(|a, b| b.quotes_requested().cmp(&a.quotes_requested()).then_with(|| a.nick().cmp(b.nick())));

		quoted
			.into_iter()
			.take(self.most_quoted_count)
			.map(|u| NickAndCount { nick: u.nick().to_owned(), count: u.quotes_requested() })
			.collect()
	}

	pub fn user_statistics(&self, name: &str) -> Option<UserStatistics> {
		self.get(name).map(|user| user.statistics(name))
	}

	/// Aliases of a user, empty for unknown users.
	pub fn user_aliases(&self, name: &str) -> Vec<String> {
		self.get(name).map(|user| user.aliases().map(str::to_owned).collect()).unwrap_or_default()
	}
}
