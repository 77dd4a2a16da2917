use std::collections::HashMap;

use super::token::{NGramKey, Token};

/// Map from an n-gram key to every successor observed after it.
///
/// Successors are kept as a list with repeats: a token seen three times after
/// a key is three times as likely to be drawn. `Token::Terminate` is stored at
/// most once per key, next to any literal successors.
///
/// # Invariants
/// - Every successor list is non-empty
/// - All keys share the same length
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionTable {
	entries: HashMap<NGramKey, Vec<Token>>,
}

impl TransitionTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one occurrence of `successor` after `key`.
	pub fn push(&mut self, key: NGramKey, successor: Token) {
		self.entries.entry(key).or_default().push(successor);
	}

	/// Records that `key` ended a line; repeated calls for one key are ignored.
	pub fn push_terminate(&mut self, key: NGramKey) {
		let successors = self.entries.entry(key).or_default();
		if !successors.contains(&Token::Terminate) {
			successors.push(Token::Terminate);
		}
	}

	pub fn get(&self, key: &NGramKey) -> Option<&[Token]> {
		self.entries.get(key).map(Vec::as_slice)
	}

	pub fn contains_key(&self, key: &NGramKey) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&NGramKey, &[Token])> {
		self.entries.iter().map(|(k, v)| (k, v.as_slice()))
	}

	/// Total number of successor occurrences across all keys.
	pub fn production_count(&self) -> usize {
		self.entries.values().map(Vec::len).sum()
	}

	/// Keys starting with `prefix`, sorted so that draws are reproducible.
	pub fn keys_with_prefix(&self, prefix: &[Token]) -> Vec<&NGramKey> {
		let mut keys: Vec<&NGramKey> = self.entries.keys().filter(|k| k.starts_with(prefix)).collect();
		keys.sort();
		keys
	}

	/// Appends every successor list of `other` to this table.
	///
	/// Lists are concatenated, not unioned, so both sources keep their weight.
	/// `other` is only read; its lists are cloned.
	pub fn merge_from(&mut self, other: &Self) {
		for (key, successors) in &other.entries {
			if let Some(existing) = self.entries.get_mut(key) {
				existing.extend(successors.iter().cloned());
			} else {
				self.entries.insert(key.clone(), successors.clone());
			}
		}
	}

	/// Returns a new table holding the concatenation of `self` and `other`.
	pub fn merged(&self, other: &Self) -> Self {
		let mut result = self.clone();
		result.merge_from(other);
		result
	}
}

/// One transition table per opening bracket, restricted to closing successors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClosingTables {
	tables: HashMap<char, TransitionTable>,
}

impl ClosingTables {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, opener: char, key: NGramKey, successor: Token) {
		self.tables.entry(opener).or_default().push(key, successor);
	}

	/// Successors of `key` that close `opener`.
	pub fn get(&self, opener: char, key: &NGramKey) -> Option<&[Token]> {
		self.tables.get(&opener)?.get(key)
	}

	pub fn table(&self, opener: char) -> Option<&TransitionTable> {
		self.tables.get(&opener)
	}

	pub fn iter(&self) -> impl Iterator<Item = (char, &TransitionTable)> {
		self.tables.iter().map(|(c, t)| (*c, t))
	}

	pub fn is_empty(&self) -> bool {
		self.tables.values().all(TransitionTable::is_empty)
	}

	pub fn merge_from(&mut self, other: &Self) {
		for (opener, table) in &other.tables {
			self.tables.entry(*opener).or_default().merge_from(table);
		}
	}

	pub fn merged(&self, other: &Self) -> Self {
		let mut result = self.clone();
		result.merge_from(other);
		result
	}
}
