use super::punctuation::{closing_opener, is_url};
use super::table::{ClosingTables, TransitionTable};
use super::token::{NGramKey, Token};

/// Everything learned from one corpus (or from several, once merged).
///
/// # Responsibilities
/// - Build starters, transitions, closing-tables and the URL pool from lines
/// - Merge with another corpus without touching either input
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceTables {
	/// Keys that began an observed line, with repeats.
	pub starters: Vec<NGramKey>,
	/// Generic successor table.
	pub transitions: TransitionTable,
	/// Successors that close a given bracket.
	pub closings: ClosingTables,
	/// Literal URLs behind every `Token::Url` placeholder.
	pub urls: Vec<String>,
}

impl SourceTables {
	/// Ingests a corpus, one message per line.
	///
	/// # Parameters
	/// - `lines`: the source lines
	/// - `lookback_len`: key length L (must be >= 1)
	///
	/// # Notes
	/// - Lines with fewer than `lookback_len` words are ignored.
	/// - The last key of every line gets a `Terminate` successor.
	pub fn ingest<I, S>(lines: I, lookback_len: usize) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut tables = Self::default();
		for line in lines {
			tables.add_line(line.as_ref(), lookback_len);
		}
		tables
	}

	/// Adds one line to the tables.
	pub fn add_line(&mut self, line: &str, lookback_len: usize) {
		if lookback_len == 0 {
			return;
		}
		let words: Vec<&str> = line.split_whitespace().collect();
		if words.len() < lookback_len {
			return;
		}

		let tokens: Vec<Token> = words
			.iter()
			.map(|word| {
				if is_url(word) {
					self.urls.push((*word).to_owned());
				}
				Token::from_raw(word)
			})
			.collect();

		// Tokens are never Terminate here, so keys always build
		let Some(starter) = NGramKey::new(&tokens[..lookback_len]) else {
			return;
		};
		self.starters.push(starter);

		for start in 0..=tokens.len() - lookback_len {
			let Some(key) = NGramKey::new(&tokens[start..start + lookback_len]) else {
				continue;
			};
			match tokens.get(start + lookback_len) {
				Some(successor) => {
					let raw = words[start + lookback_len];
					if let Some(opener) = closing_opener(raw) {
						self.closings.push(opener, key.clone(), successor.clone());
					}
					self.transitions.push(key, successor.clone());
				}
				None => self.transitions.push_terminate(key),
			}
		}
	}

	/// Total number of successor occurrences in the generic table.
	pub fn production_count(&self) -> usize {
		self.transitions.production_count()
	}

	/// Appends `other` to these tables (starters, successors and URLs).
	pub fn merge_from(&mut self, other: &Self) {
		self.starters.extend(other.starters.iter().cloned());
		self.transitions.merge_from(&other.transitions);
		self.closings.merge_from(&other.closings);
		self.urls.extend(other.urls.iter().cloned());
	}

	/// Returns a fresh copy holding `self` followed by `other`.
	pub fn merged(&self, other: &Self) -> Self {
		let mut result = self.clone();
		result.merge_from(other);
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn word(w: &str) -> Token {
		Token::Word(w.to_owned())
	}

	fn key(a: &str, b: &str) -> NGramKey {
		NGramKey::from_words(&[a, b])
	}

	#[test]
	fn single_line_round_trip() {
		let tables = SourceTables::ingest(["a b c d"], 2);

		assert_eq!(tables.starters, vec![key("a", "b")]);
		assert_eq!(tables.transitions.len(), 3);
		assert_eq!(tables.transitions.get(&key("a", "b")), Some(&[word("c")][..]));
		assert_eq!(tables.transitions.get(&key("b", "c")), Some(&[word("d")][..]));
		assert_eq!(tables.transitions.get(&key("c", "d")), Some(&[Token::Terminate][..]));
	}

	#[test]
	fn several_lines() {
		let tables = SourceTables::ingest(["a b c d", "a b c e", "f g h", "i j"], 2);

		assert_eq!(tables.starters.len(), 4);
		assert!(tables.starters.contains(&key("f", "g")));
		assert!(tables.starters.contains(&key("i", "j")));
		assert_eq!(tables.transitions.len(), 7);
		assert_eq!(tables.transitions.get(&key("a", "b")), Some(&[word("c"), word("c")][..]));
		assert_eq!(tables.transitions.get(&key("b", "c")), Some(&[word("d"), word("e")][..]));
		assert_eq!(tables.transitions.get(&key("c", "e")), Some(&[Token::Terminate][..]));
		assert_eq!(tables.transitions.get(&key("i", "j")), Some(&[Token::Terminate][..]));
	}

	#[test]
	fn short_lines_produce_nothing() {
		let tables = SourceTables::ingest(["single", "", "   "], 2);
		assert!(tables.starters.is_empty());
		assert!(tables.transitions.is_empty());

		let tables = SourceTables::ingest(["two words"], 3);
		assert!(tables.starters.is_empty());
		assert!(tables.transitions.is_empty());
	}

	#[test]
	fn terminate_once_per_key() {
		let tables = SourceTables::ingest(["x y", "x y", "w x y"], 2);
		assert_eq!(tables.transitions.get(&key("x", "y")), Some(&[Token::Terminate][..]));
		assert_eq!(tables.transitions.get(&key("w", "x")), Some(&[word("y")][..]));
	}

	#[test]
	fn every_key_has_lookback_length() {
		let tables = SourceTables::ingest(["one two three four five", "six seven eight"], 3);
		for (key, successors) in tables.transitions.iter() {
			assert_eq!(key.len(), 3);
			assert!(!successors.is_empty());
		}
	}

	#[test]
	fn closing_successors_go_to_both_tables() {
		let tables = SourceTables::ingest(["we (like this) ok"], 2);

		assert_eq!(tables.closings.get('(', &key("we", "(like")), Some(&[word("this)")][..]));
		assert_eq!(tables.transitions.get(&key("we", "(like")), Some(&[word("this)")][..]));
		assert_eq!(tables.closings.get('(', &key("(like", "this)")), None);
	}

	#[test]
	fn emoticons_never_reach_closing_tables() {
		let tables = SourceTables::ingest(["so happy :) today", "very sad ): now", "big grin >:)."], 2);
		assert!(tables.closings.is_empty());
		assert_eq!(tables.transitions.get(&key("so", "happy")), Some(&[word(":)")][..]));
	}

	#[test]
	fn closing_entries_are_subset_of_transitions() {
		let tables = SourceTables::ingest(["a (b c) d [e f] \"g h\"", "a (b x) y"], 2);
		for (_, table) in tables.closings.iter() {
			for (key, successors) in table.iter() {
				let generic = tables.transitions.get(key).unwrap_or_default();
				for successor in successors {
					assert!(generic.contains(successor));
				}
			}
		}
		assert!(tables.closings.table('(').is_some());
		assert!(tables.closings.table('[').is_some());
		assert!(tables.closings.table('"').is_some());
	}

	#[test]
	fn urls_are_pooled_and_replaced() {
		let tables = SourceTables::ingest(["look at https://example.org/a now", "www.example.org is good"], 2);

		assert_eq!(tables.urls, vec!["https://example.org/a".to_owned(), "www.example.org".to_owned()]);
		assert_eq!(tables.transitions.get(&key("look", "at")), Some(&[Token::Url][..]));
		assert!(tables.starters.contains(&NGramKey::new(&[Token::Url, word("is")]).unwrap()));
	}

	#[test]
	fn balanced_url_does_not_close() {
		let tables = SourceTables::ingest(["see (this https://en.wikipedia.org/wiki/Cat_(animal) page"], 2);
		assert!(tables.closings.is_empty());
	}

	#[test]
	fn merged_keeps_both_weights() {
		let left = SourceTables::ingest(["a b c"], 2);
		let right = SourceTables::ingest(["a b d", "x y z"], 2);
		let merged = left.merged(&right);

		assert_eq!(merged.starters.len(), 3);
		assert_eq!(merged.transitions.get(&key("a", "b")), Some(&[word("c"), word("d")][..]));
		assert_eq!(left, SourceTables::ingest(["a b c"], 2));
	}
}
