//! Bracket balancing helpers shared by ingestion and generation.
//!
//! Generated lines are stitched from fragments of different source lines, so
//! brackets opened in one fragment are rarely closed in the next. Ingestion
//! records which successors close which bracket; generation keeps a stack of
//! open brackets, cleans each emitted word against it and closes whatever is
//! still open at the end.

/// Opening bracket and its closing counterpart.
const BRACKET_PAIRS: [(char, char); 4] = [('(', ')'), ('[', ']'), ('{', '}'), ('"', '"')];

/// Tokens ignored by bracket matching.
const EXCEPTIONS: [&str; 8] = ["(:", "(:<", "):", "):<", ":(", ">:(", ":)", ">:)"];

/// Punctuation that may follow a closing bracket at the end of a word.
const SENTENCE_PUNCTUATION: [char; 6] = ['.', '?', '!', ',', ':', ';'];

const URL_PREFIXES: [&str; 3] = ["http://", "https://", "www."];

pub fn is_opener(c: char) -> bool {
	BRACKET_PAIRS.iter().any(|(open, _)| *open == c)
}

pub fn closer_for(opener: char) -> Option<char> {
	BRACKET_PAIRS.iter().find(|(open, _)| *open == opener).map(|(_, close)| *close)
}

pub fn opener_for(closer: char) -> Option<char> {
	BRACKET_PAIRS.iter().find(|(_, close)| *close == closer).map(|(open, _)| *open)
}

/// Returns true for emoticon-like tokens that must not affect bracket matching.
pub fn is_exception(word: &str) -> bool {
	EXCEPTIONS.contains(&word)
}

pub fn is_url(word: &str) -> bool {
	URL_PREFIXES.iter().any(|prefix| word.starts_with(prefix))
}

/// Strips trailing sentence punctuation (`. ? ! , : ;`).
pub fn trim_sentence_punctuation(word: &str) -> &str {
	word.trim_end_matches(SENTENCE_PUNCTUATION)
}

/// Checks whether every bracket inside `text` is closed in order.
///
/// Double quotes toggle: a quote closes the innermost open quote, otherwise opens one.
pub fn brackets_balanced(text: &str) -> bool {
	let mut open: Vec<char> = Vec::new();
	for c in text.chars() {
		if c == '"' {
			if open.last() == Some(&'"') {
				open.pop();
			} else {
				open.push(c);
			}
		} else if is_opener(c) {
			open.push(c);
		} else if let Some(opener) = opener_for(c) {
			if open.pop() != Some(opener) {
				return false;
			}
		}
	}
	open.is_empty()
}

/// Returns the opener whose closing-table a successor belongs to, if any.
///
/// A successor closes a bracket when its last character, once trailing
/// sentence punctuation is skipped, is a closing bracket. Emoticons and URLs
/// whose own brackets are balanced never qualify.
pub fn closing_opener(word: &str) -> Option<char> {
	if is_exception(word) {
		return None;
	}
	let tail = trim_sentence_punctuation(word);
	if tail.is_empty() || is_exception(tail) {
		return None;
	}
	if is_url(word) && brackets_balanced(word) {
		return None;
	}
	tail.chars().next_back().and_then(opener_for)
}

/// Stack of brackets opened so far in a generated line.
#[derive(Debug, Default)]
pub struct BracketStack {
	open: Vec<char>,
}

impl BracketStack {
	pub fn new() -> Self {
		Self::default()
	}

	/// Innermost open bracket.
	pub fn top(&self) -> Option<char> {
		self.open.last().copied()
	}

	pub fn is_empty(&self) -> bool {
		self.open.is_empty()
	}

	pub fn len(&self) -> usize {
		self.open.len()
	}

	/// Cleans one emitted word against the stack.
	///
	/// - Leading openers are pushed (not for exceptions, even with trailing punctuation).
	/// - The run of closers before any trailing sentence punctuation is read left
	///   to right: a closer matching the innermost open bracket pops it, any other
	///   closer is dropped.
	/// - The run stops where the remaining prefix is an exception.
	pub fn clean_word(&mut self, word: &str) -> String {
		if is_exception(trim_sentence_punctuation(word)) || (is_url(word) && brackets_balanced(word)) {
			return word.to_owned();
		}

		let mut lead = 0;
		for c in word.chars() {
			if !is_opener(c) {
				break;
			}
			self.open.push(c);
			lead += c.len_utf8();
		}

		let rest = &word[lead..];
		let (body, punctuation) = rest.split_at(trim_sentence_punctuation(rest).len());

		let mut start = body.len();
		while let Some(c) = body[..start].chars().next_back() {
			if is_exception(&word[..lead + start]) || opener_for(c).is_none() {
				break;
			}
			start -= c.len_utf8();
		}

		let mut cleaned = String::with_capacity(word.len());
		cleaned.push_str(&word[..lead]);
		cleaned.push_str(&body[..start]);
		for c in body[start..].chars() {
			if opener_for(c).is_some_and(|opener| self.open.last() == Some(&opener)) {
				self.open.pop();
				cleaned.push(c);
			}
		}
		cleaned.push_str(punctuation);
		cleaned
	}

	/// Closes every open bracket, innermost first, and empties the stack.
	pub fn close_all(&mut self) -> String {
		self.open.drain(..).rev().filter_map(closer_for).collect()
	}
}
