use std::fmt;

use super::punctuation::is_url;

/// A unit of source text as stored in the tables.
///
/// - `Word`: literal whitespace-delimited token
/// - `Url`: placeholder for a URL kept in the owner's URL pool
/// - `Terminate`: marks a key that ended an observed line
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
	Word(String),
	Url,
	Terminate,
}

impl Token {
	/// Classifies a raw source token, replacing URLs by the placeholder.
	pub fn from_raw(raw: &str) -> Self {
		if is_url(raw) {
			Token::Url
		} else {
			Token::Word(raw.to_owned())
		}
	}

	pub fn is_terminate(&self) -> bool {
		matches!(self, Token::Terminate)
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Word(w) => f.write_str(w),
			Token::Url => f.write_str("<url>"),
			Token::Terminate => f.write_str("<end>"),
		}
	}
}

/// Fixed-length lookup key made of consecutive tokens.
///
/// # Invariants
/// - The length equals the lookback length the owning table was built with
/// - Never contains `Token::Terminate`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NGramKey(Vec<Token>);

impl NGramKey {
	/// Builds a key from a window of tokens.
	///
	/// Returns `None` if the window contains the terminate sentinel.
	pub fn new(tokens: &[Token]) -> Option<Self> {
		if tokens.iter().any(Token::is_terminate) {
			return None;
		}
		Some(Self(tokens.to_vec()))
	}

	/// Builds a key from plain words (URLs become placeholders).
	pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
		Self(words.iter().map(|w| Token::from_raw(w.as_ref())).collect())
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn tokens(&self) -> &[Token] {
		&self.0
	}

	/// Returns true if the key starts with `prefix`.
	pub fn starts_with(&self, prefix: &[Token]) -> bool {
		self.0.starts_with(prefix)
	}

	/// Slides the window by one: drops the first token and appends `next`.
	pub fn shifted(&self, next: Token) -> Self {
		let mut tokens = Vec::with_capacity(self.0.len());
		tokens.extend(self.0.iter().skip(1).cloned());
		tokens.push(next);
		Self(tokens)
	}
}

impl fmt::Display for NGramKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut first = true;
		for token in &self.0 {
			if !first {
				f.write_str(" ")?;
			}
			write!(f, "{token}")?;
			first = false;
		}
		Ok(())
	}
}
