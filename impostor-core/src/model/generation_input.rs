use super::registry::NickSpec;

/// Parameters of one generation request.
///
/// # Responsibilities
/// - Carry the requested authors (explicit or random)
/// - Carry an optional seed and the constraints applied to random picks
///
/// # Notes
/// - An empty `seed` means "start from a random starter".
/// - A seed shorter than the lookback length matches any key starting with it;
///   a longer seed is cut to the lookback length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationInput {
	/// Requested authors, in request order.
	pub nicks: Vec<NickSpec>,

	/// Seed words for the first key.
	pub seed: Vec<String>,

	/// Minimum number of starters a randomly picked author must have.
	pub random_min_starters: usize,

	/// Whether explicit requests count towards usage statistics.
	pub increment_usage: bool,
}

impl GenerationInput {
	/// Creates an input with no seed, no starter constraint and usage counting on.
	pub fn new(nicks: Vec<NickSpec>) -> Self {
		Self { nicks, seed: Vec::new(), random_min_starters: 0, increment_usage: true }
	}

	/// Single explicit author.
	pub fn for_nick(nick: &str) -> Self {
		Self::new(vec![NickSpec::explicit(nick)])
	}

	/// Sets the seed from whitespace-separated words.
	pub fn with_seed(mut self, seed: &str) -> Self {
		self.seed = seed.split_whitespace().map(str::to_owned).collect();
		self
	}

	pub fn with_random_min_starters(mut self, min_starters: usize) -> Self {
		self.random_min_starters = min_starters;
		self
	}

	pub fn with_increment_usage(mut self, increment_usage: bool) -> Self {
		self.increment_usage = increment_usage;
		self
	}
}
