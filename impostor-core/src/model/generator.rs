use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::generation_input::GenerationInput;
use super::picker::{Picker, ThreadPicker};
use super::punctuation::BracketStack;
use super::registry::{NickAndCount, UserRegistry};
use super::source::SourceTables;
use super::token::{NGramKey, Token};
use super::user::UserStatistics;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::io;
use crate::usage::FileUsageStore;

/// Metadata key holding the primary source channel.
pub const META_PRIMARY: &str = "primary";
/// Metadata key holding the additional source channels.
pub const META_ADDITIONAL: &str = "additional";
/// Metadata key holding the date the sources were generated.
pub const META_DATE: &str = "date";

/// A generated line and the canonical nicks it was built from.
///
/// Both fields are empty when no requested author could be resolved or the
/// seed matched nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
	pub nicks: Vec<String>,
	pub text: String,
}

impl Quote {
	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}
}

/// Channels the source logs came from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChannels {
	pub primary: Option<String>,
	pub additionals: Vec<String>,
}

/// Statistics about the whole generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericStatistics {
	pub user_count: usize,
	/// Start time, in seconds since the Unix epoch.
	pub date_started: u64,
	pub date_generated: Option<String>,
	pub source_channels: SourceChannels,
	pub biggest_users: Vec<NickAndCount>,
	pub most_quoted: Vec<NickAndCount>,
}

/// High-level generator over every loaded user.
///
/// # Responsibilities
/// - Resolve requested authors through the `UserRegistry`
/// - Merge the tables of several authors into a temporary copy
/// - Walk the transition table from a starter or a seed, keeping brackets balanced
/// - Report per-user and generic statistics
///
/// All random draws go through `P`, so a deterministic picker gives
/// reproducible output.
#[derive(Debug)]
pub struct Generator<P = ThreadPicker> {
	registry: UserRegistry,
	meta: HashMap<String, Vec<String>>,
	date_started: u64,
	lookback_len: usize,
	max_words: usize,
	picker: P,
}

impl Generator<ThreadPicker> {
	/// Loads a generator from a source directory with the default configuration.
	pub fn new<Pa: AsRef<Path>>(source_dir: Pa) -> Result<Self> {
		Self::with_config(source_dir, &GeneratorConfig::default())
	}

	/// Loads a generator from a source directory.
	///
	/// # Behavior
	/// - Builds the `UserRegistry` from every source file in the directory.
	/// - Usage counters are persisted to `usage_file_name` inside the directory.
	/// - Metadata is read from `meta_file_name`; a malformed file is logged and ignored.
	///
	/// # Errors
	/// - Invalid configuration, or the directory cannot be listed.
	pub fn with_config<Pa: AsRef<Path>>(source_dir: Pa, config: &GeneratorConfig) -> Result<Self> {
		let folder = io::normalize_folder(source_dir.as_ref());
		let store = FileUsageStore::new(folder.join(&config.usage_file_name));
		let registry = UserRegistry::load(&folder, config, Box::new(store))?;

		let meta = match io::load_meta(folder.join(&config.meta_file_name)) {
			Ok(meta) => meta,
			Err(e) => {
				warn!("could not read metadata, continuing without it: {e}");
				HashMap::new()
			}
		};

		Ok(Self::from_parts(registry, meta, now_seconds(), config, ThreadPicker))
	}
}

impl<P: Picker> Generator<P> {
	/// Assembles a generator from already-built parts.
	pub fn from_parts(
		registry: UserRegistry,
		meta: HashMap<String, Vec<String>>,
		date_started: u64,
		config: &GeneratorConfig,
		picker: P,
	) -> Self {
		Self {
			registry,
			meta,
			date_started,
			lookback_len: config.lookback_len,
			max_words: config.max_words,
			picker,
		}
	}

	/// Replaces the source of randomness.
	pub fn with_picker<Q: Picker>(self, picker: Q) -> Generator<Q> {
		Generator {
			registry: self.registry,
			meta: self.meta,
			date_started: self.date_started,
			lookback_len: self.lookback_len,
			max_words: self.max_words,
			picker,
		}
	}

	pub fn registry(&self) -> &UserRegistry {
		&self.registry
	}

	/// True when no user could be loaded.
	pub fn is_empty(&self) -> bool {
		self.registry.is_empty()
	}

	/// Generates a line in the voice of the requested authors.
	///
	/// # Behavior
	/// - Resolves `input.nicks`; explicit requests may bump usage counters.
	/// - One author: walks its own tables. Several: walks a merged copy.
	/// - Picks the first key from the seed or from the starters.
	/// - Stops on a terminate marker, an unknown key, or after `max_words` words.
	///
	/// # Returns
	/// - An empty `Quote` if nobody resolved or the seed matched nothing.
	pub fn generate(&mut self, input: &GenerationInput) -> Quote {
		let nicks = self.registry.real_nicks(
			&input.nicks,
			input.random_min_starters,
			input.increment_usage,
			&mut self.picker,
		);
		let Some(corpus) = self.registry.corpus(&nicks) else {
			return Quote::default();
		};

		let Some(initial) = initial_key(&corpus, &input.seed, self.lookback_len, &mut self.picker) else {
			debug!("no starting key for {:?} with seed {:?}", nicks, input.seed);
			return Quote::default();
		};

		let text = render(&corpus, initial, self.max_words, &mut self.picker);
		Quote { nicks, text }
	}

	pub fn user_statistics(&self, nick: &str) -> Option<UserStatistics> {
		self.registry.user_statistics(nick)
	}

	pub fn user_aliases(&self, nick: &str) -> Vec<String> {
		self.registry.user_aliases(nick)
	}

	pub fn generic_statistics(&self) -> GenericStatistics {
		GenericStatistics {
			user_count: self.registry.user_count(),
			date_started: self.date_started,
			date_generated: self.first_meta(META_DATE),
			source_channels: SourceChannels {
				primary: self.first_meta(META_PRIMARY),
				additionals: self.meta.get(META_ADDITIONAL).cloned().unwrap_or_default(),
			},
			biggest_users: self.registry.biggest_users().to_vec(),
			most_quoted: self.registry.most_quoted(),
		}
	}

	/// Persists usage counters now.
	pub fn flush(&mut self) {
		self.registry.flush();
	}

	fn first_meta(&self, key: &str) -> Option<String> {
		self.meta.get(key).and_then(|values| values.first()).cloned()
	}
}

fn now_seconds() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Chooses the first key of a walk.
///
/// - No seed: a random starter (absent from the table or not).
/// - Seed shorter than `lookback_len`: a random key starting with the seed.
/// - Otherwise: the first `lookback_len` seed words, if that key exists.
fn initial_key<P: Picker>(
	corpus: &SourceTables,
	seed: &[String],
	lookback_len: usize,
	picker: &mut P,
) -> Option<NGramKey> {
	if seed.is_empty() {
		return picker.pick(&corpus.starters).cloned();
	}

	let prefix: Vec<Token> = seed.iter().take(lookback_len).map(|w| Token::from_raw(w)).collect();
	if prefix.len() == lookback_len {
		let key = NGramKey::new(&prefix)?;
		return corpus.transitions.contains_key(&key).then_some(key);
	}

	let candidates = corpus.transitions.keys_with_prefix(&prefix);
	picker.pick(&candidates).map(|key| (*key).clone())
}

/// Walks the tables from `initial` and renders the line.
///
/// While a bracket is open, successors that close it are preferred whenever
/// the closing-table knows the current key. Brackets still open at the end are
/// closed on the last word.
fn render<P: Picker>(corpus: &SourceTables, initial: NGramKey, max_words: usize, picker: &mut P) -> String {
	let mut stack = BracketStack::new();
	let mut words: Vec<String> = Vec::new();

	for token in initial.tokens() {
		if let Some(word) = emit(token, corpus, &mut stack, picker) {
			words.push(word);
		}
	}

	let mut count = initial.len();
	let mut key = initial;
	while count < max_words {
		let closing = stack.top().and_then(|opener| corpus.closings.get(opener, &key));
		let Some(successors) = closing.or_else(|| corpus.transitions.get(&key)) else {
			break;
		};
		let Some(next) = picker.pick(successors) else {
			break;
		};
		if next.is_terminate() {
			break;
		}

		if let Some(word) = emit(next, corpus, &mut stack, picker) {
			words.push(word);
		}
		key = key.shifted(next.clone());
		count += 1;
	}

	let mut text = words.join(" ");
	text.push_str(&stack.close_all());
	text
}

/// Turns a token into output text, substituting URLs and cleaning brackets.
fn emit<P: Picker>(token: &Token, corpus: &SourceTables, stack: &mut BracketStack, picker: &mut P) -> Option<String> {
	match token {
		Token::Word(word) => Some(stack.clean_word(word)),
		Token::Url => picker.pick(&corpus.urls).map(|url| stack.clean_word(url)),
		Token::Terminate => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::picker::{FirstPicker, SeededPicker};
	use crate::model::registry::NickSpec;
	use crate::model::user::UserRecord;
	use crate::usage::MemoryUsageStore;

	const SAOI_QUOTE: &str = "is glas iad na cnoic i bhfad uainn";
	const FILE_QUOTE: &str = "marbh le tae agus marbh gan é";

	fn generator_with(config: &GeneratorConfig, sources: &[(&str, &[&str])]) -> Generator<FirstPicker> {
		let mut registry = UserRegistry::new(config, Box::new(MemoryUsageStore::new()));
		for (nick, lines) in sources {
			registry.add_source(nick, SourceTables::ingest(lines.iter(), config.lookback_len));
		}
		registry.finish_ingestion();
		Generator::from_parts(registry, HashMap::new(), 0, config, FirstPicker)
	}

	fn generator(sources: &[(&str, &[&str])]) -> Generator<FirstPicker> {
		generator_with(&GeneratorConfig::default(), sources)
	}

	fn irish() -> Generator<FirstPicker> {
		generator(&[("saoi", &[SAOI_QUOTE]), ("file", &[FILE_QUOTE])])
	}

	#[test]
	fn unknown_nick_gives_empty_quote() {
		let mut generator = irish();
		assert_eq!(generator.generate(&GenerationInput::for_nick("nobody")), Quote::default());
		assert_eq!(generator.generate(&GenerationInput::new(Vec::new())), Quote::default());
	}

	#[test]
	fn single_known_nick() {
		let mut generator = irish();
		let quote = generator.generate(&GenerationInput::for_nick("saoi"));
		assert_eq!(quote.nicks, vec!["saoi".to_owned()]);
		assert_eq!(quote.text, SAOI_QUOTE);
	}

	#[test]
	fn empty_transition_table_gives_starter_only() {
		let config = GeneratorConfig::default();
		let mut registry = UserRegistry::new(&config, Box::new(MemoryUsageStore::new()));
		let mut tables = SourceTables::default();
		tables.starters.push(NGramKey::from_words(&["is", "glas"]));
		registry.insert_record(UserRecord::new("saoi", tables));
		let mut generator = Generator::from_parts(registry, HashMap::new(), 0, &config, SeededPicker::new(1));

		let quote = generator.generate(&GenerationInput::for_nick("saoi"));
		assert_eq!(quote.text, "is glas");
	}

	#[test]
	fn several_nicks_blend_without_touching_tables() {
		let mut generator = irish();
		let saoi_before = generator.registry().get("saoi").unwrap().tables().clone();
		let file_before = generator.registry().get("file").unwrap().tables().clone();

		let input = GenerationInput::new(vec![NickSpec::explicit("saoi"), NickSpec::explicit("file")]);
		let quote = generator.generate(&input);
		assert_eq!(quote.nicks, vec!["saoi".to_owned(), "file".to_owned()]);
		assert!(quote.text == SAOI_QUOTE || quote.text == FILE_QUOTE);

		let mut random = generator.with_picker(SeededPicker::new(9));
		for _ in 0..20 {
			let quote = random.generate(&input);
			assert!(quote.text == SAOI_QUOTE || quote.text == FILE_QUOTE);
		}
		assert_eq!(random.registry().get("saoi").unwrap().tables(), &saoi_before);
		assert_eq!(random.registry().get("file").unwrap().tables(), &file_before);
	}

	#[test]
	fn blended_walk_crosses_sources() {
		let mut generator = generator(&[("ailm", &["the cat sat down"]), ("beith", &["a cat sat up"])]);
		let input = GenerationInput::new(vec![NickSpec::explicit("ailm"), NickSpec::explicit("beith")]);

		let mut random = generator.with_picker(SeededPicker::new(5));
		let mut seen = std::collections::HashSet::new();
		for _ in 0..200 {
			seen.insert(random.generate(&input).text);
		}
		assert!(seen.iter().all(|t| ["the cat sat down", "the cat sat up", "a cat sat down", "a cat sat up"]
			.contains(&t.as_str())));
		assert!(seen.contains("the cat sat up") || seen.contains("a cat sat down"));
		generator = random.with_picker(FirstPicker);
		assert_eq!(generator.generate(&input).text, "the cat sat down");
	}

	#[test]
	fn output_respects_word_budget() {
		let config = GeneratorConfig { max_words: 5, ..GeneratorConfig::default() };
		let mut generator = generator_with(&config, &[("echo", &["a a a a a a a a a a"])]);

		let quote = generator.generate(&GenerationInput::for_nick("echo"));
		assert_eq!(quote.text, "a a a a a");

		let mut random = generator.with_picker(SeededPicker::new(2));
		for _ in 0..50 {
			let quote = random.generate(&GenerationInput::for_nick("echo"));
			assert!(quote.text.split_whitespace().count() <= 5);
		}
	}

	#[test]
	fn default_budget_caps_long_walks() {
		let line = vec!["la"; 400].join(" ");
		let mut generator = generator(&[("loop", &[line.as_str()])]);
		let quote = generator.generate(&GenerationInput::for_nick("loop"));
		assert_eq!(quote.text.split_whitespace().count(), 200);
	}

	#[test]
	fn seed_of_full_length() {
		let mut generator = irish();
		let quote = generator.generate(&GenerationInput::for_nick("saoi").with_seed("cnoic i"));
		assert_eq!(quote.text, "cnoic i bhfad uainn");
	}

	#[test]
	fn seed_longer_than_key_is_cut() {
		let mut generator = irish();
		let quote = generator.generate(&GenerationInput::for_nick("saoi").with_seed("na cnoic whatever"));
		assert_eq!(quote.text, "na cnoic i bhfad uainn");
	}

	#[test]
	fn short_seed_matches_prefix() {
		let mut generator = irish();
		let quote = generator.generate(&GenerationInput::for_nick("saoi").with_seed("bhfad"));
		assert_eq!(quote.text, "bhfad uainn");
	}

	#[test]
	fn unknown_seed_gives_empty_quote() {
		let mut generator = irish();
		assert!(generator.generate(&GenerationInput::for_nick("saoi").with_seed("nope")).is_empty());
		assert!(generator.generate(&GenerationInput::for_nick("saoi").with_seed("is nope")).is_empty());
	}

	#[test]
	fn open_brackets_are_closed_at_the_end() {
		let mut paren = generator(&[("paren", &["(x y z"])]);
		assert_eq!(paren.generate(&GenerationInput::for_nick("paren")).text, "(x y z)");

		let mut quoted = generator(&[("quote", &["\"so it y goes"])]);
		assert_eq!(quoted.generate(&GenerationInput::for_nick("quote")).text, "\"so it y goes\"");
	}

	#[test]
	fn closing_table_is_preferred_while_open() {
		let mut generator = generator(&[("paren", &["(x y z", "(x y w)"])]);
		assert_eq!(generator.generate(&GenerationInput::for_nick("paren")).text, "(x y w)");
	}

	#[test]
	fn generic_table_used_without_closing_entry() {
		let mut generator = generator(&[("paren", &["(x y z q", "a b c)"])]);
		assert_eq!(generator.generate(&GenerationInput::for_nick("paren")).text, "(x y z q)");
	}

	#[test]
	fn unmatched_closers_are_dropped() {
		let mut generator = generator(&[("stray", &["a b) c"])]);
		assert_eq!(generator.generate(&GenerationInput::for_nick("stray")).text, "a b c");
	}

	#[test]
	fn emoticons_pass_through() {
		let mut generator = generator(&[("happy", &["so happy :) today"])]);
		assert_eq!(generator.generate(&GenerationInput::for_nick("happy")).text, "so happy :) today");
	}

	#[test]
	fn urls_are_substituted() {
		let mut generator = generator(&[("linker", &["see https://example.org/a now"])]);
		let quote = generator.generate(&GenerationInput::for_nick("linker"));
		assert_eq!(quote.text, "see https://example.org/a now");
	}

	#[derive(Debug)]
	struct LastPicker;

	impl Picker for LastPicker {
		fn pick_index(&mut self, len: usize) -> usize {
			len - 1
		}
	}

	#[test]
	fn url_from_closing_table_keeps_line_balanced() {
		let lines: &[&str] = &["(look see https://example.org/a)", "look at https://example.org/b now"];

		let mut first = generator(&[("linker", lines)]);
		let quote = first.generate(&GenerationInput::for_nick("linker"));
		assert_eq!(quote.text, "(look see https://example.org/a)");

		let mut last = first.with_picker(LastPicker);
		let quote = last.generate(&GenerationInput::for_nick("linker").with_seed("(look see"));
		assert_eq!(quote.text, "(look see https://example.org/b)");
	}

	#[test]
	fn explicit_requests_count_usage() {
		let mut generator = irish();
		generator.generate(&GenerationInput::for_nick("saoi"));
		generator.generate(&GenerationInput::for_nick("saoi"));
		generator.generate(&GenerationInput::for_nick("saoi").with_increment_usage(false));
		generator.generate(&GenerationInput::new(vec![NickSpec::Random]));

		assert_eq!(generator.user_statistics("saoi").unwrap().quotes_requested, 2);
		assert_eq!(generator.user_statistics("file").unwrap().quotes_requested, 0);
	}

	#[test]
	fn random_min_starters_restricts_authors() {
		let mut generator = generator(&[("rich", &["a b c", "d e f"]), ("poor", &["g h i"])]);
		let input = GenerationInput::new(vec![NickSpec::Random]).with_random_min_starters(2);
		assert_eq!(generator.generate(&input).nicks, vec!["rich".to_owned()]);

		let input = GenerationInput::new(vec![NickSpec::Random]).with_random_min_starters(3);
		assert_eq!(generator.generate(&input), Quote::default());
	}

	#[test]
	fn generic_statistics_empty() {
		let generator = generator(&[]);
		let stats = generator.generic_statistics();
		assert_eq!(stats.user_count, 0);
		assert_eq!(stats.date_started, 0);
		assert_eq!(stats.date_generated, None);
		assert_eq!(stats.source_channels, SourceChannels::default());
		assert!(stats.biggest_users.is_empty());
		assert!(stats.most_quoted.is_empty());
	}

	#[test]
	fn generic_statistics_with_meta() {
		let config = GeneratorConfig::default();
		let mut registry = UserRegistry::new(&config, Box::new(MemoryUsageStore::new()));
		registry.add_source("ailm", SourceTables::ingest(["a b c d"], 2));
		registry.add_source("beith", SourceTables::ingest(["a b"], 2));
		registry.finish_ingestion();

		let meta = io::parse_meta(["primary=#ocean", "additional=#pond #sea #lake", "date=2016-03-07"]);
		let mut generator = Generator::from_parts(registry, meta, 97, &config, FirstPicker);
		generator.generate(&GenerationInput::for_nick("beith"));

		let stats = generator.generic_statistics();
		assert_eq!(stats.user_count, 2);
		assert_eq!(stats.date_started, 97);
		assert_eq!(stats.date_generated, Some("2016-03-07".to_owned()));
		assert_eq!(stats.source_channels.primary, Some("#ocean".to_owned()));
		assert_eq!(stats.source_channels.additionals, vec!["#pond", "#sea", "#lake"]);
		assert_eq!(stats.biggest_users[0], NickAndCount { nick: "ailm".to_owned(), count: 3 });
		assert_eq!(stats.most_quoted, vec![NickAndCount { nick: "beith".to_owned(), count: 1 }]);
	}

	#[test]
	fn aliases_and_statistics_pass_through() {
		let mut generator = irish();
		assert!(generator.user_aliases("saoi").is_empty());
		assert_eq!(generator.user_statistics("nobody"), None);
		assert!(!generator.is_empty());
		generator.flush();
	}
}
