use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of every random draw made by the registry and the generator.
///
/// All choices are uniform over a slice, so a single `pick_index` is enough;
/// swapping the implementation makes generation reproducible.
pub trait Picker {
	/// Returns an index in `0..len`. Never called with `len == 0`.
	fn pick_index(&mut self, len: usize) -> usize;

	/// Picks one element uniformly, or `None` for an empty slice.
	fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
		if items.is_empty() {
			return None;
		}
		let index = self.pick_index(items.len());
		items.get(index)
	}
}

/// Draws from rand's thread-local generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadPicker;

impl Picker for ThreadPicker {
	fn pick_index(&mut self, len: usize) -> usize {
		rand::rng().random_range(0..len)
	}
}

/// Reproducible picker backed by a seeded `StdRng`.
#[derive(Clone, Debug)]
pub struct SeededPicker {
	rng: StdRng,
}

impl SeededPicker {
	pub fn new(seed: u64) -> Self {
		Self { rng: StdRng::seed_from_u64(seed) }
	}
}

impl Picker for SeededPicker {
	fn pick_index(&mut self, len: usize) -> usize {
		self.rng.random_range(0..len)
	}
}

/// Always picks the first element.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstPicker;

impl Picker for FirstPicker {
	fn pick_index(&mut self, _len: usize) -> usize {
		0
	}
}
