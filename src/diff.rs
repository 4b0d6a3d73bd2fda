//! Keyed enter/update/exit partitioning.

use crate::{collection::Collection, record::Keyed};
use core::{fmt::Debug, hash::Hash, iter::FromIterator};
use hashbrown::HashSet;
use tracing::{instrument, trace};

/// The keys that currently have a visual element, in render order.
#[derive(Debug, Clone)]
pub struct RenderedKeys<K: Eq + Hash> {
	order: Vec<K>,
	set: HashSet<K>,
}

impl<K: Eq + Hash> Default for RenderedKeys<K> {
	fn default() -> Self {
		Self { order: Vec::new(), set: HashSet::new() }
	}
}

impl<K: Clone + Eq + Hash> RenderedKeys<K> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn contains(&self, key: &K) -> bool {
		self.set.contains(key)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.order.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	pub fn iter(&self) -> core::slice::Iter<'_, K> {
		self.order.iter()
	}

	#[must_use]
	pub fn as_slice(&self) -> &[K] {
		&self.order
	}
}

/// Later duplicates are ignored.
impl<K: Clone + Eq + Hash> FromIterator<K> for RenderedKeys<K> {
	fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
		let mut keys = Self::default();
		for key in iter {
			if keys.set.insert(key.clone()) {
				keys.order.push(key)
			}
		}
		keys
	}
}

/// Which part of a [`DiffResult`] a key ended up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
	Enter,
	Update,
	Exit,
}

/// Three pairwise disjoint key sequences.
///
/// `enter` and `update` follow the order of the diffed collection, `exit` the order of the previously rendered keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult<K> {
	/// Present now, not rendered before.
	pub enter: Vec<K>,
	/// Present now and rendered before, whether or not the record changed.
	pub update: Vec<K>,
	/// Rendered before, no longer present.
	pub exit: Vec<K>,
}

impl<K> Default for DiffResult<K> {
	fn default() -> Self {
		Self {
			enter: Vec::new(),
			update: Vec::new(),
			exit: Vec::new(),
		}
	}
}

impl<K: Clone + Eq + Hash> DiffResult<K> {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.enter.is_empty() && self.update.is_empty() && self.exit.is_empty()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.enter.len() + self.update.len() + self.exit.len()
	}

	#[must_use]
	pub fn partition_of(&self, key: &K) -> Option<Partition> {
		if self.enter.contains(key) {
			Some(Partition::Enter)
		} else if self.update.contains(key) {
			Some(Partition::Update)
		} else if self.exit.contains(key) {
			Some(Partition::Exit)
		} else {
			None
		}
	}
}

/// Partitions `current` (in order) against the `previous`ly rendered keys.
///
/// `current` must not contain duplicates.
#[instrument(skip(current, previous), fields(previous_len = previous.len()))]
pub fn diff<'a, K>(current: impl IntoIterator<Item = &'a K>, previous: &RenderedKeys<K>) -> DiffResult<K>
where
	K: 'a + Clone + Eq + Hash + Debug,
{
	let mut result = DiffResult::default();
	let mut seen = HashSet::new();

	for key in current {
		let fresh = seen.insert(key);
		debug_assert!(fresh, "Duplicate key encountered while diffing: {:?}", key);
		if previous.contains(key) {
			result.update.push(key.clone())
		} else {
			result.enter.push(key.clone())
		}
	}

	result.exit.extend(previous.iter().filter(|key| !seen.contains(key)).cloned());

	trace!(
		"Diffed into {} entering, {} updating and {} exiting key(s).",
		result.enter.len(),
		result.update.len(),
		result.exit.len()
	);
	result
}

/// [`diff`] over a whole [`Collection`] in insertion order.
pub fn diff_collection<T: Keyed>(collection: &Collection<T>, previous: &RenderedKeys<T::Key>) -> DiffResult<T::Key> {
	diff(collection.keys(), previous)
}
