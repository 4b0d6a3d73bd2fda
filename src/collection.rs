//! The ordered, identity-unique record collection and the reducer that folds change events into it.

use crate::{
	config::DuplicatePolicy,
	error::ReduceError,
	record::Keyed,
};
use hashbrown::HashMap;
use tracing::{instrument, trace, trace_span, warn};

/// A single change as reported by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T: Keyed> {
	Added(T),
	Modified(T),
	Removed(T::Key),
}

impl<T: Keyed> ChangeEvent<T> {
	#[must_use]
	pub fn key(&self) -> &T::Key {
		match self {
			ChangeEvent::Added(record) | ChangeEvent::Modified(record) => record.key(),
			ChangeEvent::Removed(key) => key,
		}
	}

	fn kind(&self) -> &'static str {
		match self {
			ChangeEvent::Added(_) => "added",
			ChangeEvent::Modified(_) => "modified",
			ChangeEvent::Removed(_) => "removed",
		}
	}
}

/// Records in arrival order, unique by [`Keyed::key`].
///
/// Modified records keep their position.
/// Removing a record shifts all later ones left by one.
#[derive(Debug, Clone)]
pub struct Collection<T: Keyed> {
	records: Vec<T>,
	index: HashMap<T::Key, usize>,
	duplicate_policy: DuplicatePolicy,
}

impl<T: Keyed> Default for Collection<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Keyed> Collection<T> {
	#[must_use]
	pub fn new() -> Self {
		Self::with_duplicate_policy(DuplicatePolicy::default())
	}

	#[must_use]
	pub fn with_duplicate_policy(duplicate_policy: DuplicatePolicy) -> Self {
		Self {
			records: Vec::new(),
			index: HashMap::new(),
			duplicate_policy,
		}
	}

	#[must_use]
	pub fn duplicate_policy(&self) -> DuplicatePolicy {
		self.duplicate_policy
	}

	/// Folds a single event into the collection.
	///
	/// # Errors
	///
	/// - [`ReduceError::DuplicateKey`] if a record is added twice and the policy is [`DuplicatePolicy::Reject`].
	/// - [`ReduceError::UnknownKey`] if a record is modified that isn't present.
	///
	/// The collection is left unchanged in either case.
	/// Removing an absent key is not an error, as transports may repeat removals after resubscribing.
	pub fn apply(&mut self, event: ChangeEvent<T>) -> Result<(), ReduceError<T::Key>> {
		match event {
			ChangeEvent::Added(record) => match self.index.get(record.key()) {
				None => {
					self.index.insert(record.key().clone(), self.records.len());
					self.records.push(record);
					Ok(())
				}
				Some(&i) => match self.duplicate_policy {
					DuplicatePolicy::Reject => Err(ReduceError::DuplicateKey(record.key().clone())),
					DuplicatePolicy::Replace => {
						trace!(key = ?record.key(), "Treating duplicate addition as modification.");
						self.records[i] = record;
						Ok(())
					}
				},
			},
			ChangeEvent::Modified(record) => match self.index.get(record.key()) {
				Some(&i) => {
					self.records[i] = record;
					Ok(())
				}
				None => Err(ReduceError::UnknownKey(record.key().clone())),
			},
			ChangeEvent::Removed(key) => {
				if let Some(i) = self.index.remove(&key) {
					self.records.remove(i);
					for record in &self.records[i..] {
						if let Some(position) = self.index.get_mut(record.key()) {
							*position -= 1;
						}
					}
				} else {
					trace!(?key, "Ignoring removal of absent record.");
				}
				Ok(())
			}
		}
	}

	/// Folds `events` in order, skipping (and logging) any that fail.
	///
	/// Returns the failures alongside their index in the batch.
	#[instrument(skip(self, events), fields(batch_len = events.len(), len = self.records.len()))]
	pub fn apply_batch(&mut self, events: Vec<ChangeEvent<T>>) -> Vec<(usize, ReduceError<T::Key>)> {
		let mut errors = Vec::new();
		for (i, event) in events.into_iter().enumerate() {
			let span = trace_span!("Applying change", i, kind = event.kind(), key = ?event.key());
			let _enter = span.enter();
			if let Err(error) = self.apply(event) {
				warn!("Skipping change event {} of batch: {}", i, error);
				errors.push((i, error));
			}
		}
		trace!("Collection now holds {} record(s).", self.records.len());
		errors
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.records.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	#[must_use]
	pub fn get(&self, key: &T::Key) -> Option<&T> {
		self.index.get(key).map(|&i| &self.records[i])
	}

	#[must_use]
	pub fn position(&self, key: &T::Key) -> Option<usize> {
		self.index.get(key).copied()
	}

	#[must_use]
	pub fn contains_key(&self, key: &T::Key) -> bool {
		self.index.contains_key(key)
	}

	pub fn iter(&self) -> core::slice::Iter<'_, T> {
		self.records.iter()
	}

	pub fn keys(&self) -> impl Iterator<Item = &T::Key> + '_ {
		self.records.iter().map(Keyed::key)
	}

	#[must_use]
	pub fn as_slice(&self) -> &[T] {
		&self.records
	}

	pub fn clear(&mut self) {
		self.records.clear();
		self.index.clear();
	}
}

impl<'a, T: Keyed> IntoIterator for &'a Collection<T> {
	type Item = &'a T;
	type IntoIter = core::slice::Iter<'a, T>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
