//! Failures of the reducer and of configuration loading.

use core::fmt::Debug;
use thiserror::Error;

/// A change event that couldn't be folded into the collection.
///
/// These are data-consistency violations caused by malformed batches.
/// They are scoped to the single offending event and never halt synchronisation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError<K: Debug> {
	#[error("record {0:?} was added but is already present")]
	DuplicateKey(K),
	#[error("record {0:?} was modified but is not present")]
	UnknownKey(K),
}

impl<K: Debug> ReduceError<K> {
	#[must_use]
	pub fn key(&self) -> &K {
		match self {
			ReduceError::DuplicateKey(key) | ReduceError::UnknownKey(key) => key,
		}
	}
}

/// Returned when [`SyncConfig`](`crate::config::SyncConfig`) can't be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to parse sync configuration: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("invalid sync configuration: {message}")]
	Invalid { message: String },
}
