//! Tuning for synchronisation and transitions.
//!
//! Every field has a default, so an empty JSON object is a valid configuration.

use crate::{error::ConfigError, interpolate::Easing};
use serde::{Deserialize, Serialize};

/// What to do when a record is added under a key that's already present.
///
/// Well-behaved stores never do this, but nothing in the transport prevents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
	/// Fail the event with [`ReduceError::DuplicateKey`](`crate::error::ReduceError::DuplicateKey`).
	Reject,
	/// Treat the addition as a modification of the existing record.
	Replace,
}

impl Default for DuplicatePolicy {
	fn default() -> Self {
		DuplicatePolicy::Reject
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
	/// How long each enter, update or exit transition runs, in milliseconds.
	#[serde(default = "default_duration_ms")]
	pub duration_ms: f64,
	#[serde(default)]
	pub easing: Easing,
}

impl Default for TransitionConfig {
	fn default() -> Self {
		Self {
			duration_ms: default_duration_ms(),
			easing: Easing::default(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncConfig {
	#[serde(default)]
	pub transition: TransitionConfig,
	/// Overrides [`SyncConfig::transition`] for exits, if set.
	#[serde(default)]
	pub exit_transition: Option<TransitionConfig>,
	#[serde(default)]
	pub duplicate_policy: DuplicatePolicy,
}

impl SyncConfig {
	/// Parses and validates a JSON configuration.
	///
	/// # Errors
	///
	/// Iff `json` is malformed or contains a negative or non-finite duration.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let config: SyncConfig = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	/// # Errors
	///
	/// Iff a duration is negative or non-finite.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (name, transition) in [("transition", Some(&self.transition)), ("exit_transition", self.exit_transition.as_ref())].iter() {
			if let Some(transition) = transition {
				if !transition.duration_ms.is_finite() || transition.duration_ms < 0.0 {
					return Err(ConfigError::Invalid {
						message: format!("{}.duration_ms must be a finite, non-negative number of milliseconds but was {}", name, transition.duration_ms),
					});
				}
			}
		}
		Ok(())
	}

	#[must_use]
	pub fn exit_transition(&self) -> TransitionConfig {
		self.exit_transition.unwrap_or(self.transition)
	}
}

fn default_duration_ms() -> f64 {
	800.0
}
