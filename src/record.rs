//! Record identity and the document type delivered by the remote store.

use core::{fmt::Debug, hash::Hash};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

/// Anything with a stable identity that survives modification.
///
/// Two values with equal [`Keyed::key`]s are considered versions of the same record.
pub trait Keyed {
	type Key: Clone + Eq + Hash + Debug;

	fn key(&self) -> &Self::Key;
}

/// A document as delivered by the store: its fields plus the store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub id: String,
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl Document {
	#[must_use]
	pub fn new(id: impl Into<String>) -> Self {
		Self { id: id.into(), fields: Map::new() }
	}

	/// Builder-style field insertion.
	#[must_use]
	pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.fields.insert(field.into(), value.into());
		self
	}

	#[must_use]
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.fields.get(field)
	}

	/// Numeric field value.
	///
	/// Numeric strings are accepted too, since form input frequently ends up stored verbatim.
	#[must_use]
	pub fn number(&self, field: &str) -> Option<f64> {
		match self.fields.get(field)? {
			Value::Number(number) => number.as_f64(),
			Value::String(string) => match string.trim().parse() {
				Ok(number) => Some(number),
				Err(_) => {
					if cfg!(feature = "dangerous-logging") {
						trace!(id = %self.id, field, value = %string, "Field is not numeric.");
					} else {
						trace!(id = %self.id, field, "Field is not numeric.");
					}
					None
				}
			},
			_ => None,
		}
	}

	#[must_use]
	pub fn text(&self, field: &str) -> Option<&str> {
		self.fields.get(field)?.as_str()
	}
}

impl Keyed for Document {
	type Key = String;

	fn key(&self) -> &String {
		&self.id
	}
}
