//! Per-key, cancellable, tick-driven transitions.
//!
//! The scheduler owns a side table from key to that key's last known value ("current state").
//! Render sinks never have to stash animation state on their elements.

use crate::{config::TransitionConfig, interpolate::Interpolate, sink::RenderSink};
use core::{
	fmt::{self, Debug},
	hash::Hash,
};
use hashbrown::HashMap;
use tracing::{instrument, trace, trace_span, warn};

/// Lifecycle of a single key.
///
/// ```text
/// Idle ──enter──→ Entering ──→ Steady ──update──→ Updating ──→ Steady
///                                └──exit──→ Exiting ──→ Idle (removed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// Not tracked: never entered, or removed once its exit completed.
	Idle,
	Entering,
	Steady,
	Updating,
	Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
	Enter,
	Update,
	Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEnd {
	/// Ran to its target.
	Completed,
	/// Replaced by a newer transition for the same key, which continued from the value reached so far.
	Superseded,
	/// Torn down before completion. Non-fatal.
	Abandoned,
}

/// One-shot notice that a transition is over, drained via [`TransitionScheduler::drain_completions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<K> {
	pub key: K,
	pub kind: TransitionKind,
	pub end: TransitionEnd,
}

pub type Interpolator<V> = Box<dyn Fn(&V, &V, f64) -> V>;

fn interpolate_via_trait<V: Interpolate>(from: &V, to: &V, t: f64) -> V {
	from.interpolate(to, t)
}

struct Active<V> {
	kind: TransitionKind,
	from: V,
	to: V,
	start: f64,
	config: TransitionConfig,
}

impl<V> Active<V> {
	fn progress(&self, now: f64) -> f64 {
		if self.config.duration_ms <= 0.0 {
			1.0
		} else {
			((now - self.start) / self.config.duration_ms).max(0.0).min(1.0)
		}
	}

	fn value_at(&self, interpolator: &Interpolator<V>, now: f64) -> V {
		interpolator(&self.from, &self.to, self.config.easing.apply(self.progress(now)))
	}
}

struct Slot<V> {
	current: V,
	target: V,
	active: Option<Active<V>>,
}

impl<V: Clone> Slot<V> {
	/// Cancels the in-flight transition, if any, freezing `current` at its value at `now`.
	fn settle<K: Clone>(&mut self, key: &K, now: f64, interpolator: &Interpolator<V>, completions: &mut Vec<Completion<K>>) {
		if let Some(active) = self.active.take() {
			trace!(kind = ?active.kind, "Superseding in-flight transition.");
			self.current = active.value_at(interpolator, now);
			completions.push(Completion {
				key: key.clone(),
				kind: active.kind,
				end: TransitionEnd::Superseded,
			});
		}
	}
}

/// Drives enter, update and exit transitions for any number of keys independently.
///
/// Time is supplied by the caller as milliseconds on a monotonic clock, both when scheduling and on each [`tick`](`TransitionScheduler::tick`).
/// At most one transition is active per key. Starting another one supersedes it.
pub struct TransitionScheduler<K, V> {
	slots: HashMap<K, Slot<V>>,
	completions: Vec<Completion<K>>,
	interpolator: Interpolator<V>,
	transition: TransitionConfig,
	exit_transition: TransitionConfig,
}

impl<K: Debug, V> Debug for TransitionScheduler<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransitionScheduler")
			.field("keys", &self.slots.keys().collect::<Vec<_>>())
			.field("active", &self.slots.values().filter(|slot| slot.active.is_some()).count())
			.field("completions", &self.completions)
			.field("transition", &self.transition)
			.field("exit_transition", &self.exit_transition)
			.finish()
	}
}

impl<K, V> TransitionScheduler<K, V>
where
	K: Clone + Eq + Hash + Debug,
	V: Interpolate + Clone + 'static,
{
	/// Interpolates values via their [`Interpolate`] implementation.
	#[must_use]
	pub fn new(transition: TransitionConfig, exit_transition: TransitionConfig) -> Self {
		Self::with_interpolator(transition, exit_transition, interpolate_via_trait::<V>)
	}
}

impl<K, V> TransitionScheduler<K, V>
where
	K: Clone + Eq + Hash + Debug,
	V: Clone,
{
	/// Interpolates values with a custom function instead, called as `interpolator(from, to, t)`.
	#[must_use]
	pub fn with_interpolator(transition: TransitionConfig, exit_transition: TransitionConfig, interpolator: impl Fn(&V, &V, f64) -> V + 'static) -> Self {
		Self {
			slots: HashMap::new(),
			completions: Vec::new(),
			interpolator: Box::new(interpolator),
			transition,
			exit_transition,
		}
	}

	/// Starts an enter transition from `baseline` to `target`.
	///
	/// If `key` is still tracked (for example because it is exiting), the transition starts from its present value instead of `baseline`.
	#[instrument(skip(self, baseline, target))]
	pub fn enter(&mut self, key: K, baseline: V, target: V, now: f64) {
		let Self { slots, completions, interpolator, transition, .. } = self;
		let from = match slots.get_mut(&key) {
			Some(slot) => {
				trace!("Key is still tracked. Entering from its present value.");
				slot.settle(&key, now, interpolator, completions);
				slot.current.clone()
			}
			None => baseline,
		};
		Self::start(slots, key, TransitionKind::Enter, from, target, now, *transition)
	}

	/// Starts an update transition from the key's present value to `target`.
	///
	/// Untracked keys snap to `target` without a transition.
	#[instrument(skip(self, target))]
	pub fn update(&mut self, key: K, target: V, now: f64) {
		let Self { slots, completions, interpolator, transition, .. } = self;
		match slots.get_mut(&key) {
			Some(slot) => {
				slot.settle(&key, now, interpolator, completions);
				let from = slot.current.clone();
				Self::start(slots, key, TransitionKind::Update, from, target, now, *transition)
			}
			None => {
				warn!("Updating untracked key. Snapping to target.");
				slots.insert(
					key,
					Slot {
						current: target.clone(),
						target,
						active: None,
					},
				);
			}
		}
	}

	/// Starts an exit transition from the key's present value to `vanish`.
	///
	/// Returns `false` without scheduling anything if `key` isn't tracked,
	/// in which case the caller should release its element right away.
	#[instrument(skip(self, vanish))]
	pub fn exit(&mut self, key: K, vanish: V, now: f64) -> bool {
		let Self { slots, completions, interpolator, exit_transition, .. } = self;
		match slots.get_mut(&key) {
			Some(slot) => {
				slot.settle(&key, now, interpolator, completions);
				let from = slot.current.clone();
				Self::start(slots, key, TransitionKind::Exit, from, vanish, now, *exit_transition);
				true
			}
			None => {
				trace!("Exiting untracked key.");
				false
			}
		}
	}

	fn start(slots: &mut HashMap<K, Slot<V>>, key: K, kind: TransitionKind, from: V, to: V, now: f64, config: TransitionConfig) {
		let active = Active {
			kind,
			from: from.clone(),
			to: to.clone(),
			start: now,
			config,
		};
		match slots.get_mut(&key) {
			Some(slot) => {
				slot.target = to;
				slot.active = Some(active);
			}
			None => {
				slots.insert(
					key,
					Slot {
						current: from,
						target: to,
						active: Some(active),
					},
				);
			}
		}
	}

	/// Advances all transitions to `now`, pushing each interpolated value into `sink`.
	///
	/// Finished exits are dropped from the side table and their elements released.
	/// Returns the number of transitions still in flight.
	#[instrument(level = "trace", skip(self, sink))]
	pub fn tick(&mut self, now: f64, sink: &mut impl RenderSink<K, V>) -> usize {
		let mut finished = Vec::new();
		for (key, slot) in &mut self.slots {
			if let Some(active) = &slot.active {
				let t = active.progress(now);
				let value = if t >= 1.0 { active.to.clone() } else { active.value_at(&self.interpolator, now) };
				sink.set_interpolated(key, &value);
				slot.current = value;
				if t >= 1.0 {
					finished.push(key.clone())
				}
			}
		}

		for key in finished {
			let span = trace_span!("Completing transition", ?key);
			let _enter = span.enter();
			let kind = match self.slots.get_mut(&key).and_then(|slot| slot.active.take()) {
				Some(active) => active.kind,
				None => continue,
			};
			self.completions.push(Completion {
				key: key.clone(),
				kind,
				end: TransitionEnd::Completed,
			});
			if kind == TransitionKind::Exit {
				self.slots.remove(&key);
				sink.release_element(&key);
				trace!("Released element.");
			}
		}

		self.active_len()
	}

	/// Cancels every transition and forgets all keys.
	///
	/// In-flight transitions complete as [`TransitionEnd::Abandoned`]. Elements that were exiting are released.
	#[instrument(skip(self, sink))]
	pub fn abandon_all(&mut self, sink: &mut impl RenderSink<K, V>) {
		for (key, slot) in self.slots.drain() {
			if let Some(active) = slot.active {
				self.completions.push(Completion {
					key: key.clone(),
					kind: active.kind,
					end: TransitionEnd::Abandoned,
				});
				if active.kind == TransitionKind::Exit {
					sink.release_element(&key);
				}
			}
		}
	}

	#[must_use]
	pub fn phase(&self, key: &K) -> Phase {
		match self.slots.get(key) {
			None => Phase::Idle,
			Some(Slot { active: None, .. }) => Phase::Steady,
			Some(Slot { active: Some(active), .. }) => match active.kind {
				TransitionKind::Enter => Phase::Entering,
				TransitionKind::Update => Phase::Updating,
				TransitionKind::Exit => Phase::Exiting,
			},
		}
	}

	/// The value last pushed to the sink for `key` (or its baseline, before the first tick).
	#[must_use]
	pub fn current(&self, key: &K) -> Option<&V> {
		self.slots.get(key).map(|slot| &slot.current)
	}

	/// Where `key` is headed.
	#[must_use]
	pub fn target(&self, key: &K) -> Option<&V> {
		self.slots.get(key).map(|slot| &slot.target)
	}

	/// The value `key` has (or would have) at `now`, without advancing anything.
	#[must_use]
	pub fn value_at(&self, key: &K, now: f64) -> Option<V> {
		let slot = self.slots.get(key)?;
		Some(match &slot.active {
			Some(active) => active.value_at(&self.interpolator, now),
			None => slot.current.clone(),
		})
	}

	#[must_use]
	pub fn active_len(&self) -> usize {
		self.slots.values().filter(|slot| slot.active.is_some()).count()
	}

	#[must_use]
	pub fn is_idle(&self) -> bool {
		self.slots.values().all(|slot| slot.active.is_none())
	}

	/// Number of tracked keys, in transition or steady.
	#[must_use]
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn drain_completions(&mut self) -> std::vec::Drain<'_, Completion<K>> {
		self.completions.drain(..)
	}
}
