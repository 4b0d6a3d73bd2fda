//! Wires an [`EventSource`] through the reducer, the diff engine and the transition scheduler into a [`RenderSink`].

use crate::{
	collection::{ChangeEvent, Collection},
	config::SyncConfig,
	diff::{diff, DiffResult, RenderedKeys},
	interpolate::Interpolate,
	record::Keyed,
	sink::RenderSink,
	transition::{Completion, Phase, TransitionScheduler},
};
use core::{
	cell::{Ref, RefCell},
	cmp::Ordering,
	fmt::{self, Debug},
};
use hashbrown::HashMap;
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{error, info, instrument, trace, trace_span, warn};

/// Stops delivery of batches when unsubscribed or dropped.
#[must_use = "Dropping a `Subscription` unsubscribes immediately."]
pub struct Subscription {
	unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
		Self {
			unsubscribe: Some(Box::new(unsubscribe)),
		}
	}

	/// A subscription with nothing to tear down.
	pub fn detached() -> Self {
		Self { unsubscribe: None }
	}

	pub fn unsubscribe(mut self) {
		if let Some(unsubscribe) = self.unsubscribe.take() {
			unsubscribe()
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(unsubscribe) = self.unsubscribe.take() {
			unsubscribe()
		}
	}
}

impl Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("active", &self.unsubscribe.is_some()).finish()
	}
}

/// A remote collection that reports its changes in batches.
///
/// Implementations must first deliver one batch of [`ChangeEvent::Added`] events describing the present state, then live deltas.
/// Deltas must be causally ordered: no record may be modified or removed before it was added.
pub trait EventSource<T: Keyed> {
	fn subscribe(&mut self, on_batch: Box<dyn FnMut(Vec<ChangeEvent<T>>)>) -> Subscription;
}

/// Mutations requested by the user (for example, clicking a slice to delete it), forwarded to the store verbatim.
///
/// The resulting change arrives back through the [`EventSource`] like any other.
pub trait WriteBack<K> {
	fn delete(&self, key: &K);
}

/// Milliseconds on a monotonic clock.
pub trait Clock {
	fn now(&self) -> f64;
}

impl<F: Fn() -> f64> Clock for F {
	fn now(&self) -> f64 {
		self()
	}
}

/// Turns records into visual values. All of the chart-specific geometry lives here.
pub trait Layout<T> {
	type Value;

	/// Called with the full visible view before each render, so that scale domains and similar can be refreshed.
	fn prepare(&mut self, _records: &[&T]) {}

	/// The value `record` at `index` within the view should end up at.
	fn target(&self, record: &T, index: usize) -> Self::Value;

	/// The neutral value an entering element grows out of.
	fn baseline(&self, record: &T, target: &Self::Value) -> Self::Value;

	/// The value an exiting element shrinks into, starting from its `current` one.
	fn vanish(&self, current: &Self::Value) -> Self::Value;
}

type Filter<T> = Box<dyn Fn(&T) -> bool>;
type Order<T> = Box<dyn Fn(&T, &T) -> Ordering>;

struct State<T: Keyed, L: Layout<T>, S> {
	collection: Collection<T>,
	rendered: RenderedKeys<T::Key>,
	scheduler: TransitionScheduler<T::Key, L::Value>,
	layout: L,
	sink: S,
	filter: Option<Filter<T>>,
	order: Option<Order<T>>,
	clock: Box<dyn Clock>,
	write_back: Option<Rc<dyn WriteBack<T::Key>>>,
}

struct Shared<T: Keyed, L: Layout<T>, S> {
	state: RefCell<State<T, L, S>>,
	queue: RefCell<VecDeque<Vec<ChangeEvent<T>>>>,
}

/// Owns the collection and keeps a [`RenderSink`] in step with an [`EventSource`].
///
/// Batches are folded, diffed and dispatched one at a time in delivery order.
/// A batch that arrives while another one is being processed (for example because the sink synchronously caused a write) is queued behind it.
pub struct SyncController<T: Keyed, L: Layout<T>, S> {
	shared: Rc<Shared<T, L, S>>,
	subscription: Option<Subscription>,
}

impl<T, L, S> SyncController<T, L, S>
where
	T: Keyed + 'static,
	L: Layout<T> + 'static,
	L::Value: Interpolate + Clone + 'static,
	S: RenderSink<T::Key, L::Value> + 'static,
{
	pub fn new(layout: L, sink: S, clock: impl Clock + 'static, config: SyncConfig) -> Self {
		Self {
			shared: Rc::new(Shared {
				state: RefCell::new(State {
					collection: Collection::with_duplicate_policy(config.duplicate_policy),
					rendered: RenderedKeys::new(),
					scheduler: TransitionScheduler::new(config.transition, config.exit_transition()),
					layout,
					sink,
					filter: None,
					order: None,
					clock: Box::new(clock),
					write_back: None,
				}),
				queue: RefCell::new(VecDeque::new()),
			}),
			subscription: None,
		}
	}

	/// Subscribes to `source`. Every delivered batch is rendered right away.
	///
	/// The collection is rebuilt from scratch out of the source's initial batch,
	/// so records that disappeared in the meantime exit on the first render.
	/// Restarting unsubscribes from the previous source first.
	#[instrument(skip(self, source))]
	pub fn start(&mut self, source: &mut (impl EventSource<T> + ?Sized)) {
		match self.shared.state.try_borrow_mut() {
			Ok(mut state) => state.collection.clear(),
			Err(_) => return error!("Can't start while a batch is being processed."),
		}
		self.shared.queue.borrow_mut().clear();
		if let Some(previous) = self.subscription.take() {
			warn!("Controller was already running. Unsubscribing from the previous source.");
			previous.unsubscribe();
		}
		let shared = Rc::downgrade(&self.shared);
		self.subscription = Some(source.subscribe(Box::new(move |batch| match Weak::upgrade(&shared) {
			Some(shared) => deliver(&shared, batch),
			None => trace!("Dropping batch delivered after the controller went away."),
		})));
	}

	/// Unsubscribes and abandons all transitions in flight.
	///
	/// Elements stay where they are, apart from exiting ones, which are released.
	#[instrument(skip(self))]
	pub fn stop(&mut self) {
		if let Some(subscription) = self.subscription.take() {
			subscription.unsubscribe()
		}
		self.shared.queue.borrow_mut().clear();
		match self.shared.state.try_borrow_mut() {
			Ok(mut state) => {
				let State { scheduler, sink, .. } = &mut *state;
				scheduler.abandon_all(sink);
			}
			Err(_) => error!("Can't abandon transitions while a batch is being processed."),
		}
	}

	#[must_use]
	pub fn is_running(&self) -> bool {
		self.subscription.is_some()
	}

	/// Processes a batch as if the subscribed source had delivered it.
	pub fn handle_batch(&self, batch: Vec<ChangeEvent<T>>) {
		deliver(&self.shared, batch)
	}

	/// Advances transitions to `now`. Returns the number still in flight.
	pub fn tick(&self, now: f64) -> usize {
		match self.shared.state.try_borrow_mut() {
			Ok(mut state) => {
				let State { scheduler, sink, .. } = &mut *state;
				scheduler.tick(now, sink)
			}
			Err(_) => {
				error!("Re-entrant tick ignored.");
				0
			}
		}
	}

	/// Re-renders without new events, for when the view (or something the [`Layout`] depends on) changed.
	pub fn refresh(&self) {
		match self.shared.state.try_borrow_mut() {
			Ok(mut state) => {
				let now = state.clock.now();
				state.render(now);
			}
			Err(_) => error!("Re-entrant refresh ignored."),
		}
	}

	/// Only records matching `filter` are rendered. Takes effect on the next render.
	pub fn set_filter(&self, filter: impl Fn(&T) -> bool + 'static) {
		self.shared.state.borrow_mut().filter = Some(Box::new(filter));
	}

	pub fn clear_filter(&self) {
		self.shared.state.borrow_mut().filter = None;
	}

	/// Renders records sorted by `order` instead of in arrival order. Takes effect on the next render.
	///
	/// The sort is stable, so records that compare equal stay in arrival order.
	pub fn set_order(&self, order: impl Fn(&T, &T) -> Ordering + 'static) {
		self.shared.state.borrow_mut().order = Some(Box::new(order));
	}

	pub fn clear_order(&self) {
		self.shared.state.borrow_mut().order = None;
	}

	pub fn set_write_back(&self, write_back: impl WriteBack<T::Key> + 'static) {
		self.shared.state.borrow_mut().write_back = Some(Rc::new(write_back));
	}

	/// Asks the store to delete the record with `key`.
	///
	/// Nothing changes locally until the store reports the removal.
	/// The store may call back into the controller while handling the request.
	#[instrument(skip(self))]
	pub fn delete(&self, key: &T::Key) {
		let write_back = self.shared.state.borrow().write_back.clone();
		match write_back {
			Some(write_back) => write_back.delete(key),
			None => warn!("No write-back configured. Ignoring deletion request."),
		}
		// Removals reported while a batch was in progress are still queued.
		drain_queue(&self.shared);
	}

	pub fn collection(&self) -> Ref<'_, Collection<T>> {
		Ref::map(self.shared.state.borrow(), |state| &state.collection)
	}

	pub fn rendered_keys(&self) -> Ref<'_, RenderedKeys<T::Key>> {
		Ref::map(self.shared.state.borrow(), |state| &state.rendered)
	}

	pub fn scheduler(&self) -> Ref<'_, TransitionScheduler<T::Key, L::Value>> {
		Ref::map(self.shared.state.borrow(), |state| &state.scheduler)
	}

	pub fn sink(&self) -> Ref<'_, S> {
		Ref::map(self.shared.state.borrow(), |state| &state.sink)
	}

	pub fn layout(&self) -> Ref<'_, L> {
		Ref::map(self.shared.state.borrow(), |state| &state.layout)
	}

	#[must_use]
	pub fn phase(&self, key: &T::Key) -> Phase {
		self.shared.state.borrow().scheduler.phase(key)
	}

	pub fn drain_completions(&self) -> Vec<Completion<T::Key>> {
		self.shared.state.borrow_mut().scheduler.drain_completions().collect()
	}
}

impl<T: Keyed, L: Layout<T>, S> Drop for SyncController<T, L, S> {
	fn drop(&mut self) {
		if let Some(subscription) = self.subscription.take() {
			subscription.unsubscribe()
		}
	}
}

impl<T: Keyed, L: Layout<T>, S> Debug for SyncController<T, L, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("SyncController");
		debug.field("subscription", &self.subscription);
		if let Ok(state) = self.shared.state.try_borrow() {
			debug.field("len", &state.collection.len()).field("rendered", &state.rendered.as_slice());
		}
		debug.finish()
	}
}

fn deliver<T, L, S>(shared: &Shared<T, L, S>, batch: Vec<ChangeEvent<T>>)
where
	T: Keyed,
	L: Layout<T>,
	L::Value: Clone,
	S: RenderSink<T::Key, L::Value>,
{
	shared.queue.borrow_mut().push_back(batch);
	drain_queue(shared)
}

fn drain_queue<T, L, S>(shared: &Shared<T, L, S>)
where
	T: Keyed,
	L: Layout<T>,
	L::Value: Clone,
	S: RenderSink<T::Key, L::Value>,
{
	let mut state = match shared.state.try_borrow_mut() {
		Ok(state) => state,
		Err(_) => return trace!("Queued batch behind the one in progress."),
	};
	loop {
		let next = shared.queue.borrow_mut().pop_front();
		match next {
			Some(batch) => state.process(batch),
			None => break,
		}
	}
}

impl<T, L, S> State<T, L, S>
where
	T: Keyed,
	L: Layout<T>,
	L::Value: Clone,
	S: RenderSink<T::Key, L::Value>,
{
	#[instrument(skip(self, batch), fields(batch_len = batch.len()))]
	fn process(&mut self, batch: Vec<ChangeEvent<T>>) {
		let now = self.clock.now();
		let errors = self.collection.apply_batch(batch);
		if !errors.is_empty() {
			warn!("Skipped {} malformed change event(s).", errors.len());
		}
		self.render(now);
	}

	/// Diffs the current view against the rendered keys and dispatches the result.
	fn render(&mut self, now: f64) {
		let State {
			collection,
			rendered,
			scheduler,
			layout,
			sink,
			filter,
			order,
			..
		} = self;

		let mut view: Vec<&T> = match filter {
			Some(filter) => collection.iter().filter(|record| filter(*record)).collect(),
			None => collection.iter().collect(),
		};
		if let Some(order) = order {
			view.sort_by(|a, b| order(*a, *b));
		}
		layout.prepare(&view);

		let DiffResult { enter, update, exit } = diff(view.iter().map(|record| record.key()), rendered);
		let positions: HashMap<&T::Key, (usize, &T)> = view.iter().enumerate().map(|(i, &record)| (record.key(), (i, record))).collect();

		for key in &exit {
			let span = trace_span!("Exiting", ?key);
			let _enter = span.enter();
			match scheduler.value_at(key, now) {
				Some(current) => {
					let vanish = layout.vanish(&current);
					sink.remove_element(key, &vanish);
					scheduler.exit(key.clone(), vanish, now);
				}
				None => {
					warn!("Exiting key without a known value. Releasing its element right away.");
					sink.release_element(key);
				}
			}
		}

		for key in &update {
			let span = trace_span!("Updating", ?key);
			let _enter = span.enter();
			let (i, record) = match positions.get(key) {
				Some(&position) => position,
				None => continue,
			};
			let target = layout.target(record, i);
			let baseline = scheduler.value_at(key, now).unwrap_or_else(|| target.clone());
			sink.update_element(key, &baseline, &target);
			scheduler.update(key.clone(), target, now);
		}

		for key in &enter {
			let span = trace_span!("Entering", ?key);
			let _enter = span.enter();
			let (i, record) = match positions.get(key) {
				Some(&position) => position,
				None => continue,
			};
			let target = layout.target(record, i);
			if scheduler.phase(key) == Phase::Exiting {
				trace!("Reviving exiting element.");
				if let Some(current) = scheduler.value_at(key, now) {
					sink.update_element(key, &current, &target);
				}
				// The baseline is ignored in favour of the tracked value.
				let baseline = target.clone();
				scheduler.enter(key.clone(), baseline, target, now);
			} else {
				let baseline = layout.baseline(record, &target);
				sink.create_element(key, &baseline, &target);
				scheduler.enter(key.clone(), baseline, target, now);
			}
		}

		info!("Rendered {} entering, {} updating and {} exiting element(s).", enter.len(), update.len(), exit.len());
		*rendered = view.iter().map(|record| record.key().clone()).collect();
	}
}
