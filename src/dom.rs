//! Browser bindings: an SVG [`RenderSink`], a `performance.now()` [`Clock`] and a `requestAnimationFrame` loop.

use crate::{sink::RenderSink, sync::Clock};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug},
	hash::Hash,
};
use hashbrown::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, UnwrapThrowExt};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

type Attributes<K, V> = Box<dyn Fn(&K, &V) -> Vec<(&'static str, String)>>;

/// Renders each key as one SVG element (`<rect>`, `<path>`, `<circle>`, …) appended to a parent element.
///
/// The attributes for a value are computed by a caller-supplied function, so path generators and the like stay outside this crate.
pub struct SvgSink<K, V> {
	document: web_sys::Document,
	parent: web_sys::Element,
	tag: &'static str,
	attributes: Attributes<K, V>,
	elements: HashMap<K, web_sys::Element>,
	exiting: HashSet<K>,
}

impl<K: Debug + Eq + Hash, V> Debug for SvgSink<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SvgSink")
			.field("parent", &self.parent)
			.field("tag", &self.tag)
			.field("keys", &self.elements.keys().collect::<Vec<_>>())
			.field("exiting", &self.exiting)
			.finish()
	}
}

impl<K: Clone + Eq + Hash + Debug, V> SvgSink<K, V> {
	/// # Panics
	///
	/// Iff `parent` has no owner document.
	#[must_use]
	#[instrument(skip(attributes))]
	pub fn new(parent: web_sys::Element, tag: &'static str, attributes: impl Fn(&K, &V) -> Vec<(&'static str, String)> + 'static) -> Self {
		let document = parent.owner_document().expect_throw("chart-sync: No owner document found for parent element.");
		Self {
			document,
			parent,
			tag,
			attributes: Box::new(attributes),
			elements: HashMap::new(),
			exiting: HashSet::new(),
		}
	}

	#[must_use]
	pub fn element(&self, key: &K) -> Option<&web_sys::Element> {
		self.elements.get(key)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.elements.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.elements.is_empty()
	}

	#[must_use]
	pub fn is_exiting(&self, key: &K) -> bool {
		self.exiting.contains(key)
	}

	fn write(&self, key: &K, element: &web_sys::Element, value: &V) {
		for (name, value) in (self.attributes)(key, value) {
			if let Err(error) = element.set_attribute(name, &value) {
				if cfg!(feature = "dangerous-logging") {
					error!("Could not set attribute {:?}={:?} on {:?}: {:?}", name, value, key, error)
				} else {
					error!("Could not set attribute {:?} on {:?}: {:?}", name, key, error)
				}
			}
		}
	}

	fn create(&mut self, key: &K, value: &V) {
		let element = match self.document.create_element_ns(Some(SVG_NAMESPACE), self.tag) {
			Ok(element) => element,
			Err(error) => return error!("Could not create <{}>: {:?}", self.tag, error),
		};
		self.write(key, &element, value);
		if let Err(error) = self.parent.append_child(&element) {
			return error!("Could not append <{}>: {:?}", self.tag, error);
		}
		if let Some(replaced) = self.elements.insert(key.clone(), element) {
			warn!("Element collision for {:?}. Removing the previous one.", key);
			replaced.remove();
		}
	}
}

impl<K: Clone + Eq + Hash + Debug, V> RenderSink<K, V> for SvgSink<K, V> {
	#[instrument(skip(self, baseline, _target))]
	fn create_element(&mut self, key: &K, baseline: &V, _target: &V) {
		self.exiting.remove(key);
		self.create(key, baseline)
	}

	#[instrument(skip(self, baseline, _target))]
	fn update_element(&mut self, key: &K, baseline: &V, _target: &V) {
		self.exiting.remove(key);
		match self.elements.get(key) {
			Some(element) => self.write(key, element, baseline),
			None => {
				warn!("Expected to update missing element. Recreating it.");
				self.create(key, baseline)
			}
		}
	}

	#[instrument(skip(self, _vanish))]
	fn remove_element(&mut self, key: &K, _vanish: &V) {
		if self.elements.contains_key(key) {
			self.exiting.insert(key.clone());
		} else {
			warn!("Expected to remove missing element.");
		}
	}

	fn set_interpolated(&mut self, key: &K, value: &V) {
		match self.elements.get(key) {
			Some(element) => self.write(key, element, value),
			None => trace!(?key, "Interpolated value for missing element ignored."),
		}
	}

	#[instrument(skip(self))]
	fn release_element(&mut self, key: &K) {
		self.exiting.remove(key);
		match self.elements.remove(key) {
			Some(element) => element.remove(),
			None => warn!("Expected to release missing element."),
		}
	}
}

/// [`Clock`] backed by `performance.now()`, falling back to `Date.now()` without a window.
///
/// This is the time base `requestAnimationFrame` timestamps use.
#[derive(Debug, Clone)]
pub struct PerformanceClock {
	performance: Option<web_sys::Performance>,
}

impl Default for PerformanceClock {
	fn default() -> Self {
		Self::new()
	}
}

impl PerformanceClock {
	#[must_use]
	pub fn new() -> Self {
		let performance = web_sys::window().and_then(|window| window.performance());
		if performance.is_none() {
			warn!("`performance` is unavailable. Falling back to `Date.now()`, which is not monotonic.");
		}
		Self { performance }
	}
}

impl Clock for PerformanceClock {
	fn now(&self) -> f64 {
		match &self.performance {
			Some(performance) => performance.now(),
			None => js_sys::Date::now(),
		}
	}
}

struct LoopInner {
	tick: Box<dyn Fn(f64) -> usize>,
	closure: RefCell<Option<Closure<dyn FnMut(f64)>>>,
	pending: Cell<Option<i32>>,
}

/// Calls `tick` once per animation frame for as long as it reports transitions in flight.
///
/// Call [`wake`](`AnimationLoop::wake`) after each dispatched batch. Frames stop being requested once `tick` returns `0`.
///
/// ```rust,ignore
/// let controller = Rc::new(controller);
/// let animation = AnimationLoop::new({
///     let controller = Rc::clone(&controller);
///     move |now| controller.tick(now)
/// });
/// animation.wake();
/// ```
pub struct AnimationLoop {
	inner: Rc<LoopInner>,
}

impl Debug for AnimationLoop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AnimationLoop").field("pending", &self.inner.pending.get()).finish()
	}
}

impl AnimationLoop {
	pub fn new(tick: impl Fn(f64) -> usize + 'static) -> Self {
		Self {
			inner: Rc::new(LoopInner {
				tick: Box::new(tick),
				closure: RefCell::new(None),
				pending: Cell::new(None),
			}),
		}
	}

	/// Requests an animation frame unless one is pending already.
	pub fn wake(&self) {
		request_frame(&self.inner)
	}

	#[must_use]
	pub fn is_pending(&self) -> bool {
		self.inner.pending.get().is_some()
	}

	pub fn cancel(&self) {
		if let Some(handle) = self.inner.pending.take() {
			match web_sys::window() {
				Some(window) => {
					if let Err(error) = window.cancel_animation_frame(handle) {
						error!("Could not cancel animation frame: {:?}", error)
					}
				}
				None => error!("No window to cancel the animation frame with."),
			}
		}
	}
}

impl Drop for AnimationLoop {
	fn drop(&mut self) {
		self.cancel()
	}
}

fn request_frame(inner: &Rc<LoopInner>) {
	if inner.pending.get().is_some() {
		return;
	}
	let window = match web_sys::window() {
		Some(window) => window,
		None => return error!("No window to request animation frames from."),
	};

	let mut closure = inner.closure.borrow_mut();
	let closure = closure.get_or_insert_with(|| {
		let inner: Weak<LoopInner> = Rc::downgrade(inner);
		Closure::wrap(Box::new(move |timestamp: f64| {
			if let Some(inner) = inner.upgrade() {
				inner.pending.set(None);
				let active = (inner.tick)(timestamp);
				if active > 0 {
					request_frame(&inner)
				} else {
					trace!("Transitions settled. Pausing animation frames.");
				}
			}
		}) as Box<dyn FnMut(f64)>)
	});

	match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
		Ok(handle) => inner.pending.set(Some(handle)),
		Err(error) => error!("Could not request animation frame: {:?}", error),
	}
}
