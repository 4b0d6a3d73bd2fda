#![allow(dead_code)]

use chart_sync::{
	sink::RenderSink,
	sync::{EventSource, Layout, Subscription, WriteBack},
	ChangeEvent, Document,
};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

pub fn dish(id: &str, name: &str, orders: u32) -> Document {
	Document::new(id).with("name", name).with("orders", orders)
}

pub fn key(id: &str) -> String {
	id.to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
	Create(String, f64, f64),
	Update(String, f64, f64),
	Remove(String, f64),
	Set(String, f64),
	Release(String),
}

/// Shared record of everything a [`RecordingSink`] was told.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
	pub fn take(&self) -> Vec<Call> {
		self.0.borrow_mut().drain(..).collect()
	}

	/// Takes all calls except interpolation ticks.
	pub fn take_structural(&self) -> Vec<Call> {
		self.take().into_iter().filter(|call| !matches!(call, Call::Set(..))).collect()
	}

	fn push(&self, call: Call) {
		self.0.borrow_mut().push(call)
	}
}

#[derive(Debug, Clone)]
pub struct RecordingSink(pub CallLog);

impl RenderSink<String, f64> for RecordingSink {
	fn create_element(&mut self, key: &String, baseline: &f64, target: &f64) {
		self.0.push(Call::Create(key.clone(), *baseline, *target))
	}

	fn update_element(&mut self, key: &String, baseline: &f64, target: &f64) {
		self.0.push(Call::Update(key.clone(), *baseline, *target))
	}

	fn remove_element(&mut self, key: &String, vanish: &f64) {
		self.0.push(Call::Remove(key.clone(), *vanish))
	}

	fn set_interpolated(&mut self, key: &String, value: &f64) {
		self.0.push(Call::Set(key.clone(), *value))
	}

	fn release_element(&mut self, key: &String) {
		self.0.push(Call::Release(key.clone()))
	}
}

/// Bar heights straight from the `orders` field. Bars grow from and shrink to zero.
#[derive(Debug, Default)]
pub struct Orders {
	pub prepared_with: Vec<String>,
}

impl Layout<Document> for Orders {
	type Value = f64;

	fn prepare(&mut self, records: &[&Document]) {
		self.prepared_with = records.iter().map(|record| record.id.clone()).collect();
	}

	fn target(&self, record: &Document, _index: usize) -> f64 {
		record.number("orders").unwrap_or(0.0)
	}

	fn baseline(&self, _record: &Document, _target: &f64) -> f64 {
		0.0
	}

	fn vanish(&self, _current: &f64) -> f64 {
		0.0
	}
}

pub fn manual_clock() -> (Rc<Cell<f64>>, impl Fn() -> f64) {
	let time = Rc::new(Cell::new(0.0));
	let clock = {
		let time = Rc::clone(&time);
		move || time.get()
	};
	(time, clock)
}

type OnBatch = Box<dyn FnMut(Vec<ChangeEvent<Document>>)>;

/// An in-memory store. Replays `initial` on subscription, then delivers whatever is [`emit`](`ManualSource::emit`)ted.
#[derive(Clone, Default)]
pub struct ManualSource {
	initial: Vec<ChangeEvent<Document>>,
	subscriber: Rc<RefCell<Option<OnBatch>>>,
	pub unsubscribed: Rc<Cell<bool>>,
}

impl ManualSource {
	pub fn with_initial(initial: Vec<ChangeEvent<Document>>) -> Self {
		Self { initial, ..Self::default() }
	}

	pub fn is_subscribed(&self) -> bool {
		self.subscriber.borrow().is_some()
	}

	/// Returns whether anyone was listening.
	pub fn emit(&self, batch: Vec<ChangeEvent<Document>>) -> bool {
		let taken = self.subscriber.borrow_mut().take();
		match taken {
			Some(mut on_batch) => {
				on_batch(batch);
				let mut subscriber = self.subscriber.borrow_mut();
				if subscriber.is_none() && !self.unsubscribed.get() {
					*subscriber = Some(on_batch);
				}
				true
			}
			None => false,
		}
	}
}

impl EventSource<Document> for ManualSource {
	fn subscribe(&mut self, mut on_batch: OnBatch) -> Subscription {
		self.unsubscribed.set(false);
		on_batch(self.initial.clone());
		*self.subscriber.borrow_mut() = Some(on_batch);

		let subscriber = Rc::clone(&self.subscriber);
		let unsubscribed = Rc::clone(&self.unsubscribed);
		Subscription::new(move || {
			subscriber.borrow_mut().take();
			unsubscribed.set(true);
		})
	}
}

/// Acts like a local-first store: deletions are echoed back as removals immediately.
pub struct EchoingStore {
	pub source: ManualSource,
	pub deleted: Rc<RefCell<Vec<String>>>,
}

impl WriteBack<String> for EchoingStore {
	fn delete(&self, key: &String) {
		self.deleted.borrow_mut().push(key.clone());
		self.source.emit(vec![ChangeEvent::Removed(key.clone())]);
	}
}
