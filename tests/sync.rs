mod common;

use chart_sync::{
	config::{SyncConfig, TransitionConfig},
	interpolate::Easing,
	sync::WriteBack,
	transition::{Phase, TransitionEnd, TransitionKind},
	ChangeEvent, Document, SyncController,
};
use common::{dish, key, manual_clock, Call, CallLog, EchoingStore, ManualSource, Orders, RecordingSink};
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};

fn config() -> SyncConfig {
	SyncConfig {
		transition: TransitionConfig {
			duration_ms: 800.0,
			easing: Easing::Linear,
		},
		..SyncConfig::default()
	}
}

fn snapshot() -> Vec<ChangeEvent<Document>> {
	vec![ChangeEvent::Added(dish("1", "pizza", 5)), ChangeEvent::Added(dish("2", "pasta", 3))]
}

#[test]
fn modified_record_morphs_from_its_previous_value() {
	let (time, clock) = manual_clock();
	let log = CallLog::default();
	let mut source = ManualSource::with_initial(snapshot());
	let mut controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());

	controller.start(&mut source);

	assert!(controller.is_running());
	assert_eq!(log.take(), vec![Call::Create(key("1"), 0.0, 5.0), Call::Create(key("2"), 0.0, 3.0)]);
	assert_eq!(controller.rendered_keys().as_slice(), &[key("1"), key("2")]);
	assert_eq!(controller.phase(&key("1")), Phase::Entering);

	assert_eq!(controller.tick(800.0), 0);
	assert_eq!(controller.phase(&key("1")), Phase::Steady);
	log.take();

	time.set(1000.0);
	source.emit(vec![ChangeEvent::Modified(dish("1", "pizza", 9))]);

	assert_eq!(log.take(), vec![Call::Update(key("1"), 5.0, 9.0), Call::Update(key("2"), 3.0, 3.0)]);
	assert_eq!(controller.phase(&key("1")), Phase::Updating);
	assert_eq!(controller.scheduler().current(&key("1")), Some(&5.0));

	controller.tick(1400.0);
	assert_eq!(controller.scheduler().current(&key("1")), Some(&7.0));
	controller.tick(1800.0);
	assert_eq!(controller.scheduler().current(&key("1")), Some(&9.0));
}

#[test]
fn rapid_updates_do_not_snap() {
	let (time, clock) = manual_clock();
	let log = CallLog::default();
	let mut source = ManualSource::with_initial(vec![ChangeEvent::Added(dish("1", "pizza", 8))]);
	let mut controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());
	controller.start(&mut source);

	// Halfway through entering, another change arrives.
	time.set(400.0);
	source.emit(vec![ChangeEvent::Modified(dish("1", "pizza", 2))]);

	assert_eq!(log.take_structural(), vec![Call::Create(key("1"), 0.0, 8.0), Call::Update(key("1"), 4.0, 2.0)]);
	assert_eq!(controller.scheduler().active_len(), 1);
	let completions = controller.drain_completions();
	assert_eq!(completions.len(), 1);
	assert_eq!(completions[0].kind, TransitionKind::Enter);
	assert_eq!(completions[0].end, TransitionEnd::Superseded);
}

#[test]
fn removed_records_exit_and_are_released() {
	let (time, clock) = manual_clock();
	let log = CallLog::default();
	let mut source = ManualSource::with_initial(snapshot());
	let mut controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());
	controller.start(&mut source);
	controller.tick(800.0);
	log.take();

	time.set(1000.0);
	source.emit(vec![ChangeEvent::Removed(key("2"))]);

	assert_eq!(log.take(), vec![Call::Remove(key("2"), 0.0), Call::Update(key("1"), 5.0, 5.0)]);
	assert_eq!(controller.rendered_keys().as_slice(), &[key("1")]);
	assert_eq!(controller.phase(&key("2")), Phase::Exiting);

	controller.tick(1800.0);
	assert!(log.take().contains(&Call::Release(key("2"))));
	assert_eq!(controller.phase(&key("2")), Phase::Idle);
}

#[test]
fn readded_record_revives_its_exiting_element() {
	let (time, clock) = manual_clock();
	let log = CallLog::default();
	let mut source = ManualSource::with_initial(vec![ChangeEvent::Added(dish("1", "pizza", 8))]);
	let mut controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());
	controller.start(&mut source);
	controller.tick(800.0);

	time.set(1000.0);
	source.emit(vec![ChangeEvent::Removed(key("1"))]);
	time.set(1400.0);
	source.emit(vec![ChangeEvent::Added(dish("1", "pizza", 8))]);

	assert_eq!(log.take_structural(), vec![Call::Create(key("1"), 0.0, 8.0), Call::Remove(key("1"), 0.0), Call::Update(key("1"), 4.0, 8.0)]);
	assert_eq!(controller.phase(&key("1")), Phase::Entering);
}

#[test]
fn malformed_events_are_skipped_without_stalling() {
	let (_time, clock) = manual_clock();
	let log = CallLog::default();
	let mut source = ManualSource::with_initial(snapshot());
	let mut controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());
	controller.start(&mut source);
	log.take();

	source.emit(vec![
		ChangeEvent::Modified(dish("ghost", "soup", 1)),
		ChangeEvent::Added(dish("1", "pizza", 99)),
		ChangeEvent::Added(dish("3", "curry", 4)),
	]);

	let collection = controller.collection();
	assert_eq!(collection.len(), 3);
	assert_eq!(collection.get(&key("1")).and_then(|record| record.number("orders")), Some(5.0));
	drop(collection);
	assert_eq!(log.take_structural().last(), Some(&Call::Create(key("3"), 0.0, 4.0)));
}

#[test]
fn views_filter_and_sort_before_diffing() {
	let (_time, clock) = manual_clock();
	let log = CallLog::default();
	let controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());
	controller.set_filter(|record: &Document| record.text("activity") == Some("running"));
	controller.set_order(|a: &Document, b: &Document| a.text("date").cmp(&b.text("date")));

	controller.handle_batch(vec![
		ChangeEvent::Added(Document::new("a").with("activity", "running").with("date", "2021-03-02").with("orders", 1)),
		ChangeEvent::Added(Document::new("b").with("activity", "cycling").with("date", "2021-03-01").with("orders", 2)),
		ChangeEvent::Added(Document::new("c").with("activity", "running").with("date", "2021-03-01").with("orders", 3)),
	]);

	assert_eq!(log.take(), vec![Call::Create(key("c"), 0.0, 3.0), Call::Create(key("a"), 0.0, 1.0)]);
	assert_eq!(controller.layout().prepared_with, vec![key("c"), key("a")]);

	// Switching the filter exits what no longer matches, without any new events.
	controller.set_filter(|record: &Document| record.text("activity") == Some("cycling"));
	controller.refresh();

	assert_eq!(log.take(), vec![Call::Remove(key("c"), 0.0), Call::Remove(key("a"), 0.0), Call::Create(key("b"), 0.0, 2.0)]);
	assert_eq!(controller.collection().len(), 3);
}

#[test]
fn stop_unsubscribes_and_abandons_transitions() {
	let (_time, clock) = manual_clock();
	let log = CallLog::default();
	let mut source = ManualSource::with_initial(snapshot());
	let mut controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());
	controller.start(&mut source);

	controller.stop();

	assert!(!controller.is_running());
	assert!(source.unsubscribed.get());
	assert!(!source.emit(vec![ChangeEvent::Removed(key("1"))]));
	assert_eq!(controller.collection().len(), 2);
	let completions = controller.drain_completions();
	assert_eq!(completions.len(), 2);
	assert!(completions.iter().all(|completion| completion.end == TransitionEnd::Abandoned));
	assert_eq!(controller.tick(10_000.0), 0);
}

#[test]
fn dropping_the_controller_unsubscribes() {
	let (_time, clock) = manual_clock();
	let mut source = ManualSource::with_initial(snapshot());
	let mut controller = SyncController::new(Orders::default(), RecordingSink(CallLog::default()), clock, config());
	controller.start(&mut source);
	assert!(source.is_subscribed());

	drop(controller);

	assert!(source.unsubscribed.get());
	assert!(!source.is_subscribed());
}

#[test]
fn deletions_go_through_the_store() {
	let (_time, clock) = manual_clock();
	let log = CallLog::default();
	let mut source = ManualSource::with_initial(snapshot());
	let mut controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());
	controller.start(&mut source);
	let deleted = Rc::new(RefCell::new(Vec::new()));
	controller.set_write_back(EchoingStore {
		source: source.clone(),
		deleted: Rc::clone(&deleted),
	});
	log.take();

	controller.delete(&key("1"));

	assert_eq!(*deleted.borrow(), vec![key("1")]);
	// The echoed removal was processed before `delete` returned.
	assert_eq!(controller.collection().len(), 1);
	assert_eq!(log.take_structural(), vec![Call::Remove(key("1"), 0.0), Call::Update(key("2"), 0.0, 3.0)]);
}

#[test]
fn deleting_without_write_back_changes_nothing() {
	let (_time, clock) = manual_clock();
	let controller = SyncController::new(Orders::default(), RecordingSink(CallLog::default()), clock, config());
	controller.handle_batch(snapshot());
	controller.delete(&key("1"));
	assert_eq!(controller.collection().len(), 2);
}

#[test]
fn restarting_rebuilds_the_collection_from_the_new_snapshot() {
	let (_time, clock) = manual_clock();
	let log = CallLog::default();
	let mut source = ManualSource::with_initial(snapshot());
	let mut controller = SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config());
	controller.start(&mut source);
	controller.stop();
	log.take();

	// While stopped, "2" was deleted and "1" changed.
	let mut source = ManualSource::with_initial(vec![ChangeEvent::Added(dish("1", "pizza", 9))]);
	controller.start(&mut source);

	assert!(controller.is_running());
	assert_eq!(controller.collection().len(), 1);
	assert_eq!(controller.collection().get(&key("1")).and_then(|record| record.number("orders")), Some(9.0));
	assert!(!controller.collection().contains_key(&key("2")));
	assert_eq!(controller.rendered_keys().as_slice(), &[key("1")]);
	assert_eq!(log.take_structural(), vec![Call::Release(key("2")), Call::Update(key("1"), 9.0, 9.0)]);

	// Deltas keep working on the rebuilt collection.
	assert!(source.emit(vec![ChangeEvent::Modified(dish("1", "pizza", 4))]));
	assert_eq!(controller.collection().get(&key("1")).and_then(|record| record.number("orders")), Some(4.0));
}

type Controller = SyncController<Document, Orders, RecordingSink>;

/// Hides deleted records locally instead of waiting for the store.
struct HidingStore {
	controller: Weak<Controller>,
}

impl WriteBack<String> for HidingStore {
	fn delete(&self, key: &String) {
		if let Some(controller) = self.controller.upgrade() {
			let hidden = key.clone();
			controller.set_filter(move |record: &Document| record.id != hidden);
			controller.refresh();
		}
	}
}

#[test]
fn write_backs_may_reconfigure_the_controller() {
	let (_time, clock) = manual_clock();
	let log = CallLog::default();
	let controller = Rc::new(SyncController::new(Orders::default(), RecordingSink(log.clone()), clock, config()));
	controller.set_write_back(HidingStore {
		controller: Rc::downgrade(&controller),
	});
	controller.handle_batch(snapshot());
	log.take();

	controller.delete(&key("1"));

	assert_eq!(log.take_structural(), vec![Call::Remove(key("1"), 0.0), Call::Update(key("2"), 0.0, 3.0)]);
	assert_eq!(controller.rendered_keys().as_slice(), &[key("2")]);
	assert_eq!(controller.collection().len(), 2);
}
