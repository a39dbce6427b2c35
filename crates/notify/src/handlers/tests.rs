use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::*;
use crate::notification::{Timestamp, UserId};

fn sample() -> Notification {
	Notification {
		id: None,
		user_id: UserId::from("1"),
		message: "hello".into(),
		kind: "TEST".into(),
		created_at: Timestamp::parse("2024-01-01"),
		is_read: false,
	}
}

fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> SharedHandler {
	let log = Arc::clone(log);
	Arc::new(move |_: &Notification| log.lock().push(name))
}

#[test]
fn panicking_handler_does_not_stop_the_rest() {
	let registry = HandlerRegistry::new();
	let log = Arc::new(Mutex::new(Vec::new()));

	let first = Arc::clone(&log);
	registry.add_fn(move |_| {
		first.lock().push("h1");
		panic!("h1 exploded");
	});
	registry.add(recorder(&log, "h2"));
	registry.add(recorder(&log, "h3"));

	let failed = registry.dispatch(&sample());

	assert_eq!(failed, 1);
	assert_eq!(*log.lock(), vec!["h1", "h2", "h3"]);
}

#[test]
fn remove_requires_the_same_reference() {
	let registry = HandlerRegistry::new();
	let calls = Arc::new(AtomicUsize::new(0));

	let make = |calls: &Arc<AtomicUsize>| -> SharedHandler {
		let calls = Arc::clone(calls);
		Arc::new(move |_: &Notification| {
			calls.fetch_add(1, Ordering::SeqCst);
		})
	};
	let registered = make(&calls);
	let lookalike = make(&calls);
	registry.add(Arc::clone(&registered));

	assert!(!registry.remove(&lookalike));
	assert_eq!(registry.len(), 1);

	assert!(registry.remove(&registered));
	assert!(registry.is_empty());
	assert!(!registry.remove(&registered));

	registry.dispatch(&sample());
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn remove_takes_first_of_duplicate_registrations() {
	let registry = HandlerRegistry::new();
	let log = Arc::new(Mutex::new(Vec::new()));
	let handler = recorder(&log, "dup");
	registry.add(Arc::clone(&handler));
	registry.add(Arc::clone(&handler));

	assert!(registry.remove(&handler));
	registry.dispatch(&sample());
	assert_eq!(*log.lock(), vec!["dup"]);
}

#[test]
fn handlers_can_unregister_during_dispatch() {
	let registry = Arc::new(HandlerRegistry::new());
	let slot: Arc<Mutex<Option<SharedHandler>>> = Arc::new(Mutex::new(None));

	let inner_registry = Arc::clone(&registry);
	let inner_slot = Arc::clone(&slot);
	let once = registry.add_fn(move |_| {
		if let Some(me) = inner_slot.lock().take() {
			inner_registry.remove(&me);
		}
	});
	*slot.lock() = Some(once);

	assert_eq!(registry.dispatch(&sample()), 0);
	assert!(registry.is_empty());
}

#[test]
fn panic_message_extracts_payload_text() {
	let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("boom"));
	assert_eq!(panic_message(payload.as_ref()), "boom");
	let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
	assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
}
