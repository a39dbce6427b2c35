use parking_lot::Mutex;

use super::*;
use crate::classify::Sound;
use crate::present::PresentationService;

#[derive(Default)]
struct Recording {
	alerts: Mutex<Vec<Alert>>,
	fail: bool,
}

impl PresentationService for Recording {
	fn present(&self, alert: &Alert) -> anyhow::Result<()> {
		self.alerts.lock().push(alert.clone());
		if self.fail {
			anyhow::bail!("speaker unplugged");
		}
		Ok(())
	}
}

fn pipeline(presenter: Arc<Recording>) -> (SubscriptionHandler, Arc<Mutex<Vec<Notification>>>) {
	let registry = Arc::new(HandlerRegistry::new());
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&seen);
	registry.add_fn(move |n| sink.lock().push(n.clone()));
	(SubscriptionHandler::new(UserId::from("25"), registry, presenter), seen)
}

const BODY: &str = r#"{"id":1,"userId":"25","message":"Delivered","type":"order_delivered","createdAt":"2024-06-01T10:00:00","isRead":false}"#;

#[test]
fn dispatches_and_presents_classified_alert() {
	let presenter = Arc::new(Recording::default());
	let (handler, seen) = pipeline(Arc::clone(&presenter));

	assert!(matches!(handler.handle(BODY), Delivery::Dispatched(_)));
	assert_eq!(seen.lock().len(), 1);

	let alerts = presenter.alerts.lock();
	assert_eq!(alerts.len(), 1);
	assert_eq!(alerts[0].title, "order_delivered Notification");
	assert_eq!(alerts[0].classification.sound, Sound::Success);
}

#[test]
fn malformed_payload_is_dropped() {
	let presenter = Arc::new(Recording::default());
	let (handler, seen) = pipeline(Arc::clone(&presenter));

	assert_eq!(handler.handle("{not json"), Delivery::Malformed);
	assert_eq!(handler.handle(r#"{"id":"x"}"#), Delivery::Malformed);
	assert!(seen.lock().is_empty());
	assert!(presenter.alerts.lock().is_empty());
}

#[test]
fn presenter_failure_does_not_block_dispatch() {
	let presenter = Arc::new(Recording {
		fail: true,
		..Default::default()
	});
	let (handler, seen) = pipeline(presenter);

	assert!(matches!(handler.handle(BODY), Delivery::Dispatched(_)));
	assert_eq!(seen.lock().len(), 1);
}

#[test]
fn notifications_for_other_users_are_not_dispatched() {
	let presenter = Arc::new(Recording::default());
	let (handler, seen) = pipeline(presenter);

	let foreign = BODY.replace(r#""userId":"25""#, r#""userId":"26""#);
	assert_eq!(handler.handle(&foreign), Delivery::Foreign(UserId::from("26")));
	assert!(seen.lock().is_empty());
}
