use pretty_assertions::assert_eq;

use super::*;

fn at(created_at: &str) -> Notification {
	Notification {
		id: None,
		user_id: UserId::from("1"),
		message: created_at.to_owned(),
		kind: String::new(),
		created_at: Timestamp::parse(created_at),
		is_read: false,
	}
}

#[test]
fn decodes_server_payload() {
	let body = r#"{"id":7,"userId":"25","message":"Order shipped","type":"ORDER_DELIVERED","createdAt":"2024-06-01T10:15:30","isRead":false}"#;
	let n = Notification::from_json(body).unwrap();
	assert_eq!(n.id, Some(NotificationId(7)));
	assert_eq!(n.user_id.as_str(), "25");
	assert_eq!(n.kind, "ORDER_DELIVERED");
	assert!(!n.is_read);
	assert!(n.created_at.instant().is_some());
}

#[test]
fn accepts_numeric_user_and_alternate_field_names() {
	let body = r#"{"notificationId":3,"userId":25,"message":"m","type":"x","createdAt":"2024-01-01","read":true}"#;
	let n = Notification::from_json(body).unwrap();
	assert_eq!(n.id, Some(NotificationId(3)));
	assert_eq!(n.user_id, UserId::from("25"));
	assert!(n.is_read);
}

#[test]
fn welcome_notification_without_id_decodes() {
	let body = r#"{"userId":"25","message":"Connected to notification service","type":"SYSTEM","createdAt":"2024-06-01T10:15:30.123456"}"#;
	let n = Notification::from_json(body).unwrap();
	assert_eq!(n.id, None);
	assert!(!n.is_read);
}

#[test]
fn malformed_payload_is_an_error() {
	assert!(Notification::from_json("not json").is_err());
	assert!(Notification::from_json(r#"{"message":"no owner"}"#).is_err());
}

#[test]
fn serializes_with_wire_names() {
	let n = Notification::from_json(r#"{"id":1,"userId":"9","message":"m","type":"t","createdAt":"2024-01-01","isRead":false}"#).unwrap();
	let value = serde_json::to_value(&n).unwrap();
	assert_eq!(value["userId"], "9");
	assert_eq!(value["createdAt"], "2024-01-01");
	assert_eq!(value["isRead"], false);
	assert_eq!(value["type"], "t");
}

#[test]
fn sorts_newest_first_regardless_of_input_order() {
	let mut list = vec![at("2024-01-01"), at("2024-06-01"), at("2024-03-01T08:00:00Z")];
	sort_newest_first(&mut list);
	let order: Vec<_> = list.iter().map(|n| n.created_at.as_str()).collect();
	assert_eq!(order, vec!["2024-06-01", "2024-03-01T08:00:00Z", "2024-01-01"]);
}

#[test]
fn unparseable_timestamps_sort_oldest() {
	let mut list = vec![at("garbage"), at("2024-01-01")];
	sort_newest_first(&mut list);
	assert_eq!(list[0].created_at.as_str(), "2024-01-01");
	assert_eq!(list[1].created_at.instant(), None);
}
