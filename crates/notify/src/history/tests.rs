use std::collections::HashSet;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::Error;
use crate::notification::Timestamp;

/// In-memory [`HistoryApi`] with scripted failures.
#[derive(Default)]
pub(crate) struct MockHistory {
	pub(crate) items: Mutex<Vec<Notification>>,
	pub(crate) fail_list: Mutex<bool>,
	pub(crate) reject: Mutex<HashSet<NotificationId>>,
	pub(crate) marked: Mutex<Vec<NotificationId>>,
	pub(crate) list_calls: Mutex<usize>,
}

impl MockHistory {
	pub(crate) fn with(items: Vec<Notification>) -> Arc<Self> {
		Arc::new(Self {
			items: Mutex::new(items),
			..Self::default()
		})
	}

	pub(crate) fn store(self: &Arc<Self>) -> HistoryStore {
		HistoryStore::new(Arc::clone(self) as Arc<dyn HistoryApi>)
	}
}

#[async_trait]
impl HistoryApi for MockHistory {
	async fn list(&self, user: &UserId, scope: &ListScope, _token: Option<&str>) -> Result<Vec<Notification>> {
		*self.list_calls.lock() += 1;
		if *self.fail_list.lock() {
			return Err(Error::Status {
				method: reqwest::Method::GET,
				url: format!("/api/notifications/user/{user}"),
				status: 500,
			});
		}
		Ok(self
			.items
			.lock()
			.iter()
			.filter(|n| &n.user_id == user)
			.filter(|n| match scope {
				ListScope::All => true,
				ListScope::Unread => !n.is_read,
				ListScope::Type(kind) => n.kind.eq_ignore_ascii_case(kind),
			})
			.cloned()
			.collect())
	}

	async fn mark_read(&self, id: NotificationId, _token: Option<&str>) -> Result<()> {
		if self.reject.lock().contains(&id) {
			return Err(Error::Status {
				method: reqwest::Method::PUT,
				url: format!("/api/notifications/{id}/read"),
				status: 404,
			});
		}
		self.marked.lock().push(id);
		for n in self.items.lock().iter_mut().filter(|n| n.id == Some(id)) {
			n.is_read = true;
		}
		Ok(())
	}

	async fn unread_count(&self, user: &UserId, _token: Option<&str>) -> Result<u64> {
		if *self.fail_list.lock() {
			return Err(Error::LinkClosed);
		}
		Ok(self.items.lock().iter().filter(|n| &n.user_id == user && !n.is_read).count() as u64)
	}
}

pub(crate) fn note(id: i64, user: &str, kind: &str, created_at: &str, is_read: bool) -> Notification {
	Notification {
		id: Some(NotificationId(id)),
		user_id: UserId::from(user),
		message: format!("message {id}"),
		kind: kind.to_owned(),
		created_at: Timestamp::parse(created_at),
		is_read,
	}
}

fn ids(list: &[Notification]) -> Vec<i64> {
	list.iter().filter_map(|n| n.id).map(|id| id.0).collect()
}

#[tokio::test]
async fn list_is_sorted_newest_first() {
	let api = MockHistory::with(vec![
		note(1, "25", "info", "2024-01-01", false),
		note(2, "25", "info", "2024-06-01", false),
		note(3, "25", "info", "2024-03-15T08:30:00", true),
	]);
	let store = api.store();

	assert_eq!(ids(&store.list(&"25".into(), None).await), vec![2, 3, 1]);
}

#[tokio::test]
async fn list_failure_yields_empty() {
	let api = MockHistory::with(vec![note(1, "25", "info", "2024-01-01", false)]);
	*api.fail_list.lock() = true;
	let store = api.store();

	assert!(store.list(&"25".into(), None).await.is_empty());
	assert!(store.list_unread(&"25".into(), None).await.is_empty());
	assert_eq!(store.unread_count(&"25".into(), None).await, None);
}

#[tokio::test]
async fn scoped_lists_filter_server_side() {
	let api = MockHistory::with(vec![
		note(1, "25", "ORDER_DELIVERED", "2024-01-01", false),
		note(2, "25", "info", "2024-06-01", true),
		note(3, "25", "order_delivered", "2024-07-01", true),
		note(4, "26", "info", "2024-08-01", false),
	]);
	let store = api.store();
	let user = UserId::from("25");

	assert_eq!(ids(&store.list_unread(&user, None).await), vec![1]);
	assert_eq!(ids(&store.list_by_type(&user, "order_delivered", None).await), vec![3, 1]);
	assert_eq!(store.unread_count(&user, None).await, Some(1));
}

#[tokio::test]
async fn mark_read_reports_outcome() {
	let api = MockHistory::with(vec![note(1, "25", "info", "2024-01-01", false)]);
	api.reject.lock().insert(NotificationId(9));
	let store = api.store();

	assert!(store.mark_read(NotificationId(1), None).await);
	assert!(!store.mark_read(NotificationId(9), None).await);
}

#[tokio::test]
async fn mark_many_is_all_or_nothing_but_not_transactional() {
	let api = MockHistory::default();
	let api = Arc::new(api);
	api.reject.lock().insert(NotificationId(3));
	let store = api.store();

	let ok = store
		.mark_many_read(&[NotificationId(1), NotificationId(2), NotificationId(3)], None)
		.await;

	assert!(!ok);
	let mut marked = api.marked.lock().clone();
	marked.sort();
	assert_eq!(marked, vec![NotificationId(1), NotificationId(2)]);
}

#[tokio::test]
async fn mark_many_empty_is_success() {
	let api = Arc::new(MockHistory::default());
	assert!(api.store().mark_many_read(&[], None).await);
}
