//! Consumer-facing notification view.
//!
//! [`NotificationFeed`] merges the history pull with live pushes into one list, newest
//! first, deduplicated by id, with an unread counter that always equals the number of
//! unread entries. Read-marking is optimistic: the local entry flips before the server
//! is asked and is never flipped back.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::handlers::{HandlerRegistry, SharedHandler};
use crate::history::HistoryStore;
use crate::notification::{Notification, NotificationId, UserId, sort_newest_first};

/// Size of [`NotificationFeed::recent`].
pub const RECENT: usize = 5;

#[derive(Default)]
struct View {
	items: Vec<Notification>,
	unread: usize,
}

impl View {
	fn contains(&self, id: NotificationId) -> bool {
		self.items.iter().any(|n| n.id == Some(id))
	}

	fn recount(&mut self) {
		self.unread = self.items.iter().filter(|n| !n.is_read).count();
	}
}

struct FeedState {
	user: UserId,
	view: Mutex<View>,
	unread_tx: watch::Sender<usize>,
}

impl FeedState {
	fn publish(&self, unread: usize) {
		self.unread_tx.send_if_modified(|current| {
			let changed = *current != unread;
			*current = unread;
			changed
		});
	}

	fn push(&self, notification: &Notification) {
		if notification.user_id != self.user {
			return;
		}
		let mut view = self.view.lock();
		if let Some(id) = notification.id
			&& view.contains(id)
		{
			debug!(user = %self.user, %id, "Ignoring duplicate notification");
			return;
		}
		view.items.insert(0, notification.clone());
		if !notification.is_read {
			view.unread += 1;
		}
		self.publish(view.unread);
	}

	/// Replace history entries, keeping live entries the history does not know yet.
	///
	/// An entry already read locally stays read. The result is ordered newest first.
	fn merge(&self, mut history: Vec<Notification>) {
		let mut view = self.view.lock();
		let read: HashSet<NotificationId> = view.items.iter().filter(|n| n.is_read).filter_map(|n| n.id).collect();
		for entry in &mut history {
			if entry.id.is_some_and(|id| read.contains(&id)) {
				entry.is_read = true;
			}
		}
		let known: HashSet<NotificationId> = history.iter().filter_map(|n| n.id).collect();
		let mut items: Vec<Notification> = view
			.items
			.drain(..)
			.filter(|n| n.id.is_none_or(|id| !known.contains(&id)))
			.collect();
		items.extend(history);
		sort_newest_first(&mut items);
		view.items = items;
		view.recount();
		self.publish(view.unread);
	}
}

/// Merged, counted view of one user's notifications.
///
/// Registers a handler on the [`HandlerRegistry`] for its lifetime; dropping the feed
/// (or calling [`Self::deactivate`]) removes it. The connection itself is left to its owner.
pub struct NotificationFeed {
	state: Arc<FeedState>,
	history: HistoryStore,
	token: Option<String>,
	registry: Arc<HandlerRegistry>,
	handler: SharedHandler,
}

impl std::fmt::Debug for NotificationFeed {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let view = self.state.view.lock();
		f.debug_struct("NotificationFeed")
			.field("user", &self.state.user)
			.field("len", &view.items.len())
			.field("unread", &view.unread)
			.finish_non_exhaustive()
	}
}

impl NotificationFeed {
	/// Start listening on `registry`, then seed from history.
	///
	/// Pushes that arrive while the history request is running are kept.
	pub async fn activate(user: UserId, token: Option<String>, history: HistoryStore, registry: Arc<HandlerRegistry>) -> Self {
		let (unread_tx, _) = watch::channel(0);
		let state = Arc::new(FeedState {
			user,
			view: Mutex::new(View::default()),
			unread_tx,
		});
		let sink = Arc::clone(&state);
		let handler = registry.add_fn(move |n| sink.push(n));
		let feed = Self {
			state,
			history,
			token,
			registry,
			handler,
		};
		feed.refresh().await;
		info!(user = %feed.state.user, total = feed.len(), unread = feed.unread_count(), "Notification feed active");
		feed
	}

	/// Pull history again and merge it with what is already shown.
	///
	/// History copies replace local entries with the same id, except that a locally read
	/// entry stays read. A failed pull keeps the current entries.
	pub async fn refresh(&self) {
		let history = self.history.list(&self.state.user, self.token.as_deref()).await;
		self.state.merge(history);
	}

	/// Owner of this feed.
	pub fn user(&self) -> &UserId {
		&self.state.user
	}

	/// All entries, newest first.
	pub fn notifications(&self) -> Vec<Notification> {
		self.state.view.lock().items.clone()
	}

	/// The [`RECENT`] newest entries.
	pub fn recent(&self) -> Vec<Notification> {
		self.recent_n(RECENT)
	}

	/// The `n` newest entries.
	pub fn recent_n(&self, n: usize) -> Vec<Notification> {
		self.state.view.lock().items.iter().take(n).cloned().collect()
	}

	/// Unread entries, newest first.
	pub fn unread(&self) -> Vec<Notification> {
		self.state.view.lock().items.iter().filter(|n| !n.is_read).cloned().collect()
	}

	/// Number of unread entries.
	pub fn unread_count(&self) -> usize {
		self.state.view.lock().unread
	}

	/// Watch the unread count.
	pub fn subscribe_unread(&self) -> watch::Receiver<usize> {
		self.state.unread_tx.subscribe()
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.state.view.lock().items.len()
	}

	/// Whether the feed is empty.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Mark `id` read locally, then on the server.
	///
	/// Returns the server outcome. The local flip stays even when the server refuses.
	pub async fn mark_as_read(&self, id: NotificationId) -> bool {
		{
			let mut view = self.state.view.lock();
			if let Some(entry) = view.items.iter_mut().find(|n| n.id == Some(id) && !n.is_read) {
				entry.is_read = true;
				view.unread = view.unread.saturating_sub(1);
				self.state.publish(view.unread);
			}
		}
		self.history.mark_read(id, self.token.as_deref()).await
	}

	/// Mark every unread entry read on the server, then locally.
	///
	/// Local entries are all flipped and the count zeroed whatever the server answered.
	pub async fn mark_all_as_read(&self) -> bool {
		let ids: Vec<NotificationId> = {
			let view = self.state.view.lock();
			view.items.iter().filter(|n| !n.is_read).filter_map(|n| n.id).collect()
		};
		let ok = self.history.mark_many_read(&ids, self.token.as_deref()).await;
		let mut view = self.state.view.lock();
		for entry in &mut view.items {
			entry.is_read = true;
		}
		view.unread = 0;
		self.state.publish(0);
		ok
	}

	/// Stop receiving live notifications.
	pub fn deactivate(self) {}
}

impl Drop for NotificationFeed {
	fn drop(&mut self) {
		if self.registry.remove(&self.handler) {
			debug!(user = %self.state.user, "Notification feed deactivated");
		}
	}
}
