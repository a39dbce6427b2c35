//! Notification history over REST.
//!
//! [`HistoryApi`] is the wire seam; [`RestHistory`] implements it with `reqwest`.
//! [`HistoryStore`] layers the caller-facing policy on top:
//!
//! - Listing never fails. Any error yields an empty list, which callers cannot tell
//!   apart from a user with no notifications.
//! - Lists are returned newest first whatever order the server used.
//! - Read-marking reports `bool`. A batch is one independent request per id, sent
//!   concurrently; it reports `true` only if every request succeeded, so a partial
//!   failure reads as total failure even though some updates were applied.

mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;

pub use rest::RestHistory;

use crate::config::ClientConfig;
use crate::notification::{Notification, NotificationId, UserId, sort_newest_first};
use crate::Result;

/// Which slice of a user's history to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListScope {
	/// Every notification.
	#[default]
	All,
	/// Only unread notifications.
	Unread,
	/// Notifications with the given type tag.
	Type(String),
}

/// Raw history endpoints. Errors are reported, not swallowed.
#[async_trait]
pub trait HistoryApi: Send + Sync {
	/// Fetch a user's notifications in server order.
	async fn list(&self, user: &UserId, scope: &ListScope, token: Option<&str>) -> Result<Vec<Notification>>;

	/// Mark one notification read.
	async fn mark_read(&self, id: NotificationId, token: Option<&str>) -> Result<()>;

	/// Server-side unread count for a user.
	async fn unread_count(&self, user: &UserId, token: Option<&str>) -> Result<u64>;
}

/// Caller-facing history client.
#[derive(Clone)]
pub struct HistoryStore {
	api: Arc<dyn HistoryApi>,
}

impl std::fmt::Debug for HistoryStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HistoryStore").finish_non_exhaustive()
	}
}

impl HistoryStore {
	/// Wrap an API implementation.
	pub fn new(api: Arc<dyn HistoryApi>) -> Self {
		Self { api }
	}

	/// REST-backed store for `config`.
	pub fn rest(config: &ClientConfig) -> Result<Self> {
		Ok(Self::new(Arc::new(RestHistory::new(config)?)))
	}

	/// All notifications for `user`, newest first. Empty on any failure.
	pub async fn list(&self, user: &UserId, token: Option<&str>) -> Vec<Notification> {
		self.list_scoped(user, &ListScope::All, token).await
	}

	/// Unread notifications for `user`, newest first. Empty on any failure.
	pub async fn list_unread(&self, user: &UserId, token: Option<&str>) -> Vec<Notification> {
		self.list_scoped(user, &ListScope::Unread, token).await
	}

	/// Notifications of one type for `user`, newest first. Empty on any failure.
	pub async fn list_by_type(&self, user: &UserId, kind: &str, token: Option<&str>) -> Vec<Notification> {
		self.list_scoped(user, &ListScope::Type(kind.to_owned()), token).await
	}

	/// Notifications in `scope` for `user`, newest first. Empty on any failure.
	pub async fn list_scoped(&self, user: &UserId, scope: &ListScope, token: Option<&str>) -> Vec<Notification> {
		match self.api.list(user, scope, token).await {
			Ok(mut notifications) => {
				sort_newest_first(&mut notifications);
				tracing::debug!(user = %user, ?scope, count = notifications.len(), "Fetched notification history");
				notifications
			}
			Err(e) => {
				tracing::error!(user = %user, ?scope, error = %e, "Failed to fetch notifications");
				Vec::new()
			}
		}
	}

	/// Mark `id` read. `true` only when the server accepted it.
	pub async fn mark_read(&self, id: NotificationId, token: Option<&str>) -> bool {
		match self.api.mark_read(id, token).await {
			Ok(()) => {
				tracing::debug!(%id, "Notification marked as read");
				true
			}
			Err(e) => {
				tracing::error!(%id, error = %e, "Failed to mark notification as read");
				false
			}
		}
	}

	/// Mark every id read with one concurrent request per id.
	///
	/// Not transactional: `false` means at least one request failed, and the others
	/// may still have been applied server-side.
	pub async fn mark_many_read(&self, ids: &[NotificationId], token: Option<&str>) -> bool {
		let results = join_all(ids.iter().map(|&id| self.mark_read(id, token))).await;
		let failed = results.iter().filter(|ok| !**ok).count();
		if failed > 0 {
			tracing::warn!(total = ids.len(), failed, "Batch mark-read partially failed");
		}
		failed == 0
	}

	/// Server-side unread count. `None` on any failure.
	pub async fn unread_count(&self, user: &UserId, token: Option<&str>) -> Option<u64> {
		match self.api.unread_count(user, token).await {
			Ok(count) => Some(count),
			Err(e) => {
				tracing::error!(user = %user, error = %e, "Failed to fetch unread count");
				None
			}
		}
	}
}

#[cfg(test)]
pub(crate) mod tests;
