//! Inbound pipeline for one push session.
//!
//! Each message body is decoded, checked against the session user, handed to the
//! presentation service, and dispatched to the [`HandlerRegistry`]. No step can
//! fail the connection: bad payloads and presenter failures are logged and dropped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::handlers::{HandlerRegistry, panic_message};
use crate::notification::{Notification, UserId};
use crate::present::{Alert, SharedPresenter};

/// Outcome of processing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
	/// Decoded and dispatched.
	Dispatched(Box<Notification>),
	/// The payload did not decode as a notification.
	Malformed,
	/// The notification belongs to another user.
	Foreign(UserId),
}

/// Decode, classify, present, and dispatch messages for a single user's session.
#[derive(Clone)]
pub struct SubscriptionHandler {
	user: UserId,
	registry: Arc<HandlerRegistry>,
	presenter: SharedPresenter,
}

impl std::fmt::Debug for SubscriptionHandler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SubscriptionHandler")
			.field("user", &self.user)
			.field("handlers", &self.registry.len())
			.finish_non_exhaustive()
	}
}

impl SubscriptionHandler {
	/// Create the pipeline for `user`.
	pub fn new(user: UserId, registry: Arc<HandlerRegistry>, presenter: SharedPresenter) -> Self {
		Self { user, registry, presenter }
	}

	/// The user this pipeline accepts notifications for.
	pub fn user(&self) -> &UserId {
		&self.user
	}

	/// Process one message body.
	pub fn handle(&self, body: &str) -> Delivery {
		let notification = match Notification::from_json(body) {
			Ok(n) => n,
			Err(e) => {
				tracing::warn!(user = %self.user, error = %e, raw = body, "Dropping malformed notification payload");
				return Delivery::Malformed;
			}
		};

		if notification.user_id != self.user {
			tracing::warn!(
				user = %self.user,
				owner = %notification.user_id,
				id = ?notification.id,
				"Dropping notification addressed to another user"
			);
			return Delivery::Foreign(notification.user_id);
		}

		tracing::debug!(user = %self.user, id = ?notification.id, kind = %notification.kind, handlers = self.registry.len(), "Notification received");

		let alert = Alert::for_notification(&notification);
		match catch_unwind(AssertUnwindSafe(|| self.presenter.present(&alert))) {
			Ok(Ok(())) => {}
			Ok(Err(e)) => tracing::warn!(error = %e, id = ?notification.id, "Presentation service failed"),
			Err(payload) => tracing::error!(panic = %panic_message(payload.as_ref()), id = ?notification.id, "Presentation service panicked"),
		}

		self.registry.dispatch(&notification);
		Delivery::Dispatched(Box::new(notification))
	}
}

#[cfg(test)]
mod tests;
