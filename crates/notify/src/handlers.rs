//! Consumer registry for live notifications.
//!
//! Handlers run synchronously, one after another, in registration order. A
//! handler that panics is logged and skipped; the rest still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::notification::Notification;

/// A consumer of live notifications.
pub trait NotificationHandler: Send + Sync {
	/// Called once per delivered notification.
	fn on_notification(&self, notification: &Notification);
}

impl<F> NotificationHandler for F
where
	F: Fn(&Notification) + Send + Sync,
{
	fn on_notification(&self, notification: &Notification) {
		self(notification)
	}
}

/// Shared handler reference. Identity (the allocation) is what [`HandlerRegistry::remove`] matches on.
pub type SharedHandler = Arc<dyn NotificationHandler>;

/// Ordered collection of notification handlers.
#[derive(Default)]
pub struct HandlerRegistry {
	handlers: RwLock<Vec<SharedHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HandlerRegistry").field("len", &self.len()).finish()
	}
}

impl HandlerRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Append `handler`. The same reference may be added more than once.
	pub fn add(&self, handler: SharedHandler) {
		self.handlers.write().push(handler);
	}

	/// Wrap a closure, register it, and return the reference needed to remove it.
	pub fn add_fn(&self, f: impl Fn(&Notification) + Send + Sync + 'static) -> SharedHandler {
		let handler: SharedHandler = Arc::new(f);
		self.add(Arc::clone(&handler));
		handler
	}

	/// Remove the first registration of this exact reference.
	///
	/// A different allocation wrapping equal state does not match. Returns
	/// whether anything was removed.
	pub fn remove(&self, handler: &SharedHandler) -> bool {
		let mut handlers = self.handlers.write();
		match handlers.iter().position(|h| Arc::ptr_eq(h, handler)) {
			Some(idx) => {
				handlers.remove(idx);
				true
			}
			None => false,
		}
	}

	/// Number of registrations.
	pub fn len(&self) -> usize {
		self.handlers.read().len()
	}

	/// Whether no handler is registered.
	pub fn is_empty(&self) -> bool {
		self.handlers.read().is_empty()
	}

	/// Deliver `notification` to every handler in registration order.
	///
	/// The handler list is snapshotted first, so handlers may add or remove
	/// registrations while running; changes apply from the next dispatch.
	/// Returns the number of handlers that panicked.
	pub fn dispatch(&self, notification: &Notification) -> usize {
		let snapshot: Vec<SharedHandler> = self.handlers.read().clone();
		let mut failed = 0;
		for (index, handler) in snapshot.iter().enumerate() {
			let result = catch_unwind(AssertUnwindSafe(|| handler.on_notification(notification)));
			if let Err(payload) = result {
				failed += 1;
				tracing::error!(
					handler = index + 1,
					total = snapshot.len(),
					id = ?notification.id,
					panic = %panic_message(payload.as_ref()),
					"Notification handler panicked"
				);
			}
		}
		failed
	}
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		(*msg).to_owned()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_owned()
	}
}

#[cfg(test)]
mod tests;
