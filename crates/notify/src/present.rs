//! Boundary to the host's toast/sound presentation layer.

use std::sync::Arc;

use serde::Serialize;

use crate::classify::{Classification, classify};
use crate::notification::Notification;

/// What the presentation layer is asked to show for one notification.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
	/// Toast title, `"<type> Notification"`.
	pub title: String,
	/// Toast body (the notification message).
	pub body: String,
	/// Sound and toast category.
	pub classification: Classification,
	/// The notification itself, for hosts that attach it to the toast.
	pub notification: Notification,
}

impl Alert {
	/// Build the alert for `notification`.
	pub fn for_notification(notification: &Notification) -> Self {
		Self {
			title: format!("{} Notification", notification.kind),
			body: notification.message.clone(),
			classification: classify(&notification.kind),
			notification: notification.clone(),
		}
	}
}

/// Host presentation service (toasts, sounds, vibration).
///
/// Calls are best-effort: errors and panics are caught and logged by the
/// inbound pipeline and never reach the connection.
pub trait PresentationService: Send + Sync {
	/// Show `alert`.
	fn present(&self, alert: &Alert) -> anyhow::Result<()>;
}

/// Shared presentation service.
pub type SharedPresenter = Arc<dyn PresentationService>;

/// Presenter that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPresenter;

impl PresentationService for NoopPresenter {
	fn present(&self, _alert: &Alert) -> anyhow::Result<()> {
		Ok(())
	}
}

/// Presenter that logs each alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl PresentationService for TracingPresenter {
	fn present(&self, alert: &Alert) -> anyhow::Result<()> {
		tracing::info!(
			title = %alert.title,
			sound = %alert.classification.sound,
			toast = %alert.classification.toast,
			body = %alert.body,
			"Notification"
		);
		Ok(())
	}
}
