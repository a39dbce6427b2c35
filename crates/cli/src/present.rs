//! Terminal rendering of alerts and history rows.

use std::io::Write;

use pulse_notify::{Alert, Notification, PresentationService, Sound, ToastKind};

/// Prints alerts to stdout, one per line. Text mode rings the terminal bell for
/// any sound other than the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPresenter {
	/// Emit JSON lines instead of text.
	pub json: bool,
}

impl PresentationService for TerminalPresenter {
	fn present(&self, alert: &Alert) -> anyhow::Result<()> {
		let mut out = std::io::stdout().lock();
		if self.json {
			serde_json::to_writer(&mut out, alert)?;
			writeln!(out)?;
		} else {
			if alert.classification.sound != Sound::Notification {
				write!(out, "\x07")?;
			}
			writeln!(out, "{}", alert_line(alert))?;
		}
		out.flush()?;
		Ok(())
	}
}

fn marker(toast: ToastKind) -> char {
	match toast {
		ToastKind::Success => '+',
		ToastKind::Info => '*',
		ToastKind::Warning => '!',
		ToastKind::Error => 'x',
	}
}

/// `"<marker> [<sound>] <title>: <body>"`.
pub fn alert_line(alert: &Alert) -> String {
	format!(
		"{} [{}] {}: {}",
		marker(alert.classification.toast),
		alert.classification.sound,
		alert.title,
		alert.body
	)
}

/// One history row: id, read marker, time, type, and message.
pub fn history_line(notification: &Notification) -> String {
	let id = notification.id.map_or_else(|| "-".to_owned(), |id| id.to_string());
	let read = if notification.is_read { ' ' } else { '●' };
	format!(
		"{read} #{id:<6} {}  {:<18} {}",
		notification.created_at, notification.kind, notification.message
	)
}

/// Whether `notification` is the server's copy of a `send-test` request.
///
/// The welcome notification sent after identify does not count.
pub fn is_test_echo(notification: &Notification, message: &str, kind: &str) -> bool {
	notification.message == message && notification.kind.eq_ignore_ascii_case(kind)
}
