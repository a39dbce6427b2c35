//! Presentation category for a notification type tag.

use std::fmt;

use serde::Serialize;

/// Sound played for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sound {
	/// Positive outcome.
	Success,
	/// Failure or cancellation.
	Error,
	/// Needs attention.
	Warning,
	/// Everything else.
	#[default]
	Notification,
}

/// Toast style used for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
	/// Positive outcome.
	Success,
	/// Neutral information.
	#[default]
	Info,
	/// Needs attention.
	Warning,
	/// Failure or cancellation.
	Error,
}

/// Sound and toast pair for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Classification {
	/// Sound category.
	pub sound: Sound,
	/// Toast category.
	pub toast: ToastKind,
}

impl Classification {
	const SUCCESS: Self = Self {
		sound: Sound::Success,
		toast: ToastKind::Success,
	};
	const ERROR: Self = Self {
		sound: Sound::Error,
		toast: ToastKind::Error,
	};
	const WARNING: Self = Self {
		sound: Sound::Warning,
		toast: ToastKind::Warning,
	};

	/// Whether this is the fallback category for unknown tags.
	pub fn is_default(&self) -> bool {
		*self == Self::default()
	}
}

/// Known tags, lower-cased. Anything not listed maps to [`Classification::default`].
const TABLE: &[(&str, Classification)] = &[
	("order_completed", Classification::SUCCESS),
	("order_delivered", Classification::SUCCESS),
	("success", Classification::SUCCESS),
	("order_cancelled", Classification::ERROR),
	("error", Classification::ERROR),
	("failed", Classification::ERROR),
	("order_delayed", Classification::WARNING),
	("warning", Classification::WARNING),
	("alert", Classification::WARNING),
];

/// Classify a type tag, ignoring ASCII case.
pub fn classify(kind: &str) -> Classification {
	let kind = kind.trim();
	TABLE
		.iter()
		.find(|(tag, _)| tag.eq_ignore_ascii_case(kind))
		.map(|(_, class)| *class)
		.unwrap_or_default()
}

impl fmt::Display for Sound {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Success => "success",
			Self::Error => "error",
			Self::Warning => "warning",
			Self::Notification => "notification",
		})
	}
}

impl fmt::Display for ToastKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Success => "success",
			Self::Info => "info",
			Self::Warning => "warning",
			Self::Error => "error",
		})
	}
}
