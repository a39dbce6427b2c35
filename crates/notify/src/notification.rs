//! Notification data model and wire format.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Server-assigned notification identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

impl fmt::Display for NotificationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Opaque user identifier supplied by the host's authentication layer.
///
/// The server emits it either as a JSON string or a number; it is always
/// carried and re-serialized as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
	/// Wrap an identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The identifier text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for UserId {
	fn from(id: &str) -> Self {
		Self(id.to_owned())
	}
}

impl From<String> for UserId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl Serialize for UserId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for UserId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Text(String),
			Int(i64),
		}
		Ok(match Raw::deserialize(deserializer)? {
			Raw::Text(text) => Self(text),
			Raw::Int(n) => Self(n.to_string()),
		})
	}
}

/// Creation time as sent by the server.
///
/// The raw text is kept verbatim for re-serialization. Ordering uses the parsed
/// instant; timestamps that fail to parse order before every parsed one, so they
/// sort oldest in a newest-first view.
#[derive(Debug, Clone)]
pub struct Timestamp {
	raw: String,
	instant: Option<DateTime<Utc>>,
}

impl Timestamp {
	/// Parse server text. Accepts RFC 3339, naive date-times (taken as UTC), and bare dates.
	pub fn parse(raw: impl Into<String>) -> Self {
		let raw = raw.into();
		let instant = parse_instant(raw.trim());
		Self { raw, instant }
	}

	/// The current time, rendered as RFC 3339.
	pub fn now() -> Self {
		let now = Utc::now();
		Self {
			raw: now.to_rfc3339_opts(SecondsFormat::Millis, true),
			instant: Some(now),
		}
	}

	/// The text the server sent.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// The parsed instant, when the text was understood.
	pub fn instant(&self) -> Option<DateTime<Utc>> {
		self.instant
	}
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
		return Some(dt.with_timezone(&Utc));
	}
	if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
		return Some(naive.and_utc());
	}
	if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
		return Some(naive.and_utc());
	}
	if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
		return Some(naive.and_utc());
	}
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.map(|naive| naive.and_utc())
}

impl PartialEq for Timestamp {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Timestamp {
	fn cmp(&self, other: &Self) -> Ordering {
		self.instant.cmp(&other.instant).then_with(|| self.raw.cmp(&other.raw))
	}
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

impl Serialize for Timestamp {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.raw)
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		String::deserialize(deserializer).map(Self::parse)
	}
}

/// A notification owned by one user.
///
/// Created server-side only; the client never assigns `id`. The welcome
/// notification the server sends in reply to identify carries no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
	/// Server identifier, stable and unique within the user's set.
	#[serde(default, alias = "notificationId", skip_serializing_if = "Option::is_none")]
	pub id: Option<NotificationId>,
	/// Owner.
	#[serde(rename = "userId")]
	pub user_id: UserId,
	/// Human-readable text.
	#[serde(default)]
	pub message: String,
	/// Free-form type tag, compared case-insensitively.
	#[serde(rename = "type", default)]
	pub kind: String,
	/// Creation time.
	#[serde(rename = "createdAt")]
	pub created_at: Timestamp,
	/// Read flag; only ever moves from `false` to `true`.
	#[serde(rename = "isRead", alias = "read", default)]
	pub is_read: bool,
}

impl Notification {
	/// Decode a single notification from a JSON message body.
	pub fn from_json(body: &str) -> serde_json::Result<Self> {
		serde_json::from_str(body)
	}
}

/// Order by `created_at`, newest first. Stable for equal timestamps.
pub fn sort_newest_first(notifications: &mut [Notification]) {
	notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests;
