//! Real-time notification delivery client.
//!
//! The crate keeps a persistent STOMP-over-WebSocket session to a notification server, fans
//! incoming notifications out to independent consumers, and reconciles the live stream with the
//! REST-backed notification history.
//!
//! Components, leaf first:
//! - [`classify`]: maps a notification type tag to a sound and toast category.
//! - [`handlers::HandlerRegistry`]: ordered consumer callbacks with per-handler error isolation.
//! - [`history::HistoryStore`]: history pull and read-marking over REST.
//! - [`connection::ConnectionManager`]: connect, identify, subscribe, bounded fixed-delay retry,
//!   force-reconnect, and disconnect for a single user-scoped session.
//! - [`subscription::SubscriptionHandler`]: per-connection inbound pipeline (decode, classify,
//!   present, dispatch).
//! - [`feed::NotificationFeed`]: consumer-facing merged view with unread counting and optimistic
//!   read-marking.
//!
//! Nothing in this crate panics or raises into the host on network, decode, or consumer
//! failures. Transport failures surface only as the [`connection::ConnectError`] of the
//! `connect` call that owns them; REST failures surface as empty lists and `false`.

pub mod classify;
pub mod config;
pub mod connection;
pub mod feed;
pub mod handlers;
pub mod history;
pub mod notification;
pub mod present;
pub mod subscription;

use std::time::Duration;

pub use classify::{Classification, Sound, ToastKind, classify};
pub use config::ClientConfig;
pub use connection::{ConnectError, ConnectionInfo, ConnectionManager, ConnectionState, PushTransport, SessionHandle, StompTransport};
pub use feed::NotificationFeed;
pub use handlers::{HandlerRegistry, NotificationHandler, SharedHandler};
pub use history::{HistoryApi, HistoryStore, ListScope, RestHistory};
pub use notification::{Notification, NotificationId, Timestamp, UserId};
pub use present::{Alert, NoopPresenter, PresentationService, SharedPresenter, TracingPresenter};
pub use subscription::SubscriptionHandler;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// No live push link exists.
	#[error("not connected")]
	NotConnected,
	/// The push link closed while an operation was using it.
	#[error("push link closed")]
	LinkClosed,
	/// WebSocket transport failure.
	#[error("websocket: {0}")]
	WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),
	/// The peer sent a frame the codec rejects.
	#[error("stomp: {0}")]
	Stomp(#[from] pulse_stomp::Error),
	/// The server answered the session handshake with an ERROR frame or closed instead.
	#[error("session rejected: {0}")]
	Rejected(String),
	/// The server did not complete the session handshake in time.
	#[error("session handshake timed out after {0:?}")]
	HandshakeTimeout(Duration),
	/// HTTP client failure (connect, timeout, body).
	#[error("http: {0}")]
	Http(#[from] reqwest::Error),
	/// The REST API replied with a non-success status.
	#[error("{method} {url} returned {status}")]
	Status {
		/// HTTP method of the failed request.
		method: reqwest::Method,
		/// Full request URL.
		url: String,
		/// Response status code.
		status: u16,
	},
	/// A URL could not be built from configuration.
	#[error("invalid url: {0}")]
	Url(#[from] url::ParseError),
	/// JSON encoding or decoding failed.
	#[error("json: {0}")]
	Json(#[from] serde_json::Error),
	/// Configuration is missing or invalid.
	#[error("invalid configuration: {0}")]
	Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		Self::WebSocket(Box::new(err))
	}
}
