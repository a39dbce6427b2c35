//! Frame values and builders for client frames.

use crate::Command;

/// Well-known header names.
pub mod header {
	/// Protocol versions offered by the client.
	pub const ACCEPT_VERSION: &str = "accept-version";
	/// Virtual host requested by the client.
	pub const HOST: &str = "host";
	/// Heartbeat negotiation (`cx,cy` in milliseconds).
	pub const HEART_BEAT: &str = "heart-beat";
	/// Negotiated protocol version.
	pub const VERSION: &str = "version";
	/// Destination of a SEND, SUBSCRIBE, or MESSAGE frame.
	pub const DESTINATION: &str = "destination";
	/// Client-chosen subscription id.
	pub const ID: &str = "id";
	/// Subscription a MESSAGE belongs to.
	pub const SUBSCRIPTION: &str = "subscription";
	/// Server-assigned message id.
	pub const MESSAGE_ID: &str = "message-id";
	/// Receipt requested by the client.
	pub const RECEIPT: &str = "receipt";
	/// Receipt acknowledged by the server.
	pub const RECEIPT_ID: &str = "receipt-id";
	/// Body length in octets.
	pub const CONTENT_LENGTH: &str = "content-length";
	/// Body MIME type.
	pub const CONTENT_TYPE: &str = "content-type";
	/// Short error description on ERROR frames.
	pub const MESSAGE: &str = "message";
	/// Bearer credentials forwarded as a native header.
	pub const AUTHORIZATION: &str = "Authorization";
}

/// A single STOMP frame.
///
/// Headers keep their wire order. When a header repeats, only the first
/// occurrence is significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
	/// Frame command.
	pub command: Command,
	/// Ordered `(name, value)` pairs, unescaped.
	pub headers: Vec<(String, String)>,
	/// Frame body. Empty for most control frames.
	pub body: String,
}

impl Frame {
	/// Create a frame with no headers and an empty body.
	pub fn new(command: Command) -> Self {
		Self {
			command,
			headers: Vec::new(),
			body: String::new(),
		}
	}

	/// Append a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	/// Replace the body.
	pub fn body(mut self, body: impl Into<String>) -> Self {
		self.body = body.into();
		self
	}

	/// First value of the named header.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
	}

	/// CONNECT frame offering STOMP 1.2 with heartbeats disabled.
	pub fn connect(host: &str) -> Self {
		Self::new(Command::Connect)
			.header(header::ACCEPT_VERSION, "1.2")
			.header(header::HOST, host)
			.header(header::HEART_BEAT, "0,0")
	}

	/// SUBSCRIBE frame for `destination` under the client-chosen `id`.
	pub fn subscribe(id: &str, destination: &str) -> Self {
		Self::new(Command::Subscribe)
			.header(header::ID, id)
			.header(header::DESTINATION, destination)
	}

	/// SEND frame carrying a JSON body.
	pub fn send(destination: &str, json: impl Into<String>) -> Self {
		Self::new(Command::Send)
			.header(header::DESTINATION, destination)
			.header(header::CONTENT_TYPE, "application/json")
			.body(json)
	}

	/// DISCONNECT frame, optionally asking for a receipt.
	pub fn disconnect(receipt: Option<&str>) -> Self {
		let frame = Self::new(Command::Disconnect);
		match receipt {
			Some(receipt) => frame.header(header::RECEIPT, receipt),
			None => frame,
		}
	}

	/// Destination header, if any.
	pub fn destination(&self) -> Option<&str> {
		self.get(header::DESTINATION)
	}
}
