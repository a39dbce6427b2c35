//! Frame commands.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A STOMP 1.2 frame command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
	/// Client: open a session.
	Connect,
	/// Client: open a session (1.2 spelling).
	Stomp,
	/// Server: session accepted.
	Connected,
	/// Client: publish to a destination.
	Send,
	/// Client: subscribe to a destination.
	Subscribe,
	/// Client: drop a subscription.
	Unsubscribe,
	/// Client: acknowledge a message.
	Ack,
	/// Client: reject a message.
	Nack,
	/// Client: start a transaction.
	Begin,
	/// Client: commit a transaction.
	Commit,
	/// Client: abort a transaction.
	Abort,
	/// Client: close the session.
	Disconnect,
	/// Server: a message for a subscription.
	Message,
	/// Server: receipt for a client frame.
	Receipt,
	/// Server: session-level error; the server closes the connection after it.
	Error,
}

impl Command {
	/// The wire spelling of this command.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Connect => "CONNECT",
			Self::Stomp => "STOMP",
			Self::Connected => "CONNECTED",
			Self::Send => "SEND",
			Self::Subscribe => "SUBSCRIBE",
			Self::Unsubscribe => "UNSUBSCRIBE",
			Self::Ack => "ACK",
			Self::Nack => "NACK",
			Self::Begin => "BEGIN",
			Self::Commit => "COMMIT",
			Self::Abort => "ABORT",
			Self::Disconnect => "DISCONNECT",
			Self::Message => "MESSAGE",
			Self::Receipt => "RECEIPT",
			Self::Error => "ERROR",
		}
	}

	/// Header values of CONNECT and CONNECTED frames are never escaped.
	pub const fn escapes_headers(self) -> bool {
		!matches!(self, Self::Connect | Self::Connected)
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Command {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"CONNECT" => Self::Connect,
			"STOMP" => Self::Stomp,
			"CONNECTED" => Self::Connected,
			"SEND" => Self::Send,
			"SUBSCRIBE" => Self::Subscribe,
			"UNSUBSCRIBE" => Self::Unsubscribe,
			"ACK" => Self::Ack,
			"NACK" => Self::Nack,
			"BEGIN" => Self::Begin,
			"COMMIT" => Self::Commit,
			"ABORT" => Self::Abort,
			"DISCONNECT" => Self::Disconnect,
			"MESSAGE" => Self::Message,
			"RECEIPT" => Self::Receipt,
			"ERROR" => Self::Error,
			other => return Err(Error::UnknownCommand(other.to_owned())),
		})
	}
}
