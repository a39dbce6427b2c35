//! Seam between the session manager and the wire.
//!
//! A transport opens one authenticated pub/sub session and hands back a [`PushLink`]: a
//! command sender and an event receiver backed by a task that owns the socket. The manager
//! never touches the socket itself, so tests can substitute an in-memory transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;
use crate::notification::UserId;

/// Opens push sessions.
#[async_trait]
pub trait PushTransport: Send + Sync {
	/// Open a socket and complete the session handshake for `user`.
	///
	/// Resolves once the server has acknowledged the session. Subscribing is left to the
	/// caller via [`LinkCommand::Subscribe`].
	async fn open(&self, user: &UserId) -> Result<PushLink>;
}

/// Outbound request to the link task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
	/// Subscribe to `destination` under subscription `id`.
	Subscribe {
		/// Client-chosen subscription id.
		id: String,
		/// Destination to subscribe to.
		destination: String,
	},
	/// Publish a JSON body to `destination`.
	Publish {
		/// Target destination.
		destination: String,
		/// JSON body.
		body: String,
	},
	/// Say goodbye and close the socket.
	Close,
}

/// Inbound event from the link task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
	/// A message on a subscribed destination.
	Message {
		/// Destination the server delivered on.
		destination: String,
		/// Raw body.
		body: String,
	},
	/// The link is gone. No further events follow.
	Closed {
		/// Server- or transport-supplied reason, if any.
		reason: Option<String>,
	},
}

/// Manager side of an open session.
#[derive(Debug)]
pub struct PushLink {
	/// Requests to the link task.
	pub commands: mpsc::UnboundedSender<LinkCommand>,
	/// Events from the link task.
	pub events: mpsc::UnboundedReceiver<LinkEvent>,
}

/// Task side of an open session.
#[derive(Debug)]
pub struct LinkEnd {
	/// Requests from the manager.
	pub commands: mpsc::UnboundedReceiver<LinkCommand>,
	/// Events to the manager.
	pub events: mpsc::UnboundedSender<LinkEvent>,
}

impl PushLink {
	/// A connected pair of link ends.
	pub fn pair() -> (PushLink, LinkEnd) {
		let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
		let (evt_tx, evt_rx) = mpsc::unbounded_channel();
		(
			PushLink {
				commands: cmd_tx,
				events: evt_rx,
			},
			LinkEnd {
				commands: cmd_rx,
				events: evt_tx,
			},
		)
	}
}
