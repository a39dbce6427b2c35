//! STOMP 1.2 over WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use pulse_stomp::{Command, Frame, decode, encode, header};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

use super::transport::{LinkCommand, LinkEnd, LinkEvent, PushLink, PushTransport};
use crate::config::ClientConfig;
use crate::notification::UserId;
use crate::{Error, Result};

/// [`PushTransport`] speaking STOMP over `tokio-tungstenite`.
///
/// The bearer token, when configured, is sent both on the HTTP upgrade and as a
/// STOMP `Authorization` header on CONNECT. Heart-beating is not negotiated.
#[derive(Debug, Clone)]
pub struct StompTransport {
	url: String,
	token: Option<String>,
	handshake_timeout: Duration,
}

impl StompTransport {
	/// Transport for `config.push_url`.
	pub fn new(config: &ClientConfig) -> Self {
		Self {
			url: config.push_url.clone(),
			token: config.token.clone(),
			handshake_timeout: config.handshake_timeout(),
		}
	}

	fn connect_frame(&self) -> Result<Frame> {
		let url = Url::parse(&self.url)?;
		let mut frame = Frame::connect(url.host_str().unwrap_or("localhost"));
		if let Some(token) = &self.token {
			frame = frame.header(header::AUTHORIZATION, format!("Bearer {token}"));
		}
		Ok(frame)
	}
}

#[async_trait]
impl PushTransport for StompTransport {
	async fn open(&self, user: &UserId) -> Result<PushLink> {
		let connect = self.connect_frame()?;
		let mut request = self.url.as_str().into_client_request()?;
		if let Some(token) = &self.token {
			let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| Error::Config(format!("token: {e}")))?;
			request.headers_mut().insert(AUTHORIZATION, value);
		}

		tracing::debug!(url = %self.url, user = %user, "Opening push socket");
		let (mut ws, _response) = tokio_tungstenite::connect_async(request).await?;

		ws.send(Message::Text(encode(&connect).into())).await?;
		tokio::time::timeout(self.handshake_timeout, await_connected(&mut ws))
			.await
			.map_err(|_| Error::HandshakeTimeout(self.handshake_timeout))??;

		let (link, end) = PushLink::pair();
		tokio::spawn(pump(ws, end, user.clone()));
		Ok(link)
	}
}

/// Read frames until CONNECTED. ERROR frames and closes reject the session.
pub(crate) async fn await_connected<S>(ws: &mut S) -> Result<()>
where
	S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
	while let Some(msg) = ws.next().await {
		let text = match msg? {
			Message::Text(text) => text,
			Message::Close(frame) => {
				let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
				return Err(Error::Rejected(format!("socket closed during handshake {reason}").trim_end().to_owned()));
			}
			_ => continue,
		};
		let Some(frame) = decode(&text)? else { continue };
		match frame.command {
			Command::Connected => {
				tracing::debug!(version = frame.get(header::VERSION).unwrap_or("?"), "STOMP session established");
				return Ok(());
			}
			Command::Error => return Err(Error::Rejected(error_text(&frame))),
			other => tracing::debug!(command = %other, "Ignoring frame before CONNECTED"),
		}
	}
	Err(Error::Rejected("socket closed during handshake".into()))
}

fn error_text(frame: &Frame) -> String {
	match frame.get(header::MESSAGE) {
		Some(message) if !message.is_empty() => message.to_owned(),
		_ if !frame.body.is_empty() => frame.body.clone(),
		_ => "ERROR frame".to_owned(),
	}
}

fn to_frame(command: &LinkCommand) -> Option<Frame> {
	match command {
		LinkCommand::Subscribe { id, destination } => Some(Frame::subscribe(id, destination)),
		LinkCommand::Publish { destination, body } => Some(Frame::send(destination, body.as_str())),
		LinkCommand::Close => None,
	}
}

/// Owns the socket for the life of the session.
///
/// Commands become frames; MESSAGE frames become events. Anything that ends the socket
/// (ERROR frame, close, I/O error) is reported once as [`LinkEvent::Closed`]. A
/// [`LinkCommand::Close`] or a dropped command sender ends it quietly.
pub(crate) async fn pump<S>(mut ws: S, mut end: LinkEnd, user: UserId)
where
	S: Stream<Item = std::result::Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
	let reason = loop {
		tokio::select! {
			command = end.commands.recv() => {
				let Some(frame) = command.as_ref().and_then(to_frame) else {
					let _ = ws.send(Message::Text(encode(&Frame::disconnect(None)).into())).await;
					let _ = ws.close().await;
					tracing::debug!(user = %user, "Push socket closed by client");
					return;
				};
				if let Err(e) = ws.send(Message::Text(encode(&frame).into())).await {
					break Some(e.to_string());
				}
			}
			msg = ws.next() => match msg {
				Some(Ok(Message::Text(text))) => match decode(&text) {
					Ok(Some(frame)) => match frame.command {
						Command::Message => {
							let destination = frame.destination().unwrap_or_default().to_owned();
							let _ = end.events.send(LinkEvent::Message { destination, body: frame.body });
						}
						Command::Error => break Some(error_text(&frame)),
						other => tracing::trace!(command = %other, "Ignoring frame"),
					},
					Ok(None) => {}
					Err(e) => tracing::warn!(user = %user, error = %e, "Dropping undecodable frame"),
				},
				Some(Ok(Message::Close(frame))) => break frame.map(|f| f.reason.to_string()),
				Some(Ok(_)) => {}
				Some(Err(e)) => break Some(e.to_string()),
				None => break None,
			},
		}
	};
	tracing::debug!(user = %user, reason = reason.as_deref().unwrap_or("none"), "Push socket lost");
	let _ = end.events.send(LinkEvent::Closed { reason });
}

#[cfg(test)]
mod tests;
