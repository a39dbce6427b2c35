use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use super::*;

type ServerWs = WebSocketStream<TcpStream>;

/// Accept one socket, record its upgrade `Authorization` header, and run `script` on it.
async fn serve<F, Fut>(script: F) -> (String, Arc<Mutex<Option<String>>>)
where
	F: FnOnce(ServerWs) -> Fut + Send + 'static,
	Fut: Future<Output = ()> + Send,
{
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let auth = Arc::new(Mutex::new(None));
	let seen = Arc::clone(&auth);
	tokio::spawn(async move {
		let (tcp, _) = listener.accept().await.unwrap();
		let ws = tokio_tungstenite::accept_hdr_async(tcp, move |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
			*seen.lock() = req.headers().get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
			Ok(resp)
		})
		.await
		.unwrap();
		script(ws).await;
	});
	(format!("ws://{addr}/ws"), auth)
}

async fn next_frame(ws: &mut ServerWs) -> Frame {
	loop {
		if let Message::Text(text) = ws.next().await.unwrap().unwrap()
			&& let Some(frame) = decode(&text).unwrap()
		{
			return frame;
		}
	}
}

async fn reply(ws: &mut ServerWs, frame: Frame) {
	ws.send(Message::Text(encode(&frame).into())).await.unwrap();
}

fn transport(url: String, token: Option<&str>, handshake_secs: u64) -> StompTransport {
	let mut config = ClientConfig::new(url, "http://127.0.0.1:1");
	config.token = token.map(str::to_owned);
	config.handshake_timeout_secs = handshake_secs;
	StompTransport::new(&config)
}

async fn next_event(link: &mut PushLink) -> LinkEvent {
	tokio::time::timeout(Duration::from_secs(5), link.events.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn handshake_subscribe_publish_and_deliver() {
	let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel();
	let (url, auth) = serve(move |mut ws| async move {
		let connect = next_frame(&mut ws).await;
		assert_eq!(connect.command, Command::Connect);
		assert_eq!(connect.get(header::ACCEPT_VERSION), Some("1.2"));
		assert_eq!(connect.get(header::AUTHORIZATION), Some("Bearer secret"));
		reply(&mut ws, Frame::new(Command::Connected).header(header::VERSION, "1.2")).await;

		let subscribe = next_frame(&mut ws).await;
		outbound_tx.send(subscribe).unwrap();
		let send = next_frame(&mut ws).await;
		outbound_tx.send(send).unwrap();

		reply(
			&mut ws,
			Frame::new(Command::Message)
				.header(header::DESTINATION, "/user/25/queue/notifications")
				.header(header::SUBSCRIPTION, "sub-0")
				.header(header::MESSAGE_ID, "m-1")
				.body(r#"{"id":1}"#),
		)
		.await;
		// Keep the socket open until the client leaves.
		while ws.next().await.is_some() {}
	})
	.await;

	let mut link = transport(url, Some("secret"), 5).open(&UserId::from("25")).await.unwrap();
	assert_eq!(auth.lock().as_deref(), Some("Bearer secret"));

	link.commands
		.send(LinkCommand::Subscribe {
			id: "sub-0".into(),
			destination: "/user/25/queue/notifications".into(),
		})
		.unwrap();
	link.commands
		.send(LinkCommand::Publish {
			destination: "/app/subscribe".into(),
			body: r#"{"userId":"25"}"#.into(),
		})
		.unwrap();

	let subscribe = outbound_rx.recv().await.unwrap();
	assert_eq!(subscribe.command, Command::Subscribe);
	assert_eq!(subscribe.get(header::ID), Some("sub-0"));
	assert_eq!(subscribe.destination(), Some("/user/25/queue/notifications"));

	let send = outbound_rx.recv().await.unwrap();
	assert_eq!(send.command, Command::Send);
	assert_eq!(send.destination(), Some("/app/subscribe"));
	assert_eq!(send.body, r#"{"userId":"25"}"#);

	assert_eq!(
		next_event(&mut link).await,
		LinkEvent::Message {
			destination: "/user/25/queue/notifications".into(),
			body: r#"{"id":1}"#.into(),
		}
	);
}

#[tokio::test]
async fn error_frame_rejects_session() {
	let (url, auth) = serve(|mut ws| async move {
		next_frame(&mut ws).await;
		reply(&mut ws, Frame::new(Command::Error).header(header::MESSAGE, "Bad credentials")).await;
	})
	.await;

	let err = transport(url, None, 5).open(&UserId::from("25")).await.unwrap_err();

	assert!(matches!(&err, Error::Rejected(msg) if msg == "Bad credentials"), "{err}");
	assert_eq!(*auth.lock(), None);
}

#[tokio::test]
async fn silent_server_times_out() {
	let (url, _) = serve(|mut ws| async move {
		next_frame(&mut ws).await;
		tokio::time::sleep(Duration::from_secs(10)).await;
	})
	.await;

	let err = transport(url, None, 1).open(&UserId::from("25")).await.unwrap_err();

	assert!(matches!(err, Error::HandshakeTimeout(d) if d == Duration::from_secs(1)), "{err}");
}

#[tokio::test]
async fn refused_socket_is_a_transport_error() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let url = format!("ws://{}/ws", listener.local_addr().unwrap());
	drop(listener);

	let err = transport(url, None, 5).open(&UserId::from("25")).await.unwrap_err();

	assert!(matches!(err, Error::WebSocket(_)), "{err}");
}

#[tokio::test]
async fn server_error_after_connect_reports_closed() {
	let (url, _) = serve(|mut ws| async move {
		next_frame(&mut ws).await;
		reply(&mut ws, Frame::new(Command::Connected)).await;
		reply(&mut ws, Frame::new(Command::Error).body("broker restarting")).await;
		while ws.next().await.is_some() {}
	})
	.await;

	let mut link = transport(url, None, 5).open(&UserId::from("25")).await.unwrap();

	assert_eq!(
		next_event(&mut link).await,
		LinkEvent::Closed {
			reason: Some("broker restarting".into())
		}
	);
}

#[tokio::test]
async fn client_close_sends_disconnect() {
	let (frames_tx, mut frames_rx) = tokio::sync::mpsc::unbounded_channel();
	let (url, _) = serve(move |mut ws| async move {
		next_frame(&mut ws).await;
		reply(&mut ws, Frame::new(Command::Connected)).await;
		frames_tx.send(next_frame(&mut ws).await).unwrap();
	})
	.await;

	let link = transport(url, None, 5).open(&UserId::from("25")).await.unwrap();
	link.commands.send(LinkCommand::Close).unwrap();

	let frame = tokio::time::timeout(Duration::from_secs(5), frames_rx.recv()).await.unwrap().unwrap();
	assert_eq!(frame.command, Command::Disconnect);
}
