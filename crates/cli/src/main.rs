//! Pulse terminal client.
//!
//! Listens for live notifications, browses history, and marks notifications read
//! against a notification service.

mod cli;
mod present;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Command, history_scope, notification_ids};
use parking_lot::Mutex;
use present::{TerminalPresenter, history_line, is_test_echo};
use pulse_notify::{ClientConfig, ConnectionManager, ConnectionState, HandlerRegistry, HistoryStore, NotificationFeed, UserId};
use tokio::sync::oneshot;
use tracing::{info, warn};

/// How long `send-test` waits for the server to push the notification back.
const ECHO_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config = cli.client_config()?;
	let user = cli.user_id();

	match cli.command {
		Command::Listen { json } => listen(config, user, json).await,
		Command::History { unread, kind, count } => history(&config, &user, unread, kind.as_deref(), count).await,
		Command::MarkRead { ids } => mark_read(&config, &ids).await,
		Command::SendTest { message, kind } => send_test(config, user, &message, &kind).await,
		Command::Info => info_cmd(config, user).await,
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("pulse_notify=debug,pulse_cli=debug,info")
		} else {
			EnvFilter::new("warn,pulse_notify=info")
		}
	});

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

async fn listen(config: ClientConfig, user: UserId, json: bool) -> anyhow::Result<()> {
	let registry = Arc::new(HandlerRegistry::new());
	let history = HistoryStore::rest(&config)?;
	let token = config.token.clone();
	let manager = ConnectionManager::stomp(config, Arc::clone(&registry), Arc::new(TerminalPresenter { json }));

	let feed = NotificationFeed::activate(user.clone(), token, history, Arc::clone(&registry)).await;
	if !json {
		for notification in feed.recent().iter().rev() {
			println!("{}", history_line(notification));
		}
	}

	let session = manager.connect(user).await.context("connecting to notification server")?;
	info!(user = %session.user, destination = %session.destination, unread = feed.unread_count(), "Listening");

	let mut state = manager.subscribe_state();
	let mut unread = feed.subscribe_unread();
	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			changed = state.changed() => {
				if changed.is_err() {
					break;
				}
				let current = *state.borrow_and_update();
				match current {
					ConnectionState::Failed => {
						feed.deactivate();
						bail!("notification server unreachable, giving up");
					}
					ConnectionState::Disconnected | ConnectionState::Reconnecting => warn!(state = %current, "Push session interrupted"),
					ConnectionState::Connected => info!("Push session restored"),
					ConnectionState::Connecting => {}
				}
			}
			changed = unread.changed() => {
				if changed.is_err() {
					break;
				}
				let count = *unread.borrow_and_update();
				info!(unread = count, "Unread count changed");
			}
		}
	}

	feed.deactivate();
	manager.disconnect();
	Ok(())
}

async fn history(config: &ClientConfig, user: &UserId, unread: bool, kind: Option<&str>, count: bool) -> anyhow::Result<()> {
	let store = HistoryStore::rest(config)?;
	let token = config.token.as_deref();

	if count {
		let Some(count) = store.unread_count(user, token).await else {
			bail!("could not fetch unread count");
		};
		println!("{count}");
		return Ok(());
	}

	let notifications = store.list_scoped(user, &history_scope(unread, kind), token).await;
	if notifications.is_empty() {
		println!("No notifications.");
	}
	for notification in &notifications {
		println!("{}", history_line(notification));
	}
	Ok(())
}

async fn mark_read(config: &ClientConfig, ids: &[i64]) -> anyhow::Result<()> {
	let store = HistoryStore::rest(config)?;
	let token = config.token.as_deref();
	let ids = notification_ids(ids);

	let ok = match ids.as_slice() {
		[id] => store.mark_read(*id, token).await,
		many => store.mark_many_read(many, token).await,
	};
	if !ok {
		bail!("failed to mark {} notification(s) as read; some may have been updated", ids.len());
	}
	println!("Marked {} notification(s) as read.", ids.len());
	Ok(())
}

async fn send_test(config: ClientConfig, user: UserId, message: &str, kind: &str) -> anyhow::Result<()> {
	let registry = Arc::new(HandlerRegistry::new());
	let manager = ConnectionManager::stomp(config, Arc::clone(&registry), Arc::new(TerminalPresenter::default()));

	let (echo_tx, echo_rx) = oneshot::channel();
	let echo_tx = first_only(echo_tx);
	let (expected, expected_kind) = (message.to_owned(), kind.to_owned());
	let handler = registry.add_fn(move |n| {
		if is_test_echo(n, &expected, &expected_kind) {
			echo_tx(n.message.clone());
		}
	});

	manager.connect(user).await.context("connecting to notification server")?;
	manager.send_test_notification(message, kind)?;

	let echoed = tokio::time::timeout(ECHO_TIMEOUT, echo_rx).await;
	registry.remove(&handler);
	manager.disconnect();

	match echoed {
		Ok(Ok(text)) => println!("Server echoed: {text}"),
		_ => bail!("no test notification came back within {ECHO_TIMEOUT:?}"),
	}
	Ok(())
}

/// Wrap a oneshot sender in a `Fn` that fires on the first call only.
fn first_only(tx: oneshot::Sender<String>) -> impl Fn(String) + Send + Sync + 'static {
	let slot = Mutex::new(Some(tx));
	move |text| {
		if let Some(tx) = slot.lock().take() {
			let _ = tx.send(text);
		}
	}
}

async fn info_cmd(config: ClientConfig, user: UserId) -> anyhow::Result<()> {
	let manager = ConnectionManager::stomp(config, Arc::new(HandlerRegistry::new()), Arc::new(TerminalPresenter::default()));
	let outcome = manager.connect(user).await;
	println!("{}", manager.connection_info());
	manager.disconnect();
	outcome.context("connecting to notification server")?;
	Ok(())
}
