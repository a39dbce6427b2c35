//! Push session lifecycle.
//!
//! # Purpose
//!
//! - Own the single push session for one user: connect, subscribe, identify, bounded fixed-delay retry, forced reconnect, and teardown.
//! - Feed every inbound message through a [`SubscriptionHandler`] bound to the session user.
//!
//! # Mental model
//!
//! - [`ConnectionManager`] is an explicit session object built with its configuration, a [`PushTransport`], the shared
//!   [`HandlerRegistry`], and a presentation service. It is passed by reference to whoever needs it.
//! - `connect` is a future resolving to `Ok(SessionHandle)` once the server has the subscription, or `Err(ConnectError)`.
//!   The retry loop runs in a spawned attempt task; callers only await its outcome.
//! - The attempt task is a loop over [`state::Transition`] values applied to a [`ConnectionState`]; the state is published
//!   on a `watch` channel.
//!
//! # Key types
//!
//! | Type | Meaning | Constraints | Constructed / mutated in |
//! |---|---|---|---|
//! | [`ConnectionManager`] | Session owner | At most one live link and one attempt task at a time | `ConnectionManager::*` |
//! | `SessionSlot` | User, attempt counter, epoch, retry token, in-flight attempt, live link | Single `parking_lot` lock, never held across `.await` | `connect`, `disconnect`, attempt task, reader task |
//! | [`SessionHandle`] | Proof of an established session | Carries the epoch it was established in | attempt task |
//! | [`ConnectError`] | Why `connect` did not produce a session | Reported to `connect` callers only | attempt task |
//! | [`PushTransport`] / [`PushLink`] | Wire seam and open link | Link commands are fire-and-forget | [`StompTransport`], test doubles |
//!
//! # Invariants
//!
//! - Exactly one destination is subscribed per session: the per-user destination from [`ClientConfig::destination_for`].
//! - A `connect` for the same user while an attempt is running joins that attempt instead of starting another.
//! - `disconnect` bumps the epoch and cancels the epoch token. Any attempt or retry wait from an older epoch stops, and a
//!   link it opens late is closed before it is used.
//! - A successful session resets the attempt counter to zero and cancels any pending retry wait.
//! - The attempt counter is bounded by `max_attempts`; reaching it ends the attempt with [`ConnectError::MaxAttemptsExceeded`]
//!   and state [`ConnectionState::Failed`].
//!
//! # Concurrency
//!
//! - Inbound messages are handled one at a time on the reader task, in arrival order.
//! - A link that drops mid-session starts a background attempt with a fresh budget; its failure is logged, not raised.
//!   External `connect` calls join it like any other in-flight attempt.
//!
//! # Failure modes
//!
//! - Transport open failure: counted, retried after `retry_delay`.
//! - Late link from a superseded attempt: closed, attempt reports [`ConnectError::Cancelled`].
//! - Manager dropped mid-attempt: waiters get [`ConnectError::Stopped`] or [`ConnectError::Cancelled`].

mod state;
mod stomp;
mod transport;

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use state::ConnectionState;
use state::Transition;
pub use stomp::StompTransport;
pub use transport::{LinkCommand, LinkEnd, LinkEvent, PushLink, PushTransport};

use crate::config::ClientConfig;
use crate::handlers::HandlerRegistry;
use crate::notification::{Timestamp, UserId};
use crate::present::SharedPresenter;
use crate::subscription::SubscriptionHandler;
use crate::{Error, Result};

/// Subscription id used for the per-user destination.
pub const SUBSCRIPTION_ID: &str = "sub-0";

/// Why `connect` produced no session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConnectError {
	/// Every attempt in the budget failed.
	#[error("failed to connect after {attempts} attempts")]
	MaxAttemptsExceeded {
		/// Attempts made.
		attempts: u32,
	},
	/// `reconnect` or `force_reconnect` was called before any `connect`.
	#[error("no user to connect for")]
	NoUser,
	/// A `disconnect` superseded the attempt.
	#[error("connect cancelled by disconnect")]
	Cancelled,
	/// The manager went away before the attempt reported.
	#[error("connection manager stopped")]
	Stopped,
}

/// An established, subscribed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
	/// Session user.
	pub user: UserId,
	/// The one destination subscribed for that user.
	pub destination: String,
	/// Teardown generation the session belongs to.
	pub epoch: u64,
}

/// Snapshot for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
	/// Current state.
	pub state: ConnectionState,
	/// Last user passed to `connect`.
	pub user: Option<UserId>,
	/// Attempts used in the current budget.
	pub attempts: u32,
	/// Attempt budget.
	pub max_attempts: u32,
	/// Registered handler count.
	pub handlers: usize,
	/// Push endpoint.
	pub push_url: String,
	/// Subscribed destination, when connected.
	pub destination: Option<String>,
	/// Whether a retry wait is pending.
	pub retry_pending: bool,
}

impl fmt::Display for ConnectionInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "state:        {}", self.state)?;
		writeln!(f, "user:         {}", self.user.as_ref().map_or("-", UserId::as_str))?;
		writeln!(f, "attempts:     {}/{}", self.attempts, self.max_attempts)?;
		writeln!(f, "retry:        {}", if self.retry_pending { "pending" } else { "none" })?;
		writeln!(f, "handlers:     {}", self.handlers)?;
		writeln!(f, "endpoint:     {}", self.push_url)?;
		write!(f, "destination:  {}", self.destination.as_deref().unwrap_or("-"))
	}
}

type Outcome = Option<std::result::Result<SessionHandle, ConnectError>>;

struct InFlight {
	user: UserId,
	rx: watch::Receiver<Outcome>,
}

struct LiveLink {
	commands: mpsc::UnboundedSender<LinkCommand>,
	session: SessionHandle,
}

struct SessionSlot {
	user: Option<UserId>,
	attempts: u32,
	epoch: u64,
	/// Cancelled and replaced on every teardown.
	epoch_token: CancellationToken,
	retry: Option<CancellationToken>,
	inflight: Option<InFlight>,
	link: Option<LiveLink>,
}

impl SessionSlot {
	fn new() -> Self {
		Self {
			user: None,
			attempts: 0,
			epoch: 0,
			epoch_token: CancellationToken::new(),
			retry: None,
			inflight: None,
			link: None,
		}
	}

	/// Stop everything belonging to the current epoch.
	fn teardown(&mut self) -> bool {
		self.epoch += 1;
		self.epoch_token.cancel();
		self.epoch_token = CancellationToken::new();
		self.retry = None;
		let had_attempt = self.inflight.take().is_some();
		let had_link = match self.link.take() {
			Some(link) => {
				let _ = link.commands.send(LinkCommand::Close);
				true
			}
			None => false,
		};
		had_attempt || had_link
	}
}

struct Inner {
	config: ClientConfig,
	transport: Arc<dyn PushTransport>,
	registry: Arc<HandlerRegistry>,
	presenter: SharedPresenter,
	slot: Mutex<SessionSlot>,
	state_tx: watch::Sender<ConnectionState>,
}

impl Inner {
	fn transition(&self, transition: Transition) {
		self.state_tx.send_if_modified(|state| {
			let next = state.apply(transition);
			let changed = next != *state;
			*state = next;
			changed
		});
	}
}

/// Owner of the push session for one user at a time.
///
/// Dropping the manager disconnects it.
pub struct ConnectionManager {
	inner: Arc<Inner>,
}

impl fmt::Debug for ConnectionManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConnectionManager")
			.field("state", &self.state())
			.field("push_url", &self.inner.config.push_url)
			.finish_non_exhaustive()
	}
}

impl ConnectionManager {
	/// Create a disconnected manager.
	pub fn new(config: ClientConfig, transport: Arc<dyn PushTransport>, registry: Arc<HandlerRegistry>, presenter: SharedPresenter) -> Self {
		let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
		Self {
			inner: Arc::new(Inner {
				config,
				transport,
				registry,
				presenter,
				slot: Mutex::new(SessionSlot::new()),
				state_tx,
			}),
		}
	}

	/// Manager using [`StompTransport`] for `config.push_url`.
	pub fn stomp(config: ClientConfig, registry: Arc<HandlerRegistry>, presenter: SharedPresenter) -> Self {
		let transport = Arc::new(StompTransport::new(&config));
		Self::new(config, transport, registry, presenter)
	}

	/// Handlers fed by this manager's sessions.
	pub fn registry(&self) -> &Arc<HandlerRegistry> {
		&self.inner.registry
	}

	/// Active configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.inner.config
	}

	/// Current state.
	pub fn state(&self) -> ConnectionState {
		*self.inner.state_tx.borrow()
	}

	/// Subscribe to state changes.
	pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
		self.inner.state_tx.subscribe()
	}

	/// Whether a live session exists.
	pub fn is_connected(&self) -> bool {
		self.inner.slot.lock().link.is_some()
	}

	/// The live session, if any.
	pub fn session(&self) -> Option<SessionHandle> {
		self.inner.slot.lock().link.as_ref().map(|link| link.session.clone())
	}

	/// Diagnostics snapshot.
	pub fn connection_info(&self) -> ConnectionInfo {
		let slot = self.inner.slot.lock();
		ConnectionInfo {
			state: self.state(),
			user: slot.user.clone(),
			attempts: slot.attempts,
			max_attempts: self.inner.config.max_attempts,
			handlers: self.inner.registry.len(),
			push_url: self.inner.config.push_url.clone(),
			destination: slot.link.as_ref().map(|link| link.session.destination.clone()),
			retry_pending: slot.retry.is_some(),
		}
	}

	/// Connect for `user` and resolve once subscribed.
	///
	/// Joins an attempt already running for the same user. Connecting for a different user
	/// tears down the current session first. Already connected for `user`: returns the live
	/// session without opening anything.
	pub async fn connect(&self, user: impl Into<UserId>) -> std::result::Result<SessionHandle, ConnectError> {
		let user = user.into();
		let rx = {
			let mut slot = self.inner.slot.lock();
			if let Some(link) = slot.link.as_ref().filter(|link| link.session.user == user) {
				return Ok(link.session.clone());
			}
			match slot.inflight.as_ref().filter(|f| f.user == user) {
				Some(inflight) => {
					debug!(user = %user, "Joining in-flight connect");
					inflight.rx.clone()
				}
				None => {
					if slot.teardown() {
						info!(user = %user, previous = ?slot.user, "Switching push session user");
					}
					slot.user = Some(user.clone());
					slot.attempts = 0;
					start_attempt(&self.inner, &mut slot, user, false)
				}
			}
		};
		await_outcome(rx).await
	}

	/// Connect again for the last user.
	///
	/// No user yet: [`ConnectError::NoUser`]. Already connected: the live session.
	pub async fn reconnect(&self) -> std::result::Result<SessionHandle, ConnectError> {
		let user = {
			let slot = self.inner.slot.lock();
			if let Some(link) = &slot.link {
				return Ok(link.session.clone());
			}
			slot.user.clone().ok_or(ConnectError::NoUser)?
		};
		self.connect(user).await
	}

	/// Tear down, wait the settle delay, and connect again for the last user.
	pub async fn force_reconnect(&self) -> std::result::Result<SessionHandle, ConnectError> {
		let user = self.inner.slot.lock().user.clone().ok_or(ConnectError::NoUser)?;
		info!(user = %user, "Forcing push session reconnect");
		self.disconnect();
		tokio::time::sleep(self.inner.config.settle_delay()).await;
		self.connect(user).await
	}

	/// Cancel any pending retry, close the link, and reset the attempt counter.
	///
	/// Safe to call when already disconnected. The last user is kept for [`Self::reconnect`].
	pub fn disconnect(&self) {
		let mut slot = self.inner.slot.lock();
		let had_session = slot.teardown();
		slot.attempts = 0;
		self.inner.transition(Transition::Closed);
		if had_session {
			info!(user = ?slot.user, "Push session disconnected");
		}
	}

	/// Publish a diagnostic notification request to the test destination.
	pub fn send_test_notification(&self, message: &str, kind: &str) -> Result<()> {
		let slot = self.inner.slot.lock();
		let link = slot.link.as_ref().ok_or(Error::NotConnected)?;
		let body = json!({
			"userId": link.session.user,
			"message": message,
			"type": kind,
			"timestamp": Timestamp::now(),
		});
		link.commands
			.send(LinkCommand::Publish {
				destination: self.inner.config.test_destination.clone(),
				body: body.to_string(),
			})
			.map_err(|_| Error::LinkClosed)?;
		debug!(user = %link.session.user, kind, "Test notification sent");
		Ok(())
	}
}

impl Drop for ConnectionManager {
	fn drop(&mut self) {
		self.disconnect();
	}
}

/// Register a new attempt task on `slot` and return its outcome channel.
fn start_attempt(inner: &Arc<Inner>, slot: &mut SessionSlot, user: UserId, wait_first: bool) -> watch::Receiver<Outcome> {
	let (tx, rx) = watch::channel(None);
	slot.inflight = Some(InFlight {
		user: user.clone(),
		rx: rx.clone(),
	});
	let epoch = slot.epoch;
	let cancel = slot.epoch_token.clone();
	let weak = Arc::downgrade(inner);
	let own = rx.clone();
	tokio::spawn(async move {
		let outcome = drive(&weak, user, epoch, cancel, wait_first).await;
		if let Some(inner) = weak.upgrade() {
			let mut slot = inner.slot.lock();
			if slot.inflight.as_ref().is_some_and(|f| f.rx.same_channel(&own)) {
				slot.inflight = None;
			}
		}
		let _ = tx.send(Some(outcome));
	});
	rx
}

async fn await_outcome(mut rx: watch::Receiver<Outcome>) -> std::result::Result<SessionHandle, ConnectError> {
	loop {
		if let Some(outcome) = rx.borrow_and_update().clone() {
			return outcome;
		}
		if rx.changed().await.is_err() {
			return rx.borrow().clone().unwrap_or(Err(ConnectError::Stopped));
		}
	}
}

/// The retry loop. Each pass: optional fixed-delay wait, count the attempt, open, subscribe, identify.
async fn drive(
	weak: &Weak<Inner>,
	user: UserId,
	epoch: u64,
	cancel: CancellationToken,
	wait_first: bool,
) -> std::result::Result<SessionHandle, ConnectError> {
	let mut wait = wait_first;
	loop {
		if wait {
			let (token, delay) = {
				let inner = weak.upgrade().ok_or(ConnectError::Stopped)?;
				let mut slot = inner.slot.lock();
				if slot.epoch != epoch {
					return Err(ConnectError::Cancelled);
				}
				let token = cancel.child_token();
				slot.retry = Some(token.clone());
				(token, inner.config.retry_delay_duration())
			};
			tokio::select! {
				_ = token.cancelled() => return Err(ConnectError::Cancelled),
				_ = tokio::time::sleep(delay) => {}
			}
		}

		let (transport, config, attempt) = {
			let inner = weak.upgrade().ok_or(ConnectError::Stopped)?;
			let mut slot = inner.slot.lock();
			if slot.epoch != epoch {
				return Err(ConnectError::Cancelled);
			}
			slot.retry = None;
			slot.attempts += 1;
			inner.transition(Transition::Attempt {
				retry: wait || slot.attempts > 1,
			});
			(Arc::clone(&inner.transport), inner.config.clone(), slot.attempts)
		};
		wait = true;

		info!(user = %user, attempt, max_attempts = config.max_attempts, url = %config.push_url, "Connecting to notification server");
		let opened = tokio::select! {
			_ = cancel.cancelled() => return Err(ConnectError::Cancelled),
			opened = open_session(transport.as_ref(), &config, &user) => opened,
		};

		let inner = weak.upgrade().ok_or(ConnectError::Stopped)?;
		let mut slot = inner.slot.lock();
		match opened {
			Ok((commands, events, destination)) => {
				if slot.epoch != epoch {
					let _ = commands.send(LinkCommand::Close);
					return Err(ConnectError::Cancelled);
				}
				let session = SessionHandle {
					user: user.clone(),
					destination,
					epoch,
				};
				slot.attempts = 0;
				if let Some(retry) = slot.retry.take() {
					retry.cancel();
				}
				slot.link = Some(LiveLink {
					commands,
					session: session.clone(),
				});
				inner.transition(Transition::Established);
				info!(user = %user, destination = %session.destination, attempt, "Push session established");

				let pipeline = SubscriptionHandler::new(user, Arc::clone(&inner.registry), Arc::clone(&inner.presenter));
				tokio::spawn(read_link(Weak::clone(weak), epoch, events, pipeline));
				return Ok(session);
			}
			Err(e) => {
				if slot.epoch != epoch {
					return Err(ConnectError::Cancelled);
				}
				inner.transition(Transition::Lost);
				if attempt >= config.max_attempts {
					inner.transition(Transition::Exhausted);
					error!(user = %user, attempts = attempt, error = %e, "Giving up on notification server");
					return Err(ConnectError::MaxAttemptsExceeded { attempts: attempt });
				}
				warn!(
					user = %user,
					attempt,
					max_attempts = config.max_attempts,
					retry_in = ?config.retry_delay_duration(),
					error = %e,
					"Connection attempt failed"
				);
			}
		}
	}
}

type Opened = (mpsc::UnboundedSender<LinkCommand>, mpsc::UnboundedReceiver<LinkEvent>, String);

/// Open a link, subscribe to the user's destination, and announce the user.
async fn open_session(transport: &dyn PushTransport, config: &ClientConfig, user: &UserId) -> Result<Opened> {
	let PushLink { commands, events } = transport.open(user).await?;
	let destination = config.destination_for(user);
	commands
		.send(LinkCommand::Subscribe {
			id: SUBSCRIPTION_ID.to_owned(),
			destination: destination.clone(),
		})
		.map_err(|_| Error::LinkClosed)?;
	commands
		.send(LinkCommand::Publish {
			destination: config.identify_destination.clone(),
			body: json!({ "userId": user }).to_string(),
		})
		.map_err(|_| Error::LinkClosed)?;
	Ok((commands, events, destination))
}

/// Pump one link's events into the pipeline. An unexpected close in the current epoch starts a background retry.
async fn read_link(weak: Weak<Inner>, epoch: u64, mut events: mpsc::UnboundedReceiver<LinkEvent>, pipeline: SubscriptionHandler) {
	let reason = loop {
		match events.recv().await {
			Some(LinkEvent::Message { destination, body }) => {
				debug!(user = %pipeline.user(), %destination, "Push message");
				pipeline.handle(&body);
			}
			Some(LinkEvent::Closed { reason }) => break reason,
			None => break None,
		}
	};

	let Some(inner) = weak.upgrade() else { return };
	let rx = {
		let mut slot = inner.slot.lock();
		if slot.epoch != epoch || slot.link.as_ref().is_none_or(|link| link.session.epoch != epoch) {
			return;
		}
		slot.link = None;
		inner.transition(Transition::Lost);
		warn!(user = %pipeline.user(), reason = reason.as_deref().unwrap_or("none"), "Push session lost");
		if slot.inflight.is_some() {
			return;
		}
		slot.attempts = 0;
		start_attempt(&inner, &mut slot, pipeline.user().clone(), true)
	};
	drop(inner);

	match await_outcome(rx).await {
		Ok(session) => info!(user = %session.user, "Push session recovered"),
		Err(ConnectError::Cancelled | ConnectError::Stopped) => {}
		Err(e) => error!(user = %pipeline.user(), error = %e, "Push session not recovered"),
	}
}
