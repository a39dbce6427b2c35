//! Session lifecycle state and its transition table.

use std::fmt;

/// Observable lifecycle state of the push session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
	/// No transport and no attempt running.
	#[default]
	Disconnected,
	/// First attempt of a `connect` is running.
	Connecting,
	/// Session established and subscribed.
	Connected,
	/// A retry attempt is running.
	Reconnecting,
	/// The attempt budget was exhausted.
	Failed,
}

impl ConnectionState {
	/// Whether a live, subscribed session exists.
	pub fn is_connected(self) -> bool {
		self == Self::Connected
	}

	/// Whether an attempt is running.
	pub fn is_connecting(self) -> bool {
		matches!(self, Self::Connecting | Self::Reconnecting)
	}

	/// Lowercase name.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Disconnected => "disconnected",
			Self::Connecting => "connecting",
			Self::Connected => "connected",
			Self::Reconnecting => "reconnecting",
			Self::Failed => "failed",
		}
	}

	/// Next state after `transition`.
	///
	/// `Established` only lands from an attempt state; `Lost` is a no-op when nothing
	/// was live or running, so a late link-loss report cannot overwrite `Failed`.
	pub(crate) fn apply(self, transition: Transition) -> Self {
		use ConnectionState::*;
		match (self, transition) {
			(_, Transition::Closed) => Disconnected,
			(_, Transition::Attempt { retry: false }) => Connecting,
			(_, Transition::Attempt { retry: true }) => Reconnecting,
			(Connecting | Reconnecting | Connected, Transition::Established) => Connected,
			(state, Transition::Established) => state,
			(Connecting | Reconnecting | Connected, Transition::Lost) => Disconnected,
			(state, Transition::Lost) => state,
			(_, Transition::Exhausted) => Failed,
		}
	}
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Events that move the session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
	/// An attempt started; `retry` is false only for the first attempt of a `connect`.
	Attempt { retry: bool },
	/// Transport open, subscribed, identified.
	Established,
	/// An attempt failed or a live link dropped.
	Lost,
	/// Attempt budget used up.
	Exhausted,
	/// Explicit teardown.
	Closed,
}
