//! Client configuration.
//!
//! Endpoints come from the environment or a TOML file; everything else has defaults that
//! match the notification service's deployment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::notification::UserId;
use crate::{Error, Result};

/// Placeholder substituted with the user id in destination templates.
pub const USER_PLACEHOLDER: &str = "{userId}";

/// Environment variable holding the push endpoint URL.
pub const ENV_PUSH_URL: &str = "PULSE_PUSH_URL";
/// Environment variable holding the REST base URL.
pub const ENV_API_URL: &str = "PULSE_API_URL";
/// Environment variable holding an optional bearer token.
pub const ENV_TOKEN: &str = "PULSE_TOKEN";

/// Configuration shared by the push session and the history client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
	/// WebSocket endpoint speaking STOMP.
	pub push_url: String,
	/// Base URL of the REST API (without the `/api` suffix).
	pub api_url: String,
	/// Bearer token sent with REST calls and the session handshake.
	pub token: Option<String>,
	/// Per-user subscribe destination; must contain [`USER_PLACEHOLDER`].
	pub user_destination: String,
	/// Destination of the identify message published after subscribing.
	pub identify_destination: String,
	/// Destination for diagnostic test publishes.
	pub test_destination: String,
	/// Connection attempts per `connect` before reporting terminal failure.
	pub max_attempts: u32,
	/// Fixed delay between attempts, in seconds.
	pub retry_delay_secs: u64,
	/// Pause between teardown and reconnect in a forced reconnect, in seconds.
	pub settle_delay_secs: u64,
	/// Upper bound on the STOMP CONNECT/CONNECTED exchange, in seconds.
	pub handshake_timeout_secs: u64,
	/// Per-request timeout for REST calls, in seconds.
	pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			push_url: "ws://localhost:8085/ws".into(),
			api_url: "http://localhost:8085".into(),
			token: None,
			user_destination: format!("/user/{USER_PLACEHOLDER}/queue/notifications"),
			identify_destination: "/app/subscribe".into(),
			test_destination: "/app/test".into(),
			max_attempts: 5,
			retry_delay_secs: 5,
			settle_delay_secs: 1,
			handshake_timeout_secs: 10,
			request_timeout_secs: 30,
		}
	}
}

impl ClientConfig {
	/// Create a configuration for the given endpoints with default tuning.
	pub fn new(push_url: impl Into<String>, api_url: impl Into<String>) -> Self {
		Self {
			push_url: push_url.into(),
			api_url: api_url.into(),
			..Self::default()
		}
	}

	/// Read endpoints and token from the process environment.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Read endpoints and token through `lookup`, falling back to defaults.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = Self::default();
		if let Some(url) = lookup(ENV_PUSH_URL) {
			config.push_url = url;
		}
		if let Some(url) = lookup(ENV_API_URL) {
			config.api_url = url;
		}
		config.token = lookup(ENV_TOKEN).filter(|t| !t.is_empty());
		config
	}

	/// Parse a TOML document. Missing keys take their defaults.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Set the bearer token.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// Set the attempt bound.
	pub fn max_attempts(mut self, attempts: u32) -> Self {
		self.max_attempts = attempts;
		self
	}

	/// Set the fixed retry delay.
	pub fn retry_delay(mut self, secs: u64) -> Self {
		self.retry_delay_secs = secs;
		self
	}

	/// Check invariants the session relies on.
	pub fn validate(&self) -> Result<()> {
		if self.max_attempts == 0 {
			return Err(Error::Config("max_attempts must be at least 1".into()));
		}
		if !self.user_destination.contains(USER_PLACEHOLDER) {
			return Err(Error::Config(format!("user_destination must contain {USER_PLACEHOLDER}")));
		}
		let push = Url::parse(&self.push_url)?;
		if !matches!(push.scheme(), "ws" | "wss") {
			return Err(Error::Config(format!("push_url must be ws:// or wss://, got {}", push.scheme())));
		}
		let api = Url::parse(&self.api_url)?;
		if !matches!(api.scheme(), "http" | "https") {
			return Err(Error::Config(format!("api_url must be http:// or https://, got {}", api.scheme())));
		}
		Ok(())
	}

	/// The subscribe destination scoped to `user`.
	pub fn destination_for(&self, user: &UserId) -> String {
		self.user_destination.replace(USER_PLACEHOLDER, user.as_str())
	}

	/// Fixed delay between connection attempts.
	pub fn retry_delay_duration(&self) -> Duration {
		Duration::from_secs(self.retry_delay_secs)
	}

	/// Pause used by forced reconnects.
	pub fn settle_delay(&self) -> Duration {
		Duration::from_secs(self.settle_delay_secs)
	}

	/// Handshake bound.
	pub fn handshake_timeout(&self) -> Duration {
		Duration::from_secs(self.handshake_timeout_secs)
	}

	/// REST request bound.
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

#[cfg(test)]
mod tests;
