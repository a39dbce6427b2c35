use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pulse_notify::config::ENV_TOKEN;
use pulse_notify::{ClientConfig, ListScope, NotificationId, UserId};

#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(about = "Real-time notification client")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// TOML configuration file (defaults come from the environment)
	#[arg(long, short = 'c', value_name = "PATH", global = true)]
	pub config: Option<PathBuf>,

	/// User to act as
	#[arg(long, short = 'u', env = "PULSE_USER", global = true, default_value = "1")]
	pub user: String,

	/// Bearer token for the push session and REST calls
	#[arg(long, env = ENV_TOKEN, global = true, hide_env_values = true)]
	pub token: Option<String>,

	/// Verbose logging
	#[arg(long, short = 'v', global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
	/// Connect and print live notifications until interrupted
	Listen {
		/// Print each notification as a JSON line
		#[arg(long)]
		json: bool,
	},
	/// Print notification history, newest first
	History {
		/// Only unread notifications
		#[arg(long, conflicts_with = "kind")]
		unread: bool,
		/// Only notifications of this type
		#[arg(long = "type", value_name = "TYPE")]
		kind: Option<String>,
		/// Print the server-side unread count instead of the list
		#[arg(long, conflicts_with_all = ["unread", "kind"])]
		count: bool,
	},
	/// Mark notifications as read
	MarkRead {
		/// Notification ids
		#[arg(required = true, num_args = 1..)]
		ids: Vec<i64>,
	},
	/// Ask the server to push a test notification back to this user
	SendTest {
		/// Notification text
		message: String,
		/// Notification type tag
		#[arg(long = "type", value_name = "TYPE", default_value = "info")]
		kind: String,
	},
	/// Connect once and print connection diagnostics
	Info,
}

impl Cli {
	/// Configuration from `--config` or the environment, with `--token` applied on top.
	pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
		let mut config = match &self.config {
			Some(path) => {
				let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
				ClientConfig::from_toml_str(&text).with_context(|| format!("parsing {}", path.display()))?
			}
			None => {
				let config = ClientConfig::from_env();
				config.validate()?;
				config
			}
		};
		if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
			config.token = Some(token.to_owned());
		}
		Ok(config)
	}

	/// The user id argument.
	pub fn user_id(&self) -> UserId {
		UserId::new(self.user.trim())
	}
}

/// History scope selected by `history` flags.
pub fn history_scope(unread: bool, kind: Option<&str>) -> ListScope {
	match (unread, kind) {
		(true, _) => ListScope::Unread,
		(false, Some(kind)) => ListScope::Type(kind.to_owned()),
		(false, None) => ListScope::All,
	}
}

/// Ids as the library's id type.
pub fn notification_ids(ids: &[i64]) -> Vec<NotificationId> {
	ids.iter().copied().map(NotificationId).collect()
}
