//! `reqwest` implementation of the history endpoints.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response};
use serde::Deserialize;
use url::Url;

use super::{HistoryApi, ListScope};
use crate::config::ClientConfig;
use crate::notification::{Notification, NotificationId, UserId};
use crate::{Error, Result};

/// REST client for `/api/notifications`.
#[derive(Debug, Clone)]
pub struct RestHistory {
	client: reqwest::Client,
	base: Url,
	token: Option<String>,
}

#[derive(Deserialize)]
struct UnreadCount {
	#[serde(rename = "unreadCount")]
	unread_count: u64,
}

impl RestHistory {
	/// Build a client for `config.api_url` with the configured timeout.
	///
	/// `config.token` is used for calls that pass no token of their own.
	pub fn new(config: &ClientConfig) -> Result<Self> {
		let base = Url::parse(&config.api_url)?;
		if base.cannot_be_a_base() {
			return Err(Error::Config(format!("api_url cannot be a base: {}", config.api_url)));
		}
		let client = reqwest::Client::builder().timeout(config.request_timeout()).build()?;
		Ok(Self {
			client,
			base,
			token: config.token.clone(),
		})
	}

	fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
		let mut url = self.base.clone();
		url.path_segments_mut()
			.map_err(|()| Error::Config(format!("api_url cannot be a base: {}", self.base)))?
			.pop_if_empty()
			.extend(["api", "notifications"])
			.extend(segments);
		Ok(url)
	}

	async fn send(&self, method: Method, url: Url, token: Option<&str>) -> Result<Response> {
		let mut request = self.client.request(method.clone(), url.clone()).header(CONTENT_TYPE, "application/json");
		if let Some(token) = token.or(self.token.as_deref()) {
			request = request.bearer_auth(token);
		}
		let response = request.send().await?;
		let status = response.status();
		if !status.is_success() {
			return Err(Error::Status {
				method,
				url: url.to_string(),
				status: status.as_u16(),
			});
		}
		Ok(response)
	}
}

#[async_trait]
impl HistoryApi for RestHistory {
	async fn list(&self, user: &UserId, scope: &ListScope, token: Option<&str>) -> Result<Vec<Notification>> {
		let url = match scope {
			ListScope::All => self.url(["user", user.as_str()])?,
			ListScope::Unread => self.url(["user", user.as_str(), "unread"])?,
			ListScope::Type(kind) => self.url(["user", user.as_str(), "type", kind.as_str()])?,
		};
		let response = self.send(Method::GET, url, token).await?;
		Ok(response.json().await?)
	}

	async fn mark_read(&self, id: NotificationId, token: Option<&str>) -> Result<()> {
		let id = id.to_string();
		let url = self.url([id.as_str(), "read"])?;
		self.send(Method::PUT, url, token).await?;
		Ok(())
	}

	async fn unread_count(&self, user: &UserId, token: Option<&str>) -> Result<u64> {
		let url = self.url(["user", user.as_str(), "count"])?;
		let body: UnreadCount = self.send(Method::GET, url, token).await?.json().await?;
		Ok(body.unread_count)
	}
}
