//! Discord REST client
//!
//! Implements [`ChatTransport`] over the Discord HTTP API with a bot token.

use crate::error::TransportError;
use crate::platform::{
    Channel, ChannelId, ChannelMessage, ChatTransport, GuildId, OutgoingMessage, Role, RoleId,
    User,
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DiscordClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Discord API {} {}", method, path);

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token))
            .timeout(REQUEST_TIMEOUT);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| TransportError::Http {
            endpoint: path.to_string(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            return Err(TransportError::NotFound(format!("{} ({})", path, status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| TransportError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }
}

#[async_trait]
impl ChatTransport for DiscordClient {
    async fn current_user(&self) -> Result<User, TransportError> {
        self.get("/users/@me").await
    }

    async fn fetch_channel(&self, channel: ChannelId) -> Result<Channel, TransportError> {
        self.get(&format!("/channels/{}", channel)).await
    }

    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, TransportError> {
        self.get(&format!("/channels/{}/messages?limit={}", channel, limit))
            .await
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &OutgoingMessage,
    ) -> Result<ChannelMessage, TransportError> {
        self.request(
            Method::POST,
            &format!("/channels/{}/messages", channel),
            Some(message),
        )
        .await
    }

    async fn guild_role_names(
        &self,
        guild: GuildId,
    ) -> Result<HashMap<RoleId, String>, TransportError> {
        let roles: Vec<Role> = self.get(&format!("/guilds/{}/roles", guild)).await?;
        Ok(roles.into_iter().map(|r| (r.id, r.name)).collect())
    }
}
