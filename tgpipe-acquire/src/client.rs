//! Channel gateway client
//!
//! The MTProto session, auth handshake, and entity cache live in a gateway
//! sidecar; this client speaks plain JSON to it. Message iteration is a
//! lazy, finite, forward-only sequence with a single request in flight at a
//! time — stopping iteration is the only cancellation needed.

use crate::channel::{ChannelPeer, ChannelRef};
use async_stream::try_stream;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "tgpipe/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Messages fetched per gateway request
const PAGE_SIZE: usize = 100;

/// Channel gateway client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Channel not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("'{reference}' resolved to a {kind}, not a channel")]
    NotAChannel { reference: String, kind: String },

    #[error("Gateway error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One platform message as the gateway reports it
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayMessage {
    pub id: i64,
    pub date: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub sender_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub replies: Option<i64>,
    pub post_author: Option<String>,
    pub grouped_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    id: i64,
    username: Option<String>,
    title: String,
    kind: String,
}

#[derive(Debug, Deserialize)]
struct MessagesPage {
    messages: Vec<GatewayMessage>,
}

/// External channel collaborator consumed by the Acquirer.
///
/// `iter_messages` produces messages most recent first, bounded by `limit`;
/// the stream is consumed once per run and cannot be restarted.
#[allow(async_fn_in_trait)]
pub trait ChannelClient {
    async fn resolve(&self, reference: &ChannelRef) -> Result<ChannelPeer, ClientError>;

    fn iter_messages<'a>(
        &'a self,
        peer: &'a ChannelPeer,
        limit: usize,
    ) -> BoxStream<'a, Result<GatewayMessage, ClientError>>;
}

/// HTTP implementation of [`ChannelClient`] against the gateway sidecar
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl GatewayClient {
    pub fn new(config: &tgpipe_common::config::TelegramConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn fetch_page(
        &self,
        channel_id: i64,
        limit: usize,
        offset_id: Option<i64>,
    ) -> Result<MessagesPage, ClientError> {
        let mut url = format!(
            "{}/v1/channels/{}/messages?limit={}",
            self.base_url, channel_id, limit
        );
        if let Some(offset) = offset_id {
            url.push_str(&format!("&offset_id={}", offset));
        }

        tracing::debug!(url = %url, "Fetching message page");

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

impl ChannelClient for GatewayClient {
    async fn resolve(&self, reference: &ChannelRef) -> Result<ChannelPeer, ClientError> {
        let url = format!("{}/v1/channels/{}", self.base_url, reference.as_query());

        tracing::debug!(reference = %reference, url = %url, "Resolving channel reference");

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            return Err(ClientError::NotFound(reference.to_string()));
        }
        if status == 401 || status == 403 {
            return Err(ClientError::AccessDenied(reference.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), body));
        }

        let descriptor: ResolveResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        if descriptor.kind != "channel" {
            return Err(ClientError::NotAChannel {
                reference: reference.to_string(),
                kind: descriptor.kind,
            });
        }

        Ok(ChannelPeer {
            id: descriptor.id,
            username: descriptor.username,
            title: descriptor.title,
        })
    }

    fn iter_messages<'a>(
        &'a self,
        peer: &'a ChannelPeer,
        limit: usize,
    ) -> BoxStream<'a, Result<GatewayMessage, ClientError>> {
        Box::pin(try_stream! {
            let mut remaining = limit;
            // Pagination cursor: the id of the last message seen; the next
            // page starts strictly below it.
            let mut offset_id: Option<i64> = None;

            while remaining > 0 {
                let page = self
                    .fetch_page(peer.id, remaining.min(PAGE_SIZE), offset_id)
                    .await?;
                if page.messages.is_empty() {
                    break;
                }
                for message in page.messages {
                    offset_id = Some(message.id);
                    remaining -= 1;
                    yield message;
                    if remaining == 0 {
                        break;
                    }
                }
            }
        })
    }
}
