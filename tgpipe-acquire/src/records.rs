//! Flat acquired-message records
//!
//! The serialized shape is the raw layer's wire format: the loader and the
//! downstream transformation layer consume these fields by name, so the
//! field set and names are stable.

use crate::channel::ChannelPeer;
use crate::client::GatewayMessage;
use serde::{Deserialize, Serialize};

/// One acquired message, flattened for the raw layer.
///
/// Created once per message observed in a scrape window and immutable
/// afterward; a later scrape of the same window supersedes the whole batch
/// file rather than merging into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessageRecord {
    /// Platform-assigned id, unique within the channel
    pub id: i64,
    /// Message timestamp, RFC 3339
    pub date: Option<String>,
    /// Free-text body
    pub message: Option<String>,
    pub sender_id: Option<i64>,
    pub peer_id: Option<i64>,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub replies: Option<i64>,
    pub post_author: Option<String>,
    /// Album grouping id, shared by messages posted together
    pub grouped_id: Option<i64>,
    /// Derived permalink
    pub url: String,
}

impl RawMessageRecord {
    pub fn from_wire(message: &GatewayMessage, peer: &ChannelPeer) -> Self {
        Self {
            id: message.id,
            date: message.date.map(|d| d.to_rfc3339()),
            message: message.text.clone(),
            sender_id: message.sender_id,
            peer_id: message.channel_id,
            views: message.views,
            forwards: message.forwards,
            replies: message.replies,
            post_author: message.post_author.clone(),
            grouped_id: message.grouped_id,
            url: peer.permalink(message.id),
        }
    }
}
