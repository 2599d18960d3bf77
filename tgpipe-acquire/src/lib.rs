//! tgpipe-acquire - Source Acquirer stage
//!
//! Fetches a bounded window of messages from a remote channel through the
//! channel gateway, shapes each into a flat record, and writes the batch as
//! one JSON array file under the raw messages root. Resolution and message
//! pagination are owned by the gateway; this stage only disambiguates the
//! channel reference, shapes records, computes permalinks, and serializes
//! the batch.

pub mod acquirer;
pub mod channel;
pub mod client;
pub mod records;

pub use acquirer::{AcquireError, AcquireReport, Acquirer};
pub use channel::{ChannelPeer, ChannelRef};
pub use client::{ChannelClient, ClientError, GatewayClient, GatewayMessage};
pub use records::RawMessageRecord;
