//! Acquirer stage tests against a scripted channel client

use chrono::Utc;
use futures::stream::{self, BoxStream};
use tgpipe_acquire::{
    Acquirer, ChannelClient, ChannelPeer, ChannelRef, ClientError, GatewayMessage,
    RawMessageRecord,
};

struct StubClient {
    peer: ChannelPeer,
    messages: Vec<GatewayMessage>,
    fail_resolve: bool,
    fail_after: Option<usize>,
}

impl StubClient {
    fn new(peer: ChannelPeer, messages: Vec<GatewayMessage>) -> Self {
        Self {
            peer,
            messages,
            fail_resolve: false,
            fail_after: None,
        }
    }
}

impl ChannelClient for StubClient {
    async fn resolve(&self, reference: &ChannelRef) -> Result<ChannelPeer, ClientError> {
        if self.fail_resolve {
            return Err(ClientError::NotFound(reference.to_string()));
        }
        Ok(self.peer.clone())
    }

    fn iter_messages<'a>(
        &'a self,
        _peer: &'a ChannelPeer,
        limit: usize,
    ) -> BoxStream<'a, Result<GatewayMessage, ClientError>> {
        let mut items: Vec<Result<GatewayMessage, ClientError>> = self
            .messages
            .iter()
            .take(limit)
            .cloned()
            .map(Ok)
            .collect();
        if let Some(after) = self.fail_after {
            items.truncate(after);
            items.push(Err(ClientError::Network("connection reset".to_string())));
        }
        Box::pin(stream::iter(items))
    }
}

fn public_peer() -> ChannelPeer {
    ChannelPeer {
        id: 1234567890,
        username: Some("lobelia4cosmetics".to_string()),
        title: "Lobelia Cosmetics".to_string(),
    }
}

fn message(id: i64, text: &str) -> GatewayMessage {
    GatewayMessage {
        id,
        date: Some(Utc::now()),
        text: Some(text.to_string()),
        sender_id: Some(42),
        channel_id: Some(1234567890),
        views: Some(100),
        forwards: None,
        replies: None,
        post_author: None,
        grouped_id: None,
    }
}

fn read_batch(root: &std::path::Path, stem: &str) -> Vec<RawMessageRecord> {
    let day = Utc::now().format("%Y-%m-%d").to_string();
    let path = root.join(day).join(format!("{}.json", stem));
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn writes_one_batch_file_most_recent_first() {
    let root = tempfile::tempdir().unwrap();
    let client = StubClient::new(
        public_peer(),
        vec![message(30, "newest"), message(20, "middle"), message(10, "oldest")],
    );
    let acquirer = Acquirer::new(client, root.path().to_path_buf());

    let report = acquirer
        .run(&ChannelRef::parse("lobelia4cosmetics"), 50)
        .await
        .unwrap();

    assert_eq!(report.messages, 3);
    assert_eq!(report.channel_title, "Lobelia Cosmetics");

    let records = read_batch(root.path(), "lobelia4cosmetics");
    assert_eq!(records.len(), 3);
    // Order preserved: most recent first
    assert_eq!(records[0].id, 30);
    assert_eq!(records[2].id, 10);
    assert_eq!(records[0].url, "https://t.me/lobelia4cosmetics/30");
    assert_eq!(records[1].message.as_deref(), Some("middle"));
}

#[tokio::test]
async fn respects_message_limit() {
    let root = tempfile::tempdir().unwrap();
    let client = StubClient::new(
        public_peer(),
        (0..10).map(|i| message(100 - i, "m")).collect(),
    );
    let acquirer = Acquirer::new(client, root.path().to_path_buf());

    let report = acquirer
        .run(&ChannelRef::parse("lobelia4cosmetics"), 4)
        .await
        .unwrap();

    assert_eq!(report.messages, 4);
    assert_eq!(read_batch(root.path(), "lobelia4cosmetics").len(), 4);
}

#[tokio::test]
async fn private_channel_batch_is_named_by_numeric_id() {
    let root = tempfile::tempdir().unwrap();
    let peer = ChannelPeer {
        id: 987654321,
        username: None,
        title: "Private Channel".to_string(),
    };
    let client = StubClient::new(peer, vec![message(7, "hello")]);
    let acquirer = Acquirer::new(client, root.path().to_path_buf());

    acquirer
        .run(&ChannelRef::parse("-100987654321"), 10)
        .await
        .unwrap();

    let records = read_batch(root.path(), "987654321");
    assert_eq!(records[0].url, "https://t.me/c/987654321/7");
}

#[tokio::test]
async fn resolution_failure_aborts_with_no_output() {
    let root = tempfile::tempdir().unwrap();
    let mut client = StubClient::new(public_peer(), vec![message(1, "x")]);
    client.fail_resolve = true;
    let acquirer = Acquirer::new(client, root.path().to_path_buf());

    let result = acquirer.run(&ChannelRef::parse("missing"), 10).await;

    assert!(result.is_err());
    // Nothing written, not even the date directory
    assert!(std::fs::read_dir(root.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn mid_stream_failure_aborts_with_no_partial_output() {
    let root = tempfile::tempdir().unwrap();
    let mut client = StubClient::new(
        public_peer(),
        vec![message(3, "a"), message(2, "b"), message(1, "c")],
    );
    client.fail_after = Some(2);
    let acquirer = Acquirer::new(client, root.path().to_path_buf());

    let result = acquirer
        .run(&ChannelRef::parse("lobelia4cosmetics"), 10)
        .await;

    assert!(result.is_err());
    assert!(std::fs::read_dir(root.path()).unwrap().next().is_none());
}
