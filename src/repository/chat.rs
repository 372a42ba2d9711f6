//! Chat repository backed by a remote data source.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ChatChannel, ChatMessage, Identifier};
use crate::errors::RepositoryError;
use crate::registry::ChannelRegistry;
use crate::source::{ChatDataSource, SnapshotStream};

use super::{ChatRepository, relay_feed};

/// Live chat repository. One upstream message feed per channel, shared by
/// all of that channel's subscribers.
pub struct SyncedChatRepository<S> {
    source: Arc<S>,
    registry: ChannelRegistry<ChatMessage>,
}

impl<S: ChatDataSource + 'static> SyncedChatRepository<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            registry: ChannelRegistry::new(),
        }
    }
}

#[async_trait]
impl<S: ChatDataSource + 'static> ChatRepository for SyncedChatRepository<S> {
    fn observe_messages(
        &self,
        channel_id: &Identifier<ChatChannel>,
    ) -> SnapshotStream<ChatMessage> {
        let subscription = self.registry.subscribe(channel_id.as_str());
        self.registry.ensure_upstream(channel_id.as_str(), || {
            relay_feed(
                &self.registry,
                channel_id.as_str(),
                self.source.message_snapshots(channel_id),
            )
        });
        Box::pin(subscription)
    }

    async fn send_message(&self, message: ChatMessage) -> Result<(), RepositoryError> {
        self.source.send_message(&message).await
    }

    async fn create_channel(&self, channel: ChatChannel) -> Result<(), RepositoryError> {
        self.source.create_channel(&channel).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use futures_util::StreamExt;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    use super::*;
    use crate::registry::SnapshotEvent;

    struct ScriptedChatSource {
        feeds: Mutex<VecDeque<SnapshotStream<ChatMessage>>>,
        sent: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedChatSource {
        fn new(feeds: Vec<SnapshotStream<ChatMessage>>) -> Self {
            Self {
                feeds: Mutex::new(feeds.into_iter().collect()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatDataSource for ScriptedChatSource {
        fn message_snapshots(
            &self,
            _channel_id: &Identifier<ChatChannel>,
        ) -> SnapshotStream<ChatMessage> {
            self.feeds
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Box::pin(futures_util::stream::pending()))
        }

        async fn send_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn create_channel(&self, _channel: &ChatChannel) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    fn message(id: &str, body: &str) -> ChatMessage {
        let mut msg = ChatMessage::new(
            Identifier::from_raw("general"),
            Identifier::from_raw("owner"),
            body,
        );
        msg.id = Identifier::from_raw(id);
        msg
    }

    fn feed_of(
        events: Vec<SnapshotEvent<ChatMessage>>,
    ) -> (
        SnapshotStream<ChatMessage>,
        tokio::sync::mpsc::UnboundedSender<SnapshotEvent<ChatMessage>>,
    ) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        for event in events {
            tx.send(event).unwrap();
        }
        (Box::pin(UnboundedReceiverStream::new(rx)), tx)
    }

    #[tokio::test]
    async fn observe_replays_then_follows_the_feed() {
        let (feed, tx) = feed_of(vec![Ok(vec![message("m1", "welcome")])]);
        let repo = SyncedChatRepository::new(ScriptedChatSource::new(vec![feed]));
        let channel = Identifier::from_raw("general");

        let mut stream = repo.observe_messages(&channel);
        assert!(stream.next().await.unwrap().unwrap().is_empty());
        assert_eq!(stream.next().await.unwrap().unwrap()[0].body, "welcome");

        tx.send(Ok(vec![message("m1", "welcome"), message("m2", "hi")]))
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn send_delegates_to_the_source() {
        let repo = SyncedChatRepository::new(ScriptedChatSource::new(Vec::new()));
        repo.send_message(message("m1", "hello")).await.unwrap();
        let sent = repo.source.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "hello");
    }

    #[tokio::test]
    async fn feed_failure_ends_every_channel_subscriber() {
        let (feed, tx) = feed_of(Vec::new());
        let repo = SyncedChatRepository::new(ScriptedChatSource::new(vec![feed]));
        let channel = Identifier::from_raw("general");

        let mut first = repo.observe_messages(&channel);
        let mut second = repo.observe_messages(&channel);
        assert!(first.next().await.unwrap().unwrap().is_empty());
        assert!(second.next().await.unwrap().unwrap().is_empty());

        tx.send(Err(RepositoryError::Transport("gone".to_string())))
            .unwrap();
        for stream in [&mut first, &mut second] {
            assert!(stream.next().await.unwrap().is_err());
            assert!(stream.next().await.is_none());
        }
    }
}
