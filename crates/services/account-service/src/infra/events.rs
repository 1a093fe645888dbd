//! Account event sinks.
//!
//! The user manager publishes an [`AccountEvent`] after each successful
//! create and bulk delete. Which transport carries it is decided at wiring
//! time.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::broadcast;

use common::AppResult;
use domain::AccountEvent;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Destination for account events.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: AccountEvent) -> AppResult<()>;
}

/// Writes events to the tracing log.
#[derive(Debug, Default, Clone)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: AccountEvent) -> AppResult<()> {
        tracing::info!(
            event = event.name(),
            user_ids = ?event.user_ids(),
            "Account event"
        );
        Ok(())
    }
}

/// Publishes JSON-encoded events on a Redis pub/sub channel.
#[derive(Clone)]
pub struct RedisEventSink {
    connection: ConnectionManager,
    channel: String,
}

impl RedisEventSink {
    /// Connect to Redis and publish on `channel`.
    pub async fn connect(redis_url: &str, channel: impl Into<String>) -> AppResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection,
            channel: channel.into(),
        })
    }
}

#[async_trait]
impl EventSink for RedisEventSink {
    async fn publish(&self, event: AccountEvent) -> AppResult<()> {
        let payload = serde_json::to_string(&event)?;
        let mut connection = self.connection.clone();
        let receivers: i64 = connection.publish(&self.channel, payload).await?;

        tracing::debug!(
            event = event.name(),
            channel = %self.channel,
            receivers,
            "Published account event"
        );
        Ok(())
    }
}

/// In-process fan-out over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<AccountEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn publish(&self, event: AccountEvent) -> AppResult<()> {
        // Sending only fails when nobody is listening
        if self.sender.send(event).is_err() {
            tracing::debug!("Account event dropped: no subscribers");
        }
        Ok(())
    }
}
