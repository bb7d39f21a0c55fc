use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use rand::Rng;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::{DocumentSnapshot, SnapshotStream, StoreError, VerbStore};
use crate::model::VerbRecord;

const KEY_PREFIX: &str = "verbs:";
const CHANNEL_PREFIX: &str = "verbs:events:";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const RECONNECT_JITTER_RATIO: f64 = 0.2;
const SUBSCRIBER_BUFFER: usize = 64;

/// On-the-wire document shape: one JSON object with a `verbs` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VerbDocument {
    verbs: Vec<VerbRecord>,
}

/// Remote store over Redis. The document is a JSON string at
/// `verbs:{storage_key}`; every write also publishes the new document on
/// `verbs:events:{storage_key}`, which is what live subscribers listen to.
pub struct RedisVerbStore {
    redis_url: String,
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisVerbStore {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            connection: RwLock::new(None),
        }
    }

    /// Connects eagerly so a bad URL fails here instead of at first use.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let store = Self::new(redis_url);
        store.command_connection().await?;
        Ok(store)
    }

    fn document_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    fn channel_name(key: &str) -> String {
        format!("{CHANNEL_PREFIX}{key}")
    }

    async fn command_connection(&self) -> Result<MultiplexedConnection, StoreError> {
        if let Some(conn) = self.connection.read().await.clone() {
            return Ok(conn);
        }

        let client = Client::open(self.redis_url.as_str())?;
        let conn = client.get_multiplexed_tokio_connection().await?;

        {
            let mut connection = self.connection.write().await;
            *connection = Some(conn.clone());
        }

        info!("redis verb store connected");
        Ok(conn)
    }

    async fn publish(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        let mut conn = self.command_connection().await?;
        conn.publish::<_, _, i64>(Self::channel_name(key), payload)
            .await
            .map_err(StoreError::Publish)?;

        debug!(key = %key, "verb document change published");
        Ok(())
    }
}

#[async_trait]
impl VerbStore for RedisVerbStore {
    async fn subscribe(&self, key: &str) -> Result<SnapshotStream, StoreError> {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let worker = SubscriberWorker {
            redis_url: self.redis_url.clone(),
            key: key.to_string(),
            sender,
        };
        tokio::spawn(worker.run());

        Ok(ReceiverStream::new(receiver).boxed())
    }

    async fn create_if_absent(&self, key: &str, initial: &[VerbRecord]) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&VerbDocument {
            verbs: initial.to_vec(),
        })?;

        let mut conn = self.command_connection().await?;
        let created: Option<String> = redis::cmd("SET")
            .arg(Self::document_key(key))
            .arg(&payload)
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        if created.is_some() {
            debug!(key = %key, "verb document created");
            self.publish(key, &payload).await?;
        }
        Ok(())
    }

    async fn overwrite(&self, key: &str, verbs: &[VerbRecord]) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&VerbDocument {
            verbs: verbs.to_vec(),
        })?;

        let mut conn = self.command_connection().await?;
        conn.set::<_, _, ()>(Self::document_key(key), &payload)
            .await?;

        self.publish(key, &payload).await
    }
}

/// Listens on one key's notification channel and forwards snapshots until
/// the receiving stream is dropped. Reconnects with a jittered delay.
struct SubscriberWorker {
    redis_url: String,
    key: String,
    sender: mpsc::Sender<DocumentSnapshot>,
}

impl SubscriberWorker {
    async fn run(self) {
        loop {
            match self.listen().await {
                Ok(()) => debug!(key = %self.key, "redis subscription ended"),
                Err(err) => {
                    warn!(key = %self.key, error = %err, "redis subscription error, reconnecting")
                }
            }

            if self.sender.is_closed() {
                debug!(key = %self.key, "subscriber dropped, stopping redis listener");
                return;
            }
            tokio::time::sleep(jittered(RECONNECT_DELAY)).await;
        }
    }

    async fn listen(&self) -> Result<(), StoreError> {
        let client = Client::open(self.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub
            .subscribe(RedisVerbStore::channel_name(&self.key))
            .await
            .map_err(StoreError::Subscribe)?;

        // Deliver the current document first, so subscribers start from
        // present state, including after a reconnect.
        let initial = self.current_snapshot(&client).await?;
        if self.sender.send(initial).await.is_err() {
            return Ok(());
        }

        let mut messages = pubsub.on_message();
        loop {
            let message = tokio::select! {
                _ = self.sender.closed() => return Ok(()),
                message = messages.next() => match message {
                    Some(message) => message,
                    None => return Ok(()),
                },
            };

            let payload: String = match message.get_payload() {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(key = %self.key, error = %err, "unreadable notification payload");
                    continue;
                }
            };

            match serde_json::from_str::<VerbDocument>(&payload) {
                Ok(document) => {
                    if self
                        .sender
                        .send(DocumentSnapshot::present(document.verbs))
                        .await
                        .is_err()
                    {
                        return Ok(());
                    }
                }
                Err(err) => {
                    warn!(key = %self.key, error = %err, "ignoring malformed document notification")
                }
            }
        }
    }

    async fn current_snapshot(&self, client: &Client) -> Result<DocumentSnapshot, StoreError> {
        let mut conn = client.get_multiplexed_tokio_connection().await?;
        let payload: Option<String> = conn.get(RedisVerbStore::document_key(&self.key)).await?;

        Ok(match payload {
            Some(raw) => {
                let document: VerbDocument = serde_json::from_str(&raw)?;
                DocumentSnapshot::present(document.verbs)
            }
            None => DocumentSnapshot::missing(),
        })
    }
}

fn jittered(delay: Duration) -> Duration {
    let base_ms = delay.as_millis() as f64;
    let mut rng = rand::rng();
    let factor = rng.random_range(1.0 - RECONNECT_JITTER_RATIO..=1.0 + RECONNECT_JITTER_RATIO);
    Duration::from_millis((base_ms * factor).round() as u64)
}
