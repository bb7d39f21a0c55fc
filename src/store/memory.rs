use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream;
use futures_util::StreamExt;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::{DocumentSnapshot, SnapshotStream, StoreError, VerbStore};
use crate::model::VerbRecord;

const CHANNEL_CAPACITY: usize = 64;

/// In-process store. Backs the test suite and single-machine use; documents
/// live in a map and change notifications ride one broadcast channel per key.
#[derive(Default)]
pub struct MemoryVerbStore {
    documents: RwLock<HashMap<String, Vec<VerbRecord>>>,
    channels: RwLock<HashMap<String, broadcast::Sender<DocumentSnapshot>>>,
}

impl MemoryVerbStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current document contents, or None if nothing was ever written at `key`.
    pub fn document(&self, key: &str) -> Option<Vec<VerbRecord>> {
        self.documents.read().get(key).cloned()
    }

    fn sender(&self, key: &str) -> broadcast::Sender<DocumentSnapshot> {
        let mut channels = self.channels.write();
        channels
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    fn notify(&self, key: &str, verbs: Vec<VerbRecord>) {
        // Send errors just mean nobody is subscribed right now.
        let _ = self.sender(key).send(DocumentSnapshot::present(verbs));
    }
}

#[async_trait]
impl VerbStore for MemoryVerbStore {
    async fn subscribe(&self, key: &str) -> Result<SnapshotStream, StoreError> {
        let receiver = self.sender(key).subscribe();

        let initial = match self.document(key) {
            Some(verbs) => DocumentSnapshot::present(verbs),
            None => DocumentSnapshot::missing(),
        };

        let updates = BroadcastStream::new(receiver).filter_map(|item| async move { item.ok() });
        Ok(stream::iter(std::iter::once(initial)).chain(updates).boxed())
    }

    async fn create_if_absent(&self, key: &str, initial: &[VerbRecord]) -> Result<(), StoreError> {
        let created = {
            let mut documents = self.documents.write();
            if documents.contains_key(key) {
                false
            } else {
                documents.insert(key.to_string(), initial.to_vec());
                true
            }
        };

        if created {
            self.notify(key, initial.to_vec());
        }
        Ok(())
    }

    async fn overwrite(&self, key: &str, verbs: &[VerbRecord]) -> Result<(), StoreError> {
        self.documents
            .write()
            .insert(key.to_string(), verbs.to_vec());
        self.notify(key, verbs.to_vec());
        Ok(())
    }
}
