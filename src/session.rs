use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::identity::UserSession;
use crate::model::{self, VerbEntry, VerbRecord};
use crate::store::{StoreError, VerbStore};

/// A logged-in user's live view of their verb list.
///
/// The session owns an in-memory mirror of the remote document, kept current
/// by a subscription task, and pushes every local mutation back as a
/// whole-document overwrite. Local state is updated synchronously before the
/// write is issued, so readers see the change immediately; a failed write is
/// logged and not rolled back.
pub struct VerbSession {
    store: Arc<dyn VerbStore>,
    storage_key: String,
    mirror: Arc<watch::Sender<Vec<VerbEntry>>>,
    subscription: JoinHandle<()>,
}

impl VerbSession {
    /// Logs the user in: makes sure their document exists (created empty on
    /// first login) and starts the live subscription.
    pub async fn open(store: Arc<dyn VerbStore>, user: &UserSession) -> Result<Self, StoreError> {
        let storage_key = user.storage_key();
        store.create_if_absent(&storage_key, &[]).await?;

        let mut snapshots = store.subscribe(&storage_key).await?;
        let mirror = Arc::new(watch::channel(Vec::new()).0);

        let task_mirror = Arc::clone(&mirror);
        let task_key = storage_key.clone();
        let subscription = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.next().await {
                if !snapshot.exists {
                    debug!(key = %task_key, "snapshot for missing document ignored");
                    continue;
                }

                task_mirror.send_modify(|entries| {
                    *entries = reconcile(entries, snapshot.verbs);
                });
            }
            debug!(key = %task_key, "subscription stream ended");
        });

        Ok(Self {
            store,
            storage_key,
            mirror,
            subscription,
        })
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Receiver for the collection mirror; the render source of truth.
    pub fn watch(&self) -> watch::Receiver<Vec<VerbEntry>> {
        self.mirror.subscribe()
    }

    /// One-shot copy of the current collection.
    pub fn snapshot(&self) -> Vec<VerbEntry> {
        self.mirror.borrow().clone()
    }

    /// Appends a new entry, re-sorts, and persists.
    pub async fn insert(&self, entry: VerbEntry) {
        self.mirror.send_modify(|entries| {
            entries.push(entry);
            model::sort_by_translation(entries);
        });
        self.persist().await;
    }

    /// Replaces the fields of the entry with `entry.id`, keeping every other
    /// entry untouched, then re-sorts and persists. A stale id (entry removed
    /// remotely in the meantime) is a no-op.
    pub async fn update(&self, entry: VerbEntry) {
        let id = entry.id.clone();
        let replaced = self.mirror.send_if_modified(|entries| {
            match entries.iter_mut().find(|existing| existing.id == entry.id) {
                Some(existing) => {
                    *existing = entry;
                    model::sort_by_translation(entries);
                    true
                }
                None => false,
            }
        });

        if replaced {
            self.persist().await;
        } else {
            warn!(key = %self.storage_key, id = %id, "update target no longer in collection");
        }
    }

    /// Removes the entry with `id` and persists. No confirmation, no undo.
    pub async fn remove(&self, id: &str) {
        let removed = self.mirror.send_if_modified(|entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            entries.len() != before
        });

        if removed {
            self.persist().await;
        }
    }

    /// Stops the subscription; snapshots delivered after this are dropped.
    /// An overwrite already in flight may still land at the store.
    pub fn close(self) {}

    async fn persist(&self) {
        let records: Vec<VerbRecord> = self.mirror.borrow().iter().map(VerbEntry::record).collect();

        if let Err(err) = self.store.overwrite(&self.storage_key, &records).await {
            warn!(key = %self.storage_key, error = %err, "failed to persist verb list");
        }
    }
}

impl Drop for VerbSession {
    fn drop(&mut self) {
        self.subscription.abort();
    }
}

/// Folds an incoming document into the current collection. Records that
/// match a current entry keep its id, so identifiers stay stable across the
/// echo of our own writes and remote edits that touch other entries; only
/// genuinely new records get fresh ids. The result is always sorted.
fn reconcile(current: &[VerbEntry], incoming: Vec<VerbRecord>) -> Vec<VerbEntry> {
    let mut unclaimed: Vec<&VerbEntry> = current.iter().collect();

    let mut next: Vec<VerbEntry> = incoming
        .into_iter()
        .map(|record| {
            match unclaimed
                .iter()
                .position(|entry| entry.record() == record)
            {
                Some(index) => {
                    let entry = unclaimed.swap_remove(index);
                    VerbEntry::with_id(entry.id.clone(), record)
                }
                None => VerbEntry::new(record),
            }
        })
        .collect();

    model::sort_by_translation(&mut next);
    next
}
