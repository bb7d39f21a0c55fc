use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use verbos::identity::UserSession;
use verbos::model::{VerbCategory, VerbEntry, VerbRecord};
use verbos::session::VerbSession;
use verbos::store::memory::MemoryVerbStore;
use verbos::store::VerbStore;

pub fn record(base: &str, translation: &str) -> VerbRecord {
    VerbRecord {
        base_form: base.to_string(),
        translation: translation.to_string(),
        past_simple: "did".to_string(),
        past_participle: "done".to_string(),
        category: VerbCategory::Irregular,
    }
}

pub async fn open_session(store: &Arc<MemoryVerbStore>, username: &str) -> VerbSession {
    let user = UserSession::new(username, "english-2b").unwrap();
    let store: Arc<dyn VerbStore> = store.clone();
    VerbSession::open(store, &user).await.unwrap()
}

/// Waits until the watched collection satisfies `pred`, returning it.
pub async fn wait_for<F>(
    receiver: &mut watch::Receiver<Vec<VerbEntry>>,
    mut pred: F,
) -> Vec<VerbEntry>
where
    F: FnMut(&[VerbEntry]) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let current = receiver.borrow_and_update();
                if pred(&current) {
                    return current.clone();
                }
            }
            receiver.changed().await.expect("collection watch closed");
        }
    })
    .await
    .expect("condition not reached in time")
}
