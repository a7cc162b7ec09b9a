use std::collections::HashSet;

use tokio::sync::{Mutex, MutexGuard};

/// Topics this process has subscribed to, used in tracked mode.
///
/// Callers hold the guard from `lock` across the broker round-trip so that
/// add and remove for the same topic cannot interleave.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: Mutex<HashSet<String>>,
}

impl SubscriptionRegistry {
    pub async fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.topics.lock().await
    }

    pub async fn contains(&self, topic: &str) -> bool {
        self.topics.lock().await.contains(topic)
    }

    pub async fn len(&self) -> usize {
        self.topics.lock().await.len()
    }
}
