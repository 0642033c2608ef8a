use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The set of topics joined in the current session.
///
/// Membership is the only state: subscription ids belong to the `Session`
/// that sends SUBSCRIBE/UNSUBSCRIBE frames. The registry applies no policy;
/// joining twice or leaving an unknown topic is a no-op.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: Mutex<HashSet<String>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // A panic elsewhere cannot leave a HashSet half-updated.
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `topic` as joined.
    pub fn join(&self, topic: &str) {
        self.lock().insert(topic.to_string());
    }

    /// Forget `topic` if it was joined.
    pub fn leave(&self, topic: &str) {
        self.lock().remove(topic);
    }

    pub fn is_joined(&self, topic: &str) -> bool {
        self.lock().contains(topic)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Joined topics, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.lock().iter().cloned().collect();
        topics.sort();
        topics
    }
}
