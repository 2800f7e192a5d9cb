//! Set-once terminal outcome of a call.

use quadrpc_common::{Outcome, Status};
use tokio::sync::watch;

/// Holds the terminal outcome once it is known and wakes everyone waiting
/// for it.
///
/// The first `set` wins; later ones are ignored.
#[derive(Debug)]
pub struct StatusEnvelope {
    tx: watch::Sender<Option<Outcome>>,
}

impl StatusEnvelope {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publishes `outcome`. Returns false if an outcome was already set.
    pub fn set(&self, outcome: Outcome) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }

    pub fn get(&self) -> Option<Outcome> {
        self.tx.borrow().clone()
    }

    pub fn is_set(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Waits until an outcome is set and returns a copy of it.
    pub async fn wait(&self) -> Outcome {
        let mut rx = self.tx.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        };
        // The sender lives as long as `self`, so the channel cannot close
        // while we wait.
        outcome.unwrap_or_else(|| Err(Status::internal("call ended without an outcome")))
    }
}

impl Default for StatusEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_first_outcome_wins() {
        let envelope = StatusEnvelope::new();
        assert!(!envelope.is_set());
        assert!(envelope.set(Ok(json!(1))));
        assert!(!envelope.set(Err(Status::cancelled("late"))));
        assert_eq!(envelope.get(), Some(Ok(json!(1))));
    }

    #[tokio::test]
    async fn test_wait_observes_later_set() {
        let envelope = Arc::new(StatusEnvelope::new());
        let waiter = {
            let envelope = Arc::clone(&envelope);
            tokio::spawn(async move { envelope.wait().await })
        };

        tokio::task::yield_now().await;
        envelope.set(Err(Status::not_found("no blog")));
        assert_eq!(waiter.await.unwrap(), Err(Status::not_found("no blog")));
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_set() {
        let envelope = StatusEnvelope::new();
        envelope.set(Ok(json!({"sum": 3})));
        assert_eq!(envelope.wait().await, Ok(json!({"sum": 3})));
    }
}
