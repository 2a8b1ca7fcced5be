//! Subscriber connections and fan-out
//!
//! Each subscriber owns a bounded queue drained by its transport task.
//! Broadcasting never waits on a queue: a subscriber whose queue is full or
//! closed counts as failed and is pruned once the whole scatter is done, so
//! one slow or dead viewer cannot hold up the others.
//!
//! ```text
//!   broadcast(push) ──┬──► try_send ──► [queue] ──► transport ──► viewer
//!                     ├──► try_send ──► [queue] ──► transport ──► viewer
//!                     └──► try_send ──✗ (full/closed) ──► pruned
//! ```

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::id::SubscriberId;
use super::message::Push;
use crate::error::{Error, Result};

/// Failure delivering a push to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("subscriber connection closed")]
    Closed,
    #[error("subscriber queue full")]
    Full,
}

/// Sending half of a subscriber connection
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Push>,
}

impl Subscriber {
    /// Create a subscriber and the receiving end its transport drains
    pub fn channel(id: SubscriberId, capacity: usize) -> (Self, mpsc::Receiver<Push>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Queue a push without waiting
    pub fn try_push(&self, push: Push) -> std::result::Result<(), SendError> {
        self.tx.try_send(push).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

/// Result of one broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Subscribers the push was queued to
    pub delivered: usize,
    /// Subscribers removed because delivery failed
    pub pruned: Vec<SubscriberId>,
}

/// Bounded set of live subscribers
#[derive(Debug)]
pub struct SubscriberSet {
    subscribers: HashMap<SubscriberId, Subscriber>,
    limit: usize,
}

impl SubscriberSet {
    /// Create a set holding at most `limit` subscribers (0 = unlimited)
    pub fn new(limit: usize) -> Self {
        Self {
            subscribers: HashMap::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Add a subscriber, refusing it when the set is full
    pub fn insert(&mut self, subscriber: Subscriber) -> Result<()> {
        if self.limit > 0 && self.subscribers.len() >= self.limit {
            return Err(Error::CapacityExceeded { limit: self.limit });
        }
        self.subscribers.insert(subscriber.id, subscriber);
        Ok(())
    }

    pub fn remove(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Queue `push` to every subscriber, then prune the ones that failed
    pub fn broadcast(&mut self, push: &Push) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();

        for (id, subscriber) in &self.subscribers {
            match subscriber.try_push(push.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    tracing::warn!(subscriber = %id, error = %e, "Dropping subscriber");
                    outcome.pruned.push(*id);
                }
            }
        }

        for id in &outcome.pruned {
            self.subscribers.remove(id);
        }

        outcome
    }

    /// Queue `push` to a single subscriber, pruning it on failure
    pub fn send_to(&mut self, id: SubscriberId, push: Push) -> bool {
        let Some(subscriber) = self.subscribers.get(&id) else {
            return false;
        };

        match subscriber.try_push(push) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(subscriber = %id, error = %e, "Dropping subscriber");
                self.subscribers.remove(&id);
                false
            }
        }
    }

    /// Best-effort farewell to every subscriber, then drop them all
    ///
    /// Dropping the sending halves closes each queue, which ends the
    /// transport task once it has drained what was already queued.
    pub fn close_all(&mut self, farewell: Option<Push>) -> usize {
        if let Some(push) = farewell {
            for subscriber in self.subscribers.values() {
                let _ = subscriber.try_push(push.clone());
            }
        }

        let closed = self.subscribers.len();
        self.subscribers.clear();
        closed
    }
}
