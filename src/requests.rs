//! In-memory registry for pending token requests.
//!
//! A request stays PENDING until an administrator accepts or denies it,
//! or until the sweeper finds its deadline passed. Resolution removes the
//! entry before any notification goes out, so a racing accept, deny, and
//! sweep on the same id produce exactly one winner; the losers see a miss.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// Point-to-point endpoint for delivering the resolution back to whoever
/// submitted the request.
pub type RequesterHandle = mpsc::UnboundedSender<TokenResponse>;

/// Resolution message delivered to the original requester.
///
/// `token` is empty when `success` is false (denial or expiry).
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub comment: String,
    pub id: String,
    pub success: bool,
    pub token: String,
}

/// Broadcast announcement that a new request is awaiting review.
#[derive(Debug, Clone)]
pub struct PendingRequestEvent {
    pub comment: String,
    pub id: String,
}

/// A registry entry. Holds the requester's channel endpoint, so it never
/// leaves the registry except through resolution or expiry.
#[derive(Debug)]
pub struct PendingEntry {
    pub comment: String,
    pub deadline: DateTime<Utc>,
    pub handle: RequesterHandle,
    pub id: String,
}

/// Snapshot view of a pending request, safe for display.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequest {
    pub comment: String,
    pub deadline: DateTime<Utc>,
    pub id: String,
}

#[derive(Debug, Default)]
pub struct PendingRequestRegistry {
    entries: HashMap<String, PendingEntry>,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request under a caller-chosen id.
    ///
    /// A duplicate id replaces the prior entry; the displaced handle is
    /// dropped, which closes the old requester's channel without a reply.
    pub fn submit(
        &mut self,
        handle: RequesterHandle,
        comment: &str,
        id: &str,
        deadline: DateTime<Utc>,
    ) {
        let entry = PendingEntry {
            comment: comment.to_string(),
            deadline,
            handle,
            id: id.to_string(),
        };

        if self.entries.insert(id.to_string(), entry).is_some() {
            tracing::debug!(id = %id, "Replaced pending token request with same id");
        }
    }

    /// Remove and return the entry for `id`, if still pending.
    ///
    /// The second resolution attempt for an id is always a miss.
    pub fn resolve(&mut self, id: &str) -> Option<PendingEntry> {
        self.entries.remove(id)
    }

    /// Remove and return every entry whose deadline has passed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<PendingEntry> {
        let expired_ids: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| entry.id.clone())
            .collect();

        expired_ids
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .collect()
    }

    /// Defensive copy of the current pending set, keyed by id.
    pub fn snapshot(&self) -> HashMap<String, PendingRequest> {
        self.entries
            .values()
            .map(|entry| {
                (
                    entry.id.clone(),
                    PendingRequest {
                        comment: entry.comment.clone(),
                        deadline: entry.deadline,
                        id: entry.id.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn channel() -> (RequesterHandle, mpsc::UnboundedReceiver<TokenResponse>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_resolve_removes_entry() {
        let mut registry = PendingRequestRegistry::new();
        let (tx, _rx) = channel();
        let deadline = Utc::now() + Duration::seconds(60);

        registry.submit(tx, "phone", "r1", deadline);
        assert_eq!(registry.len(), 1);

        let entry = registry.resolve("r1").unwrap();
        assert_eq!(entry.comment, "phone");
        assert!(registry.is_empty());

        // Second resolution on the same id is a guaranteed miss
        assert!(registry.resolve("r1").is_none());
    }

    #[test]
    fn test_resolve_unknown_id() {
        let mut registry = PendingRequestRegistry::new();
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_duplicate_id_replaces() {
        let mut registry = PendingRequestRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, _rx2) = channel();
        let deadline = Utc::now() + Duration::seconds(60);

        registry.submit(tx1, "first", "r1", deadline);
        registry.submit(tx2, "second", "r1", deadline);

        // Only one entry per id, holding the last submission
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("r1").unwrap().comment, "second");

        // The displaced requester observes its channel closing
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let mut registry = PendingRequestRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let now = Utc::now();

        registry.submit(tx1, "stale", "r1", now - Duration::seconds(1));
        registry.submit(tx2, "fresh", "r2", now + Duration::seconds(60));

        let expired = registry.sweep(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "r1");

        assert_eq!(registry.len(), 1);
        assert!(registry.snapshot().contains_key("r2"));

        // A second sweep finds nothing new
        assert!(registry.sweep(now).is_empty());
    }

    #[test]
    fn test_sweep_deadline_boundary() {
        let mut registry = PendingRequestRegistry::new();
        let (tx, _rx) = channel();
        let now = Utc::now();

        registry.submit(tx, "edge", "r1", now);
        assert_eq!(registry.sweep(now).len(), 1);
    }

    #[test]
    fn test_snapshot_contents() {
        let mut registry = PendingRequestRegistry::new();
        let (tx, _rx) = channel();
        let deadline = Utc::now() + Duration::seconds(60);

        registry.submit(tx, "phone", "r1", deadline);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        let request = &snapshot["r1"];
        assert_eq!(request.comment, "phone");
        assert_eq!(request.deadline, deadline);

        // Snapshot is a copy; mutating the registry afterwards does not
        // change what the caller already holds
        registry.resolve("r1");
        assert_eq!(snapshot.len(), 1);
    }
}
