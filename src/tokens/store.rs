//! API token store.
//!
//! # Responsibilities
//! - Mint one bearer token per server instance generation
//! - Retire every earlier token of an instance on respawn or destroy
//! - Answer "is this token current, and whose is it"
//!
//! # Design Decisions
//! - Per-instance `Mutex` slots inside a `DashMap`: unrelated instances
//!   never contend, and issue/revoke/validate on one instance are
//!   serialized so a returned revoke is seen by every later lookup
//! - Only SHA-256 digests of tokens are kept
//! - Slots outlive `revoke_all` so generations stay monotonic when an
//!   instance id is reused

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::clock::now_unix;
use crate::observability::metrics;

type TokenDigest = [u8; 32];

fn digest(token: &str) -> TokenDigest {
    Sha256::digest(token.as_bytes()).into()
}

/// A freshly minted token. The secret is only ever returned here.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub instance_id: String,
    pub generation: u64,
    pub token: String,
}

/// Owner of a currently valid token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenOwner {
    pub instance_id: String,
    pub generation: u64,
}

/// Operator view of one instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    pub instance_id: String,
    pub generation: u64,
    pub active: bool,
    pub created_at: Option<u64>,
}

/// Metadata of an issued token.
#[derive(Debug, Clone)]
struct TokenRecord {
    instance_id: String,
    generation: u64,
    created_at: u64,
    revoked: bool,
}

#[derive(Debug, Default)]
struct InstanceSlot {
    generation: u64,
    current: Option<(TokenDigest, TokenRecord)>,
}

impl InstanceSlot {
    /// Mark the current token revoked and drop it from the index.
    fn retire(&mut self, index: &DashMap<TokenDigest, String>) -> bool {
        match &mut self.current {
            Some((digest, record)) if !record.revoked => {
                record.revoked = true;
                index.remove(digest);
                true
            }
            _ => false,
        }
    }

    fn live(&self) -> Option<&TokenRecord> {
        self.current
            .as_ref()
            .map(|(_, record)| record)
            .filter(|record| !record.revoked)
    }
}

/// Source of truth for valid API tokens.
#[derive(Debug, Default)]
pub struct ApiTokenStore {
    slots: DashMap<String, Arc<Mutex<InstanceSlot>>>,
    /// token digest → instance id
    index: DashMap<TokenDigest, String>,
}

impl ApiTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, instance_id: &str) -> Arc<Mutex<InstanceSlot>> {
        if let Some(slot) = self.slots.get(instance_id) {
            return slot.clone();
        }
        self.slots
            .entry(instance_id.to_string())
            .or_default()
            .clone()
    }

    /// Mint a token for a new generation of `instance_id`, retiring any
    /// earlier token.
    pub fn issue(&self, instance_id: &str) -> IssuedToken {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);
        let token_digest = digest(&token);

        let slot = self.slot(instance_id);
        let mut slot = slot.lock();
        let replaced = slot.retire(&self.index);
        slot.generation += 1;
        let record = TokenRecord {
            instance_id: instance_id.to_string(),
            generation: slot.generation,
            created_at: now_unix(),
            revoked: false,
        };
        self.index.insert(token_digest, instance_id.to_string());
        slot.current = Some((token_digest, record));

        tracing::info!(
            instance_id = %instance_id,
            generation = slot.generation,
            replaced,
            "Issued API token"
        );
        metrics::record_token_event("issued");

        IssuedToken {
            instance_id: instance_id.to_string(),
            generation: slot.generation,
            token,
        }
    }

    /// Revoke every token of `instance_id`. Returns whether a token was live.
    pub fn revoke_all(&self, instance_id: &str) -> bool {
        let Some(slot) = self.slots.get(instance_id).map(|s| s.clone()) else {
            return false;
        };
        let mut slot = slot.lock();
        let revoked = slot.retire(&self.index);
        if revoked {
            tracing::info!(instance_id = %instance_id, generation = slot.generation, "Revoked API token");
            metrics::record_token_event("revoked");
        }
        revoked
    }

    /// Owner of `token` if it is the current token of its instance.
    pub fn resolve(&self, token: &str) -> Option<TokenOwner> {
        let token_digest = digest(token);
        let instance_id = self.index.get(&token_digest).map(|r| r.value().clone())?;
        let slot = self.slots.get(&instance_id).map(|s| s.clone())?;

        // Confirm under the instance lock; the index may be stale by now.
        let slot = slot.lock();
        match &slot.current {
            Some((current, record))
                if *current == token_digest && record.generation == slot.generation && !record.revoked =>
            {
                Some(TokenOwner {
                    instance_id: record.instance_id.clone(),
                    generation: record.generation,
                })
            }
            _ => None,
        }
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.resolve(token).is_some()
    }

    /// Current generation of an instance (0 if never issued).
    pub fn generation(&self, instance_id: &str) -> u64 {
        self.slots
            .get(instance_id)
            .map(|s| s.clone())
            .map(|s| s.lock().generation)
            .unwrap_or(0)
    }

    pub fn instances(&self) -> Vec<InstanceSummary> {
        let slots: Vec<_> = self
            .slots
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        let mut summaries: Vec<_> = slots
            .into_iter()
            .map(|(instance_id, slot)| {
                let slot = slot.lock();
                InstanceSummary {
                    instance_id,
                    generation: slot.generation,
                    active: slot.live().is_some(),
                    created_at: slot.current.as_ref().map(|(_, r)| r.created_at),
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_issue_and_validate() {
        let store = ApiTokenStore::new();
        let t = store.issue("alice");
        assert_eq!(t.generation, 1);
        assert!(store.is_valid(&t.token));
        assert_eq!(
            store.resolve(&t.token),
            Some(TokenOwner { instance_id: "alice".into(), generation: 1 })
        );
        assert!(!store.is_valid("made-up"));
    }

    #[test]
    fn test_respawn_retires_previous_generation() {
        let store = ApiTokenStore::new();
        let t1 = store.issue("alice");
        let other = store.issue("bob");
        let t2 = store.issue("alice");

        assert_eq!(t2.generation, 2);
        assert!(!store.is_valid(&t1.token));
        assert!(store.is_valid(&t2.token));
        assert!(store.is_valid(&other.token), "other instances are untouched");
    }

    #[test]
    fn test_revoke_all_and_reuse_keeps_generation_monotonic() {
        let store = ApiTokenStore::new();
        let t1 = store.issue("alice");
        assert!(store.revoke_all("alice"));
        assert!(!store.is_valid(&t1.token));
        assert!(!store.revoke_all("alice"));
        assert!(!store.revoke_all("never-spawned"));

        let t2 = store.issue("alice");
        assert_eq!(t2.generation, 2);
        assert!(!store.is_valid(&t1.token));
        assert!(store.is_valid(&t2.token));
        assert_eq!(store.generation("alice"), 2);
    }

    #[test]
    fn test_instances_summary() {
        let store = ApiTokenStore::new();
        store.issue("b");
        store.issue("a");
        store.revoke_all("b");
        let s = store.instances();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].instance_id, "a");
        assert!(s[0].active);
        assert!(!s[1].active);
        assert_eq!(s[1].generation, 1);
    }

    #[test]
    fn test_no_stale_accept_after_concurrent_revoke() {
        let store = Arc::new(ApiTokenStore::new());
        let token = store.issue("alice").token;
        let revoked = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let token = token.clone();
                let revoked = revoked.clone();
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        // Read the flag first: if the revoke had returned, the
                        // lookup must fail.
                        let after = revoked.load(Ordering::SeqCst);
                        let valid = store.is_valid(&token);
                        assert!(!(after && valid), "token accepted after revoke returned");
                    }
                })
            })
            .collect();

        store.revoke_all("alice");
        revoked.store(true, Ordering::SeqCst);

        for r in readers {
            r.join().unwrap();
        }
        assert!(!store.is_valid(&token));
    }
}
