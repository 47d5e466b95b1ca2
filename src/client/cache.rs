//! Accepted-cookie cache.
//!
//! Avoids asking the Hub again for every asset of one page load. Only
//! accepted cookies are cached, keyed by the exact cookie value. Entries
//! expire after the TTL and are never refreshed by reads.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::protocol::HubUser;

#[derive(Debug, Clone)]
struct CachedUser {
    user: HubUser,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct IdentityCache {
    entries: DashMap<String, CachedUser>,
    ttl: Duration,
    max_entries: usize,
}

impl IdentityCache {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, cookie: &str) -> Option<HubUser> {
        self.get_at(cookie, Instant::now())
    }

    pub fn get_at(&self, cookie: &str, now: Instant) -> Option<HubUser> {
        let entry = self.entries.get(cookie).map(|e| e.value().clone())?;
        if entry.expires_at > now {
            return Some(entry.user);
        }
        self.entries.remove_if(cookie, |_, e| e.expires_at <= now);
        None
    }

    pub fn insert(&self, cookie: &str, user: HubUser) {
        self.insert_at(cookie, user, Instant::now());
    }

    pub fn insert_at(&self, cookie: &str, user: HubUser, now: Instant) {
        if self.ttl.is_zero() {
            return;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(cookie) {
            self.entries.retain(|_, e| e.expires_at > now);
            if self.entries.len() >= self.max_entries {
                self.evict_soonest();
            }
        }
        self.entries.insert(
            cookie.to_string(),
            CachedUser {
                user,
                expires_at: now + self.ttl,
            },
        );
    }

    fn evict_soonest(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|e| e.value().expires_at)
            .map(|e| e.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    pub fn invalidate(&self, cookie: &str) {
        self.entries.remove(cookie);
    }

    pub fn clear(&self) {
        self.entries.clear();
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

    fn user(name: &str) -> HubUser {
        HubUser {
            name: name.to_string(),
            session_id: "s".to_string(),
            server: None,
        }
    }

    #[test]
    fn test_hit_until_ttl_then_gone() {
        let cache = IdentityCache::new(Duration::from_secs(10), 16);
        let t0 = Instant::now();
        cache.insert_at("c1", user("alice"), t0);

        assert_eq!(cache.get_at("c1", t0 + Duration::from_secs(9)), Some(user("alice")));
        // Reads do not extend the lifetime.
        assert_eq!(cache.get_at("c1", t0 + Duration::from_secs(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keyed_by_exact_cookie() {
        let cache = IdentityCache::new(Duration::from_secs(10), 16);
        cache.insert("c1", user("alice"));
        assert!(cache.get("c1").is_some());
        assert!(cache.get("c1 ").is_none());
        assert!(cache.get("c2").is_none());
    }

    #[test]
    fn test_zero_ttl_disables() {
        let cache = IdentityCache::new(Duration::ZERO, 16);
        cache.insert("c1", user("alice"));
        assert!(cache.get("c1").is_none());
    }

    #[test]
    fn test_bounded_size() {
        let cache = IdentityCache::new(Duration::from_secs(10), 2);
        let t0 = Instant::now();
        cache.insert_at("c1", user("a"), t0);
        cache.insert_at("c2", user("b"), t0 + Duration::from_secs(1));
        cache.insert_at("c3", user("c"), t0 + Duration::from_secs(2));

        assert_eq!(cache.len(), 2);
        let now = t0 + Duration::from_secs(3);
        assert!(cache.get_at("c1", now).is_none(), "oldest entry evicted");
        assert!(cache.get_at("c2", now).is_some());
        assert!(cache.get_at("c3", now).is_some());
    }

    #[test]
    fn test_full_cache_prefers_purging_expired() {
        let cache = IdentityCache::new(Duration::from_secs(10), 2);
        let t0 = Instant::now();
        cache.insert_at("old", user("a"), t0);
        cache.insert_at("fresh", user("b"), t0 + Duration::from_secs(8));
        cache.insert_at("new", user("c"), t0 + Duration::from_secs(11));

        let now = t0 + Duration::from_secs(12);
        assert!(cache.get_at("fresh", now).is_some());
        assert!(cache.get_at("new", now).is_some());
        assert_eq!(cache.len(), 2);
    }
}
