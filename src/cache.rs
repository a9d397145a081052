//! In-process key-value cache with per-entry TTL.
//!
//! Holds the per-app media access tokens, the component access tokens and
//! the latest verify tickets. Entries are stored with an absolute deadline;
//! expired entries are treated as absent and dropped lazily on access.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Shared TTL cache. Cloning is cheap and clones observe the same entries.
#[derive(Clone, Default)]
pub struct TokenCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("token cache poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: &str, ttl: Duration) {
        let mut entries = self.entries.lock().expect("token cache poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Get-or-create-with-expiry: returns the cached value while it is
    /// valid, otherwise stores and returns `make()` with the given TTL.
    pub fn get_or_insert_with(
        &self,
        key: &str,
        ttl: Duration,
        make: impl FnOnce() -> String,
    ) -> String {
        let mut entries = self.entries.lock().expect("token cache poisoned");
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > Instant::now() {
                return entry.value.clone();
            }
        }
        let value = make();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        value
    }

}

/// URL-safe random token (24 bytes of entropy, base64url).
pub fn random_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}
