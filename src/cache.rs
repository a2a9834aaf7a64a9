use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time-windowed set of already-notified links.
///
/// Each entry carries its own expiry deadline; an expired entry behaves
/// exactly like one that was never inserted. Expired entries are dropped
/// lazily on lookup and purged opportunistically on insert, so the map does
/// not grow without bound across quiet periods.
pub struct DedupCache {
    default_ttl: Duration,
    entries: Mutex<HashMap<String, Instant>>,
}

impl DedupCache {
    pub fn new(default_ttl: Duration) -> Self {
        DedupCache {
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if `key` is present and not expired.
    pub fn get(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(deadline) if Instant::now() < *deadline => true,
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        }
    }

    /// Inserts `key`, (re)arming its expiry to now + the default TTL.
    pub fn set(&self, key: impl Into<String>) {
        self.set_with_ttl(key, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, deadline| now < *deadline);
        entries.insert(key.into(), now + ttl);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
