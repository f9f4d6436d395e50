//! Memoization of word → token ids.
//!
//! Encoding a word is a pure function of the word and the (immutable) tokenizer, so results are
//! kept and reused the next time the same word is seen.  Real text repeats a small set of words
//! a lot, so this saves most of the merge work.
use crate::TokenId;
use lru::LruCache;
use rustc_hash::FxHashMap as HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// How the word cache of a [`crate::Tokenizer`] grows.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CachePolicy {
    /// Keep every word ever encoded, for the lifetime of the tokenizer.
    ///
    /// This is the fastest option and fine for batch jobs and short-lived processes, but memory
    /// use grows with the number of distinct words seen and is never given back.  Long-running
    /// services fed arbitrary text should use [`CachePolicy::Lru`] instead.
    #[default]
    Unbounded,

    /// Keep at most `capacity` words, evicting the least recently used.
    Lru { capacity: NonZeroUsize },

    /// Don't cache anything; every word goes through the merge loop every time.
    Disabled,
}

impl CachePolicy {
    /// Map a user-facing capacity setting to a policy: no setting means unbounded, zero disables
    /// the cache, anything else is an LRU bound.
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            None => CachePolicy::Unbounded,
            Some(capacity) => match NonZeroUsize::new(capacity) {
                Some(capacity) => CachePolicy::Lru { capacity },
                None => CachePolicy::Disabled,
            },
        }
    }
}

enum Store {
    Unbounded(HashMap<String, Arc<[TokenId]>>),
    Lru(LruCache<String, Arc<[TokenId]>>),
    Disabled,
}

/// Word cache shared by all clones of a tokenizer.
///
/// The lock is only held for the map operation itself, never while encoding.  Two threads that
/// miss on the same word at the same time both encode it and both insert; the results are
/// identical so it doesn't matter which write lands last.
pub(crate) struct WordCache {
    policy: CachePolicy,
    store: Mutex<Store>,
}

impl WordCache {
    pub(crate) fn new(policy: CachePolicy) -> Self {
        let store = match policy {
            CachePolicy::Unbounded => Store::Unbounded(HashMap::default()),
            CachePolicy::Lru { capacity } => Store::Lru(LruCache::new(capacity)),
            CachePolicy::Disabled => Store::Disabled,
        };

        Self {
            policy,
            store: Mutex::new(store),
        }
    }

    pub(crate) fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub(crate) fn get(&self, word: &str) -> Option<Arc<[TokenId]>> {
        // A poisoned lock only means another thread panicked mid-insert; treat it as a miss
        let mut store = self.store.lock().ok()?;

        match &mut *store {
            Store::Unbounded(map) => map.get(word).cloned(),
            Store::Lru(lru) => lru.get(word).cloned(),
            Store::Disabled => None,
        }
    }

    pub(crate) fn insert(&self, word: &str, ids: Arc<[TokenId]>) {
        if let Ok(mut store) = self.store.lock() {
            match &mut *store {
                Store::Unbounded(map) => {
                    map.insert(word.to_string(), ids);
                }
                Store::Lru(lru) => {
                    lru.put(word.to_string(), ids);
                }
                Store::Disabled => {}
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.store
            .lock()
            .map(|store| match &*store {
                Store::Unbounded(map) => map.len(),
                Store::Lru(lru) => lru.len(),
                Store::Disabled => 0,
            })
            .unwrap_or(0)
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut store) = self.store.lock() {
            match &mut *store {
                Store::Unbounded(map) => map.clear(),
                Store::Lru(lru) => lru.clear(),
                Store::Disabled => {}
            }
        }
    }
}
