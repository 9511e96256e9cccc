//! Cancellation tokens and a keyed registry of in-flight work
//!
//! Each unit of work (a page rasterization, keyed by document and page) owns
//! one token. Registering a key that already has a live token cancels the
//! old one first, so at most one piece of work per key is ever current.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

/// Cancellation token for cooperative cancellation
///
/// Workers check `is_cancelled()` before publishing a result; the owner calls
/// `cancel()` when the work is no longer wanted. Clones share state.
///
/// # Example
///
/// ```
/// use blueprint_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
///
/// token.cancel();
/// assert!(worker_token.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether both handles refer to the same underlying token
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyed registry of live cancellation tokens
///
/// # Example
///
/// ```
/// use blueprint_scheduler::CancellationRegistry;
///
/// let registry = CancellationRegistry::new();
/// let first = registry.register(7u32);
/// let second = registry.register(7u32);
///
/// // Same key: the older request is superseded
/// assert!(first.is_cancelled());
/// assert!(!second.is_cancelled());
/// assert!(registry.is_current(&7, &second));
/// ```
pub struct CancellationRegistry<K> {
    tokens: Mutex<HashMap<K, CancellationToken>>,
}

impl<K: Eq + Hash + Clone> CancellationRegistry<K> {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CancellationToken>> {
        // Tokens are plain flags; a panic elsewhere cannot leave them inconsistent.
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register new work under `key`, cancelling whatever was registered there
    pub fn register(&self, key: K) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock().insert(key, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Whether `token` is still the live registration for `key`
    pub fn is_current(&self, key: &K, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            return false;
        }
        self.lock()
            .get(key)
            .map(|current| current.same_as(token))
            .unwrap_or(false)
    }

    /// Drop the registration for `key` if it still belongs to `token`
    ///
    /// Called when work finishes. A superseded token leaves the newer
    /// registration in place. Returns `true` if an entry was removed.
    pub fn complete(&self, key: &K, token: &CancellationToken) -> bool {
        let mut tokens = self.lock();
        match tokens.get(key) {
            Some(current) if current.same_as(token) => {
                tokens.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Cancel and remove the registration for `key`
    pub fn cancel(&self, key: &K) -> bool {
        match self.lock().remove(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel and remove every registration whose key matches `predicate`
    ///
    /// Returns the number of registrations cancelled.
    pub fn cancel_where(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let mut tokens = self.lock();
        let mut cancelled = 0;
        tokens.retain(|key, token| {
            if predicate(key) {
                token.cancel();
                cancelled += 1;
                false
            } else {
                true
            }
        });
        cancelled
    }

    /// Cancel and remove everything. Returns the number cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut tokens = self.lock();
        let count = tokens.len();
        for (_, token) in tokens.drain() {
            token.cancel();
        }
        count
    }

    pub fn get(&self, key: &K) -> Option<CancellationToken> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<K> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for CancellationRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_clone() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        assert!(!token2.is_cancelled());
        token1.cancel();
        assert!(token1.is_cancelled());
        assert!(token2.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_identity() {
        let token1 = CancellationToken::new();
        let token2 = CancellationToken::new();

        assert!(token1.same_as(&token1.clone()));
        assert!(!token1.same_as(&token2));
    }

    #[test]
    fn test_registry_supersedes_same_key() {
        let registry = CancellationRegistry::new();

        let stale = registry.register((1u64, 3u32));
        let fresh = registry.register((1u64, 3u32));

        assert!(stale.is_cancelled());
        assert!(!fresh.is_cancelled());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_current(&(1, 3), &stale));
        assert!(registry.is_current(&(1, 3), &fresh));
    }

    #[test]
    fn test_registry_different_keys_coexist() {
        let registry = CancellationRegistry::new();

        let page1 = registry.register((1u64, 1u32));
        let page2 = registry.register((1u64, 2u32));

        assert!(!page1.is_cancelled());
        assert!(!page2.is_cancelled());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_complete_ignores_superseded_token() {
        let registry = CancellationRegistry::new();

        let stale = registry.register("page");
        let fresh = registry.register("page");

        assert!(!registry.complete(&"page", &stale));
        assert!(registry.contains(&"page"));

        assert!(registry.complete(&"page", &fresh));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_cancel() {
        let registry = CancellationRegistry::new();

        let token = registry.register(5u32);
        assert!(registry.cancel(&5));
        assert!(token.is_cancelled());
        assert!(!registry.cancel(&5));
        assert!(!registry.cancel(&999));
    }

    #[test]
    fn test_registry_cancel_where() {
        let registry = CancellationRegistry::new();

        let a1 = registry.register((1u64, 1u32));
        let a2 = registry.register((1u64, 2u32));
        let b1 = registry.register((2u64, 1u32));

        let cancelled = registry.cancel_where(|(doc, _)| *doc == 1);
        assert_eq!(cancelled, 2);

        assert!(a1.is_cancelled());
        assert!(a2.is_cancelled());
        assert!(!b1.is_cancelled());
        assert_eq!(registry.keys(), vec![(2, 1)]);
    }

    #[test]
    fn test_registry_cancel_all() {
        let registry = CancellationRegistry::new();

        let token1 = registry.register(1u32);
        let token2 = registry.register(2u32);

        assert_eq!(registry.cancel_all(), 2);
        assert!(token1.is_cancelled());
        assert!(token2.is_cancelled());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_get() {
        let registry = CancellationRegistry::new();

        let token1 = registry.register(1u32);
        let token2 = registry.get(&1).unwrap();

        token1.cancel();
        assert!(token2.is_cancelled());
        assert!(registry.get(&999).is_none());
    }
}
