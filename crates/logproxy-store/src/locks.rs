//! Per-token write serialization.
//!
//! Every mutation for a token happens while holding that token's guard.
//! Different tokens never contend except for the brief registry lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use logproxy_types::ServerToken;
use tokio::sync::OwnedMutexGuard;

/// Held while mutating one token's state. Released on drop.
pub type TokenGuard = OwnedMutexGuard<()>;

/// Registry of one async mutex per token.
#[derive(Debug, Default)]
pub struct TokenLocks {
    locks: Mutex<HashMap<ServerToken, Arc<tokio::sync::Mutex<()>>>>,
}

impl TokenLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `token`.
    ///
    /// The guard is owned, so it can move into a spawned task and is
    /// released however that task ends.
    pub async fn acquire(&self, token: &ServerToken) -> TokenGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(token.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
