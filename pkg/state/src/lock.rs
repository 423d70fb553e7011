use std::hash::{BuildHasher, RandomState};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Striped write locks keyed by state-store key.
///
/// Keys hashing to the same stripe share a lock, so a holder must never
/// acquire a second key while the first guard is alive.
#[derive(Clone)]
pub(crate) struct KeyLocks {
    stripes: Arc<[Arc<Mutex<()>>]>,
    hasher: RandomState,
}

impl KeyLocks {
    pub(crate) fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1))
                .map(|_| Arc::new(Mutex::new(())))
                .collect(),
            hasher: RandomState::new(),
        }
    }

    pub(crate) async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let index = (self.hasher.hash_one(key) % self.stripes.len() as u64) as usize;
        self.stripes[index].clone().lock_owned().await
    }
}
