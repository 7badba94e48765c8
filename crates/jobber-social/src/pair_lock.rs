use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-conversation critical sections, keyed by the *unordered* user pair.
///
/// `send` serializes on these so two near-simultaneous sends between the
/// same two users cannot interleave the read-modify-write of the connection
/// rows and leave a stale `last_message` pointer. Different pairs never
/// contend.
#[derive(Clone, Default)]
pub struct PairLocks {
    inner: Arc<StdMutex<HashMap<(Uuid, Uuid), Arc<Mutex<()>>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Acquire the lock for the (a, b) pair, in either argument order.
    pub async fn lock(&self, a: Uuid, b: Uuid) -> OwnedMutexGuard<()> {
        let mutex = {
            // The table only ever grows entries; a poisoned guard still
            // holds a usable map.
            let mut table = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(Self::key(a, b))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn argument_order_maps_to_one_lock() {
        let locks = PairLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let guard = locks.lock(a, b).await;
        // Same pair, swapped order: must contend
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(b, a))
                .await
                .is_err()
        );
        drop(guard);
        // Released: acquirable again
        let _ = locks.lock(b, a).await;
    }

    #[tokio::test]
    async fn poisoned_table_still_hands_out_locks() {
        let locks = PairLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _table = locks.inner.lock().unwrap();
            panic!("poison the table");
        }));

        let _guard = locks.lock(a, b).await;
    }

    #[tokio::test]
    async fn distinct_pairs_do_not_contend() {
        let locks = PairLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let _ab = locks.lock(a, b).await;
        // (a, c) is a different pair and must be acquirable immediately
        let _ac = tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(a, c))
            .await
            .expect("distinct pair blocked");
    }
}
