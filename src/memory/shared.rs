//! Process-wide serialization of mutating memory operations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::core::MemoryCore;

/// Cloneable handle that runs one operation at a time against the logs.
///
/// Read-modify-rewrite cycles on the same log must not interleave; every
/// clone shares one lock, so appends from several threads get distinct ids.
#[derive(Debug, Clone)]
pub struct SharedMemory {
    inner: Arc<Mutex<MemoryCore>>,
}

impl SharedMemory {
    pub fn new(core: MemoryCore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(core)),
        }
    }

    /// Run `op` while holding the memory lock.
    pub fn with<T>(&self, op: impl FnOnce(&MemoryCore) -> T) -> T {
        let guard = self.lock();
        op(&guard)
    }

    /// A panicked operation poisons the lock but cannot leave a half-written
    /// log behind (rewrites are atomic), so later callers keep going.
    fn lock(&self) -> MutexGuard<'_, MemoryCore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<MemoryCore> for SharedMemory {
    fn from(core: MemoryCore) -> Self {
        Self::new(core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::core::test_support::open_temp;
    use crate::memory::ingest::ShadowDraft;
    use std::collections::HashSet;
    use std::fs;
    use std::thread;

    #[test]
    fn concurrent_appends_get_distinct_ids() {
        let (root, core) = open_temp("shared");
        let shared = SharedMemory::new(core);
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    (0..5)
                        .map(|n| {
                            shared
                                .with(|core| {
                                    core.append_shadow(ShadowDraft::new(
                                        "worker",
                                        format!("{worker}-{n}"),
                                    ))
                                })
                                .expect("append")
                                .id
                        })
                        .collect::<Vec<u64>>()
                })
            })
            .collect();
        let ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("worker thread"))
            .collect();
        let unique: HashSet<u64> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 20);
        assert_eq!(unique.len(), 20);
        assert_eq!(shared.with(|core| core.shadow_records()).expect("read").len(), 20);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn panicked_operation_does_not_wedge_the_handle() {
        let (root, core) = open_temp("shared-poison");
        let shared = SharedMemory::new(core);
        shared
            .with(|core| core.append_shadow(ShadowDraft::new("before", "panic")))
            .expect("append");

        let poisoner = shared.clone();
        let outcome = thread::spawn(move || {
            poisoner.with(|_| panic!("operation failed mid-flight"));
        })
        .join();
        assert!(outcome.is_err());
        assert!(shared.inner.is_poisoned());

        let after = shared
            .with(|core| core.append_shadow(ShadowDraft::new("after", "panic")))
            .expect("append after poison");
        assert_eq!(after.id, 2);
        let _ = fs::remove_dir_all(&root);
    }
}
