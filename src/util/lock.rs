//! Poison-tolerant lock access for in-process stores.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(lock: &'a RwLock<T>, owner: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read()
        .unwrap_or_else(|poisoned| recover(poisoned, owner, "rwlock.read"))
}

pub(crate) fn rw_write<'a, T>(lock: &'a RwLock<T>, owner: &'static str) -> RwLockWriteGuard<'a, T> {
    lock.write()
        .unwrap_or_else(|poisoned| recover(poisoned, owner, "rwlock.write"))
}

pub(crate) fn mutex_lock<'a, T>(lock: &'a Mutex<T>, owner: &'static str) -> MutexGuard<'a, T> {
    lock.lock()
        .unwrap_or_else(|poisoned| recover(poisoned, owner, "mutex.lock"))
}

fn recover<G>(poisoned: PoisonError<G>, owner: &'static str, lock_kind: &'static str) -> G {
    warn!(
        target: "tasklane::lock",
        owner,
        lock_kind,
        result = "poisoned_recovered",
        "Recovered from poisoned lock; state may be stale after a panic elsewhere"
    );
    poisoned.into_inner()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use super::*;

    #[test]
    fn poisoned_rwlock_is_still_usable() {
        let lock = Arc::new(RwLock::new(1_u32));
        let poisoner = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write().expect("first writer");
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        *rw_write(&lock, "test") += 1;
        assert_eq!(*rw_read(&lock, "test"), 2);
    }
}
