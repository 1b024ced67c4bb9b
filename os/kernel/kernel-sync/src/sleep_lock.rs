use crate::interrupt::assert_can_sleep;
use crate::{Mutex, MutexGuard, RawLock, RawUnlock, SpinMutex, SyncError, WaitChannel};
use core::fmt;
use std::thread::{self, ThreadId};

/// A blocking lock with an owner.
///
/// Unlike a spin lock the owner is recorded, so only the acquiring thread may
/// release it and [`do_i_hold`](Self::do_i_hold) answers reliably. Contended
/// acquirers sleep on the lock's wait channel.
pub struct SleepLock {
    name: String,
    owner: SpinMutex<Option<ThreadId>>,
    wchan: WaitChannel,
}

/// Data protected by a [`SleepLock`].
pub type Lock<T> = Mutex<T, SleepLock>;

/// Guard of a [`Lock`].
pub type LockGuard<'a, T> = MutexGuard<'a, T, SleepLock>;

impl SleepLock {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            wchan: WaitChannel::new(format!("{name}.wchan")),
            owner: SpinMutex::new(None),
            name,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until the lock is free, then takes it.
    ///
    /// # Panics
    /// Panics when called from interrupt context.
    pub fn acquire(&self) {
        assert_can_sleep(&self.name);
        let me = thread::current().id();

        let mut owner = self.owner.lock();
        while owner.is_some_and(|holder| holder != me) {
            let ticket = self.wchan.prepare_sleep();
            drop(owner);
            ticket.sleep();
            owner = self.owner.lock();
        }
        *owner = Some(me);
    }

    pub fn try_acquire(&self) -> bool {
        let mut owner = self.owner.lock();
        if owner.is_some() {
            return false;
        }
        *owner = Some(thread::current().id());
        true
    }

    /// Releases the lock.
    ///
    /// # Errors
    /// [`SyncError::NotOwner`] if the caller does not hold the lock; the lock
    /// is left untouched.
    pub fn release(&self) -> Result<(), SyncError> {
        let mut owner = self.owner.lock();
        if *owner != Some(thread::current().id()) {
            return Err(SyncError::NotOwner {
                name: self.name.clone(),
            });
        }
        *owner = None;
        self.wchan.wake_one();
        Ok(())
    }

    /// Whether the calling thread owns the lock.
    #[must_use]
    pub fn do_i_hold(&self) -> bool {
        *self.owner.lock() == Some(thread::current().id())
    }
}

impl fmt::Debug for SleepLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SleepLock")
            .field("name", &self.name)
            .field("owner", &*self.owner.lock())
            .finish_non_exhaustive()
    }
}

impl RawLock for SleepLock {
    fn raw_lock(&self) {
        // A second guard on the same data from one thread would alias it.
        assert!(
            !self.do_i_hold(),
            "lock {:?} acquired recursively",
            self.name
        );
        self.acquire();
    }

    fn raw_try_lock(&self) -> bool {
        self.try_acquire()
    }
}

impl RawUnlock for SleepLock {
    unsafe fn raw_unlock(&self) {
        let released = self.release();
        debug_assert!(released.is_ok(), "{released:?}");
    }
}

impl<T> Lock<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self::from_raw(SleepLock::new(name), value)
    }

    /// Whether the calling thread holds this lock.
    #[must_use]
    pub fn is_held_by_current(&self) -> bool {
        self.raw().do_i_hold()
    }
}
