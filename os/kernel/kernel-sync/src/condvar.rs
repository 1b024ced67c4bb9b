use crate::interrupt::assert_can_sleep;
use crate::{LockGuard, WaitChannel};

/// A condition variable used together with a [`Lock`](crate::Lock).
///
/// All operations take the caller's lock guard, which proves the lock is held.
/// [`wait`](Self::wait) queues the caller on the condition before the lock is
/// released, so a [`signal`](Self::signal) issued by the next lock holder
/// always finds it.
pub struct Condvar {
    name: String,
    wchan: WaitChannel,
}

impl Condvar {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            wchan: WaitChannel::new(format!("{name}.wchan")),
            name,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Releases the lock, sleeps until signalled and reacquires the lock.
    ///
    /// Wakeups may be spurious with respect to the caller's condition; wait in
    /// a loop or use [`wait_while`](Self::wait_while).
    ///
    /// # Panics
    /// Panics when called from interrupt context.
    pub fn wait<'a, T>(&self, guard: LockGuard<'a, T>) -> LockGuard<'a, T> {
        assert_can_sleep(&self.name);
        let lock = guard.mutex();
        let ticket = self.wchan.prepare_sleep();
        drop(guard);
        ticket.sleep();
        lock.lock()
    }

    /// Waits until `condition` returns `false`.
    pub fn wait_while<'a, T>(
        &self,
        mut guard: LockGuard<'a, T>,
        mut condition: impl FnMut(&mut T) -> bool,
    ) -> LockGuard<'a, T> {
        while condition(&mut guard) {
            guard = self.wait(guard);
        }
        guard
    }

    /// Wakes one waiter.
    pub fn signal<T>(&self, _held: &LockGuard<'_, T>) {
        self.wchan.wake_one();
    }

    /// Wakes every waiter.
    pub fn broadcast<T>(&self, _held: &LockGuard<'_, T>) {
        self.wchan.wake_all();
    }

    /// Number of threads currently waiting.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.wchan.len()
    }
}
