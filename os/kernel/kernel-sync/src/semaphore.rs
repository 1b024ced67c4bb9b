use crate::interrupt::assert_can_sleep;
use crate::{SpinMutex, WaitChannel};
use core::fmt;

/// A counting semaphore.
///
/// [`acquire`](Self::acquire) (P) blocks while the count is zero and then
/// decrements it; [`release`](Self::release) (V) increments the count and wakes
/// at most one waiter. Waiters are not served in FIFO order: a thread calling
/// `acquire` may take the count before a thread that has been waiting longer.
pub struct Semaphore {
    name: String,
    count: SpinMutex<u32>,
    wchan: WaitChannel,
}

impl Semaphore {
    pub fn new(name: impl Into<String>, initial: u32) -> Self {
        let name = name.into();
        Self {
            wchan: WaitChannel::new(format!("{name}.wchan")),
            count: SpinMutex::new(initial),
            name,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// P: waits until the count is positive, then decrements it.
    ///
    /// # Panics
    /// Panics when called from interrupt context.
    pub fn acquire(&self) {
        assert_can_sleep(&self.name);

        let mut count = self.count.lock();
        while *count == 0 {
            let ticket = self.wchan.prepare_sleep();
            drop(count);
            ticket.sleep();
            count = self.count.lock();
        }
        *count -= 1;
    }

    /// Decrements the count if it is positive, without blocking.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// V: increments the count and wakes one waiter.
    ///
    /// # Panics
    /// Panics if the count would overflow.
    pub fn release(&self) {
        let mut count = self.count.lock();
        *count = count
            .checked_add(1)
            .unwrap_or_else(|| panic!("semaphore {:?} count overflow", self.name));
        self.wchan.wake_one();
    }

    /// Current count; only a snapshot.
    #[must_use]
    pub fn count(&self) -> u32 {
        *self.count.lock()
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("name", &self.name)
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}
