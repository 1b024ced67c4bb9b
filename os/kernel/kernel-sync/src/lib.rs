//! # Kernel synchronization primitives
//!
//! Two layers live in this crate:
//!
//! * **Spin substrate**: [`RawSpin`] and the generic [`Mutex`] built over any
//!   [`RawLock`] + [`RawUnlock`] implementation. Spin locks never suspend the
//!   caller and protect short, bounded critical sections only.
//! * **Sleeping primitives**: [`Semaphore`], [`SleepLock`] (and the
//!   data-carrying [`Lock`]), [`Condvar`] and [`RwLock`]. Each of them keeps
//!   its state behind a spin lock and blocks on a [`WaitChannel`].
//!
//! Every blocking path follows the same two-phase protocol: while the
//! protecting spin guard is held the caller enqueues itself on the wait
//! channel ([`WaitChannel::prepare_sleep`]), then the guard is dropped, then
//! the caller parks ([`SleepTicket::sleep`]). A waker needs the same guard to
//! change the condition, so it can only run after the sleeper is visible on
//! the queue and a wakeup can never be missed.
//!
//! None of the sleeping primitives hands out wakeups in FIFO order. A thread
//! that arrives while others are queued may win the race for the resource.

#![allow(unsafe_code)]

mod condvar;
pub mod interrupt;
mod mutex;
mod raw_spin;
mod rwlock;
mod semaphore;
mod sleep_lock;
mod wchan;

pub use condvar::Condvar;
pub use interrupt::{InterruptContext, in_interrupt};
pub use mutex::{Mutex, MutexGuard};
pub use raw_spin::RawSpin;
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use semaphore::Semaphore;
pub use sleep_lock::{Lock, LockGuard, SleepLock};
pub use wchan::{SleepTicket, WaitChannel};

pub type SpinMutex<T> = Mutex<T, RawSpin>;

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;
}

pub trait RawUnlock {
    unsafe fn raw_unlock(&self);
}

/// Errors reported by the sleeping primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The calling thread tried to release a lock it does not hold.
    #[error("lock {name:?} released by a thread that does not own it")]
    NotOwner { name: String },
}
