use crate::{RawLock, RawUnlock};
use core::cell::UnsafeCell;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

/// A value protected by a raw lock `R`.
///
/// With [`RawSpin`](crate::RawSpin) this is the non-blocking
/// [`SpinMutex`](crate::SpinMutex); with [`SleepLock`](crate::SleepLock) it
/// is the blocking [`Lock`](crate::Lock).
pub struct Mutex<T, R> {
    raw: R,
    cell: UnsafeCell<T>,
    _no_send_sync: PhantomData<*mut ()>, // !Send/!Sync by default; we implement below
}

unsafe impl<T: Send, R: Sync> Sync for Mutex<T, R> {}
unsafe impl<T: Send, R: Send> Send for Mutex<T, R> {}

impl<T, R> Mutex<T, R> {
    pub const fn from_raw(raw: R, value: T) -> Self {
        Self {
            raw,
            cell: UnsafeCell::new(value),
            _no_send_sync: PhantomData,
        }
    }

    /// The raw lock, for ownership queries.
    #[inline]
    pub const fn raw(&self) -> &R {
        &self.raw
    }

    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.cell.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.cell.into_inner()
    }
}

/// Holds the lock until dropped.
///
/// Guards are `!Send`: a sleeping lock must be released by the thread that
/// acquired it.
pub struct MutexGuard<'a, T, R>
where
    R: RawUnlock,
{
    m: &'a Mutex<T, R>,
    _not_send: PhantomData<*const ()>,
}

unsafe impl<T: Sync, R: RawUnlock + Sync> Sync for MutexGuard<'_, T, R> {}

impl<'a, T, R> MutexGuard<'a, T, R>
where
    R: RawUnlock,
{
    /// The mutex this guard locks; used to reacquire after a condition wait.
    #[inline]
    pub const fn mutex(&self) -> &'a Mutex<T, R> {
        self.m
    }
}

impl<T, R> Deref for MutexGuard<'_, T, R>
where
    R: RawUnlock,
{
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.m.cell.get() }
    }
}

impl<T, R> DerefMut for MutexGuard<'_, T, R>
where
    R: RawUnlock,
{
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.m.cell.get() }
    }
}

impl<T, R> Drop for MutexGuard<'_, T, R>
where
    R: RawUnlock,
{
    fn drop(&mut self) {
        unsafe { self.m.raw.raw_unlock() }
    }
}

impl<T: fmt::Debug, R: RawUnlock> fmt::Debug for MutexGuard<'_, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T, R> Mutex<T, R>
where
    R: RawLock + RawUnlock,
{
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T, R> {
        self.raw.raw_lock();
        MutexGuard {
            m: self,
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T, R>> {
        if self.raw.raw_try_lock() {
            Some(MutexGuard {
                m: self,
                _not_send: PhantomData,
            })
        } else {
            None
        }
    }

    /// Runs `f` with the lock held.
    #[inline]
    pub fn with_lock<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        let mut g = self.lock();
        f(&mut g)
    }
}

impl<T, R: Default> Default for Mutex<T, R>
where
    T: Default,
{
    fn default() -> Self {
        Self::from_raw(R::default(), T::default())
    }
}
