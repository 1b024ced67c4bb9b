use crate::interrupt::assert_can_sleep;
use crate::{SpinMutex, WaitChannel};
use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};

/// A writer-preferring reader-writer lock.
///
/// Any number of readers may hold the lock while no writer does. Once a
/// writer is waiting, new readers queue behind it, so a steady stream of
/// readers cannot starve writers. Releasing the last read lock wakes one
/// writer; releasing a write lock wakes one writer and every reader, and the
/// readers go back to sleep if a writer is still queued.
///
/// A thread that already holds a read lock must not take another one while a
/// writer may be waiting: the second read queues behind the writer, which
/// waits for the first read to be released.
pub struct RwLock<T> {
    name: String,
    state: SpinMutex<RwState>,
    readers: WaitChannel,
    writers: WaitChannel,
    cell: UnsafeCell<T>,
}

#[derive(Debug, Default)]
struct RwState {
    readers: usize,
    writer: Option<ThreadId>,
    waiting_writers: usize,
}

unsafe impl<T: Send + Sync> Sync for RwLock<T> {}
unsafe impl<T: Send> Send for RwLock<T> {}

impl RwState {
    const fn admits_reader(&self) -> bool {
        self.writer.is_none() && self.waiting_writers == 0
    }

    const fn admits_writer(&self) -> bool {
        self.writer.is_none() && self.readers == 0
    }
}

impl<T> RwLock<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        let name = name.into();
        Self {
            readers: WaitChannel::new(format!("{name}.readers")),
            writers: WaitChannel::new(format!("{name}.writers")),
            state: SpinMutex::new(RwState::default()),
            cell: UnsafeCell::new(value),
            name,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Takes a shared lock, blocking while a writer holds or waits for it.
    ///
    /// # Panics
    /// Panics when called from interrupt context.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        assert_can_sleep(&self.name);
        let mut state = self.state.lock();
        while !state.admits_reader() {
            let ticket = self.readers.prepare_sleep();
            drop(state);
            ticket.sleep();
            state = self.state.lock();
        }
        state.readers += 1;
        RwLockReadGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        let mut state = self.state.lock();
        if !state.admits_reader() {
            return None;
        }
        state.readers += 1;
        Some(RwLockReadGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Takes the exclusive lock, blocking while readers or another writer hold it.
    ///
    /// # Panics
    /// Panics when called from interrupt context or when the caller already
    /// holds the write lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        assert_can_sleep(&self.name);
        let me = thread::current().id();
        let mut state = self.state.lock();
        assert_ne!(state.writer, Some(me), "rwlock {:?} write-locked twice", self.name);

        state.waiting_writers += 1;
        while !state.admits_writer() {
            let ticket = self.writers.prepare_sleep();
            drop(state);
            ticket.sleep();
            state = self.state.lock();
        }
        state.waiting_writers -= 1;
        state.writer = Some(me);
        RwLockWriteGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        let mut state = self.state.lock();
        if !state.admits_writer() {
            return None;
        }
        state.writer = Some(thread::current().id());
        Some(RwLockWriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Number of readers currently holding the lock.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers
    }

    /// Number of writers queued for the lock.
    #[must_use]
    pub fn waiting_writers(&self) -> usize {
        self.state.lock().waiting_writers
    }

    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    fn release_read(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.readers > 0);
        state.readers -= 1;
        if state.readers == 0 {
            self.writers.wake_one();
        }
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.writer, Some(thread::current().id()));
        state.writer = None;
        self.writers.wake_one();
        self.readers.wake_all();
    }

    pub const fn get_mut(&mut self) -> &mut T {
        self.cell.get_mut()
    }
}

pub struct RwLockReadGuard<'a, T> {
    lock: &'a RwLock<T>,
    _not_send: PhantomData<*const ()>,
}

pub struct RwLockWriteGuard<'a, T> {
    lock: &'a RwLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.cell.get() }
    }
}

impl<T> Drop for RwLockReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.cell.get() }
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.cell.get() }
    }
}

impl<T> Drop for RwLockWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}
