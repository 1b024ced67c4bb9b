use crate::Errno;
use core::fmt;
use core::num::NonZeroU32;
use log::trace;
use std::collections::VecDeque;

/// A process identifier. Zero is never a valid PID.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(NonZeroU32);

impl Pid {
    /// Interprets a user-supplied PID; `None` for zero and negative values.
    #[must_use]
    pub fn from_user(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().and_then(NonZeroU32::new).map(Self)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    pub(crate) const fn index(self) -> usize {
        self.0.get() as usize
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of PIDs: recycled PIDs first, in the order they were returned,
/// then never-issued ones from a counter bounded by the table capacity.
#[derive(Debug)]
pub struct PidPool {
    free: VecDeque<Pid>,
    next: u32,
    capacity: u32,
}

impl PidPool {
    /// A pool for a process table of `capacity` slots; slot 0 is unused.
    #[must_use]
    pub const fn new(capacity: u32) -> Self {
        Self {
            free: VecDeque::new(),
            next: 1,
            capacity,
        }
    }

    /// Takes a PID.
    ///
    /// # Errors
    /// [`Errno::ENPROC`] when every PID below the capacity is in use.
    pub fn allocate(&mut self) -> Result<Pid, Errno> {
        if let Some(pid) = self.free.pop_front() {
            trace!("pid {pid} recycled");
            return Ok(pid);
        }
        if self.next >= self.capacity {
            return Err(Errno::ENPROC);
        }
        let pid = NonZeroU32::new(self.next).map(Pid).ok_or(Errno::ENPROC)?;
        self.next += 1;
        Ok(pid)
    }

    /// Returns a reaped process's PID to the back of the queue.
    ///
    /// # Panics
    /// Panics if `pid` was never issued or is already free.
    pub fn release(&mut self, pid: Pid) {
        assert!(pid.get() < self.next, "pid {pid} was never issued");
        assert!(!self.free.contains(&pid), "pid {pid} released twice");
        self.free.push_back(pid);
    }

    /// PIDs currently handed out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        (self.next - 1) as usize - self.free.len()
    }

    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }
}
