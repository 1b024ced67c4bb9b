//! Services the process subsystem consumes but does not implement.

use crate::{Errno, UserContext};
use kernel_memory_addresses::VirtualAddress;
use kernel_syscall::TrapFrame;
use kernel_vmem::AddressSpace;
use std::sync::Arc;

/// An open file. Closing is dropping.
pub trait Vnode: Send {
    /// Reads from the current position; `Ok(0)` at end of file.
    ///
    /// # Errors
    /// Whatever the file system reports.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno>;

    /// # Errors
    /// Whatever the file system reports.
    fn write(&mut self, data: &[u8]) -> Result<usize, Errno>;

    /// Moves to the absolute offset `pos` and returns it.
    ///
    /// # Errors
    /// Whatever the file system reports.
    fn seek(&mut self, pos: u64) -> Result<u64, Errno>;
}

/// Path resolution.
pub trait Vfs: Send + Sync {
    /// Opens `path` for reading.
    ///
    /// # Errors
    /// [`Errno::ENOENT`] and friends.
    fn open(&self, path: &str) -> Result<Box<dyn Vnode>, Errno>;
}

/// Turns an executable file into regions of an address space.
pub trait ExecutableLoader: Send + Sync {
    /// Defines and fills the program's regions in `aspace`, which is fresh
    /// and not yet active, and returns the entry point.
    ///
    /// # Errors
    /// [`Errno::ENOEXEC`] for malformed images, or the address-space and
    /// file errors encountered while loading.
    fn load(&self, file: &mut dyn Vnode, aspace: &mut AddressSpace) -> Result<VirtualAddress, Errno>;
}

/// The transfer to user mode.
pub trait UserMode: Send + Sync {
    /// Runs user code with register state `tf` in the process behind `ctx`
    /// until it traps into a call that ends the process. Returning counts
    /// as `_exit(0)`.
    fn enter_user_mode(&self, ctx: &mut UserContext, tf: TrapFrame);
}

/// The collaborators a [`Kernel`](crate::Kernel) is booted with.
#[derive(Clone)]
pub struct Platform {
    pub vfs: Arc<dyn Vfs>,
    pub loader: Arc<dyn ExecutableLoader>,
    pub user_mode: Arc<dyn UserMode>,
}
