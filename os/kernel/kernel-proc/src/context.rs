use crate::thread::thread_exit;
use crate::{Errno, ExitStatus, Kernel, Pid};
use kernel_syscall::TrapFrame;
use kernel_vmem::AddressSpace;
use log::debug;
use std::sync::Arc;

/// The kernel's view of the process running on the current thread.
///
/// Every process-facing operation goes through here; the context owns the
/// process's address space while it runs.
pub struct UserContext {
    kernel: Arc<Kernel>,
    pid: Pid,
    aspace: Option<AddressSpace>,
}

impl UserContext {
    pub(crate) const fn new(kernel: Arc<Kernel>, pid: Pid, aspace: Option<AddressSpace>) -> Self {
        Self { kernel, pid, aspace }
    }

    #[must_use]
    pub const fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    #[must_use]
    pub const fn getpid(&self) -> Pid {
        self.pid
    }

    /// The parent's PID, or `None` once the parent has exited.
    #[must_use]
    pub fn getppid(&self) -> Option<Pid> {
        self.kernel.getppid(self.pid)
    }

    #[must_use]
    pub const fn aspace(&self) -> Option<&AddressSpace> {
        self.aspace.as_ref()
    }

    pub const fn aspace_mut(&mut self) -> Option<&mut AddressSpace> {
        self.aspace.as_mut()
    }

    pub(crate) fn replace_aspace(&mut self, aspace: AddressSpace) -> Option<AddressSpace> {
        self.aspace.replace(aspace)
    }

    /// The address space, or `EFAULT` for a process that has none.
    pub(crate) fn user_memory(&mut self) -> Result<&mut AddressSpace, Errno> {
        self.aspace.as_mut().ok_or(Errno::EFAULT)
    }

    /// Terminates the process with `code`.
    ///
    /// The address space moves into the zombie record and is destroyed when
    /// the parent reaps it.
    pub fn exit(&mut self, code: i32) -> ! {
        let aspace = self.aspace.take();
        if !self.kernel.retire(self.pid, ExitStatus::new(code), aspace) {
            debug!("process {}: exit after exit ignored", self.pid);
        }
        thread_exit()
    }

    /// Waits for child `pid` to exit, reaps it and returns its status.
    ///
    /// # Errors
    /// [`Errno::ESRCH`] for an unknown PID, [`Errno::ECHILD`] for anything
    /// but a child of this process (itself, its parent, siblings), or if
    /// another waiter reaped it first.
    pub fn waitpid(&mut self, pid: Pid) -> Result<(Pid, ExitStatus), Errno> {
        let status = self.kernel.waitpid(self.pid, pid)?;
        Ok((pid, status))
    }

    /// As [`Self::waitpid`] but returns `Ok(None)` if the child is still running.
    ///
    /// # Errors
    /// As for [`Self::waitpid`].
    pub fn waitpid_nohang(&mut self, pid: Pid) -> Result<Option<(Pid, ExitStatus)>, Errno> {
        let status = self.kernel.waitpid_nohang(self.pid, pid)?;
        Ok(status.map(|s| (pid, s)))
    }

    /// Runs `tf` in user mode; the process exits with 0 if that returns.
    pub(crate) fn run_user(&mut self, tf: TrapFrame) -> ! {
        let user_mode = Arc::clone(&self.kernel.platform().user_mode);
        user_mode.enter_user_mode(self, tf);
        self.exit(0)
    }
}

impl core::fmt::Debug for UserContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserContext")
            .field("pid", &self.pid)
            .field("aspace", &self.aspace)
            .finish_non_exhaustive()
    }
}
