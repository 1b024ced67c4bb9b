use crate::{Errno, Pid, UserContext, thread};
use kernel_syscall::TrapFrame;
use kernel_vmem::AddressSpace;
use log::debug;
use std::sync::Arc;

impl UserContext {
    /// Creates a child running a copy of this process.
    ///
    /// The child resumes from `tf`, the frame of the `fork` call, with 0 in
    /// `v0` and the program counter past the call; the parent gets the
    /// child's PID. On failure nothing of the child remains.
    ///
    /// # Errors
    /// [`Errno::ENOMEM`] if the address space cannot be copied or the thread
    /// cannot be created, [`Errno::ENPROC`] if no PID is free.
    pub fn fork(&mut self, tf: &TrapFrame) -> Result<Pid, Errno> {
        let aspace = self.aspace().map(AddressSpace::copy).transpose()?;

        let kernel = Arc::clone(self.kernel());
        let name = kernel.name_of(self.getpid());
        let child = kernel.register(&name, Some(self.getpid()))?;

        let child_kernel = Arc::clone(&kernel);
        let child_tf = *tf;
        let started = thread::spawn(&kernel, child, &name, move || {
            child_entry(child_kernel, child, aspace, child_tf)
        });
        if let Err(e) = started {
            kernel.discard(child);
            return Err(e);
        }

        debug!("process {}: forked {child}", self.getpid());
        Ok(child)
    }
}

/// First code a forked child runs.
fn child_entry(kernel: Arc<crate::Kernel>, pid: Pid, aspace: Option<AddressSpace>, mut tf: TrapFrame) -> ! {
    tf.set_success(0);
    tf.advance_pc();

    let mut ctx = UserContext::new(kernel, pid, aspace);
    if let Some(aspace) = ctx.aspace() {
        aspace.activate();
    }
    ctx.run_user(tf)
}
