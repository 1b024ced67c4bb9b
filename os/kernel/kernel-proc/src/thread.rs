//! Kernel threads.
//!
//! A process runs on one kernel thread. Leaving the process is an unwind
//! back to the thread's trampoline, so it can happen from any call depth
//! without returning through user code.

use crate::{Errno, ExitStatus, Kernel, Pid};
use log::error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Exit code recorded for a process whose thread panicked.
pub const PANIC_EXIT_CODE: i32 = -1;

/// Unwind payload marking a deliberate thread exit.
struct ThreadExit;

/// Ends the calling kernel thread.
pub fn thread_exit() -> ! {
    panic::resume_unwind(Box::new(ThreadExit))
}

/// Starts the thread that runs process `pid`.
///
/// If the body panics, the process is recorded as exited with
/// [`PANIC_EXIT_CODE`] so a waiting parent is not left hanging, and the
/// panic resurfaces from [`Kernel::join_all`].
pub(crate) fn spawn(
    kernel: &Arc<Kernel>,
    pid: Pid,
    name: &str,
    body: impl FnOnce() + Send + 'static,
) -> Result<(), Errno> {
    let owner = Arc::clone(kernel);
    let handle = std::thread::Builder::new()
        .name(format!("{name}[{pid}]"))
        .spawn(move || match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(()) => {}
            Err(payload) if payload.is::<ThreadExit>() => {}
            Err(payload) => {
                error!("process {pid} panicked");
                owner.retire(pid, ExitStatus::new(PANIC_EXIT_CODE), None);
                panic::resume_unwind(payload);
            }
        })
        .map_err(|_| Errno::ENOMEM)?;
    kernel.track(handle);
    Ok(())
}
