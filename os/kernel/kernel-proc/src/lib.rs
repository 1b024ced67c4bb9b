//! # Processes
//!
//! The process table, the PID pool and the lifecycle calls built on them.
//!
//! ```text
//!            fork                 _exit                 waitpid
//!   (none) ───────▶ RUNNING ─────────────▶ EXITED ─────────────▶ (reaped)
//!                     │  ▲                (zombie)
//!                     └──┘ execv
//! ```
//!
//! ## Ownership
//!
//! * A running process's [`AddressSpace`](kernel_vmem::AddressSpace) belongs
//!   to the [`UserContext`] of the thread executing it. `_exit` moves it into
//!   the zombie record; the reap destroys it.
//! * A PID stays with its record until the reap. Only then does it go back
//!   to the [`PidPool`], so it cannot be reissued while anyone can still
//!   observe the old process.
//! * The table, the PID pool and the coremap are separate lock domains and
//!   no operation holds two of them. Teardown of reaped records (PID
//!   release, address-space destruction) runs after the table lock is gone.
//!
//! ## Orphans
//!
//! When a process exits, children that already exited are reaped at once
//! and running children are detached. A process without a parent reaps
//! itself when it exits, so nothing is left behind for a waiter that can
//! no longer exist.
//!
//! ## Waiting
//!
//! Only the parent may wait for a process. Waiters block on the child's
//! exit semaphore and pass the wakeup on; the reap happens under the table
//! lock after checking the record is still the one waited for, so exactly
//! one waiter collects the status.

mod context;
mod errno;
mod exec;
mod fork;
mod kernel;
mod pid;
pub mod platform;
mod process;
pub mod syscall;
mod table;
pub mod thread;

pub use context::UserContext;
pub use errno::Errno;
pub use kernel::{BootError, Kernel};
pub use pid::{Pid, PidPool};
pub use platform::{ExecutableLoader, Platform, UserMode, Vfs, Vnode};
pub use process::{ExitStatus, Process, ProcessState};
pub use table::ProcessTable;
