//! # System Call ABI
//!
//! The register-level contract between user programs and the kernel:
//!
//! * the call number travels in `v0`, arguments in `a0..a3`;
//! * on return `v0` holds the result (or the error number) and `a3` is the
//!   error flag, 0 on success and 1 on failure;
//! * the saved program counter is advanced past the `syscall` instruction,
//!   so the call is not restarted.
//!
//! ```rust
//! # use kernel_syscall::{Sysno, TrapFrame};
//! let mut tf = TrapFrame::syscall(Sysno::Getpid, [0; 4]);
//! tf.epc = 0x0040_0010;
//! tf.set_success(7);
//! tf.advance_pc();
//! assert_eq!((tf.v0, tf.a3, tf.epc), (7, 0, 0x0040_0014));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod syscall;
mod trapframe;

pub use syscall::{Sysno, UnknownSyscall};
pub use trapframe::TrapFrame;

/// `waitpid` option: return immediately if the child has not exited.
pub const WNOHANG: u32 = 1;

/// `waitpid` option: report stopped children. Accepted; there is no job control.
pub const WUNTRACED: u32 = 2;

/// Whether `options` contains only known `waitpid` flags.
#[must_use]
pub const fn valid_wait_options(options: u32) -> bool {
    options & !(WNOHANG | WUNTRACED) == 0
}
