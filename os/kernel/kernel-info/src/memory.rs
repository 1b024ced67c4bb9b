//! # Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  unmapped (null page guard)     │
//!             ├─────────────────────────────────┤
//!             │  user regions (text, data, ...) │
//!             │                                 │
//!             ├─────────────────────────────────┤ USERSTACK - USER_STACK_SIZE
//!             │  user stack (grows down)        │
//! USERSTACK   ├─────────────────────────────────┤ 0x8000_0000 = USERSPACE_TOP
//!             │  KSEG0: direct-mapped RAM       │ kvaddr = paddr + KSEG0_BASE
//!             ├─────────────────────────────────┤ 0xa000_0000
//!             │  not used by this kernel        │
//! 0xffff_ffff └─────────────────────────────────┘
//! ```

pub use kernel_memory_addresses::PAGE_SIZE;

/// First address that is not user space. Pointers at or above it are rejected
/// at the syscall boundary.
pub const USERSPACE_TOP: u32 = 0x8000_0000;

/// Base of the direct-mapped kernel segment.
pub const KSEG0_BASE: u32 = 0x8000_0000;

/// Size of the direct-mapped kernel segment; bounds usable physical RAM.
pub const KSEG0_SIZE: u32 = 0x2000_0000;

/// Top of every user stack; the initial user stack pointer.
pub const USERSTACK: u32 = USERSPACE_TOP;

/// Pages mapped for a fresh user stack.
pub const USER_STACK_PAGES: u32 = 12;

/// Bytes mapped for a fresh user stack.
pub const USER_STACK_SIZE: u32 = USER_STACK_PAGES * PAGE_SIZE;

/// Process table capacity, including the unused slot 0.
pub const MAX_RUNNING_PROCS: u32 = 128;

/// Upper bound on a configurable process table.
pub const PID_MAX: u32 = 32_767;

/// Limit on the total size of exec arguments, pointers included.
pub const ARG_MAX: u32 = 16 * 1024;

/// Longest accepted path, including the terminating NUL.
pub const PATH_MAX: u32 = 1024;

/// Width of a user pointer.
pub const USER_POINTER_SIZE: u32 = 4;

/// Width of one instruction; a syscall returns to `epc + INSTRUCTION_SIZE`.
pub const INSTRUCTION_SIZE: u32 = 4;

/// Stack pointer alignment required on entry to user mode.
pub const STACK_ALIGN: u32 = 8;

/// Default amount of simulated RAM.
pub const DEFAULT_RAM_SIZE: u32 = 4 * 1024 * 1024;

/// Smallest RAM the kernel will boot with.
pub const MIN_RAM_SIZE: u32 = 16 * PAGE_SIZE;

/// Whether `addr` lies in user space.
#[inline]
#[must_use]
pub const fn is_user_address(addr: u32) -> bool {
    addr < USERSPACE_TOP
}

const _: () = {
    assert!(USERSTACK <= USERSPACE_TOP);
    assert!(USER_STACK_SIZE < USERSTACK);
    assert!(KSEG0_BASE >= USERSPACE_TOP);
    assert!(KSEG0_BASE.checked_add(KSEG0_SIZE).is_some());
    assert!(ARG_MAX < USER_STACK_SIZE);
    assert!(DEFAULT_RAM_SIZE.is_multiple_of(PAGE_SIZE));
    assert!(MIN_RAM_SIZE <= DEFAULT_RAM_SIZE);
    assert!(MAX_RUNNING_PROCS <= PID_MAX);
};
