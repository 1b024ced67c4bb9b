//! # Per-Process Address Spaces
//!
//! An [`AddressSpace`] is the user half of a process's memory: a list of
//! non-overlapping [`Region`]s plus a [`PageTable`] mapping user pages to
//! frames obtained from the [`Coremap`](kernel_alloc::Coremap).
//!
//! ```text
//!   0x0000_0000 ┌──────────────────────┐
//!               │ text / data regions  │  define_region + prepare_load
//!               ├──────────────────────┤  ← heap_base = heap_top
//!               │         ...          │
//!               ├──────────────────────┤  ← stack_base
//!               │ user stack (12 pp.)  │  define_stack
//!   0x8000_0000 └──────────────────────┘  ← USERSTACK
//! ```
//!
//! ## Lifecycle
//!
//! 1. [`AddressSpace::create`] returns an empty space.
//! 2. The loader calls [`AddressSpace::define_region`] per segment, then
//!    [`AddressSpace::prepare_load`] to back every region with zeroed,
//!    writable frames, copies the segments in, and finally calls
//!    [`AddressSpace::complete_load`] to write-protect read-only regions.
//! 3. [`AddressSpace::define_stack`] maps the user stack and returns the
//!    initial stack pointer.
//! 4. [`AddressSpace::copy`] clones the space for `fork`; every mapped page
//!    gets its own frame.
//! 5. Dropping the space (or [`AddressSpace::destroy`]) returns each frame to
//!    the coremap exactly once.
//!
//! Pages of a region that were never mapped are filled on first touch by
//! [`AddressSpace::fault`].

mod address_space;
mod entry_lo;
mod fault;
mod page_table;
mod region;
pub mod tlb;
mod user_copy;

pub use address_space::AddressSpace;
pub use entry_lo::EntryLo;
pub use fault::FaultKind;
pub use page_table::PageTable;
pub use region::{Permissions, Region};

use kernel_alloc::FrameError;
use kernel_memory_addresses::VirtualAddress;

/// Errors of address-space operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("region of zero bytes")]
    EmptyRegion,
    /// The region would reach into the kernel half or wrap around.
    #[error("region at {base} of {size} bytes leaves user space")]
    OutOfRange { base: VirtualAddress, size: u32 },
    #[error("region at {base} overlaps an existing region")]
    Overlap { base: VirtualAddress },
    /// No region covers the address, or it is not a user address.
    #[error("bad user address {0}")]
    BadAddress(VirtualAddress),
    #[error("{0} is not mapped")]
    Unmapped(VirtualAddress),
    #[error("write to read-only page at {0}")]
    ReadOnly(VirtualAddress),
    #[error("user string longer than {max} bytes")]
    StringTooLong { max: usize },
    #[error("user string at {0} is not valid UTF-8")]
    NotUtf8(VirtualAddress),
}

impl VmError {
    /// Whether the failure came from running out of frames.
    #[must_use]
    pub const fn is_out_of_memory(self) -> bool {
        matches!(self, Self::Frame(FrameError::OutOfMemory { .. }))
    }
}
