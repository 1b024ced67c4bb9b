//! # Physical Memory and Page-Frame Allocation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Coremap ([`Coremap`])               │
//! │    • one descriptor per physical frame              │
//! │    • single frames and contiguous runs              │
//! │    • FREE / DIRTY / FIXED state, owner back-ref     │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ kernel virtual addresses (KSEG0)
//! ┌─────────────────▼───────────────────────────────────┐
//! │          Physical memory ([`PhysicalMemory`])       │
//! │    • page-sized frames of simulated RAM             │
//! │    • zero / copy / read / write by physical address │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Coremap
//!
//! The coremap is an array of frame descriptors sized to RAM. The frames that
//! would hold the array itself in a real kernel are marked FIXED at bootstrap
//! and never handed out. Every allocation returns the frame's kernel virtual
//! address in the direct-mapped segment (`paddr + KSEG0_BASE`).
//!
//! All coremap operations run under one spin lock and never block inside
//! it: the first-fit scan and the commit of a run happen in one critical
//! section, so two allocators can never claim overlapping frames. Zeroing
//! happens after the commit, when the frames already belong to the caller.
//!
//! Frames are not evicted. When no suitable run exists the allocation fails
//! with [`FrameError::OutOfMemory`] and the caller unwinds.
//!
//! Freeing a frame that is not allocated, a FIXED frame, or a frame in the
//! middle of a run means the caller's bookkeeping is corrupt; those are
//! fatal assertions.

mod coremap;
mod phys_memory;

pub use coremap::{AddressSpaceId, Coremap, CoremapEntry, CoremapStats, FrameState};
pub use phys_memory::{PhysicalMemory, kvaddr_to_paddr, paddr_to_kvaddr};

/// Errors of the frame allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// No free run of the requested length exists.
    #[error("out of physical memory: no run of {requested} free frame(s)")]
    OutOfMemory { requested: u32 },
    /// A zero-length run was requested.
    #[error("requested a run of zero frames")]
    ZeroPages,
    /// RAM cannot hold the coremap plus at least one allocatable frame.
    #[error("{frames} frame(s) of RAM cannot hold a coremap needing {reserved}")]
    RamTooSmall { frames: u32, reserved: u32 },
}
