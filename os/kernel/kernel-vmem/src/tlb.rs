//! Per-CPU translation state.
//!
//! Each kernel thread stands in for a CPU. Activating an address space
//! records it as the CPU's current mapping and invalidates every cached
//! translation, which is the full shootdown a single-core design needs.

use core::cell::Cell;
use kernel_alloc::AddressSpaceId;

#[derive(Clone, Copy, Default)]
struct Tlb {
    current: Option<AddressSpaceId>,
    flushes: u64,
}

std::thread_local! {
    static TLB: Cell<Tlb> = const { Cell::new(Tlb { current: None, flushes: 0 }) };
}

/// Makes `id` the current mapping after flushing the TLB.
pub fn activate(id: AddressSpaceId) {
    TLB.with(|tlb| {
        let mut state = tlb.get();
        state.flushes += 1;
        state.current = Some(id);
        tlb.set(state);
    });
}

/// Drops the current mapping if it is `id`.
pub fn deactivate(id: AddressSpaceId) {
    TLB.with(|tlb| {
        let mut state = tlb.get();
        if state.current == Some(id) {
            state.flushes += 1;
            state.current = None;
            tlb.set(state);
        }
    });
}

/// The address space this CPU currently translates through.
#[must_use]
pub fn current() -> Option<AddressSpaceId> {
    TLB.with(|tlb| tlb.get().current)
}

/// Number of full invalidations on this CPU.
#[must_use]
pub fn flush_count() -> u64 {
    TLB.with(|tlb| tlb.get().flushes)
}
