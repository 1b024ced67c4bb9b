use crate::phys_memory::{PhysicalMemory, kvaddr_to_paddr, paddr_to_kvaddr};
use crate::FrameError;
use core::num::NonZeroU64;
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage, VirtualAddress, pages_spanning};
use kernel_sync::SpinMutex;
use log::{info, trace, warn};

/// Allocation state of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Free,
    /// Allocated to the kernel or to an address space.
    Dirty,
    /// Reserved at bootstrap; never allocated or freed.
    Fixed,
}

/// Identity of an address space, recorded on the frames it maps.
///
/// Only a back-reference for bookkeeping: frames never own or tear down an
/// address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressSpaceId(NonZeroU64);

impl AddressSpaceId {
    /// Returns an id not handed out before.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

/// Descriptor of one physical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoremapEntry {
    pub state: FrameState,
    /// Kernel virtual address of the frame.
    pub kvaddr: VirtualAddress,
    /// Frames in the allocation on its first frame; 0 on the rest of a run.
    /// Always 1 on free frames.
    pub run_len: u32,
    /// Allocation clock value when the frame was handed out.
    pub timestamp: u64,
    pub owner: Option<AddressSpaceId>,
}

impl CoremapEntry {
    const fn free(kvaddr: VirtualAddress) -> Self {
        Self {
            state: FrameState::Free,
            kvaddr,
            run_len: 1,
            timestamp: 0,
            owner: None,
        }
    }
}

/// Frame counts by state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoremapStats {
    pub total: u32,
    pub free: u32,
    pub used: u32,
    pub fixed: u32,
}

struct CoremapState {
    entries: Vec<CoremapEntry>,
    clock: u64,
}

/// The page-frame allocator.
pub struct Coremap {
    state: SpinMutex<CoremapState>,
    memory: PhysicalMemory,
}

impl Coremap {
    /// Builds the coremap for `ram_size` bytes of RAM.
    ///
    /// The frames a resident coremap would occupy are marked FIXED.
    ///
    /// # Errors
    /// [`FrameError::RamTooSmall`] if nothing would be left to allocate.
    pub fn bootstrap(ram_size: u32) -> Result<Self, FrameError> {
        let frames = ram_size / PAGE_SIZE;
        let table_bytes = u32::try_from(size_of::<CoremapEntry>())
            .ok()
            .and_then(|size| size.checked_mul(frames))
            .unwrap_or(u32::MAX);
        let reserved = pages_spanning(table_bytes);
        if reserved >= frames {
            return Err(FrameError::RamTooSmall { frames, reserved });
        }

        let entries = (0..frames)
            .map(|pfn| {
                let mut entry = CoremapEntry::free(frame_kvaddr(pfn));
                if pfn < reserved {
                    entry.state = FrameState::Fixed;
                }
                entry
            })
            .collect();

        info!("coremap: {frames} frames, {reserved} fixed for the coremap itself");
        Ok(Self {
            state: SpinMutex::new(CoremapState { entries, clock: 0 }),
            memory: PhysicalMemory::new(frames),
        })
    }

    /// Allocates one zeroed frame.
    ///
    /// # Errors
    /// [`FrameError::OutOfMemory`] if every frame is in use.
    pub fn allocate_one(&self, owner: Option<AddressSpaceId>) -> Result<VirtualAddress, FrameError> {
        self.allocate(1, owner)
    }

    /// Allocates `npages` physically contiguous, zeroed kernel frames and
    /// returns the address of the first.
    ///
    /// # Errors
    /// [`FrameError::OutOfMemory`] if no free run is long enough, or
    /// [`FrameError::ZeroPages`] for an empty request.
    pub fn allocate_run(&self, npages: u32) -> Result<VirtualAddress, FrameError> {
        self.allocate(npages, None)
    }

    fn allocate(&self, npages: u32, owner: Option<AddressSpaceId>) -> Result<VirtualAddress, FrameError> {
        if npages == 0 {
            return Err(FrameError::ZeroPages);
        }

        let first = {
            let mut state = self.state.lock();
            let Some(first) = find_free_run(&state.entries, npages as usize) else {
                drop(state);
                warn!("coremap: no run of {npages} free frame(s)");
                return Err(FrameError::OutOfMemory { requested: npages });
            };

            state.clock += 1;
            let timestamp = state.clock;
            for (i, entry) in state.entries[first..first + npages as usize].iter_mut().enumerate() {
                entry.state = FrameState::Dirty;
                entry.run_len = if i == 0 { npages } else { 0 };
                entry.timestamp = timestamp;
                entry.owner = owner;
            }
            first
        };

        // The run is committed; nobody else can touch these frames.
        for pfn in first..first + npages as usize {
            self.memory.zero(frame_number(pfn));
        }

        let kvaddr = frame_kvaddr(frame_number(first).number());
        trace!("coremap: allocated {npages} frame(s) at {kvaddr}");
        Ok(kvaddr)
    }

    /// Frees a single-frame allocation.
    ///
    /// # Panics
    /// Panics if `kvaddr` is not the start of a one-frame allocation.
    pub fn free_one(&self, kvaddr: VirtualAddress) {
        let freed = self.free(kvaddr, Some(1));
        debug_assert_eq!(freed, 1);
    }

    /// Frees the whole allocation starting at `kvaddr` and returns its length.
    ///
    /// # Panics
    /// Panics if `kvaddr` is not the first frame of a live allocation: a
    /// double free, a FIXED frame, or a frame inside a run.
    pub fn free_run(&self, kvaddr: VirtualAddress) -> u32 {
        self.free(kvaddr, None)
    }

    fn free(&self, kvaddr: VirtualAddress, expect_len: Option<u32>) -> u32 {
        let index = self.index_of(kvaddr);
        let mut state = self.state.lock();
        let head = state.entries[index];
        match head.state {
            FrameState::Free => panic!("coremap: double free of {kvaddr}"),
            FrameState::Fixed => panic!("coremap: freeing fixed frame {kvaddr}"),
            FrameState::Dirty if head.run_len == 0 => {
                panic!("coremap: {kvaddr} is inside a multi-frame run")
            }
            FrameState::Dirty => {}
        }
        if let Some(len) = expect_len {
            assert_eq!(head.run_len, len, "coremap: {kvaddr} is a run of {} frames", head.run_len);
        }

        let run = head.run_len as usize;
        for entry in &mut state.entries[index..index + run] {
            assert_eq!(entry.state, FrameState::Dirty, "coremap: corrupt run at {kvaddr}");
            *entry = CoremapEntry::free(entry.kvaddr);
        }
        drop(state);

        trace!("coremap: freed {run} frame(s) at {kvaddr}");
        head.run_len
    }

    fn index_of(&self, kvaddr: VirtualAddress) -> usize {
        let pa = kvaddr_to_paddr(kvaddr)
            .unwrap_or_else(|| panic!("coremap: {kvaddr} is not a direct-mapped address"));
        assert!(pa.is_page_aligned(), "coremap: {kvaddr} is not page aligned");
        assert!(self.memory.contains(pa), "coremap: {kvaddr} is beyond RAM");
        pa.frame().number() as usize
    }

    /// Snapshot of the descriptor for the frame at `kvaddr`.
    #[must_use]
    pub fn entry(&self, kvaddr: VirtualAddress) -> Option<CoremapEntry> {
        let pa = kvaddr_to_paddr(kvaddr)?;
        self.state.lock().entries.get(pa.frame().number() as usize).copied()
    }

    #[must_use]
    pub fn stats(&self) -> CoremapStats {
        let state = self.state.lock();
        let mut stats = CoremapStats::default();
        for entry in &state.entries {
            stats.total += 1;
            match entry.state {
                FrameState::Free => stats.free += 1,
                FrameState::Dirty => stats.used += 1,
                FrameState::Fixed => stats.fixed += 1,
            }
        }
        stats
    }

    /// Number of frames recorded as owned by `owner`.
    #[must_use]
    pub fn frames_owned_by(&self, owner: AddressSpaceId) -> u32 {
        let state = self.state.lock();
        let owned = state.entries.iter().filter(|e| e.owner == Some(owner)).count();
        u32::try_from(owned).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    /// Copies one whole frame to another, both given by kernel address.
    pub fn copy_page(&self, src: VirtualAddress, dst: VirtualAddress) {
        let (src, dst) = (self.index_of(src), self.index_of(dst));
        self.memory.copy(frame_number(src), frame_number(dst));
    }

    pub fn zero_page(&self, kvaddr: VirtualAddress) {
        let index = self.index_of(kvaddr);
        self.memory.zero(frame_number(index));
    }
}

/// First-fit search for `len` consecutive free frames.
fn find_free_run(entries: &[CoremapEntry], len: usize) -> Option<usize> {
    let mut run = 0;
    for (i, entry) in entries.iter().enumerate() {
        if entry.state == FrameState::Free {
            run += 1;
            if run == len {
                return Some(i + 1 - len);
            }
        } else {
            run = 0;
        }
    }
    None
}

#[allow(clippy::cast_possible_truncation)]
const fn frame_number(index: usize) -> PhysicalPage {
    // Frame counts come from a u32 RAM size.
    PhysicalPage::from_number(index as u32)
}

const fn frame_kvaddr(pfn: u32) -> VirtualAddress {
    paddr_to_kvaddr(PhysicalAddress::new(pfn * PAGE_SIZE))
}
