use bitfield_struct::bitfield;
use kernel_alloc::paddr_to_kvaddr;
use kernel_memory_addresses::{PhysicalPage, VirtualAddress};

/// A page-table entry in the layout of the MIPS TLB `EntryLo` register.
///
/// ### Bit layout
///
/// | Bits  | Name      | Meaning |
/// |-------|-----------|---------|
/// | 0–7   | –         | Unused |
/// | 8     | `GLOBAL`  | Match in every address space |
/// | 9     | `VALID`   | Translation is usable |
/// | 10    | `DIRTY`   | Writes allowed (write-enable, not "modified") |
/// | 11    | `NOCACHE` | Bypass the cache |
/// | 12–31 | `PFN`     | Physical frame number |
///
/// ```rust
/// # use kernel_vmem::EntryLo;
/// # use kernel_memory_addresses::PhysicalPage;
/// let e = EntryLo::for_frame(PhysicalPage::from_number(0x42), true);
/// assert_eq!(e.into_bits(), 0x0004_2600);
/// ```
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct EntryLo {
    #[bits(8)]
    __: u8,

    /// Global (bit 8). Never set for user mappings.
    pub global: bool,

    /// Valid (bit 9).
    pub valid: bool,

    /// Dirty (bit 10): the page may be written through this entry.
    pub dirty: bool,

    /// No-cache (bit 11).
    pub nocache: bool,

    /// Physical frame number (bits 12–31).
    #[bits(20)]
    pub pfn: u32,
}

impl EntryLo {
    /// A valid user mapping of `frame`.
    #[must_use]
    pub const fn for_frame(frame: PhysicalPage, writable: bool) -> Self {
        Self::new()
            .with_pfn(frame.number())
            .with_valid(true)
            .with_dirty(writable)
    }

    #[must_use]
    pub const fn frame(self) -> PhysicalPage {
        PhysicalPage::from_number(self.pfn())
    }

    /// Kernel address of the mapped frame.
    #[must_use]
    pub const fn kvaddr(self) -> VirtualAddress {
        paddr_to_kvaddr(self.frame().base())
    }
}
