use bitflags::bitflags;
use kernel_memory_addresses::{PAGE_SIZE, VirtualAddress, VirtualPage};

bitflags! {
    /// Access rights of a region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u8 {
        const READ = 0b100;
        const WRITE = 0b010;
        const EXECUTE = 0b001;
    }
}

impl Permissions {
    /// Builds the rights from the loader's separate flags.
    #[must_use]
    pub fn from_flags(readable: bool, writable: bool, executable: bool) -> Self {
        let mut perms = Self::empty();
        perms.set(Self::READ, readable);
        perms.set(Self::WRITE, writable);
        perms.set(Self::EXECUTE, executable);
        perms
    }
}

/// A page-aligned span of virtual memory with uniform permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    base: VirtualPage,
    npages: u32,
    perms: Permissions,
}

impl Region {
    /// `base` must be page aligned and the span must stay below 4 GiB.
    pub(crate) const fn new(base: VirtualPage, npages: u32, perms: Permissions) -> Self {
        Self { base, npages, perms }
    }

    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base.base()
    }

    #[must_use]
    pub const fn npages(&self) -> u32 {
        self.npages
    }

    #[must_use]
    pub const fn permissions(&self) -> Permissions {
        self.perms
    }

    /// One past the last byte, as a 64-bit value so a region may end at 4 GiB.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base.base().as_u32() as u64 + self.npages as u64 * PAGE_SIZE as u64
    }

    #[must_use]
    pub const fn contains(&self, addr: VirtualAddress) -> bool {
        let a = addr.as_u32() as u64;
        a >= self.base.base().as_u32() as u64 && a < self.end()
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        (self.base.base().as_u32() as u64) < other.end()
            && (other.base.base().as_u32() as u64) < self.end()
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.perms.contains(Permissions::WRITE)
    }

    /// The region's pages in ascending order.
    pub fn pages(&self) -> impl Iterator<Item = VirtualPage> + use<> {
        let base = self.base;
        (0..self.npages).filter_map(move |i| base.forward(i))
    }
}
