use crate::region::{Permissions, Region};
use crate::{EntryLo, PageTable, VmError, tlb};
use kernel_alloc::{AddressSpaceId, Coremap, kvaddr_to_paddr};
use kernel_info::memory::{USER_STACK_SIZE, USERSPACE_TOP, USERSTACK};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, VirtualAddress, VirtualPage};
use log::{debug, trace};
use std::sync::Arc;

/// The user half of a process's memory.
pub struct AddressSpace {
    id: AddressSpaceId,
    coremap: Arc<Coremap>,
    regions: Vec<Region>,
    page_table: PageTable,
    heap_base: VirtualAddress,
    heap_top: VirtualAddress,
    stack_base: VirtualAddress,
    stack_top: VirtualAddress,
}

impl AddressSpace {
    /// An empty address space drawing frames from `coremap`.
    #[must_use]
    pub fn create(coremap: &Arc<Coremap>) -> Self {
        let id = AddressSpaceId::next();
        trace!("as {}: created", id.get());
        Self {
            id,
            coremap: Arc::clone(coremap),
            regions: Vec::new(),
            page_table: PageTable::default(),
            heap_base: VirtualAddress::zero(),
            heap_top: VirtualAddress::zero(),
            stack_base: VirtualAddress::zero(),
            stack_top: VirtualAddress::zero(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> AddressSpaceId {
        self.id
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[must_use]
    pub const fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub(crate) const fn page_table_mut(&mut self) -> &mut PageTable {
        &mut self.page_table
    }

    pub(crate) const fn coremap(&self) -> &Arc<Coremap> {
        &self.coremap
    }

    /// `(heap_base, heap_top)`. Both sit at the end of the highest region.
    #[must_use]
    pub const fn heap(&self) -> (VirtualAddress, VirtualAddress) {
        (self.heap_base, self.heap_top)
    }

    /// `(stack_base, stack_top)`; both zero until [`Self::define_stack`].
    #[must_use]
    pub const fn stack(&self) -> (VirtualAddress, VirtualAddress) {
        (self.stack_base, self.stack_top)
    }

    /// Defines a region covering `[vaddr, vaddr + size)` widened to whole pages.
    ///
    /// Nothing is mapped yet; see [`Self::prepare_load`].
    ///
    /// # Errors
    /// [`VmError::EmptyRegion`], [`VmError::OutOfRange`] past the end of user
    /// space, or [`VmError::Overlap`] with an existing region.
    pub fn define_region(
        &mut self,
        vaddr: VirtualAddress,
        size: u32,
        perms: Permissions,
    ) -> Result<(), VmError> {
        if size == 0 {
            return Err(VmError::EmptyRegion);
        }
        let out_of_range = VmError::OutOfRange { base: vaddr, size };
        let end = vaddr
            .checked_add(size)
            .and_then(VirtualAddress::page_align_up)
            .filter(|end| end.as_u32() <= USERSPACE_TOP)
            .ok_or(out_of_range)?;

        let base = vaddr.page();
        let npages = (end.as_u32() - base.base().as_u32()) >> kernel_memory_addresses::PAGE_SHIFT;
        self.add_region(Region::new(base, npages, perms))?;

        if end > self.heap_base {
            self.heap_base = end;
            self.heap_top = end;
        }
        debug!(
            "as {}: region {}..{end} {perms:?}",
            self.id.get(),
            base.base()
        );
        Ok(())
    }

    fn add_region(&mut self, region: Region) -> Result<(), VmError> {
        if self.regions.iter().any(|r| r.overlaps(&region)) {
            return Err(VmError::Overlap {
                base: region.base(),
            });
        }
        self.regions.push(region);
        Ok(())
    }

    /// Backs every page of every region with a zeroed frame, writable so the
    /// loader can fill it.
    ///
    /// # Errors
    /// On frame exhaustion; pages mapped by this call are released again.
    pub fn prepare_load(&mut self) -> Result<(), VmError> {
        let pages: Vec<VirtualPage> = self
            .regions
            .iter()
            .flat_map(Region::pages)
            .filter(|page| !self.page_table.contains(*page))
            .collect();
        self.map_pages(&pages)
    }

    /// Ends loading: pages of regions without write permission lose DIRTY.
    pub fn complete_load(&mut self) {
        let readonly: Vec<VirtualPage> = self
            .regions
            .iter()
            .filter(|r| !r.is_writable())
            .flat_map(Region::pages)
            .collect();
        for page in readonly {
            if let Some(entry) = self.page_table.get_mut(page) {
                entry.set_dirty(false);
            }
        }
        trace!("as {}: load complete", self.id.get());
    }

    /// Defines and maps the user stack below [`USERSTACK`] and returns the
    /// initial stack pointer.
    ///
    /// # Errors
    /// [`VmError::Overlap`] if something already occupies the stack range, or
    /// frame exhaustion (with the stack left unmapped).
    pub fn define_stack(&mut self) -> Result<VirtualAddress, VmError> {
        let top = VirtualAddress::new(USERSTACK);
        let base = VirtualAddress::new(USERSTACK - USER_STACK_SIZE);
        let npages = USER_STACK_SIZE >> kernel_memory_addresses::PAGE_SHIFT;
        let region = Region::new(base.page(), npages, Permissions::READ | Permissions::WRITE);
        self.add_region(region)?;

        let pages: Vec<VirtualPage> = region.pages().collect();
        if let Err(e) = self.map_pages(&pages) {
            self.regions.pop();
            return Err(e);
        }

        self.stack_base = base;
        self.stack_top = top;
        debug!("as {}: stack {base}..{top}", self.id.get());
        Ok(top)
    }

    /// Maps each page writable to a fresh zeroed frame, all or nothing.
    fn map_pages(&mut self, pages: &[VirtualPage]) -> Result<(), VmError> {
        for (done, &page) in pages.iter().enumerate() {
            if let Err(e) = self.map_fresh(page, true) {
                for &mapped in &pages[..done] {
                    self.unmap(mapped);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Maps `page` to a newly allocated zeroed frame.
    pub(crate) fn map_fresh(&mut self, page: VirtualPage, writable: bool) -> Result<EntryLo, VmError> {
        let kvaddr = self.coremap.allocate_one(Some(self.id))?;
        let entry = EntryLo::for_frame(frame_of(kvaddr), writable);
        self.page_table.insert(page, entry);
        Ok(entry)
    }

    fn unmap(&mut self, page: VirtualPage) {
        if let Some(entry) = self.page_table.remove(page) {
            self.coremap.free_one(entry.kvaddr());
        }
    }

    /// A deep copy: same regions and markers, every mapped page duplicated
    /// into a frame of its own.
    ///
    /// # Errors
    /// On frame exhaustion; the partial copy is released.
    pub fn copy(&self) -> Result<Self, VmError> {
        let mut new = Self::create(&self.coremap);
        new.regions.clone_from(&self.regions);
        new.heap_base = self.heap_base;
        new.heap_top = self.heap_top;
        new.stack_base = self.stack_base;
        new.stack_top = self.stack_top;

        for (page, entry) in self.page_table.iter() {
            // On error `new` is dropped and gives back what it mapped so far.
            let copied = new.map_fresh(page, entry.dirty())?;
            self.coremap.copy_page(entry.kvaddr(), copied.kvaddr());
        }

        debug!(
            "as {}: copied to as {} ({} pages)",
            self.id.get(),
            new.id.get(),
            new.page_table.len()
        );
        Ok(new)
    }

    /// Makes this the current CPU's address space and flushes its TLB.
    pub fn activate(&self) {
        tlb::activate(self.id);
    }

    /// Tears the space down; same as dropping it.
    pub fn destroy(self) {
        drop(self);
    }

    /// Physical address `addr` translates to, if mapped.
    #[must_use]
    pub fn translate(&self, addr: VirtualAddress) -> Option<PhysicalAddress> {
        let entry = self.page_table.get(addr.page())?;
        Some(entry.frame().base() + addr.page_offset())
    }

    /// The region containing `addr`.
    #[must_use]
    pub fn region_containing(&self, addr: VirtualAddress) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(addr))
    }
}

impl Drop for AddressSpace {
    fn drop(&mut self) {
        let pages = self.page_table.len();
        for (_, entry) in self.page_table.drain() {
            self.coremap.free_one(entry.kvaddr());
        }
        tlb::deactivate(self.id);
        trace!("as {}: destroyed, {pages} frame(s) released", self.id.get());
    }
}

impl core::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("id", &self.id.get())
            .field("regions", &self.regions)
            .field("mapped", &self.page_table.len())
            .field("heap", &(self.heap_base, self.heap_top))
            .field("stack", &(self.stack_base, self.stack_top))
            .finish()
    }
}

fn frame_of(kvaddr: VirtualAddress) -> PhysicalPage {
    kvaddr_to_paddr(kvaddr)
        .map(PhysicalAddress::frame)
        .unwrap_or_else(|| panic!("coremap handed out {kvaddr} outside the direct map"))
}
