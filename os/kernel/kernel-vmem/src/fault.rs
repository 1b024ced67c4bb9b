use crate::{AddressSpace, VmError};
use kernel_info::memory::is_user_address;
use kernel_memory_addresses::VirtualAddress;
use log::trace;

/// What the faulting access was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Read,
    Write,
    /// A write hit a mapping without DIRTY.
    ReadOnly,
}

impl AddressSpace {
    /// Resolves a translation miss at `addr`.
    ///
    /// A page inside a region that was never touched is mapped to a zeroed
    /// frame. A write to a page of a read-only region fails.
    ///
    /// # Errors
    /// [`VmError::BadAddress`] outside every region, [`VmError::ReadOnly`]
    /// for writes to read-only pages, or frame exhaustion.
    pub fn fault(&mut self, kind: FaultKind, addr: VirtualAddress) -> Result<(), VmError> {
        if !is_user_address(addr.as_u32()) {
            return Err(VmError::BadAddress(addr));
        }
        let writable = self
            .region_containing(addr)
            .ok_or(VmError::BadAddress(addr))?
            .is_writable();

        let page = addr.page();
        match (self.page_table().get(page), kind) {
            (Some(_), FaultKind::Read) => Ok(()),
            (Some(entry), FaultKind::Write | FaultKind::ReadOnly) => {
                if entry.dirty() {
                    Ok(())
                } else {
                    Err(VmError::ReadOnly(addr))
                }
            }
            (None, FaultKind::Write | FaultKind::ReadOnly) if !writable => {
                Err(VmError::ReadOnly(addr))
            }
            (None, _) => {
                self.map_fresh(page, writable)?;
                trace!("as {}: zero-filled {page}", self.id().get());
                Ok(())
            }
        }
    }
}
