use crate::{AddressSpace, EntryLo, FaultKind, VmError};
use kernel_info::memory::{USERSPACE_TOP, is_user_address};
use kernel_memory_addresses::{PAGE_SIZE, VirtualAddress};

impl AddressSpace {
    /// Copies `data` to user memory at `dst`.
    ///
    /// # Errors
    /// [`VmError::BadAddress`] if the range leaves user space or hits no
    /// region, [`VmError::ReadOnly`] for read-only pages.
    pub fn copy_out(&mut self, dst: VirtualAddress, data: &[u8]) -> Result<(), VmError> {
        check_range(dst, data.len())?;
        let mut done = 0;
        while done < data.len() {
            let addr = dst + offset(done);
            let len = chunk_len(addr, data.len() - done);
            let entry = self.resolve(addr, FaultKind::Write)?;
            let pa = entry.frame().base() + addr.page_offset();
            self.coremap().memory().write(pa, &data[done..done + len]);
            done += len;
        }
        Ok(())
    }

    /// Fills `buf` from user memory at `src`.
    ///
    /// # Errors
    /// [`VmError::BadAddress`] if the range leaves user space or hits no region.
    pub fn copy_in(&mut self, src: VirtualAddress, buf: &mut [u8]) -> Result<(), VmError> {
        check_range(src, buf.len())?;
        let mut done = 0;
        while done < buf.len() {
            let addr = src + offset(done);
            let len = chunk_len(addr, buf.len() - done);
            let entry = self.resolve(addr, FaultKind::Read)?;
            let pa = entry.frame().base() + addr.page_offset();
            self.coremap().memory().read(pa, &mut buf[done..done + len]);
            done += len;
        }
        Ok(())
    }

    /// Reads a NUL-terminated string of at most `max` bytes, terminator included.
    ///
    /// # Errors
    /// [`VmError::StringTooLong`] if no terminator appears in time, or the
    /// errors of [`Self::copy_in`].
    pub fn copy_in_str(&mut self, src: VirtualAddress, max: usize) -> Result<String, VmError> {
        let mut bytes = Vec::new();
        let mut addr = src;
        loop {
            if !is_user_address(addr.as_u32()) {
                return Err(VmError::BadAddress(addr));
            }
            let mut chunk = vec![0u8; chunk_len(addr, max - bytes.len())];
            let entry = self.resolve(addr, FaultKind::Read)?;
            let pa = entry.frame().base() + addr.page_offset();
            self.coremap().memory().read(pa, &mut chunk);

            if let Some(nul) = chunk.iter().position(|&b| b == 0) {
                bytes.extend_from_slice(&chunk[..nul]);
                break;
            }
            bytes.extend_from_slice(&chunk);
            if bytes.len() >= max {
                return Err(VmError::StringTooLong { max });
            }
            addr += offset(chunk.len());
        }
        String::from_utf8(bytes).map_err(|_| VmError::NotUtf8(src))
    }

    /// Whether [`Self::copy_out`] to `dst..dst + len` would succeed, short of
    /// running out of frames. Maps nothing.
    ///
    /// # Errors
    /// [`VmError::BadAddress`] if the range leaves user space or hits no
    /// region, [`VmError::ReadOnly`] for read-only pages.
    pub fn check_writable(&self, dst: VirtualAddress, len: usize) -> Result<(), VmError> {
        check_range(dst, len)?;
        let mut done = 0;
        while done < len {
            let addr = dst + offset(done);
            let region = self.region_containing(addr).ok_or(VmError::BadAddress(addr))?;
            let writable = match self.page_table().get(addr.page()) {
                Some(entry) => entry.dirty(),
                None => region.is_writable(),
            };
            if !writable {
                return Err(VmError::ReadOnly(addr));
            }
            done += chunk_len(addr, len - done);
        }
        Ok(())
    }

    /// The entry for `addr`, faulting the page in if needed.
    fn resolve(&mut self, addr: VirtualAddress, kind: FaultKind) -> Result<EntryLo, VmError> {
        let page = addr.page();
        match self.page_table().get(page) {
            Some(entry) if kind == FaultKind::Read || entry.dirty() => Ok(entry),
            _ => {
                self.fault(kind, addr)?;
                self.page_table().get(page).ok_or(VmError::Unmapped(addr))
            }
        }
    }
}

fn check_range(start: VirtualAddress, len: usize) -> Result<(), VmError> {
    let end = u64::from(start.as_u32()) + len as u64;
    if !is_user_address(start.as_u32()) || end > u64::from(USERSPACE_TOP) {
        return Err(VmError::BadAddress(start));
    }
    Ok(())
}

/// Bytes from `addr` to the end of its page, capped at `remaining`.
fn chunk_len(addr: VirtualAddress, remaining: usize) -> usize {
    ((PAGE_SIZE - addr.page_offset()) as usize).min(remaining)
}

#[allow(clippy::cast_possible_truncation)]
const fn offset(bytes: usize) -> u32 {
    // Ranges were checked to stay below USERSPACE_TOP.
    bytes as u32
}
