use kernel_info::memory::{KSEG0_BASE, KSEG0_SIZE};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalPage, VirtualAddress};
use kernel_sync::SpinMutex;

/// Kernel virtual address of a physical address in the direct-mapped segment.
#[inline]
#[must_use]
pub const fn paddr_to_kvaddr(pa: PhysicalAddress) -> VirtualAddress {
    VirtualAddress::new(pa.as_u32() + KSEG0_BASE)
}

/// Physical address behind a direct-mapped kernel address, or `None` if `va`
/// is outside the segment.
#[inline]
#[must_use]
pub const fn kvaddr_to_paddr(va: VirtualAddress) -> Option<PhysicalAddress> {
    let v = va.as_u32();
    if v >= KSEG0_BASE && v - KSEG0_BASE < KSEG0_SIZE {
        Some(PhysicalAddress::new(v - KSEG0_BASE))
    } else {
        None
    }
}

/// Simulated RAM: one lock per frame so distinct frames are accessed in parallel.
pub struct PhysicalMemory {
    frames: Box<[SpinMutex<Box<[u8]>>]>,
}

impl PhysicalMemory {
    #[must_use]
    pub fn new(frame_count: u32) -> Self {
        let frames = (0..frame_count)
            .map(|_| SpinMutex::new(vec![0u8; PAGE_SIZE as usize].into_boxed_slice()))
            .collect();
        Self { frames }
    }

    #[must_use]
    pub fn frame_count(&self) -> u32 {
        // Built from a u32 count.
        u32::try_from(self.frames.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn contains(&self, pa: PhysicalAddress) -> bool {
        pa.frame().number() < self.frame_count()
    }

    fn frame(&self, page: PhysicalPage) -> &SpinMutex<Box<[u8]>> {
        self.frames
            .get(page.number() as usize)
            .unwrap_or_else(|| panic!("{page} is outside physical memory"))
    }

    pub fn zero(&self, page: PhysicalPage) {
        self.frame(page).lock().fill(0);
    }

    /// Copies the contents of frame `src` into frame `dst`.
    pub fn copy(&self, src: PhysicalPage, dst: PhysicalPage) {
        if src == dst {
            return;
        }
        let mut staging = [0u8; PAGE_SIZE as usize];
        staging.copy_from_slice(&self.frame(src).lock());
        self.frame(dst).lock().copy_from_slice(&staging);
    }

    /// Reads `buf.len()` bytes starting at `pa`; may cross frame boundaries.
    ///
    /// # Panics
    /// Panics if the range leaves physical memory.
    pub fn read(&self, pa: PhysicalAddress, buf: &mut [u8]) {
        let mut done = 0;
        while done < buf.len() {
            let addr = advance(pa, done);
            let off = addr.page_offset() as usize;
            let len = (PAGE_SIZE as usize - off).min(buf.len() - done);
            let frame = self.frame(addr.frame()).lock();
            buf[done..done + len].copy_from_slice(&frame[off..off + len]);
            done += len;
        }
    }

    /// Writes `data` starting at `pa`; may cross frame boundaries.
    ///
    /// # Panics
    /// Panics if the range leaves physical memory.
    pub fn write(&self, pa: PhysicalAddress, data: &[u8]) {
        let mut done = 0;
        while done < data.len() {
            let addr = advance(pa, done);
            let off = addr.page_offset() as usize;
            let len = (PAGE_SIZE as usize - off).min(data.len() - done);
            let mut frame = self.frame(addr.frame()).lock();
            frame[off..off + len].copy_from_slice(&data[done..done + len]);
            done += len;
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn advance(pa: PhysicalAddress, bytes: usize) -> PhysicalAddress {
    // Physical memory is bounded by the 512 MiB direct map.
    pa + bytes as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kseg0_translation_round_trips() {
        let pa = PhysicalAddress::new(0x0001_2340);
        let va = paddr_to_kvaddr(pa);
        assert_eq!(va.as_u32(), 0x8001_2340);
        assert_eq!(kvaddr_to_paddr(va), Some(pa));
        assert_eq!(kvaddr_to_paddr(VirtualAddress::new(0x0040_0000)), None);
        assert_eq!(kvaddr_to_paddr(VirtualAddress::new(0xa000_0000)), None);
    }

    #[test]
    fn reads_and_writes_span_frames() {
        let mem = PhysicalMemory::new(3);
        let data: Vec<u8> = (0..=255).cycle().take(5000).collect();
        let start = PhysicalAddress::new(PAGE_SIZE - 100);
        mem.write(start, &data);

        let mut back = vec![0u8; data.len()];
        mem.read(start, &mut back);
        assert_eq!(back, data);

        let mut first = [0u8; 1];
        mem.read(PhysicalAddress::new(PAGE_SIZE), &mut first);
        assert_eq!(first[0], data[100]);
    }

    #[test]
    fn copy_and_zero_whole_frames() {
        let mem = PhysicalMemory::new(2);
        mem.write(PhysicalAddress::new(16), b"frame zero");
        mem.copy(PhysicalPage::from_number(0), PhysicalPage::from_number(1));

        let mut buf = [0u8; 10];
        mem.read(PhysicalAddress::new(PAGE_SIZE + 16), &mut buf);
        assert_eq!(&buf, b"frame zero");

        mem.zero(PhysicalPage::from_number(1));
        mem.read(PhysicalAddress::new(PAGE_SIZE + 16), &mut buf);
        assert_eq!(buf, [0u8; 10]);
    }

    #[test]
    #[should_panic(expected = "outside physical memory")]
    fn access_past_the_end_panics() {
        let mem = PhysicalMemory::new(1);
        mem.zero(PhysicalPage::from_number(1));
    }
}
