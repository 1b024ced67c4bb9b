use crate::Sysno;
use kernel_info::memory::INSTRUCTION_SIZE;

/// User register state saved on entry to the kernel.
///
/// Only the registers the process subsystem reads or writes are modeled;
/// the frame is copied by value into a forked child.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TrapFrame {
    /// Call number on entry, result or error number on return.
    pub v0: u32,
    pub v1: u32,
    pub a0: u32,
    pub a1: u32,
    pub a2: u32,
    /// Fourth argument on entry, error flag on return.
    pub a3: u32,
    pub sp: u32,
    /// Address of the `syscall` instruction (or the entry point).
    pub epc: u32,
}

impl TrapFrame {
    /// A frame as user code leaves it when issuing `sysno`.
    #[must_use]
    pub const fn syscall(sysno: Sysno, args: [u32; 4]) -> Self {
        Self {
            v0: sysno as u32,
            v1: 0,
            a0: args[0],
            a1: args[1],
            a2: args[2],
            a3: args[3],
            sp: 0,
            epc: 0,
        }
    }

    #[must_use]
    pub const fn sysno(&self) -> u32 {
        self.v0
    }

    #[must_use]
    pub const fn args(&self) -> [u32; 4] {
        [self.a0, self.a1, self.a2, self.a3]
    }

    pub const fn set_success(&mut self, value: u32) {
        self.v0 = value;
        self.a3 = 0;
    }

    pub const fn set_error(&mut self, errno: u32) {
        self.v0 = errno;
        self.a3 = 1;
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.a3 != 0
    }

    /// Skips the `syscall` instruction so it is not restarted.
    pub const fn advance_pc(&mut self) {
        self.epc = self.epc.wrapping_add(INSTRUCTION_SIZE);
    }
}
