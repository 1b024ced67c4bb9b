use crate::{Errno, UserContext};
use kernel_info::memory::{ARG_MAX, PATH_MAX, STACK_ALIGN, USER_POINTER_SIZE};
use kernel_memory_addresses::VirtualAddress;
use kernel_syscall::TrapFrame;
use kernel_vmem::AddressSpace;
use log::info;
use std::sync::Arc;

impl UserContext {
    /// Replaces the running program with the executable at `path`.
    ///
    /// The new image is built in a fresh address space; the old one is
    /// discarded only once the new one is complete, so on error the process
    /// is unchanged. Does not return on success.
    ///
    /// `argv` must hold at least the program name and no empty strings.
    pub fn execv(&mut self, path: &str, argv: &[&str]) -> Errno {
        let (aspace, tf) = match self.build_image(path, argv) {
            Ok(image) => image,
            Err(e) => return e,
        };

        drop(self.replace_aspace(aspace));
        if let Some(aspace) = self.aspace() {
            aspace.activate();
        }
        self.kernel().rename(self.getpid(), argv[0]);
        info!("process {}: exec {path} ({} args)", self.getpid(), argv.len());
        self.run_user(tf)
    }

    fn build_image(&self, path: &str, argv: &[&str]) -> Result<(AddressSpace, TrapFrame), Errno> {
        validate(path, argv)?;
        let args = ArgBlock::size_of(argv)?;

        let mut file = self.kernel().platform().vfs.open(path)?;
        let mut aspace = AddressSpace::create(self.kernel().coremap());
        let loader = Arc::clone(&self.kernel().platform().loader);
        let entry = loader.load(file.as_mut(), &mut aspace)?;
        drop(file);

        let stack_top = aspace.define_stack()?;
        let block = ArgBlock::build(argv, args, stack_top);
        aspace.copy_out(block.base, &block.bytes)?;

        let tf = TrapFrame {
            a0: block.argc,
            a1: block.base.as_u32(),
            sp: block.base.as_u32() & !(STACK_ALIGN - 1),
            epc: entry.as_u32(),
            ..TrapFrame::default()
        };
        Ok((aspace, tf))
    }
}

fn validate(path: &str, argv: &[&str]) -> Result<(), Errno> {
    if path.is_empty() || argv.is_empty() || argv.iter().any(|a| a.is_empty()) {
        return Err(Errno::EINVAL);
    }
    if path.len() >= PATH_MAX as usize {
        return Err(Errno::ENAMETOOLONG);
    }
    Ok(())
}

/// The argument vector as it is placed at the top of the new stack:
///
/// ```text
///   base → argv[0] … argv[argc-1] NULL   (4-byte user pointers)
///          "arg0\0" pad  "arg1\0" pad …   (each padded to 4 bytes)
///   top  ┘
/// ```
struct ArgBlock {
    base: VirtualAddress,
    argc: u32,
    bytes: Vec<u8>,
}

impl ArgBlock {
    /// Bytes the block needs.
    ///
    /// # Errors
    /// [`Errno::E2BIG`] if that exceeds [`ARG_MAX`].
    fn size_of(argv: &[&str]) -> Result<u32, Errno> {
        let pointers = (argv.len() + 1) * USER_POINTER_SIZE as usize;
        let strings: usize = argv.iter().map(|a| padded_len(a)).sum();
        u32::try_from(pointers + strings)
            .ok()
            .filter(|&size| size <= ARG_MAX)
            .ok_or(Errno::E2BIG)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn build(argv: &[&str], size: u32, top: VirtualAddress) -> Self {
        // `size` is at most ARG_MAX, so every offset fits in 32 bits.
        let base = VirtualAddress::new(top.as_u32() - size);
        let mut pointers = Vec::with_capacity(size as usize);
        let mut strings = Vec::new();
        let mut offset = (argv.len() + 1) * USER_POINTER_SIZE as usize;

        for arg in argv {
            let addr = base.as_u32() + offset as u32;
            pointers.extend_from_slice(&addr.to_le_bytes());
            strings.extend_from_slice(arg.as_bytes());
            strings.resize(strings.len() + padded_len(arg) - arg.len(), 0);
            offset += padded_len(arg);
        }
        pointers.extend_from_slice(&0u32.to_le_bytes());
        pointers.extend_from_slice(&strings);
        debug_assert_eq!(pointers.len(), size as usize);

        Self {
            base,
            argc: argv.len() as u32,
            bytes: pointers,
        }
    }
}

/// Length of `arg` with its NUL, rounded up to a pointer.
const fn padded_len(arg: &str) -> usize {
    (arg.len() + 1).next_multiple_of(USER_POINTER_SIZE as usize)
}
