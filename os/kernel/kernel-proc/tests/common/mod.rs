//! Fake collaborators for driving the process subsystem from tests.
//!
//! * [`MemVfs`]: files held in memory.
//! * [`FlatLoader`]: loads a file verbatim as one read-only text region at
//!   [`TEXT_BASE`] and enters at its first byte.
//! * [`ScriptedUserMode`]: "executes" user code by running Rust closures.
//!   A loaded image is just a program name; entering user mode at its entry
//!   point runs the closure registered under that name. Forked children
//!   resume at a registered resume point instead.

#![allow(dead_code)]

use kernel_console::ConsoleLogger;
use kernel_info::config::KernelConfig;
use kernel_memory_addresses::VirtualAddress;
use kernel_proc::{Errno, ExecutableLoader, Kernel, Pid, Platform, UserContext, UserMode, Vfs, Vnode};
use kernel_syscall::{Sysno, TrapFrame};
use kernel_vmem::{AddressSpace, Permissions};
use log::LevelFilter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const TEXT_BASE: u32 = 0x0040_0000;

/// Where forked children resume; never a mapped address.
const RESUME_BASE: u32 = 0x7000_0000;

#[derive(Default)]
pub struct MemVfs {
    files: HashMap<String, Arc<[u8]>>,
}

impl MemVfs {
    #[must_use]
    pub fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.files.insert(path.to_owned(), Arc::from(contents));
        self
    }
}

impl Vfs for MemVfs {
    fn open(&self, path: &str) -> Result<Box<dyn Vnode>, Errno> {
        let data = self.files.get(path).ok_or(Errno::ENOENT)?;
        Ok(Box::new(MemFile {
            data: Arc::clone(data),
            pos: 0,
        }))
    }
}

struct MemFile {
    data: Arc<[u8]>,
    pos: usize,
}

impl Vnode for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, _data: &[u8]) -> Result<usize, Errno> {
        Err(Errno::EBADF)
    }

    fn seek(&mut self, pos: u64) -> Result<u64, Errno> {
        self.pos = usize::try_from(pos).map_err(|_| Errno::EINVAL)?;
        Ok(pos)
    }
}

pub struct FlatLoader;

impl ExecutableLoader for FlatLoader {
    fn load(&self, file: &mut dyn Vnode, aspace: &mut AddressSpace) -> Result<VirtualAddress, Errno> {
        let mut image = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            image.extend_from_slice(&buf[..n]);
        }
        if image.is_empty() {
            return Err(Errno::ENOEXEC);
        }

        let text = VirtualAddress::new(TEXT_BASE);
        let size = u32::try_from(image.len()).map_err(|_| Errno::ENOEXEC)?;
        aspace.define_region(text, size, Permissions::READ | Permissions::EXECUTE)?;
        aspace.prepare_load()?;
        aspace.copy_out(text, &image)?;
        aspace.complete_load();
        Ok(text)
    }
}

pub type Program = Arc<dyn Fn(&mut UserContext, TrapFrame) + Send + Sync>;
type Resume = Box<dyn FnOnce(&mut UserContext) + Send>;

#[derive(Default)]
pub struct ScriptedUserMode {
    programs: Mutex<HashMap<String, Program>>,
    resumes: Mutex<HashMap<u32, Resume>>,
    next_resume: AtomicU32,
}

impl ScriptedUserMode {
    /// Registers the code run when an image named `name` is entered.
    pub fn program(&self, name: &str, body: impl Fn(&mut UserContext, TrapFrame) + Send + Sync + 'static) {
        self.programs
            .lock()
            .unwrap()
            .insert(name.to_owned(), Arc::new(body));
    }

    /// Registers what a forked child runs and returns the address its
    /// `fork` call must be issued from.
    pub fn resume_point(&self, child: impl FnOnce(&mut UserContext) + Send + 'static) -> u32 {
        let n = self.next_resume.fetch_add(1, Ordering::Relaxed);
        let resume_at = RESUME_BASE + 8 * n;
        self.resumes.lock().unwrap().insert(resume_at, Box::new(child));
        resume_at - 4
    }

    /// `fork()` from user code; the child runs `child`.
    pub fn fork(
        &self,
        ctx: &mut UserContext,
        child: impl FnOnce(&mut UserContext) + Send + 'static,
    ) -> Result<Pid, Errno> {
        let epc = self.resume_point(child);
        let tf = TrapFrame {
            epc,
            ..TrapFrame::syscall(Sysno::Fork, [0; 4])
        };
        let result = ctx.fork(&tf);
        if result.is_err() {
            self.resumes.lock().unwrap().remove(&(epc + 4));
        }
        result
    }
}

impl UserMode for ScriptedUserMode {
    fn enter_user_mode(&self, ctx: &mut UserContext, tf: TrapFrame) {
        let resume = self.resumes.lock().unwrap().remove(&tf.epc);
        if let Some(resume) = resume {
            assert_eq!((tf.v0, tf.a3), (0, 0), "a forked child sees fork() return 0");
            resume(ctx);
            return;
        }

        let name = ctx
            .aspace_mut()
            .expect("an exec'd program has an address space")
            .copy_in_str(VirtualAddress::new(tf.epc), 64)
            .expect("the image starts with the program name");
        let program = self
            .programs
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_else(|| panic!("no program named {name:?}"));
        program(ctx, tf);
    }
}

pub struct TestSystem {
    pub kernel: Arc<Kernel>,
    pub user: Arc<ScriptedUserMode>,
}

pub const LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// The default configuration, logging at [`LOG_LEVEL`].
#[must_use]
pub fn config() -> KernelConfig {
    KernelConfig::default().with_log_level(LOG_LEVEL)
}

/// Boots a kernel whose file system holds one image per `(path, program)`.
pub fn boot(files: &[(&str, &str)]) -> TestSystem {
    boot_with(config(), files)
}

pub fn boot_with(config: KernelConfig, files: &[(&str, &str)]) -> TestSystem {
    let _ = ConsoleLogger::new(LOG_LEVEL).init();

    let vfs = files.iter().fold(MemVfs::default(), |vfs, (path, program)| {
        vfs.with_file(path, format!("{program}\0").as_bytes())
    });
    let user = Arc::new(ScriptedUserMode::default());
    let platform = Platform {
        vfs: Arc::new(vfs),
        loader: Arc::new(FlatLoader),
        user_mode: Arc::clone(&user) as Arc<dyn UserMode>,
    };
    let kernel = Kernel::bootstrap(config, platform).unwrap();
    TestSystem { kernel, user }
}

/// Spins until `pid` has exited but is not yet reaped.
pub fn await_zombie(kernel: &Kernel, pid: Pid) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !matches!(kernel.process_info(pid), Some((_, Some(_)))) {
        assert!(Instant::now() < deadline, "process {pid} never exited");
        std::thread::yield_now();
    }
}
