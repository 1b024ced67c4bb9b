use crate::platform::Platform;
use crate::table::ProcessTable;
use crate::thread;
use crate::{Errno, ExitStatus, Pid, PidPool, Process, UserContext};
use kernel_alloc::{Coremap, CoremapStats, FrameError};
use kernel_info::config::{ConfigError, KernelConfig};
use kernel_sync::{Lock, SpinMutex};
use kernel_vmem::AddressSpace;
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Why the kernel could not boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Memory(#[from] FrameError),
}

/// The process subsystem: frames, PIDs and process records.
///
/// The coremap, the PID pool and the process table each have their own
/// lock and no operation holds two of them at once.
pub struct Kernel {
    config: KernelConfig,
    coremap: Arc<Coremap>,
    pids: Lock<PidPool>,
    table: Lock<ProcessTable>,
    platform: Platform,
    threads: SpinMutex<Vec<JoinHandle<()>>>,
}

impl Kernel {
    /// Validates `config`, applies its log level and builds the coremap, PID
    /// pool and process table.
    ///
    /// The configured level replaces the global `log` ceiling, including one
    /// an installed logger set.
    ///
    /// # Errors
    /// The configuration or coremap error that prevents booting.
    pub fn bootstrap(config: KernelConfig, platform: Platform) -> Result<Arc<Self>, BootError> {
        config.validate()?;
        log::set_max_level(config.log_level());
        let coremap = Arc::new(Coremap::bootstrap(config.ram_size())?);
        info!(
            "kernel: {} KiB RAM, {} process slots",
            config.ram_size() / 1024,
            config.max_processes()
        );
        Ok(Arc::new(Self {
            config,
            coremap,
            pids: Lock::new("pid pool", PidPool::new(config.max_processes())),
            table: Lock::new("process table", ProcessTable::new(config.max_processes())),
            platform,
            threads: SpinMutex::new(Vec::new()),
        }))
    }

    #[must_use]
    pub const fn config(&self) -> &KernelConfig {
        &self.config
    }

    #[must_use]
    pub const fn coremap(&self) -> &Arc<Coremap> {
        &self.coremap
    }

    #[must_use]
    pub fn memory_stats(&self) -> CoremapStats {
        self.coremap.stats()
    }

    pub(crate) const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Starts a parentless process without an address space that runs
    /// `body`. Returning from `body` exits with code 0.
    ///
    /// # Errors
    /// [`Errno::ENPROC`] if no PID is free, [`Errno::ENOMEM`] if the thread
    /// cannot be created.
    pub fn spawn_init<F>(self: &Arc<Self>, name: &str, body: F) -> Result<Pid, Errno>
    where
        F: FnOnce(&mut UserContext) + Send + 'static,
    {
        let pid = self.register(name, None)?;
        let kernel = Arc::clone(self);
        let started = thread::spawn(self, pid, name, move || {
            let mut ctx = UserContext::new(kernel, pid, None);
            body(&mut ctx);
            ctx.exit(0)
        });
        if let Err(e) = started {
            self.discard(pid);
            return Err(e);
        }
        info!("kernel: started {name} as process {pid}");
        Ok(pid)
    }

    /// Starts a parentless process that execs `path` with `argv`. If the
    /// exec fails the process exits with the error number as its code.
    ///
    /// # Errors
    /// As for [`Self::spawn_init`].
    pub fn run_program(self: &Arc<Self>, path: &str, argv: &[&str]) -> Result<Pid, Errno> {
        let path = path.to_owned();
        let argv: Vec<String> = argv.iter().map(|&a| a.to_owned()).collect();
        let name = argv.first().cloned().unwrap_or_else(|| path.clone());
        self.spawn_init(&name, move |ctx| {
            let args: Vec<&str> = argv.iter().map(String::as_str).collect();
            let err = ctx.execv(&path, &args);
            warn!("kernel: cannot run {path}: {err}");
            ctx.exit(err.code().cast_signed())
        })
    }

    /// Waits until every kernel thread, including ones started meanwhile,
    /// has finished.
    ///
    /// # Panics
    /// Re-raises the first panic of a kernel thread.
    pub fn join_all(&self) {
        loop {
            let handles = core::mem::take(&mut *self.threads.lock());
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(payload) = handle.join() {
                    std::panic::resume_unwind(payload);
                }
            }
        }
    }

    pub(crate) fn track(&self, handle: JoinHandle<()>) {
        self.threads.lock().push(handle);
    }

    /// Number of records in the process table, zombies included.
    #[must_use]
    pub fn process_count(&self) -> usize {
        self.table.lock().len()
    }

    /// PIDs handed out and not yet returned to the pool.
    #[must_use]
    pub fn pids_in_use(&self) -> usize {
        self.pids.lock().in_use()
    }

    /// `(parent, exited)` of a process, if it has a record.
    #[must_use]
    pub fn process_info(&self, pid: Pid) -> Option<(Option<Pid>, Option<ExitStatus>)> {
        let table = self.table.lock();
        table.get(pid).map(|p| (p.parent(), p.exit_status()))
    }

    /// Parent of `pid`; `None` for parentless and unknown processes.
    #[must_use]
    pub fn getppid(&self, pid: Pid) -> Option<Pid> {
        self.table.lock().get(pid).and_then(Process::parent)
    }

    /// Allocates a PID and a running record for it.
    pub(crate) fn register(&self, name: &str, parent: Option<Pid>) -> Result<Pid, Errno> {
        let pid = self.pids.lock().allocate()?;
        self.table.lock().insert(Process::new(pid, name, parent));
        Ok(pid)
    }

    pub(crate) fn name_of(&self, pid: Pid) -> String {
        self.table
            .lock()
            .get(pid)
            .map(|p| p.name().to_owned())
            .unwrap_or_default()
    }

    pub(crate) fn rename(&self, pid: Pid, name: &str) {
        if let Some(process) = self.table.lock().get_mut(pid) {
            process.set_name(name);
        }
    }

    /// Unwinds [`Self::register`] for a process that never ran.
    pub(crate) fn discard(&self, pid: Pid) {
        let record = self.table.lock().remove(pid);
        if let Some(record) = record {
            self.bury(vec![record]);
        }
    }

    /// Records the exit of `pid` and applies the orphan policy: exited
    /// children are reaped now, running children lose their parent, and a
    /// process without a parent reaps itself. Wakes waiters afterwards.
    ///
    /// Returns `false` if the process had already exited.
    pub(crate) fn retire(&self, pid: Pid, status: ExitStatus, aspace: Option<AddressSpace>) -> bool {
        let mut table = self.table.lock();
        let Some(process) = table.get_mut(pid) else {
            return false;
        };
        if !process.mark_exited(status, aspace) {
            return false;
        }
        let exit_sem = Arc::clone(process.exit_sem());
        let parent = process.parent();

        let mut graveyard = Vec::new();
        for child in table.children_of(pid) {
            let exited = table.get(child).is_some_and(Process::has_exited);
            if exited {
                graveyard.extend(table.remove(child));
            } else if let Some(child) = table.get_mut(child) {
                child.detach();
            }
        }
        if parent.is_none() {
            graveyard.extend(table.remove(pid));
        }
        drop(table);

        debug!("process {pid} exited with {}", status.code());
        exit_sem.release();
        self.bury(graveyard);
        true
    }

    /// Waits for child `pid` of `caller` and reaps it.
    ///
    /// # Errors
    /// [`Errno::ESRCH`] if there is no such process, [`Errno::ECHILD`] if it
    /// is not a child of `caller` or another waiter reaped it first.
    pub fn waitpid(&self, caller: Pid, pid: Pid) -> Result<ExitStatus, Errno> {
        self.wait_for_child(caller, pid, true)?.ok_or(Errno::ECHILD)
    }

    /// As [`Self::waitpid`] but returns `Ok(None)` instead of blocking.
    ///
    /// # Errors
    /// As for [`Self::waitpid`].
    pub fn waitpid_nohang(&self, caller: Pid, pid: Pid) -> Result<Option<ExitStatus>, Errno> {
        self.wait_for_child(caller, pid, false)
    }

    fn wait_for_child(&self, caller: Pid, pid: Pid, block: bool) -> Result<Option<ExitStatus>, Errno> {
        let exit_sem = {
            let mut table = self.table.lock();
            let child = table.get(pid).ok_or(Errno::ESRCH)?;
            if child.parent() != Some(caller) {
                return Err(Errno::ECHILD);
            }
            if let Some(status) = child.exit_status() {
                let record = table.remove(pid);
                drop(table);
                self.bury(record.into_iter().collect());
                return Ok(Some(status));
            }
            if !block {
                return Ok(None);
            }
            Arc::clone(child.exit_sem())
        };

        exit_sem.acquire();
        // Pass the wakeup on so every other waiter drains too.
        exit_sem.release();

        let mut table = self.table.lock();
        let claim = table.get(pid).and_then(|child| {
            let same = Arc::ptr_eq(child.exit_sem(), &exit_sem) && child.parent() == Some(caller);
            if same { child.exit_status() } else { None }
        });
        let Some(status) = claim else {
            return Err(Errno::ECHILD);
        };
        let record = table.remove(pid);
        drop(table);
        self.bury(record.into_iter().collect());
        Ok(Some(status))
    }

    /// Returns the PIDs of reaped records to the pool and destroys their
    /// address spaces. Called without the table lock.
    fn bury(&self, records: Vec<Process>) {
        if records.is_empty() {
            return;
        }
        {
            let mut pids = self.pids.lock();
            for record in &records {
                pids.release(record.pid());
            }
        }
        for record in records {
            debug!("process {} reaped", record.pid());
            drop(record);
        }
    }
}
