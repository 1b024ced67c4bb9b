use crate::Pid;
use kernel_sync::Semaphore;
use kernel_vmem::AddressSpace;
use std::sync::Arc;

/// Exit code passed to `_exit`, as the parent will see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitStatus(i32);

impl ExitStatus {
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// The status word stored for `waitpid`: the low byte of the code,
    /// shifted above the two reason bits (0 = normal exit).
    #[must_use]
    pub fn wait_status(self) -> u32 {
        u32::from(self.0.to_le_bytes()[0]) << 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    /// A zombie until its parent collects the status.
    Exited(ExitStatus),
}

/// One process-table record.
pub struct Process {
    pid: Pid,
    name: String,
    parent: Option<Pid>,
    state: ProcessState,
    exit_sem: Arc<Semaphore>,
    /// Empty while running: the thread executing the process owns its
    /// address space. Exit parks it here until the reap.
    aspace: Option<AddressSpace>,
}

impl Process {
    pub(crate) fn new(pid: Pid, name: impl Into<String>, parent: Option<Pid>) -> Self {
        Self {
            pid,
            name: name.into(),
            parent,
            state: ProcessState::Running,
            exit_sem: Arc::new(Semaphore::new("exit", 0)),
            aspace: None,
        }
    }

    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub const fn parent(&self) -> Option<Pid> {
        self.parent
    }

    pub(crate) const fn detach(&mut self) {
        self.parent = None;
    }

    #[must_use]
    pub const fn state(&self) -> ProcessState {
        self.state
    }

    #[must_use]
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        match self.state {
            ProcessState::Running => None,
            ProcessState::Exited(status) => Some(status),
        }
    }

    #[must_use]
    pub const fn has_exited(&self) -> bool {
        matches!(self.state, ProcessState::Exited(_))
    }

    pub(crate) const fn exit_sem(&self) -> &Arc<Semaphore> {
        &self.exit_sem
    }

    /// Records the exit. Only the first call has an effect; it returns
    /// `false` for every later one.
    pub(crate) fn mark_exited(&mut self, status: ExitStatus, aspace: Option<AddressSpace>) -> bool {
        if self.has_exited() {
            return false;
        }
        self.state = ProcessState::Exited(status);
        self.aspace = aspace;
        true
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("state", &self.state)
            .field("aspace", &self.aspace.as_ref().map(|a| a.id().get()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> Pid {
        Pid::from_user(n).unwrap()
    }

    #[test]
    fn wait_status_keeps_the_low_byte() {
        assert_eq!(ExitStatus::new(0).wait_status(), 0);
        assert_eq!(ExitStatus::new(7).wait_status(), 28);
        assert_eq!(ExitStatus::new(0x1ff).wait_status(), 0xff << 2);
        assert_eq!(ExitStatus::new(-1).wait_status(), 0xff << 2);
    }

    #[test]
    fn exit_is_recorded_once() {
        let mut p = Process::new(pid(3), "p", Some(pid(1)));
        assert_eq!(p.exit_status(), None);

        assert!(p.mark_exited(ExitStatus::new(4), None));
        assert!(!p.mark_exited(ExitStatus::new(9), None));
        assert_eq!(p.state(), ProcessState::Exited(ExitStatus::new(4)));
    }

    #[test]
    fn detaching_forgets_the_parent() {
        let mut p = Process::new(pid(3), "p", Some(pid(1)));
        p.detach();
        assert_eq!(p.parent(), None);
    }
}
