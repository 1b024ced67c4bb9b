use crate::{Pid, Process};

/// Process records indexed by PID.
#[derive(Debug)]
pub struct ProcessTable {
    slots: Vec<Option<Process>>,
    live: usize,
}

impl ProcessTable {
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            live: 0,
        }
    }

    #[must_use]
    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.slots.get(pid.index())?.as_ref()
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.slots.get_mut(pid.index())?.as_mut()
    }

    /// Stores a new record in its PID's slot.
    ///
    /// # Panics
    /// Panics if the slot is taken; the PID pool handed out a live PID.
    pub fn insert(&mut self, process: Process) {
        let pid = process.pid();
        let slot = self
            .slots
            .get_mut(pid.index())
            .unwrap_or_else(|| panic!("pid {pid} beyond the process table"));
        assert!(slot.is_none(), "pid {pid} is already in use");
        *slot = Some(process);
        self.live += 1;
    }

    /// Clears the slot and returns what it held.
    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        let process = self.slots.get_mut(pid.index())?.take()?;
        self.live -= 1;
        Some(process)
    }

    /// PIDs of the processes whose parent is `parent`.
    #[must_use]
    pub fn children_of(&self, parent: Pid) -> Vec<Pid> {
        self.iter()
            .filter(|p| p.parent() == Some(parent))
            .map(Process::pid)
            .collect()
    }

    /// Occupied slots, zombies included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.slots.iter().flatten()
    }
}
