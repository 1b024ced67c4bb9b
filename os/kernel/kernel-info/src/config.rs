//! Boot-time kernel configuration.

use crate::memory::{DEFAULT_RAM_SIZE, KSEG0_SIZE, MAX_RUNNING_PROCS, MIN_RAM_SIZE, PAGE_SIZE, PID_MAX};
use log::LevelFilter;
use utils_accessors_derive::{Getters, Setters};

/// Tunables chosen at boot.
///
/// ```
/// use kernel_info::config::KernelConfig;
/// use log::LevelFilter;
///
/// let config = KernelConfig::default()
///     .with_ram_size(2 * 1024 * 1024)
///     .with_log_level(LevelFilter::Debug);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.ram_size(), 2 * 1024 * 1024);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Setters, Getters)]
pub struct KernelConfig {
    /// Bytes of simulated physical RAM.
    ram_size: u32,
    /// Process table capacity; PIDs run from 1 to `max_processes - 1`.
    max_processes: u32,
    /// Maximum level the kernel logger emits.
    log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("RAM size {0:#x} is not a multiple of the page size")]
    RamNotPageAligned(u32),
    #[error("RAM size {ram_size:#x} is below the minimum of {minimum:#x}")]
    RamTooSmall { ram_size: u32, minimum: u32 },
    #[error("RAM size {ram_size:#x} exceeds the direct-mapped segment ({maximum:#x})")]
    RamTooLarge { ram_size: u32, maximum: u32 },
    #[error("process table capacity {0} is outside 2..={max}", max = PID_MAX)]
    ProcessCapacity(u32),
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            ram_size: DEFAULT_RAM_SIZE,
            max_processes: MAX_RUNNING_PROCS,
            log_level: LevelFilter::Info,
        }
    }
}

impl KernelConfig {
    /// Checks the configuration for values the kernel cannot boot with.
    ///
    /// # Errors
    /// The first [`ConfigError`] found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if !self.ram_size.is_multiple_of(PAGE_SIZE) {
            return Err(ConfigError::RamNotPageAligned(self.ram_size));
        }
        if self.ram_size < MIN_RAM_SIZE {
            return Err(ConfigError::RamTooSmall {
                ram_size: self.ram_size,
                minimum: MIN_RAM_SIZE,
            });
        }
        if self.ram_size > KSEG0_SIZE {
            return Err(ConfigError::RamTooLarge {
                ram_size: self.ram_size,
                maximum: KSEG0_SIZE,
            });
        }
        if self.max_processes < 2 || self.max_processes > PID_MAX {
            return Err(ConfigError::ProcessCapacity(self.max_processes));
        }
        Ok(())
    }

    /// Number of page frames in RAM.
    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.ram_size / PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = KernelConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.frame_count(), DEFAULT_RAM_SIZE / PAGE_SIZE);
        assert_eq!(config.max_processes(), MAX_RUNNING_PROCS);
    }

    #[test]
    fn rejects_unaligned_ram() {
        let config = KernelConfig::default().with_ram_size(MIN_RAM_SIZE + 1);
        assert_eq!(config.validate(), Err(ConfigError::RamNotPageAligned(MIN_RAM_SIZE + 1)));
    }

    #[test]
    fn rejects_ram_outside_the_direct_map() {
        let small = KernelConfig::default().with_ram_size(PAGE_SIZE);
        assert!(matches!(small.validate(), Err(ConfigError::RamTooSmall { .. })));

        let large = KernelConfig::default().with_ram_size(KSEG0_SIZE + PAGE_SIZE);
        assert!(matches!(large.validate(), Err(ConfigError::RamTooLarge { .. })));
    }

    #[test]
    fn rejects_tiny_process_tables() {
        let mut config = KernelConfig::default();
        config.set_max_processes(1);
        assert_eq!(config.validate(), Err(ConfigError::ProcessCapacity(1)));
        config.set_max_processes(2);
        assert_eq!(config.validate(), Ok(()));
    }
}
