/// System call numbers of the process subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Sysno {
    Fork = 0,
    Execv = 2,
    Exit = 3,
    Waitpid = 4,
    Getpid = 5,
    Getppid = 6,
}

/// A call number the kernel does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown system call {0}")]
pub struct UnknownSyscall(pub u32);

impl TryFrom<u32> for Sysno {
    type Error = UnknownSyscall;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Fork,
            2 => Self::Execv,
            3 => Self::Exit,
            4 => Self::Waitpid,
            5 => Self::Getpid,
            6 => Self::Getppid,
            other => return Err(UnknownSyscall(other)),
        })
    }
}

impl From<Sysno> for u32 {
    fn from(sysno: Sysno) -> Self {
        sysno as Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_round_trip() {
        for sysno in [
            Sysno::Fork,
            Sysno::Execv,
            Sysno::Exit,
            Sysno::Waitpid,
            Sysno::Getpid,
            Sysno::Getppid,
        ] {
            assert_eq!(Sysno::try_from(u32::from(sysno)), Ok(sysno));
        }
    }

    #[test]
    fn gaps_are_unknown() {
        assert_eq!(Sysno::try_from(1), Err(UnknownSyscall(1)));
        assert_eq!(Sysno::try_from(113), Err(UnknownSyscall(113)));
    }

    #[test]
    fn unknown_numbers_are_errors() {
        let err: Box<dyn std::error::Error> = Box::new(UnknownSyscall(42));
        assert_eq!(err.to_string(), "unknown system call 42");
    }
}
