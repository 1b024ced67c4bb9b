use kernel_alloc::FrameError;
use kernel_vmem::VmError;

/// Error numbers reported to user programs.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[repr(u32)]
pub enum Errno {
    #[error("function not implemented")]
    ENOSYS = 1,
    #[error("function not implemented yet")]
    EUNIMP = 2,
    #[error("out of memory")]
    ENOMEM = 3,
    #[error("operation would block")]
    EAGAIN = 4,
    #[error("interrupted system call")]
    EINTR = 5,
    #[error("bad memory reference")]
    EFAULT = 6,
    #[error("string too long")]
    ENAMETOOLONG = 7,
    #[error("invalid argument")]
    EINVAL = 8,
    #[error("operation not permitted")]
    EPERM = 9,
    #[error("permission denied")]
    EACCES = 10,
    #[error("too many processes")]
    EMPROC = 11,
    #[error("too many processes in system")]
    ENPROC = 12,
    #[error("file is not executable")]
    ENOEXEC = 13,
    #[error("argument list too long")]
    E2BIG = 14,
    #[error("no such process")]
    ESRCH = 15,
    #[error("no child processes")]
    ECHILD = 16,
    #[error("not a directory")]
    ENOTDIR = 17,
    #[error("is a directory")]
    EISDIR = 18,
    #[error("no such file or directory")]
    ENOENT = 19,
    #[error("bad file number")]
    EBADF = 30,
}

impl Errno {
    /// The number placed in `v0` when a system call fails.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }
}

impl From<FrameError> for Errno {
    fn from(_: FrameError) -> Self {
        Self::ENOMEM
    }
}

impl From<VmError> for Errno {
    fn from(e: VmError) -> Self {
        match e {
            VmError::Frame(e) => e.into(),
            VmError::EmptyRegion | VmError::OutOfRange { .. } | VmError::Overlap { .. } => {
                Self::EINVAL
            }
            VmError::BadAddress(_)
            | VmError::Unmapped(_)
            | VmError::ReadOnly(_)
            | VmError::NotUtf8(_) => Self::EFAULT,
            VmError::StringTooLong { .. } => Self::ENAMETOOLONG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::VirtualAddress;

    #[test]
    fn codes_match_the_user_headers() {
        assert_eq!(Errno::ENOSYS.code(), 1);
        assert_eq!(Errno::ENOMEM.code(), 3);
        assert_eq!(Errno::EFAULT.code(), 6);
        assert_eq!(Errno::EINVAL.code(), 8);
        assert_eq!(Errno::ENPROC.code(), 12);
        assert_eq!(Errno::E2BIG.code(), 14);
        assert_eq!(Errno::ESRCH.code(), 15);
        assert_eq!(Errno::ECHILD.code(), 16);
        assert_eq!(Errno::EBADF.code(), 30);
    }

    #[test]
    fn vm_errors_map_to_user_errors() {
        let oom = VmError::Frame(FrameError::OutOfMemory { requested: 1 });
        assert_eq!(Errno::from(oom), Errno::ENOMEM);
        assert_eq!(
            Errno::from(VmError::BadAddress(VirtualAddress::new(0x8000_0000))),
            Errno::EFAULT
        );
        assert_eq!(
            Errno::from(VmError::StringTooLong { max: 1024 }),
            Errno::ENAMETOOLONG
        );
        assert_eq!(Errno::from(VmError::EmptyRegion), Errno::EINVAL);
    }
}
