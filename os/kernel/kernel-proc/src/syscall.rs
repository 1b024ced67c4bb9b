//! Trap-level entry points: decode the frame, validate user pointers,
//! call into [`UserContext`], encode the result.

use crate::{Errno, Pid, UserContext};
use kernel_info::memory::{ARG_MAX, PATH_MAX, USER_POINTER_SIZE, is_user_address};
use kernel_memory_addresses::VirtualAddress;
use kernel_syscall::{Sysno, TrapFrame, WNOHANG, valid_wait_options};
use kernel_vmem::VmError;
use log::trace;

/// Handles the system call described by `tf` and writes the result back.
pub fn dispatch(ctx: &mut UserContext, tf: &mut TrapFrame) {
    let sysno = tf.sysno();
    let result = match Sysno::try_from(sysno) {
        Ok(Sysno::Getpid) => Ok(ctx.getpid().get()),
        Ok(Sysno::Getppid) => Ok(ctx.getppid().map_or(0, Pid::get)),
        Ok(Sysno::Fork) => ctx.fork(tf).map(Pid::get),
        Ok(Sysno::Exit) => ctx.exit(tf.a0.cast_signed()),
        Ok(Sysno::Waitpid) => sys_waitpid(ctx, tf.a0, tf.a1, tf.a2),
        Ok(Sysno::Execv) => sys_execv(ctx, tf.a0, tf.a1),
        Err(unknown) => {
            trace!("process {}: {unknown}", ctx.getpid());
            Err(Errno::ENOSYS)
        }
    };

    match result {
        Ok(value) => tf.set_success(value),
        Err(errno) => {
            trace!("process {}: syscall {sysno} failed: {errno}", ctx.getpid());
            tf.set_error(errno.code());
        }
    }
    tf.advance_pc();
}

/// `waitpid(pid, &status, options)`.
fn sys_waitpid(ctx: &mut UserContext, pid: u32, status: u32, options: u32) -> Result<u32, Errno> {
    let status = user_pointer(status, USER_POINTER_SIZE)?;
    if !valid_wait_options(options) {
        return Err(Errno::EINVAL);
    }
    let pid = Pid::from_user(pid.cast_signed()).ok_or(Errno::EINVAL)?;

    // The status word must be writable before a child is reaped into it.
    ctx.user_memory()?
        .check_writable(status, USER_POINTER_SIZE as usize)?;

    let reaped = if options & WNOHANG == 0 {
        Some(ctx.waitpid(pid)?)
    } else {
        ctx.waitpid_nohang(pid)?
    };
    let Some((pid, exit)) = reaped else {
        return Ok(0);
    };
    ctx.user_memory()?
        .copy_out(status, &exit.wait_status().to_le_bytes())?;
    Ok(pid.get())
}

/// `execv(path, argv)`.
fn sys_execv(ctx: &mut UserContext, path: u32, argv: u32) -> Result<u32, Errno> {
    let path = user_pointer(path, 1)?;
    let argv = user_pointer(argv, USER_POINTER_SIZE)?;
    let memory = ctx.user_memory()?;

    let path = memory.copy_in_str(path, PATH_MAX as usize)?;

    let mut args = Vec::new();
    let mut total = 0usize;
    let mut slot = argv;
    loop {
        let mut word = [0u8; 4];
        memory.copy_in(slot, &mut word)?;
        let ptr = u32::from_le_bytes(word);
        if ptr == 0 {
            break;
        }
        let arg = memory
            .copy_in_str(user_pointer(ptr, 1)?, ARG_MAX as usize)
            .map_err(|e| match e {
                VmError::StringTooLong { .. } => Errno::E2BIG,
                other => other.into(),
            })?;
        total += arg.len() + 1 + USER_POINTER_SIZE as usize;
        if total > ARG_MAX as usize {
            return Err(Errno::E2BIG);
        }
        args.push(arg);
        slot = slot.checked_add(USER_POINTER_SIZE).ok_or(Errno::EFAULT)?;
    }

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    Err(ctx.execv(&path, &args))
}

/// Checks a user pointer before anything is done with it.
fn user_pointer(raw: u32, align: u32) -> Result<VirtualAddress, Errno> {
    let addr = VirtualAddress::new(raw);
    if addr.is_null() || !is_user_address(raw) || !addr.is_aligned_to(align) {
        return Err(Errno::EFAULT);
    }
    Ok(addr)
}
