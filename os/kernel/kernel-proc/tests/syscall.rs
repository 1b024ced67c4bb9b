mod common;

use common::{ScriptedUserMode, TEXT_BASE, boot};
use kernel_info::memory::USERSTACK;
use kernel_memory_addresses::VirtualAddress;
use kernel_proc::syscall::dispatch;
use kernel_proc::{Errno, UserContext};
use kernel_syscall::{Sysno, TrapFrame, WNOHANG};
use std::sync::{Arc, mpsc};

const CALL_SITE: u32 = 0x0040_0100;

/// A word on the stack well below the argument block.
const STATUS: u32 = USERSTACK - 0x100;

/// Scratch stack memory for building `execv` arguments.
const SCRATCH: u32 = USERSTACK - 0x1000;

fn call(ctx: &mut UserContext, sysno: Sysno, args: [u32; 4]) -> TrapFrame {
    let mut tf = TrapFrame {
        epc: CALL_SITE,
        ..TrapFrame::syscall(sysno, args)
    };
    dispatch(ctx, &mut tf);
    tf
}

fn poke(ctx: &mut UserContext, addr: u32, bytes: &[u8]) {
    ctx.aspace_mut()
        .unwrap()
        .copy_out(VirtualAddress::new(addr), bytes)
        .unwrap();
}

fn peek(ctx: &mut UserContext, addr: u32) -> u32 {
    let mut word = [0u8; 4];
    ctx.aspace_mut()
        .unwrap()
        .copy_in(VirtualAddress::new(addr), &mut word)
        .unwrap();
    u32::from_le_bytes(word)
}

fn fork_via_trap(
    user: &ScriptedUserMode,
    ctx: &mut UserContext,
    child: impl FnOnce(&mut UserContext) + Send + 'static,
) -> u32 {
    let mut tf = TrapFrame {
        epc: user.resume_point(child),
        ..TrapFrame::syscall(Sysno::Fork, [0; 4])
    };
    dispatch(ctx, &mut tf);
    assert!(!tf.is_error(), "fork failed with {}", tf.v0);
    tf.v0
}

/// Runs `body` as the program of a freshly exec'd process and waits for
/// the whole system to finish.
fn run(body: impl Fn(&mut UserContext, &ScriptedUserMode) + Send + Sync + 'static) {
    let sys = boot(&[("/bin/probe", "probe"), ("/bin/next", "next")]);
    let user = Arc::clone(&sys.user);
    sys.user.program("probe", move |ctx, _tf| body(ctx, &user));
    sys.kernel.run_program("/bin/probe", &["probe"]).unwrap();
    sys.kernel.join_all();
    assert_eq!(sys.kernel.process_count(), 0);
}

#[test]
fn identity_calls_return_in_v0_and_advance_the_pc() {
    let (tx, rx) = mpsc::channel();
    run(move |ctx, user| {
        let pid = call(ctx, Sysno::Getpid, [0; 4]);
        let ppid = call(ctx, Sysno::Getppid, [0; 4]);
        tx.send(("self", pid, ppid, ctx.getpid().get())).unwrap();

        let child_tx = tx.clone();
        let child = fork_via_trap(user, ctx, move |ctx| {
            let ppid = call(ctx, Sysno::Getppid, [0; 4]);
            let pid = call(ctx, Sysno::Getpid, [0; 4]);
            child_tx.send(("child", pid, ppid, ctx.getpid().get())).unwrap();
        });
        let wait = call(ctx, Sysno::Waitpid, [child, STATUS, 0, 0]);
        assert_eq!(wait.v0, child);
    });

    let (_, pid, ppid, own) = rx.recv().unwrap();
    assert_eq!((pid.v0, pid.a3, pid.epc), (own, 0, CALL_SITE + 4));
    assert_eq!((ppid.v0, ppid.a3), (0, 0), "no parent reads as 0");

    let (_, child_pid, child_ppid, child_own) = rx.recv().unwrap();
    assert_eq!(child_pid.v0, child_own);
    assert_eq!(child_ppid.v0, own);
}

#[test]
fn unknown_calls_fail_with_enosys() {
    let (tx, rx) = mpsc::channel();
    run(move |ctx, _| {
        let mut tf = TrapFrame {
            v0: 99,
            epc: CALL_SITE,
            ..TrapFrame::default()
        };
        dispatch(ctx, &mut tf);
        tx.send(tf).unwrap();
    });
    let tf = rx.recv().unwrap();
    assert!(tf.is_error());
    assert_eq!(tf.v0, Errno::ENOSYS.code());
    assert_eq!(tf.epc, CALL_SITE + 4);
}

#[test]
fn waitpid_rejects_bad_arguments_without_reaping() {
    let (tx, rx) = mpsc::channel();
    run(move |ctx, user| {
        let own = ctx.getpid().get();
        let child = fork_via_trap(user, ctx, |ctx| ctx.exit(5));

        let failures = [
            call(ctx, Sysno::Waitpid, [child, 0, 0, 0]),
            call(ctx, Sysno::Waitpid, [child, 0x8000_0000, 0, 0]),
            call(ctx, Sysno::Waitpid, [child, STATUS + 2, 0, 0]),
            call(ctx, Sysno::Waitpid, [child, 0x1000_0000, 0, 0]),
            call(ctx, Sysno::Waitpid, [child, STATUS, 4, 0]),
            call(ctx, Sysno::Waitpid, [0, STATUS, 0, 0]),
            call(ctx, Sysno::Waitpid, [(-4i32).cast_unsigned(), STATUS, 0, 0]),
            call(ctx, Sysno::Waitpid, [own, STATUS, 0, 0]),
        ]
        .map(|tf| (tf.a3, tf.v0));

        let reaped = call(ctx, Sysno::Waitpid, [child, STATUS, 0, 0]);
        let status = peek(ctx, STATUS);
        let again = call(ctx, Sysno::Waitpid, [child, STATUS, 0, 0]);
        tx.send((failures, reaped, status, again, child)).unwrap();
    });

    let (failures, reaped, status, again, child) = rx.recv().unwrap();
    let err = |e: Errno| (1u32, e.code());
    assert_eq!(
        failures,
        [
            err(Errno::EFAULT),
            err(Errno::EFAULT),
            err(Errno::EFAULT),
            err(Errno::EFAULT),
            err(Errno::EINVAL),
            err(Errno::EINVAL),
            err(Errno::EINVAL),
            err(Errno::ECHILD),
        ]
    );
    assert_eq!((reaped.a3, reaped.v0), (0, child));
    assert_eq!(status, 5 << 2);
    assert_eq!((again.a3, again.v0), (1, Errno::ESRCH.code()));
}

#[test]
fn a_read_only_status_word_fails_before_the_child_is_reaped() {
    let (tx, rx) = mpsc::channel();
    run(move |ctx, user| {
        let child = fork_via_trap(user, ctx, |ctx| ctx.exit(5));
        let text = call(ctx, Sysno::Waitpid, [child, TEXT_BASE, 0, 0]);
        let reaped = call(ctx, Sysno::Waitpid, [child, STATUS, 0, 0]);
        tx.send((text, reaped, peek(ctx, STATUS), child)).unwrap();
    });

    let (text, reaped, status, child) = rx.recv().unwrap();
    assert_eq!((text.a3, text.v0), (1, Errno::EFAULT.code()));
    assert_eq!((reaped.a3, reaped.v0), (0, child));
    assert_eq!(status, 5 << 2);
}

#[test]
fn wnohang_returns_zero_while_the_child_runs() {
    let (tx, rx) = mpsc::channel();
    run(move |ctx, user| {
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let child = fork_via_trap(user, ctx, move |ctx| {
            go_rx.recv().unwrap();
            ctx.exit(3);
        });

        poke(ctx, STATUS, &0xdead_beef_u32.to_le_bytes());
        let early = call(ctx, Sysno::Waitpid, [child, STATUS, WNOHANG, 0]);
        let untouched = peek(ctx, STATUS);
        go_tx.send(()).unwrap();
        let late = call(ctx, Sysno::Waitpid, [child, STATUS, 0, 0]);
        tx.send((early, untouched, late, peek(ctx, STATUS), child)).unwrap();
    });

    let (early, untouched, late, status, child) = rx.recv().unwrap();
    assert_eq!((early.a3, early.v0), (0, 0));
    assert_eq!(untouched, 0xdead_beef);
    assert_eq!((late.a3, late.v0), (0, child));
    assert_eq!(status, 3 << 2);
}

#[test]
fn exit_through_the_trap_reports_the_low_byte() {
    let (tx, rx) = mpsc::channel();
    run(move |ctx, user| {
        let child = fork_via_trap(user, ctx, |ctx| {
            call(ctx, Sysno::Exit, [(-1i32).cast_unsigned(), 0, 0, 0]);
            unreachable!("exit returned");
        });
        call(ctx, Sysno::Waitpid, [child, STATUS, 0, 0]);
        tx.send(peek(ctx, STATUS)).unwrap();
    });
    assert_eq!(rx.recv().unwrap(), 0xff << 2);
}

/// Lays out `path` and a NULL-terminated `argv` in scratch memory and
/// returns their addresses.
fn stage_exec(ctx: &mut UserContext, path: &str, argv: &[&str]) -> (u32, u32) {
    let mut strings = Vec::new();
    let strings_base = SCRATCH + 0x100;
    let mut pointers = Vec::new();
    let place = |s: &str, strings: &mut Vec<u8>| {
        let addr = strings_base + u32::try_from(strings.len()).unwrap();
        strings.extend_from_slice(s.as_bytes());
        strings.push(0);
        addr
    };
    let path_addr = place(path, &mut strings);
    for arg in argv {
        pointers.extend_from_slice(&place(arg, &mut strings).to_le_bytes());
    }
    pointers.extend_from_slice(&0u32.to_le_bytes());

    poke(ctx, SCRATCH, &pointers);
    poke(ctx, strings_base, &strings);
    (path_addr, SCRATCH)
}

#[test]
fn execv_reads_its_arguments_from_user_memory() {
    let (tx, rx) = mpsc::channel();
    let sys = boot(&[("/bin/probe", "probe"), ("/bin/next", "next")]);

    let failures_tx = tx.clone();
    sys.user.program("probe", move |ctx, _tf| {
        let (path, argv) = stage_exec(ctx, "/bin/nothing", &["nothing"]);
        let failures = [
            call(ctx, Sysno::Execv, [0, argv, 0, 0]),
            call(ctx, Sysno::Execv, [0x1000_0000, argv, 0, 0]),
            call(ctx, Sysno::Execv, [path, argv + 1, 0, 0]),
            call(ctx, Sysno::Execv, [path, 0x8000_0010, 0, 0]),
            call(ctx, Sysno::Execv, [path, argv, 0, 0]),
        ]
        .map(|tf| (tf.a3, tf.v0, tf.epc));
        failures_tx.send(Err(failures)).unwrap();

        let (path, argv) = stage_exec(ctx, "/bin/next", &["next", "one", "two"]);
        let tf = call(ctx, Sysno::Execv, [path, argv, 0, 0]);
        panic!("execv returned {}", tf.v0);
    });
    sys.user.program("next", move |_ctx, tf| {
        tx.send(Ok((tf.a0, tf.epc))).unwrap();
    });

    let pid = sys.kernel.run_program("/bin/probe", &["probe"]).unwrap();
    sys.kernel.join_all();

    let Err(failures) = rx.recv().unwrap() else {
        panic!("the failures are reported first");
    };
    let err = |e: Errno| (1u32, e.code(), CALL_SITE + 4);
    assert_eq!(
        failures,
        [
            err(Errno::EFAULT),
            err(Errno::EFAULT),
            err(Errno::EFAULT),
            err(Errno::EFAULT),
            err(Errno::ENOENT),
        ]
    );
    assert_eq!(rx.recv().unwrap(), Ok((3, TEXT_BASE)));
    assert_eq!(sys.kernel.process_info(pid), None);
}
