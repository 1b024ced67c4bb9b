use kernel_sync::{Lock, SleepLock, SyncError};
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn contended_lock_is_exclusive() {
    let threads = 8;
    let iters = 1_000;
    let lock = Arc::new(Lock::new("counter", 0usize));
    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let in_cs = Arc::clone(&in_cs);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for _ in 0..iters {
                    let mut g = lock.lock();
                    assert_eq!(in_cs.fetch_add(1, Ordering::SeqCst), 0);
                    assert!(lock.is_held_by_current());
                    *g += 1;
                    in_cs.fetch_sub(1, Ordering::SeqCst);
                    drop(g);
                    assert!(!lock.is_held_by_current());
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(*lock.lock(), threads * iters);
}

#[test]
fn held_by_caller_is_only_true_for_the_owner() {
    let lock = Arc::new(SleepLock::new("owner"));
    lock.acquire();
    assert!(lock.do_i_hold());

    let other = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.do_i_hold())
    };
    assert!(!other.join().unwrap());

    lock.release().unwrap();
    assert!(!lock.do_i_hold());
}

#[test]
fn release_by_non_owner_is_rejected() {
    let lock = Arc::new(SleepLock::new("guarded"));
    lock.acquire();

    let res = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.release()).join().unwrap()
    };
    assert_eq!(
        res,
        Err(SyncError::NotOwner {
            name: "guarded".into()
        })
    );
    assert!(lock.do_i_hold(), "failed release must not drop ownership");

    lock.release().unwrap();
    assert!(lock.release().is_err(), "releasing an unheld lock is an error");
}

#[test]
fn waiter_acquires_after_release() {
    let lock = Arc::new(SleepLock::new("handoff"));
    let start = Arc::new(Barrier::new(2));
    lock.acquire();

    let h = {
        let lock = Arc::clone(&lock);
        let start = Arc::clone(&start);
        thread::spawn(move || {
            start.wait();
            lock.acquire();
            let held = lock.do_i_hold();
            lock.release().unwrap();
            held
        })
    };

    start.wait();
    thread::sleep(std::time::Duration::from_millis(20));
    lock.release().unwrap();
    assert!(h.join().unwrap());
}

#[test]
fn try_acquire_does_not_block() {
    let lock = Arc::new(SleepLock::new("try"));
    assert!(lock.try_acquire());
    let contended = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || lock.try_acquire()).join().unwrap()
    };
    assert!(!contended);
    lock.release().unwrap();
}

#[test]
fn recursive_data_lock_panics_and_unwinds_cleanly() {
    let lock = Lock::new("recursive", 7u32);
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let _outer = lock.lock();
        let _inner = lock.lock();
    }));
    assert!(res.is_err());
    assert!(!lock.is_held_by_current());
    assert_eq!(*lock.try_lock().expect("lock must be free"), 7);
}
