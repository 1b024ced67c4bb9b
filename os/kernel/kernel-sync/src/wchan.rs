use crate::SpinMutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

/// A named queue of threads blocked pending a wakeup.
///
/// The queue itself is guarded by a spin lock, so enqueueing and waking are
/// non-blocking. A wait channel carries no condition of its own; callers
/// re-check their condition after every wakeup.
pub struct WaitChannel {
    name: String,
    sleepers: SpinMutex<VecDeque<Arc<Sleeper>>>,
}

struct Sleeper {
    thread: Thread,
    woken: AtomicBool,
}

/// A published intent to sleep on a [`WaitChannel`].
///
/// Obtained with [`WaitChannel::prepare_sleep`] while the caller still holds
/// the guard protecting its condition; [`sleep`](Self::sleep) is called after
/// that guard is released. A wakeup delivered in between is not lost.
#[must_use = "a prepared sleeper must sleep or it will absorb a wakeup"]
pub struct SleepTicket {
    sleeper: Arc<Sleeper>,
}

impl WaitChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sleepers: SpinMutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueues the calling thread.
    pub fn prepare_sleep(&self) -> SleepTicket {
        let sleeper = Arc::new(Sleeper {
            thread: thread::current(),
            woken: AtomicBool::new(false),
        });
        self.sleepers.lock().push_back(Arc::clone(&sleeper));
        SleepTicket { sleeper }
    }

    /// Wakes one queued thread, if any. Returns whether a thread was woken.
    pub fn wake_one(&self) -> bool {
        let sleeper = self.sleepers.lock().pop_front();
        sleeper.is_some_and(|s| {
            s.wake();
            true
        })
    }

    /// Wakes every queued thread and returns how many there were.
    pub fn wake_all(&self) -> usize {
        let sleepers = core::mem::take(&mut *self.sleepers.lock());
        let n = sleepers.len();
        for s in sleepers {
            s.wake();
        }
        n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sleepers.lock().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sleepers.lock().len()
    }
}

impl Drop for WaitChannel {
    fn drop(&mut self) {
        if thread::panicking() {
            return;
        }
        assert!(
            self.sleepers.get_mut().is_empty(),
            "wait channel {:?} destroyed with sleeping threads",
            self.name
        );
    }
}

impl Sleeper {
    fn wake(&self) {
        self.woken.store(true, Ordering::Release);
        self.thread.unpark();
    }
}

impl SleepTicket {
    /// Suspends the calling thread until it is woken.
    pub fn sleep(self) {
        // park() may return spuriously; only the flag counts.
        while !self.sleeper.woken.load(Ordering::Acquire) {
            thread::park();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_on_empty_channel_is_a_no_op() {
        let wc = WaitChannel::new("empty");
        assert!(!wc.wake_one());
        assert_eq!(wc.wake_all(), 0);
        assert!(wc.is_empty());
    }

    #[test]
    fn wakeup_between_prepare_and_sleep_is_not_lost() {
        let wc = WaitChannel::new("early");
        let ticket = wc.prepare_sleep();
        assert_eq!(wc.len(), 1);
        assert!(wc.wake_one());
        // Would park forever if the wakeup had been dropped.
        ticket.sleep();
        assert!(wc.is_empty());
    }

    #[test]
    fn wake_all_releases_every_sleeper() {
        let wc = Arc::new(WaitChannel::new("all"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let wc = Arc::clone(&wc);
                let (tx, rx) = std::sync::mpsc::channel();
                let h = thread::spawn(move || {
                    let ticket = wc.prepare_sleep();
                    tx.send(()).unwrap();
                    ticket.sleep();
                });
                rx.recv().unwrap();
                h
            })
            .collect();

        assert_eq!(wc.wake_all(), 4);
        for h in handles {
            h.join().unwrap();
        }
    }
}
