//! Per-CPU interrupt-context tracking.
//!
//! Blocking primitives must never be entered from an interrupt handler: the
//! handler borrows the interrupted thread's context and cannot sleep on its
//! own. Trap entry marks the CPU with an [`InterruptContext`] guard for the
//! duration of the handler and the sleeping primitives assert the flag is
//! clear before they block.

use std::cell::Cell;
use std::marker::PhantomData;

std::thread_local! {
    static IN_INTERRUPT: Cell<bool> = const { Cell::new(false) };
}

/// Returns `true` while the current CPU is running an interrupt handler.
#[inline]
#[must_use]
pub fn in_interrupt() -> bool {
    IN_INTERRUPT.with(Cell::get)
}

/// RAII guard marking the current CPU as handling an interrupt.
///
/// Nesting is allowed; the previous state is restored on drop.
///
/// # Examples
///
/// ```
/// use kernel_sync::{InterruptContext, in_interrupt};
///
/// assert!(!in_interrupt());
/// {
///     let _irq = InterruptContext::enter();
///     assert!(in_interrupt());
/// }
/// assert!(!in_interrupt());
/// ```
pub struct InterruptContext {
    was_set: bool,
    _cpu_local: PhantomData<*const ()>,
}

impl InterruptContext {
    #[must_use]
    pub fn enter() -> Self {
        let was_set = IN_INTERRUPT.with(|flag| flag.replace(true));
        Self {
            was_set,
            _cpu_local: PhantomData,
        }
    }
}

impl Drop for InterruptContext {
    fn drop(&mut self) {
        IN_INTERRUPT.with(|flag| flag.set(self.was_set));
    }
}

#[inline]
pub(crate) fn assert_can_sleep(what: &str) {
    assert!(!in_interrupt(), "{what}: cannot block in interrupt context");
}
