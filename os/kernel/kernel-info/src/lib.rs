//! # Kernel Configuration and Memory Layout
//!
//! The single source of truth for values shared by the frame allocator, the
//! address-space manager and the process subsystem.
//!
//! * [`memory`]: compile-time layout constants (user/kernel split, the
//!   direct-mapped kernel segment, stack placement, argument limits). Layout
//!   relations are checked by `const` assertions, so an inconsistent edit
//!   fails the build.
//! * [`config`]: [`KernelConfig`](config::KernelConfig), the boot-time
//!   tunables (RAM size, process table capacity, log level) and their
//!   validation.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod memory;
