//! # Synchronization Problems
//!
//! Two textbook exercises solved with [`kernel_sync`] locks and condition
//! variables, without busy-waiting:
//!
//! * [`whalemating`]: a male, a female and a matchmaker must all be present
//!   before any of them may leave, and they leave in complete triples.
//! * [`stoplight`]: cars cross a four-quadrant intersection. A car holds
//!   every quadrant on its route while crossing and takes the quadrant locks
//!   in ascending index order, so no two cars share a quadrant and no
//!   cycle of waiting cars can form.

pub mod stoplight;
pub mod whalemating;
