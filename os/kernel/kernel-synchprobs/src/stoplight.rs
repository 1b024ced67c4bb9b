//! Four-way stop: cars cross an intersection split into four quadrants.
//!
//! ```text
//!        | N |
//!      --     --
//!         0 1
//!      W       E
//!         3 2
//!      --     --
//!        | S |
//! ```
//!
//! A car entering from direction `d` drives on the right and enters
//! quadrant `d` first. Going straight it also crosses `(d + 3) % 4`; turning
//! left it continues into `(d + 2) % 4`.

use kernel_sync::{Lock, LockGuard};
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Turn {
    Right,
    Straight,
    Left,
}

impl Turn {
    pub const ALL: [Self; 3] = [Self::Right, Self::Straight, Self::Left];
}

/// Index of a quadrant, `0..4`.
pub type Quadrant = usize;

/// What a car reports while crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Enter(Quadrant),
    /// The car is out; its quadrants are released after this.
    Leave,
}

/// Quadrants a car from `from` crosses, in driving order.
#[must_use]
pub fn route(from: Direction, turn: Turn) -> Vec<Quadrant> {
    let d = from as usize;
    let path = [d, (d + 3) % 4, (d + 2) % 4];
    let len = match turn {
        Turn::Right => 1,
        Turn::Straight => 2,
        Turn::Left => 3,
    };
    path[..len].to_vec()
}

/// The intersection. Each quadrant lock counts the cars that crossed it.
pub struct Intersection {
    quadrants: [Lock<u64>; 4],
}

impl Default for Intersection {
    fn default() -> Self {
        Self::new()
    }
}

impl Intersection {
    #[must_use]
    pub fn new() -> Self {
        Self {
            quadrants: core::array::from_fn(|q| Lock::new(format!("quadrant {q}"), 0)),
        }
    }

    /// Drives one car through, reporting each quadrant entered and then the
    /// exit to `observe`. Every report happens while the car owns all the
    /// quadrants of its route.
    pub fn pass(&self, from: Direction, turn: Turn, mut observe: impl FnMut(Event)) {
        let path = route(from, turn);

        let mut order = path.clone();
        order.sort_unstable();
        let mut held: Vec<(Quadrant, LockGuard<'_, u64>)> = order
            .into_iter()
            .map(|q| (q, self.quadrants[q].lock()))
            .collect();

        for &q in &path {
            if let Some((_, crossings)) = held.iter_mut().find(|(held_q, _)| *held_q == q) {
                **crossings += 1;
            }
            observe(Event::Enter(q));
        }
        observe(Event::Leave);
        trace!("stoplight: {turn:?} from {from:?} through {path:?}");

        // Release in reverse acquisition order.
        while let Some(guard) = held.pop() {
            drop(guard);
        }
    }

    /// Cars that crossed quadrant `q` so far.
    ///
    /// # Panics
    /// Panics if `q` is not below 4.
    #[must_use]
    pub fn crossings(&self, q: Quadrant) -> u64 {
        *self.quadrants[q].lock()
    }
}
