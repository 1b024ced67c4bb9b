//! Whale mating: matches form from one whale of each [`Role`].
//!
//! An arriving whale registers as waiting. The arrival that completes a
//! triple takes one waiter of each role out of the pool and posts the match
//! number to each role's queue; a whale leaves once it has taken a number
//! from its role's queue. Every match number is therefore taken by exactly
//! one male, one female and one matchmaker.

use kernel_sync::{Condvar, Lock};
use log::debug;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Male,
    Female,
    Matchmaker,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Male, Self::Female, Self::Matchmaker];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Number of a completed match, counting from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Match(pub u64);

#[derive(Debug, Default)]
struct Pool {
    waiting: [u32; 3],
    admitted: [VecDeque<Match>; 3],
    matches: u64,
}

impl Pool {
    fn try_match(&mut self) -> Option<Match> {
        if self.waiting.contains(&0) {
            return None;
        }
        self.matches += 1;
        let m = Match(self.matches);
        for (waiting, admitted) in self.waiting.iter_mut().zip(&mut self.admitted) {
            *waiting -= 1;
            admitted.push_back(m);
        }
        Some(m)
    }
}

/// The meeting place.
pub struct WhaleMating {
    pool: Lock<Pool>,
    matched: Condvar,
}

impl Default for WhaleMating {
    fn default() -> Self {
        Self::new()
    }
}

impl WhaleMating {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: Lock::new("whalemating", Pool::default()),
            matched: Condvar::new("whalemating.matched"),
        }
    }

    pub fn male(&self) -> Match {
        self.arrive(Role::Male)
    }

    pub fn female(&self) -> Match {
        self.arrive(Role::Female)
    }

    pub fn matchmaker(&self) -> Match {
        self.arrive(Role::Matchmaker)
    }

    /// Blocks until a whale of `role` is part of a complete match and
    /// returns that match.
    pub fn arrive(&self, role: Role) -> Match {
        let r = role.index();
        let mut pool = self.pool.lock();
        pool.waiting[r] += 1;
        if let Some(m) = pool.try_match() {
            debug!("whalemating: match {} formed by a {role:?}", m.0);
            self.matched.broadcast(&pool);
        }

        let mut pool = self.matched.wait_while(pool, |p| p.admitted[r].is_empty());
        let Some(m) = pool.admitted[r].pop_front() else {
            unreachable!("whalemating: {role:?} woken without a match");
        };
        m
    }

    /// Whales of `role` still waiting for a match.
    #[must_use]
    pub fn waiting(&self, role: Role) -> u32 {
        self.pool.lock().waiting[role.index()]
    }

    /// Matches completed so far.
    #[must_use]
    pub fn matches(&self) -> u64 {
        self.pool.lock().matches
    }
}
