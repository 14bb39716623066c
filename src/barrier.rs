//! Reusable cyclic barrier for N-way rendezvous.

use std::sync::{Condvar, Mutex};

struct BarrierState {
    arrived: usize,
    generation: u64,
}

/// Blocks callers until a fixed number of them have arrived, then releases
/// them all together and resets itself for the next rendezvous.
///
/// The generation counter distinguishes release cycles: a waiter woken
/// spuriously (or late) only returns once the generation it arrived in has
/// passed. Calling `arrive_and_wait` from more than `parties` threads
/// concurrently is a caller contract violation.
pub struct CyclicBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    condvar: Condvar,
}

impl CyclicBarrier {
    /// Creates a barrier that trips once `parties` callers have arrived.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is zero.
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "barrier requires at least one party");
        Self {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Number of callers required to trip the barrier.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Blocks until `parties` callers have arrived in the current generation.
    ///
    /// The last arrival advances the generation, resets the arrival count and
    /// wakes every waiter. Safe to call again immediately for the next
    /// rendezvous.
    pub fn arrive_and_wait(&self) {
        let mut state = self.state.lock().expect("barrier lock poisoned");
        let generation = state.generation;
        state.arrived += 1;

        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.condvar.notify_all();
            return;
        }

        // Re-check the generation on every wake-up (spurious wakes).
        while state.generation == generation {
            state = self
                .condvar
                .wait(state)
                .expect("barrier lock poisoned");
        }
    }
}
