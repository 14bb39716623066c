//! Baton hand-off: a single-producer, single-consumer completion signal.

use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
struct BatonState {
    finished: bool,
    leg_time: Option<f32>,
}

/// One runner's hand-off point.
///
/// Each runner owns a baton; the *next* runner in the team waits on it. The
/// owner calls [`pass`](Baton::pass) exactly once when its leg is done; the
/// single waiter re-checks the `finished` predicate on every wake, so a
/// spurious wake-up never lets it through early. Leg-1 runners have no
/// predecessor and never wait.
pub struct Baton {
    state: Mutex<BatonState>,
    passed: Condvar,
}

impl Baton {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BatonState::default()),
            passed: Condvar::new(),
        }
    }

    /// Records the finished leg and wakes the successor, if any is waiting.
    /// The flag flips false→true exactly once per race.
    pub fn pass(&self, leg_time: f32) {
        let mut state = self.state.lock().expect("baton lock poisoned");
        state.leg_time = Some(leg_time);
        state.finished = true;
        self.passed.notify_one();
    }

    /// Blocks until the owner has passed the baton; returns the owner's
    /// recorded leg time. Returns immediately if the baton was already
    /// passed.
    pub fn wait(&self) -> f32 {
        let mut state = self.state.lock().expect("baton lock poisoned");
        while !state.finished {
            state = self.passed.wait(state).expect("baton lock poisoned");
        }
        state
            .leg_time
            .expect("baton passed without a recorded leg time")
    }

    /// The leg time recorded by [`pass`](Baton::pass), if it happened yet.
    pub fn leg_time(&self) -> Option<f32> {
        self.state.lock().expect("baton lock poisoned").leg_time
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().expect("baton lock poisoned").finished
    }
}

impl Default for Baton {
    fn default() -> Self {
        Self::new()
    }
}
