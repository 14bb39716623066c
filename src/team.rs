//! Per-team accumulation of leg times and completed exchanges.

use std::sync::Mutex;

#[derive(Debug, Default, Clone, Copy)]
struct TeamStats {
    total_time: f32,
    exchange_count: usize,
}

/// Running totals for one team.
///
/// Mutated by that team's runner workers. The hand-off chain serializes their
/// calls in practice, but the mutex makes the aggregate safe regardless of
/// how callers are scheduled.
pub struct Team {
    name: String,
    stats: Mutex<TeamStats>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats: Mutex::new(TeamStats::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds one completed leg: the time and the exchange count move together
    /// in a single critical section.
    ///
    /// Returns the team's exchange count after this leg, which is how a
    /// worker learns it just completed the final leg.
    pub fn add_leg_time(&self, duration: f32) -> usize {
        let mut stats = self.stats.lock().expect("team lock poisoned");
        stats.total_time += duration;
        stats.exchange_count += 1;
        stats.exchange_count
    }

    /// Current `(total_time, exchange_count)`. Intended for reporting after
    /// all workers have joined, when no writers remain.
    pub fn snapshot(&self) -> (f32, usize) {
        let stats = self.stats.lock().expect("team lock poisoned");
        (stats.total_time, stats.exchange_count)
    }
}
