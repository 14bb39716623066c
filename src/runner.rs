//! Runner records and their slot addressing.

use crate::baton::Baton;

/// Position of a runner in the roster: team index and leg index, both
/// zero-based. Leg 0 is the team's starting runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunnerSlot {
    pub team: usize,
    pub leg: usize,
}

impl RunnerSlot {
    pub fn new(team: usize, leg: usize) -> Self {
        Self { team, leg }
    }

    /// Slot of this runner's predecessor, or `None` for a leg-1 runner.
    pub fn predecessor(&self) -> Option<RunnerSlot> {
        if self.leg == 0 {
            None
        } else {
            Some(RunnerSlot::new(self.team, self.leg - 1))
        }
    }
}

/// One runner: identity plus the baton the *next* runner in the team waits
/// on. Cross-references go through [`RunnerSlot`] indices into the race's
/// arena rather than pointers; every runner outlives every worker.
pub struct Runner {
    name: String,
    slot: RunnerSlot,
    baton: Baton,
}

impl Runner {
    pub fn new(name: impl Into<String>, slot: RunnerSlot) -> Self {
        Self {
            name: name.into(),
            slot,
            baton: Baton::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot(&self) -> RunnerSlot {
        self.slot
    }

    pub fn baton(&self) -> &Baton {
        &self.baton
    }

    /// The duration of this runner's own leg, once run.
    pub fn last_leg_time(&self) -> Option<f32> {
        self.baton.leg_time()
    }
}
