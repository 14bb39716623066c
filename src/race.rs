//! Race orchestration: roster wiring, worker threads, start sequence,
//! winner arbitration and final results.

use crate::barrier::CyclicBarrier;
use crate::report::Reporter;
use crate::runner::{Runner, RunnerSlot};
use crate::sampler::{DurationSampler, SamplerError, UniformSampler};
use crate::team::Team;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Construction-time contract violations. Nothing here is recoverable
/// mid-race; a `Race` that constructs successfully runs to completion.
#[derive(Error, Debug)]
pub enum RaceError {
    #[error("a race needs at least one team")]
    EmptyRoster,
    #[error("team {0} has no runners")]
    EmptyTeam(String),
    #[error("all teams must field the same number of runners")]
    UnevenTeams,
    #[error("drop slot {0:?} is out of range or a starting leg")]
    InvalidDropSlot(RunnerSlot),
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

/// How the dropped-baton runner is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    /// Uniform over every slot except each team's starting leg. The default.
    Random,
    /// Exactly this slot drops the baton. Must not be a starting leg.
    Pinned(RunnerSlot),
    /// Nobody drops the baton.
    Disabled,
}

/// Tunables for one race. The defaults match the simulated 4x100m relay:
/// legs of 10-12 s, a 1-3 s fumble plus a fixed 2 s recovery penalty, and a
/// 3-5 s starter-gun delay.
#[derive(Debug, Clone)]
pub struct RaceConfig {
    pub leg_range: (f32, f32),
    pub drop_range: (f32, f32),
    pub recovery_penalty_secs: f32,
    pub starter_range: (f32, f32),
    /// Wall-clock seconds slept per simulated second. Recorded times are
    /// always in simulated seconds, whatever the scale.
    pub time_scale: f32,
    pub drop_policy: DropPolicy,
    /// Suppress per-runner progress output.
    pub quiet: bool,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            leg_range: (10.0, 12.0),
            drop_range: (1.0, 3.0),
            recovery_penalty_secs: 2.0,
            starter_range: (3.0, 5.0),
            time_scale: 1.0,
            drop_policy: DropPolicy::Random,
            quiet: false,
        }
    }
}

/// One team's entry in the roster: team name plus runner names in leg order.
#[derive(Debug, Clone)]
pub struct RosterTeam {
    pub name: String,
    pub runners: Vec<String>,
}

impl RosterTeam {
    pub fn new<N, R, I>(name: N, runners: I) -> Self
    where
        N: Into<String>,
        R: Into<String>,
        I: IntoIterator<Item = R>,
    {
        Self {
            name: name.into(),
            runners: runners.into_iter().map(Into::into).collect(),
        }
    }
}

/// Shared race state: explicit, passed to every worker at spawn. No
/// process-wide singletons.
struct RaceContext {
    winner: AtomicBool,
    winner_team: Mutex<Option<usize>>,
    announcements: AtomicUsize,
    drop_slot: Option<RunnerSlot>,
    finish_order: Mutex<Vec<RunnerSlot>>,
    reporter: Reporter,
}

/// The arena: every team, runner, barrier and shared knob, owned in one
/// place and outliving every worker thread by construction.
struct RaceState {
    teams: Vec<Team>,
    runners: Vec<Vec<Runner>>,
    legs_per_team: usize,
    ready: CyclicBarrier,
    go: CyclicBarrier,
    leg_sampler: Arc<dyn DurationSampler>,
    drop_sampler: Arc<dyn DurationSampler>,
    recovery_penalty_secs: f32,
    time_scale: f32,
    ctx: RaceContext,
}

impl RaceState {
    fn runner(&self, slot: RunnerSlot) -> &Runner {
        &self.runners[slot.team][slot.leg]
    }

    /// Sleeps `secs` simulated seconds of "running".
    fn sleep(&self, secs: f32) {
        let wall = (secs * self.time_scale).max(0.0);
        thread::sleep(Duration::from_secs_f32(wall));
    }
}

/// Final standing of one team, in roster order.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamResult {
    pub name: String,
    pub total_time: f32,
    pub exchange_count: usize,
}

/// Everything a caller learns from a finished race.
#[derive(Debug, Clone)]
pub struct RaceOutcome {
    pub teams: Vec<TeamResult>,
    /// Roster index of the team that won the arbitration, if any leg ran.
    pub winner: Option<usize>,
    /// How many winner announcements were made. The arbitration contract
    /// guarantees this never exceeds one.
    pub announcements: usize,
    /// Per-runner leg times, indexed `[team][leg]`, in simulated seconds.
    pub leg_times: Vec<Vec<f32>>,
    /// Runners in the order they completed their legs.
    pub finish_order: Vec<RunnerSlot>,
}

/// Orchestrates one relay race: builds the roster arena, spawns one thread
/// per runner, fires the two-phase start, joins everyone and reports.
pub struct Race {
    state: Arc<RaceState>,
    starter_range: (f32, f32),
}

impl fmt::Debug for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Race")
            .field("starter_range", &self.starter_range)
            .finish_non_exhaustive()
    }
}

impl Race {
    /// Builds a race with uniform samplers from the config's ranges.
    pub fn new(roster: Vec<RosterTeam>, config: RaceConfig) -> Result<Self, RaceError> {
        let leg_sampler: Arc<dyn DurationSampler> =
            Arc::new(UniformSampler::new(config.leg_range.0, config.leg_range.1)?);
        let drop_sampler: Arc<dyn DurationSampler> =
            Arc::new(UniformSampler::new(config.drop_range.0, config.drop_range.1)?);
        Self::with_samplers(roster, config, leg_sampler, drop_sampler)
    }

    /// Builds a race with injected samplers. This is how tests pin leg and
    /// drop durations to exact values.
    pub fn with_samplers(
        roster: Vec<RosterTeam>,
        config: RaceConfig,
        leg_sampler: Arc<dyn DurationSampler>,
        drop_sampler: Arc<dyn DurationSampler>,
    ) -> Result<Self, RaceError> {
        if roster.is_empty() {
            return Err(RaceError::EmptyRoster);
        }
        let legs_per_team = roster[0].runners.len();
        for entry in &roster {
            if entry.runners.is_empty() {
                return Err(RaceError::EmptyTeam(entry.name.clone()));
            }
            if entry.runners.len() != legs_per_team {
                return Err(RaceError::UnevenTeams);
            }
        }

        let drop_slot = Self::pick_drop_slot(&roster, legs_per_team, config.drop_policy)?;

        let teams: Vec<Team> = roster.iter().map(|entry| Team::new(&entry.name)).collect();
        let runners: Vec<Vec<Runner>> = roster
            .iter()
            .enumerate()
            .map(|(team, entry)| {
                entry
                    .runners
                    .iter()
                    .enumerate()
                    .map(|(leg, name)| Runner::new(name, RunnerSlot::new(team, leg)))
                    .collect()
            })
            .collect();

        let worker_count = teams.len() * legs_per_team;
        let state = RaceState {
            teams,
            runners,
            legs_per_team,
            // The orchestrator is counted at both rendezvous: nothing starts
            // until it is ready, and nothing runs until it releases the gun.
            ready: CyclicBarrier::new(worker_count + 1),
            go: CyclicBarrier::new(worker_count + 1),
            leg_sampler,
            drop_sampler,
            recovery_penalty_secs: config.recovery_penalty_secs,
            time_scale: config.time_scale,
            ctx: RaceContext {
                winner: AtomicBool::new(false),
                winner_team: Mutex::new(None),
                announcements: AtomicUsize::new(0),
                drop_slot,
                finish_order: Mutex::new(Vec::with_capacity(worker_count)),
                reporter: Reporter::new(config.quiet),
            },
        };

        Ok(Self {
            state: Arc::new(state),
            starter_range: config.starter_range,
        })
    }

    fn pick_drop_slot(
        roster: &[RosterTeam],
        legs_per_team: usize,
        policy: DropPolicy,
    ) -> Result<Option<RunnerSlot>, RaceError> {
        match policy {
            DropPolicy::Disabled => Ok(None),
            DropPolicy::Pinned(slot) => {
                if slot.team >= roster.len() || slot.leg == 0 || slot.leg >= legs_per_team {
                    return Err(RaceError::InvalidDropSlot(slot));
                }
                Ok(Some(slot))
            }
            DropPolicy::Random => {
                // Every slot except each team's starting leg is eligible.
                let eligible: Vec<RunnerSlot> = (0..roster.len())
                    .flat_map(|team| (1..legs_per_team).map(move |leg| RunnerSlot::new(team, leg)))
                    .collect();
                if eligible.is_empty() {
                    // Single-leg teams: nobody can drop mid-exchange.
                    return Ok(None);
                }
                let pick = rand::thread_rng().gen_range(0..eligible.len());
                Ok(Some(eligible[pick]))
            }
        }
    }

    /// The pre-selected dropped-baton slot, fixed before any worker starts.
    pub fn drop_slot(&self) -> Option<RunnerSlot> {
        self.state.ctx.drop_slot
    }

    /// Runs the race to completion: spawn, two-phase start, join, report.
    pub fn run(self) -> RaceOutcome {
        let mut handles = Vec::with_capacity(self.state.teams.len() * self.state.legs_per_team);
        for team in 0..self.state.teams.len() {
            for leg in 0..self.state.legs_per_team {
                let slot = RunnerSlot::new(team, leg);
                let state = Arc::clone(&self.state);
                let handle = thread::Builder::new()
                    .name(format!("team-{}-leg-{}", team + 1, leg + 1))
                    .spawn(move || run_leg(&state, slot))
                    .expect("failed to spawn runner thread");
                handles.push(handle);
            }
        }

        self.state.ready.arrive_and_wait();
        self.state
            .ctx
            .reporter
            .progress("\nThe race official raises her starting pistol...");

        let starter_delay = rand::thread_rng().gen_range(
            self.starter_range.0..=self.starter_range.1.max(self.starter_range.0),
        );
        self.state.sleep(starter_delay);

        self.state.go.arrive_and_wait();
        self.state.ctx.reporter.progress("\nGO !\n");

        for handle in handles {
            // A panicking worker means a broken synchronization invariant;
            // surface it here rather than reporting a half-run race.
            handle.join().expect("runner thread panicked");
        }

        self.into_outcome()
    }

    fn into_outcome(self) -> RaceOutcome {
        let state = &self.state;
        let teams = state
            .teams
            .iter()
            .map(|team| {
                let (total_time, exchange_count) = team.snapshot();
                TeamResult {
                    name: team.name().to_string(),
                    total_time,
                    exchange_count,
                }
            })
            .collect();
        let leg_times = state
            .runners
            .iter()
            .map(|team| {
                team.iter()
                    .map(|runner| {
                        runner
                            .last_leg_time()
                            .expect("runner joined without recording a leg time")
                    })
                    .collect()
            })
            .collect();
        let finish_order = state
            .ctx
            .finish_order
            .lock()
            .expect("finish order lock poisoned")
            .clone();

        RaceOutcome {
            teams,
            winner: *state.ctx.winner_team.lock().expect("winner lock poisoned"),
            announcements: state.ctx.announcements.load(Ordering::SeqCst),
            leg_times,
            finish_order,
        }
    }
}

/// One runner's whole race, from the ready line to the hand-off (or the
/// finish line, for the anchor leg).
fn run_leg(state: &RaceState, slot: RunnerSlot) {
    let runner = state.runner(slot);
    let team = &state.teams[slot.team];
    let ctx = &state.ctx;

    ctx.reporter
        .progress(&format!("{} ready,", runner.name()));
    state.ready.arrive_and_wait();
    state.go.arrive_and_wait();

    match slot.predecessor() {
        None => {
            ctx.reporter
                .progress(&format!("{} started, ({})", runner.name(), team.name()));
        }
        Some(prev) => {
            let prev_runner = state.runner(prev);
            prev_runner.baton().wait();
            ctx.reporter.progress(&format!(
                "{} ({}) took the baton from {}",
                runner.name(),
                team.name(),
                prev_runner.name()
            ));
        }
    }

    let mut leg_secs = state.leg_sampler.sample();

    if ctx.drop_slot == Some(slot) {
        let drop_secs = state.drop_sampler.sample();
        state.sleep(drop_secs);
        ctx.reporter
            .progress(&format!("{} dropped the baton. ({})", runner.name(), team.name()));
        ctx.reporter.progress(&format!(
            "{} picked up the baton. ({} + {:.2} s + {:.0} s penalty)",
            runner.name(),
            team.name(),
            drop_secs,
            state.recovery_penalty_secs
        ));
        leg_secs += drop_secs + state.recovery_penalty_secs;
    }

    state.sleep(leg_secs);

    // Record the leg, then hand over: the successor may only start once this
    // leg's time is in the team aggregate.
    let exchanges = team.add_leg_time(leg_secs);
    ctx.finish_order
        .lock()
        .expect("finish order lock poisoned")
        .push(slot);
    runner.baton().pass(leg_secs);

    ctx.reporter.progress(&format!(
        "Leg {}: {} ran in {:.2} seconds. ({})",
        slot.leg + 1,
        runner.name(),
        leg_secs,
        team.name()
    ));

    if exchanges == state.legs_per_team {
        // First past the post claims the flag; everyone else finishes
        // silently, full exchange count and all.
        if !ctx.winner.swap(true, Ordering::SeqCst) {
            *ctx.winner_team.lock().expect("winner lock poisoned") = Some(slot.team);
            ctx.announcements.fetch_add(1, Ordering::SeqCst);
            ctx.reporter.winner(team.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::FixedSampler;
    use std::collections::HashMap;

    fn quiet_config() -> RaceConfig {
        RaceConfig {
            starter_range: (0.0, 0.0),
            time_scale: 0.005,
            drop_policy: DropPolicy::Disabled,
            quiet: true,
            ..RaceConfig::default()
        }
    }

    fn two_by_two() -> Vec<RosterTeam> {
        vec![
            RosterTeam::new("Alpha", ["A1", "A2"]),
            RosterTeam::new("Beta", ["B1", "B2"]),
        ]
    }

    fn four_by_four() -> Vec<RosterTeam> {
        (0..4)
            .map(|t| {
                RosterTeam::new(
                    format!("Team {t}"),
                    (0..4).map(|l| format!("Runner {t}-{l}")),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_roster_rejected() {
        let err = Race::new(vec![], quiet_config()).unwrap_err();
        assert!(matches!(err, RaceError::EmptyRoster));
    }

    #[test]
    fn test_empty_team_rejected() {
        let roster = vec![RosterTeam::new("Ghosts", Vec::<String>::new())];
        let err = Race::new(roster, quiet_config()).unwrap_err();
        assert!(matches!(err, RaceError::EmptyTeam(name) if name == "Ghosts"));
    }

    #[test]
    fn test_uneven_teams_rejected() {
        let roster = vec![
            RosterTeam::new("Alpha", ["A1", "A2"]),
            RosterTeam::new("Beta", ["B1"]),
        ];
        let err = Race::new(roster, quiet_config()).unwrap_err();
        assert!(matches!(err, RaceError::UnevenTeams));
    }

    #[test]
    fn test_pinned_drop_slot_must_not_be_starting_leg() {
        let config = RaceConfig {
            drop_policy: DropPolicy::Pinned(RunnerSlot::new(0, 0)),
            ..quiet_config()
        };
        let err = Race::new(two_by_two(), config).unwrap_err();
        assert!(matches!(err, RaceError::InvalidDropSlot(_)));
    }

    #[test]
    fn test_random_drop_slot_never_starting_leg() {
        let config = RaceConfig {
            drop_policy: DropPolicy::Random,
            ..quiet_config()
        };
        for _ in 0..10_000 {
            let race = Race::new(four_by_four(), config.clone()).unwrap();
            let slot = race.drop_slot().expect("random policy always picks");
            assert!(slot.leg > 0, "drop slot landed on a starting leg");
            assert!(slot.team < 4 && slot.leg < 4);
        }
    }

    #[test]
    fn test_random_drop_slot_roughly_uniform() {
        let config = RaceConfig {
            drop_policy: DropPolicy::Random,
            ..quiet_config()
        };
        let trials = 12_000;
        let mut counts: HashMap<RunnerSlot, usize> = HashMap::new();
        for _ in 0..trials {
            let race = Race::new(four_by_four(), config.clone()).unwrap();
            *counts.entry(race.drop_slot().unwrap()).or_default() += 1;
        }

        // 12 eligible slots, expected 1000 each; allow a wide band.
        assert_eq!(counts.len(), 12);
        for (slot, count) in counts {
            assert!(
                (700..=1300).contains(&count),
                "slot {slot:?} drawn {count} times"
            );
        }
    }

    #[test]
    fn test_end_to_end_fixed_legs_no_drop() {
        let race = Race::with_samplers(
            two_by_two(),
            quiet_config(),
            Arc::new(FixedSampler(1.0)),
            Arc::new(FixedSampler(0.0)),
        )
        .unwrap();
        let outcome = race.run();

        for team in &outcome.teams {
            assert_eq!(team.exchange_count, 2);
            assert!((team.total_time - 2.0).abs() < 1e-5, "{team:?}");
        }
        assert_eq!(outcome.announcements, 1);
        assert!(outcome.winner.is_some());

        // Leg-time consistency: per-runner times sum to the team total.
        for (team, legs) in outcome.teams.iter().zip(&outcome.leg_times) {
            let sum: f32 = legs.iter().sum();
            assert!((sum - team.total_time).abs() < 1e-5);
        }
    }

    #[test]
    fn test_hand_off_ordering_within_each_team() {
        let race = Race::with_samplers(
            four_by_four(),
            quiet_config(),
            Arc::new(FixedSampler(0.5)),
            Arc::new(FixedSampler(0.0)),
        )
        .unwrap();
        let outcome = race.run();

        assert_eq!(outcome.finish_order.len(), 16);
        for team in 0..4 {
            let legs: Vec<usize> = outcome
                .finish_order
                .iter()
                .filter(|slot| slot.team == team)
                .map(|slot| slot.leg)
                .collect();
            assert_eq!(legs, vec![0, 1, 2, 3], "team {team} legs out of order");
        }
    }

    #[test]
    fn test_pinned_drop_penalty_applied_exactly_once() {
        let dropper = RunnerSlot::new(1, 1);
        let config = RaceConfig {
            drop_policy: DropPolicy::Pinned(dropper),
            ..quiet_config()
        };
        let race = Race::with_samplers(
            two_by_two(),
            config,
            Arc::new(FixedSampler(1.0)),
            Arc::new(FixedSampler(1.5)),
        )
        .unwrap();
        let outcome = race.run();

        // base 1.0 + drop 1.5 + fixed 2.0 recovery penalty
        assert!((outcome.leg_times[1][1] - 4.5).abs() < 1e-5);
        // Everyone else ran a clean 1.0 s leg.
        assert!((outcome.leg_times[0][0] - 1.0).abs() < 1e-5);
        assert!((outcome.leg_times[0][1] - 1.0).abs() < 1e-5);
        assert!((outcome.leg_times[1][0] - 1.0).abs() < 1e-5);

        assert!((outcome.teams[0].total_time - 2.0).abs() < 1e-5);
        assert!((outcome.teams[1].total_time - 5.5).abs() < 1e-5);
    }

    #[test]
    fn test_winner_unique_under_simultaneous_finishes() {
        // Identical zero-length legs make every team finish in the same
        // instant; arbitration must still announce exactly once.
        for _ in 0..50 {
            let config = RaceConfig {
                time_scale: 0.0,
                ..quiet_config()
            };
            let race = Race::with_samplers(
                four_by_four(),
                config,
                Arc::new(FixedSampler(0.0)),
                Arc::new(FixedSampler(0.0)),
            )
            .unwrap();
            let outcome = race.run();
            assert_eq!(outcome.announcements, 1);
            let winner = outcome.winner.expect("someone must win");
            assert_eq!(outcome.teams[winner].exchange_count, 4);
        }
    }

    #[test]
    fn test_all_teams_complete_even_when_not_winning() {
        let race = Race::with_samplers(
            four_by_four(),
            quiet_config(),
            Arc::new(FixedSampler(0.2)),
            Arc::new(FixedSampler(0.0)),
        )
        .unwrap();
        let outcome = race.run();

        // The losers finish silently but fully.
        for team in &outcome.teams {
            assert_eq!(team.exchange_count, 4);
        }
        assert_eq!(outcome.announcements, 1);
    }
}
