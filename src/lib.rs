//! Multi-team relay race simulation.
//!
//! Each runner is an OS thread. The interesting parts are the synchronization
//! pieces the race is built from:
//!
//! * [`CyclicBarrier`] — reusable N-way rendezvous ("all ready", then "go")
//! * [`Baton`] — single-producer/single-consumer hand-off between a runner
//!   and the next leg of the same team
//! * [`Race`] — orchestration, dropped-baton injection, and exactly-once
//!   winner arbitration via an atomic flag
//!
//! Run the simulation with `cargo run`; durations are sampled in simulated
//! seconds (legs of 10-12 s by default) and slept for real, scaled by
//! [`RaceConfig::time_scale`].

pub mod barrier;
pub mod baton;
pub mod race;
pub mod report;
pub mod runner;
pub mod sampler;
pub mod team;

pub use barrier::CyclicBarrier;
pub use baton::Baton;
pub use race::{DropPolicy, Race, RaceConfig, RaceError, RaceOutcome, RosterTeam, TeamResult};
pub use runner::{Runner, RunnerSlot};
pub use sampler::{DurationSampler, FixedSampler, SamplerError, UniformSampler};
pub use team::Team;
