//! Thread-safe sampling of simulated durations.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Mutex;
use thiserror::Error;

/// Error building a [`UniformSampler`].
#[derive(Error, Debug, PartialEq)]
pub enum SamplerError {
    #[error("invalid duration range: min {min} exceeds max {max}")]
    InvalidRange { min: f32, max: f32 },
}

/// Source of simulated durations, in seconds.
///
/// The production implementation samples a bounded uniform distribution;
/// tests inject a [`FixedSampler`] to make run-times deterministic.
pub trait DurationSampler: Send + Sync {
    fn sample(&self) -> f32;
}

/// Uniform sampler over `[min, max)` seconds.
///
/// The RNG is guarded by a mutex: the engine itself is not safe for
/// concurrent mutation, so concurrent callers serialize around it. The
/// distribution needs no such protection.
#[derive(Debug)]
pub struct UniformSampler {
    distribution: Uniform<f32>,
    rng: Mutex<StdRng>,
}

impl UniformSampler {
    pub fn new(min: f32, max: f32) -> Result<Self, SamplerError> {
        if min > max {
            return Err(SamplerError::InvalidRange { min, max });
        }
        Ok(Self {
            distribution: Uniform::new_inclusive(min, max),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }
}

impl DurationSampler for UniformSampler {
    fn sample(&self) -> f32 {
        let mut rng = self.rng.lock().expect("sampler lock poisoned");
        self.distribution.sample(&mut *rng)
    }
}

/// Always returns the same duration. Test double.
pub struct FixedSampler(pub f32);

impl DurationSampler for FixedSampler {
    fn sample(&self) -> f32 {
        self.0
    }
}
