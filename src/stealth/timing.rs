//! Statistical delay generation
//!
//! Every humanised pause in the crate is drawn here. Normal profiles use a
//! Box-Muller transform over the model's own generator so a fixed seed
//! reproduces the exact same delays.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;

/// Lower bound for the first uniform draw so `ln(u1)` stays finite
const MIN_UNIFORM: f64 = 0.0001;

/// Shape of a delay distribution, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DelayProfile {
    Normal {
        mean_ms: f64,
        std_dev_ms: f64,
        #[serde(default)]
        min_ms: Option<u64>,
        #[serde(default)]
        max_ms: Option<u64>,
    },
    Uniform {
        min_ms: u64,
        max_ms: u64,
    },
}

impl DelayProfile {
    pub fn uniform(min_ms: u64, max_ms: u64) -> Self {
        DelayProfile::Uniform { min_ms, max_ms }
    }

    /// Normal distribution centred on the range, σ = range / 4, clamped to it
    pub fn between(min_ms: u64, max_ms: u64) -> Self {
        let (lo, hi) = if min_ms <= max_ms { (min_ms, max_ms) } else { (max_ms, min_ms) };
        DelayProfile::Normal {
            mean_ms: (lo + hi) as f64 / 2.0,
            std_dev_ms: (hi - lo) as f64 / 4.0,
            min_ms: Some(lo),
            max_ms: Some(hi),
        }
    }
}

/// Seedable delay generator
#[derive(Debug)]
pub struct TimingModel {
    rng: StdRng,
}

impl TimingModel {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Generator shared with the model that owns this timing source
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Draw one delay from `profile`
    pub fn sample(&mut self, profile: &DelayProfile) -> Duration {
        let ms = match profile {
            DelayProfile::Normal {
                mean_ms,
                std_dev_ms,
                min_ms,
                max_ms,
            } => {
                let mut v = mean_ms + self.standard_normal() * std_dev_ms;
                if let Some(lo) = min_ms {
                    v = v.max(*lo as f64);
                }
                if let Some(hi) = max_ms {
                    v = v.min(*hi as f64);
                }
                v
            }
            DelayProfile::Uniform { min_ms, max_ms } => {
                let (lo, hi) = if min_ms <= max_ms { (*min_ms, *max_ms) } else { (*max_ms, *min_ms) };
                self.rng.gen_range(lo..=hi) as f64
            }
        };

        if ms.is_finite() && ms > 0.0 {
            Duration::from_nanos((ms * 1_000_000.0).round() as u64)
        } else {
            Duration::ZERO
        }
    }

    /// Randomised delay inside `[min_ms, max_ms]`, denser around the middle
    pub fn between(&mut self, min_ms: u64, max_ms: u64) -> Duration {
        self.sample(&DelayProfile::between(min_ms, max_ms))
    }

    /// `base` moved by up to `fraction` of itself in either direction
    pub fn jitter(&mut self, base: Duration, fraction: f64) -> Duration {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction == 0.0 {
            return base;
        }
        let factor = self.rng.gen_range(1.0 - fraction..=1.0 + fraction);
        base.mul_f64(factor.max(0.0))
    }

    /// Bernoulli draw
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.gen_bool(probability)
    }

    /// Standard normal variate via Box-Muller
    fn standard_normal(&mut self) -> f64 {
        // gen::<f64>() is in [0, 1); flip to (0, 1]
        let u1 = (1.0 - self.rng.gen::<f64>()).max(MIN_UNIFORM);
        let u2 = 1.0 - self.rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}
