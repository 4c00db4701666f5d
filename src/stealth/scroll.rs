//! Synthetic scroll steps

use super::timing::TimingModel;
use crate::config::ScrollConfig;
use rand::Rng;
use std::time::Duration;

/// One wheel movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollStep {
    /// Vertical pixels; zero for a reading pause
    pub delta: i64,
    pub duration: Duration,
}

/// Scroll increment generator
#[derive(Debug)]
pub struct ScrollModel {
    timing: TimingModel,
    config: ScrollConfig,
}

impl ScrollModel {
    pub fn new(config: ScrollConfig, timing: TimingModel) -> Self {
        Self { timing, config }
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Steps that move the page from `from` to `to`; deltas always sum to `to - from`
    pub fn scroll_steps(&mut self, from: i64, to: i64) -> Vec<ScrollStep> {
        let total = to - from;
        if total == 0 {
            return Vec::new();
        }
        if !self.config.enabled {
            return vec![ScrollStep {
                delta: total,
                duration: self.timing.sample(&self.config.step_duration),
            }];
        }

        let sign = total.signum();
        let distance = total.abs();
        let lo = self.config.min_speed.max(1) as f64;
        let hi = (self.config.max_speed as f64).max(lo);

        let mut steps = Vec::new();
        let mut moved = 0i64;
        while moved < distance {
            let progress = moved as f64 / distance as f64;
            let speed = self.timing.rng().gen_range(lo..=hi) * speed_multiplier(progress);
            let increment = (speed.round() as i64).clamp(1, distance - moved);
            moved += increment;
            steps.push(ScrollStep {
                delta: sign * increment,
                duration: self.timing.sample(&self.config.step_duration),
            });

            if moved < distance && self.timing.chance(self.config.pause_probability) {
                steps.push(ScrollStep {
                    delta: 0,
                    duration: self.timing.sample(&self.config.pause),
                });
            }
        }

        if self.timing.chance(self.config.scroll_back_probability) {
            let back_max = distance.min(100);
            let back = self.timing.rng().gen_range(back_max.min(20)..=back_max);
            steps.push(ScrollStep {
                delta: -sign * back,
                duration: self.timing.sample(&self.config.step_duration),
            });
            steps.push(ScrollStep {
                delta: sign * back,
                duration: self.timing.sample(&self.config.step_duration),
            });
        }

        steps
    }
}

/// Ease-in, constant, ease-out speed curve
pub fn speed_multiplier(progress: f64) -> f64 {
    if progress < 0.2 {
        0.3 + 3.5 * progress
    } else if progress > 0.8 {
        0.3 + 3.5 * (1.0 - progress)
    } else {
        1.0
    }
}
