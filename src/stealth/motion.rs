//! Synthetic pointer paths
//!
//! Paths are cubic Bézier curves bent sideways by two randomly offset control
//! points, with a Fitts-style step count and an optional overshoot that is
//! corrected back onto the target.

use super::timing::TimingModel;
use crate::config::MotionConfig;
use bezier_rs::{Bezier, TValue};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Symmetric noise added to the Fitts step count
const STEP_NOISE: i64 = 5;
/// Control point offset, as a fraction of the segment length
const MAX_CURVE_OFFSET: f64 = 0.3;
const OVERSHOOT_MIN_PX: f64 = 2.0;
const OVERSHOOT_MAX_PX: f64 = 8.0;
/// Wander radius around the target before approaching it
const WANDER_RADIUS_PX: f64 = 100.0;
/// Drift of the resting hand after a click
const POST_CLICK_DRIFT_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Axis-aligned element bounds in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Points to visit and how long each hop takes
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPath {
    pub points: Vec<Point>,
    /// `durations[i]` is the time spent moving from `points[i]` to `points[i + 1]`
    pub durations: Vec<Duration>,
    /// Segments of the main curve, excluding any overshoot correction
    pub steps: usize,
    pub overshoot: bool,
}

impl MotionPath {
    fn direct(start: Point, end: Point, total: Duration) -> Self {
        Self {
            points: vec![start, end],
            durations: vec![total],
            steps: 1,
            overshoot: false,
        }
    }

    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    pub fn total_duration(&self) -> Duration {
        self.durations.iter().sum()
    }
}

/// Pointer path generator
#[derive(Debug)]
pub struct MotionModel {
    timing: TimingModel,
    config: MotionConfig,
}

impl MotionModel {
    pub fn new(config: MotionConfig, timing: TimingModel) -> Self {
        Self { timing, config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Path from `start` to `end` using the configured move duration
    pub fn path(&mut self, start: Point, end: Point) -> MotionPath {
        let total = self.timing.sample(&self.config.move_duration);
        self.path_with_duration(start, end, total)
    }

    /// Path from `start` to `end` spread over roughly `total`
    pub fn path_with_duration(&mut self, start: Point, end: Point, total: Duration) -> MotionPath {
        let distance = start.distance(&end);
        if !self.config.enabled || distance < f64::EPSILON {
            return MotionPath::direct(start, end, total);
        }

        let steps = self.step_count(distance);
        let overshoot = self.timing.chance(self.config.overshoot_probability);

        let curve_end = if overshoot {
            let amount = self.timing.rng().gen_range(OVERSHOOT_MIN_PX..=OVERSHOOT_MAX_PX);
            Point::new(
                end.x + (end.x - start.x) / distance * amount,
                end.y + (end.y - start.y) / distance * amount,
            )
        } else {
            end
        };

        let mut points = self.curve(start, curve_end, steps);

        if overshoot {
            let correction = self.timing.rng().gen_range(3..=5);
            for i in 1..=correction {
                let t = i as f64 / correction as f64;
                points.push(Point::new(
                    curve_end.x + (end.x - curve_end.x) * t,
                    curve_end.y + (end.y - curve_end.y) * t,
                ));
            }
        }

        if let Some(last) = points.last_mut() {
            *last = end;
        }

        let durations = self.segment_durations(points.len() - 1, total);
        MotionPath {
            points,
            durations,
            steps,
            overshoot,
        }
    }

    /// `round(log2(d + 1) * 10) + noise`, clamped to the configured bounds
    pub fn step_count(&mut self, distance: f64) -> usize {
        let base = ((distance.max(0.0) + 1.0).log2() * 10.0).round() as i64;
        let noise = self.timing.rng().gen_range(-STEP_NOISE..=STEP_NOISE);
        let lo = self.config.min_steps.max(1) as i64;
        let hi = (self.config.max_steps as i64).max(lo);
        (base + noise).clamp(lo, hi) as usize
    }

    /// Random waypoints near `target` to wander through before approaching it
    pub fn approach(&mut self, target: Point, viewport: (u32, u32)) -> Vec<Point> {
        if !self.config.enabled || !self.config.random_movement {
            return Vec::new();
        }
        let (w, h) = (viewport.0 as f64, viewport.1 as f64);
        let count = self.timing.rng().gen_range(0..=3);
        (0..count)
            .map(|_| {
                let rng = self.timing.rng();
                let dx = rng.gen_range(-WANDER_RADIUS_PX..=WANDER_RADIUS_PX);
                let dy = rng.gen_range(-WANDER_RADIUS_PX..=WANDER_RADIUS_PX);
                Point::new((target.x + dx).clamp(0.0, w), (target.y + dy).clamp(0.0, h))
            })
            .collect()
    }

    /// Where the pointer drifts after clicking at `at`, and how long after
    pub fn post_click(&mut self, at: Point, viewport: (u32, u32)) -> Option<(Point, Duration)> {
        if !self.config.enabled || !self.config.random_movement {
            return None;
        }
        let rng = self.timing.rng();
        let dx = rng.gen_range(-POST_CLICK_DRIFT_PX..POST_CLICK_DRIFT_PX);
        let dy = rng.gen_range(-POST_CLICK_DRIFT_PX..POST_CLICK_DRIFT_PX);
        let delay = Duration::from_millis(rng.gen_range(50..150));
        let drift = Point::new(
            (at.x + dx).clamp(0.0, viewport.0 as f64),
            (at.y + dy).clamp(0.0, viewport.1 as f64),
        );
        Some((drift, delay))
    }

    /// A point inside the middle half of `bounds`
    pub fn click_point(&mut self, bounds: &Rect) -> Point {
        let center = bounds.center();
        let rx = bounds.width.abs() / 4.0;
        let ry = bounds.height.abs() / 4.0;
        let rng = self.timing.rng();
        let dx = if rx > 0.0 { rng.gen_range(-rx..=rx) } else { 0.0 };
        let dy = if ry > 0.0 { rng.gen_range(-ry..=ry) } else { 0.0 };
        Point::new(center.x + dx, center.y + dy)
    }

    /// Sample `steps + 1` points along a randomly bent cubic curve
    fn curve(&mut self, start: Point, end: Point, steps: usize) -> Vec<Point> {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let length = dx.hypot(dy);
        // unit normal to the start-end line
        let (nx, ny) = (-dy / length, dx / length);

        let rng = self.timing.rng();
        let off1 = rng.gen_range(-MAX_CURVE_OFFSET..=MAX_CURVE_OFFSET) * length;
        let off2 = rng.gen_range(-MAX_CURVE_OFFSET..=MAX_CURVE_OFFSET) * length;

        let c1 = Point::new(start.x + dx * 0.3 + nx * off1, start.y + dy * 0.3 + ny * off1);
        let c2 = Point::new(start.x + dx * 0.7 + nx * off2, start.y + dy * 0.7 + ny * off2);

        let bezier = Bezier::from_cubic_coordinates(
            start.x, start.y, c1.x, c1.y, c2.x, c2.y, end.x, end.y,
        );

        let mut points: Vec<Point> = (0..=steps)
            .map(|i| {
                let t = i as f64 / steps as f64;
                let p = bezier.evaluate(TValue::Parametric(t));
                Point::new(p.x, p.y)
            })
            .collect();
        points[0] = start;
        points
    }

    /// Ease-in/ease-out durations for `segments` hops, each jittered by ±20%
    fn segment_durations(&mut self, segments: usize, total: Duration) -> Vec<Duration> {
        let weights: Vec<f64> = (0..segments)
            .map(|i| 1.0 / speed_factor(i as f64 / segments as f64))
            .collect();
        let sum: f64 = weights.iter().sum();
        weights
            .iter()
            .map(|w| {
                let nominal = total.mul_f64(w / sum);
                self.timing.jitter(nominal, 0.2)
            })
            .collect()
    }
}

/// Relative pointer speed at `progress`: slow at both ends, steady in between
pub fn speed_factor(progress: f64) -> f64 {
    if progress < 0.2 {
        0.5 + progress * 2.5
    } else if progress > 0.8 {
        0.5 + (1.0 - progress) * 2.5
    } else {
        1.0
    }
}
