//! Behavioral model tests

use super::*;
use crate::config::{IdentityConfig, MotionConfig, ScrollConfig, TypingConfig};
use rand::{Rng, SeedableRng};
use std::time::Duration;

fn typing(seed: u64, typo_probability: f64) -> TypingModel {
    let config = TypingConfig {
        typo_probability,
        ..Default::default()
    };
    TypingModel::new(config, TimingModel::seeded(seed))
}

fn motion(seed: u64, overshoot_probability: f64) -> MotionModel {
    let config = MotionConfig {
        overshoot_probability,
        ..Default::default()
    };
    MotionModel::new(config, TimingModel::seeded(seed))
}

fn random_text(rng: &mut StdRng, len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 .,!?-'";
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

// ============================================================================
// TimingModel
// ============================================================================

#[test]
fn test_normal_samples_stay_within_bounds() {
    let mut timing = TimingModel::seeded(1);
    let profile = DelayProfile::between(50, 150);
    for _ in 0..10_000 {
        let d = timing.sample(&profile);
        assert!(d >= Duration::from_millis(50), "{:?} below bound", d);
        assert!(d <= Duration::from_millis(150), "{:?} above bound", d);
    }
}

#[test]
fn test_uniform_samples_stay_within_bounds() {
    let mut timing = TimingModel::seeded(2);
    let profile = DelayProfile::uniform(200, 500);
    for _ in 0..10_000 {
        let d = timing.sample(&profile);
        assert!(d >= Duration::from_millis(200));
        assert!(d <= Duration::from_millis(500));
    }
}

#[test]
fn test_negative_draws_clamp_to_zero() {
    let mut timing = TimingModel::seeded(3);
    // mean close to zero with a wide spread pulls many raw draws below zero
    let profile = DelayProfile::Normal {
        mean_ms: 10.0,
        std_dev_ms: 100.0,
        min_ms: None,
        max_ms: None,
    };
    let mut zeros = 0;
    for _ in 0..10_000 {
        let d = timing.sample(&profile);
        if d == Duration::ZERO {
            zeros += 1;
        }
    }
    assert!(zeros > 0);
}

#[test]
fn test_normal_mean_is_centred() {
    let mut timing = TimingModel::seeded(4);
    let profile = DelayProfile::Normal {
        mean_ms: 2_000.0,
        std_dev_ms: 500.0,
        min_ms: None,
        max_ms: None,
    };
    let total: f64 = (0..10_000)
        .map(|_| timing.sample(&profile).as_secs_f64() * 1000.0)
        .sum();
    let mean = total / 10_000.0;
    assert!((mean - 2_000.0).abs() < 50.0, "mean was {}", mean);
}

#[test]
fn test_same_seed_reproduces_delays() {
    let mut a = TimingModel::seeded(42);
    let mut b = TimingModel::seeded(42);
    let profile = DelayProfile::between(100, 900);
    for _ in 0..100 {
        assert_eq!(a.sample(&profile), b.sample(&profile));
    }
}

#[test]
fn test_jitter_and_chance() {
    let mut timing = TimingModel::seeded(5);
    let base = Duration::from_millis(1_000);
    for _ in 0..1_000 {
        let d = timing.jitter(base, 0.2);
        assert!(d >= Duration::from_millis(800) && d <= Duration::from_millis(1_200));
    }
    assert_eq!(timing.jitter(base, 0.0), base);
    assert!(!timing.chance(0.0));
    assert!(timing.chance(1.0));
}

#[test]
fn test_model_seeds_are_deterministic() {
    let mut a = ModelSeeds::new(Some(9));
    let mut b = ModelSeeds::new(Some(9));
    assert_eq!(a.next_rng().gen::<u64>(), b.next_rng().gen::<u64>());
    let first = a.next_rng().gen::<u64>();
    let second = a.next_rng().gen::<u64>();
    assert_ne!(first, second);
}

// ============================================================================
// TypingModel
// ============================================================================

#[test]
fn test_replay_reconstructs_text() {
    let mut text_rng = StdRng::seed_from_u64(11);
    for (seed, p) in [(1u64, 0.0), (2, 0.05), (3, 0.5), (4, 1.0)] {
        let mut model = typing(seed, p);
        for len in [0usize, 1, 2, 7, 40, 150, 500] {
            let text = random_text(&mut text_rng, len);
            let keys = model.keystrokes(&text);
            assert_eq!(keys.replay(), text, "p={} len={}", p, len);
        }
    }
}

#[test]
fn test_replay_handles_non_ascii() {
    let mut model = typing(8, 1.0);
    let text = "Olá, Zoë! 東京 ok";
    assert_eq!(model.keystrokes(text).replay(), text);
}

#[test]
fn test_empty_text_yields_empty_sequence() {
    let mut model = typing(1, 0.5);
    assert!(model.keystrokes("").is_empty());
}

#[test]
fn test_backspace_follows_wrong_char_and_pause() {
    let mut model = typing(6, 1.0);
    let keys = model.keystrokes("hello world");
    assert!(keys.typo_count() > 0);

    for (i, event) in keys.events.iter().enumerate() {
        if let KeyEvent::Backspace { .. } = event {
            assert!(i >= 2);
            assert!(matches!(keys.events[i - 1], KeyEvent::Pause { .. }));
            assert!(matches!(keys.events[i - 2], KeyEvent::Char { .. }));
        }
    }
}

#[test]
fn test_typo_is_adjacent_and_keeps_case() {
    let mut model = typing(7, 1.0);
    for _ in 0..100 {
        let lower = model.adjacent_key('g').unwrap();
        assert!("ftyhbv".contains(lower));
        let upper = model.adjacent_key('G').unwrap();
        assert!("FTYHBV".contains(upper));
    }
    assert_eq!(model.adjacent_key('5'), None);
    assert_eq!(model.adjacent_key('.'), None);
}

#[test]
fn test_no_typos_when_probability_zero() {
    let mut model = typing(9, 0.0);
    let keys = model.keystrokes("the quick brown fox jumps over the lazy dog");
    assert_eq!(keys.typo_count(), 0);
}

#[test]
fn test_bursts_insert_pauses() {
    let mut model = typing(10, 0.0);
    let text = "abcdefghijklmnopqrstuvwxyz";
    let keys = model.keystrokes(text);
    let pauses = keys
        .iter()
        .filter(|e| matches!(e, KeyEvent::Pause { .. }))
        .count();
    // bursts are at most 8 characters long
    assert!(pauses >= text.len() / 8 - 1);
    assert!(!matches!(keys.events.last(), Some(KeyEvent::Pause { .. })));
}

#[test]
fn test_keystroke_delays_respect_bounds() {
    let mut model = typing(12, 0.0);
    let keys = model.keystrokes("plain lowercase words");
    for event in keys.iter() {
        if let KeyEvent::Char { delay, .. } = event {
            assert!(*delay >= Duration::from_millis(50));
            // base 150 + optional space pause 150
            assert!(*delay <= Duration::from_millis(300));
        }
    }
}

#[test]
fn test_disabled_typing_is_plain() {
    let config = TypingConfig {
        enabled: false,
        typo_probability: 1.0,
        ..Default::default()
    };
    let mut model = TypingModel::new(config, TimingModel::seeded(1));
    let keys = model.keystrokes("Abc");
    assert_eq!(keys.len(), 3);
    assert_eq!(keys.total_duration(), Duration::from_millis(150));
}

// ============================================================================
// MotionModel
// ============================================================================

#[test]
fn test_path_starts_and_ends_exactly() {
    for seed in 0..50 {
        let mut model = motion(seed, 0.5);
        let start = Point::new(10.0, 20.0);
        let end = Point::new(640.0, 410.0);
        let path = model.path(start, end);
        assert_eq!(path.start(), start);
        assert!((path.end().x - end.x).abs() < 1e-9);
        assert!((path.end().y - end.y).abs() < 1e-9);
        assert!(path.points.len() >= 2);
        assert_eq!(path.durations.len(), path.points.len() - 1);
    }
}

#[test]
fn test_step_count_within_bounds() {
    let mut model = motion(13, 0.0);
    for distance in [1.0, 10.0, 100.0, 1_000.0, 100_000.0] {
        for _ in 0..50 {
            let steps = model.step_count(distance);
            assert!((20..=50).contains(&steps), "{} steps for {}", steps, distance);
        }
    }
    let path = model.path(Point::new(0.0, 0.0), Point::new(800.0, 600.0));
    assert!((20..=50).contains(&path.steps));
}

#[test]
fn test_overshoot_passes_target_then_corrects() {
    let mut model = motion(14, 1.0);
    let start = Point::new(0.0, 0.0);
    let end = Point::new(500.0, 0.0);
    let path = model.path(start, end);

    assert!(path.overshoot);
    let furthest = path.points.iter().map(|p| p.x).fold(f64::MIN, f64::max);
    assert!(furthest > end.x + 1.0);
    assert!(furthest <= end.x + 8.0 + 1e-9);
    assert_eq!(path.end(), end);
    // main curve plus 3 to 5 correction points
    let extra = path.points.len() - (path.steps + 1);
    assert!((3..=5).contains(&extra));
}

#[test]
fn test_zero_length_move_is_direct() {
    let mut model = motion(15, 1.0);
    let p = Point::new(5.0, 5.0);
    let path = model.path(p, p);
    assert_eq!(path.points, vec![p, p]);
}

#[test]
fn test_durations_ease_in_and_out() {
    let mut model = motion(16, 0.0);
    let total = Duration::from_millis(1_000);
    let path = model.path_with_duration(Point::new(0.0, 0.0), Point::new(900.0, 500.0), total);

    let sum = path.total_duration().as_secs_f64();
    assert!(sum >= 0.8 && sum <= 1.2, "total {}", sum);

    let n = path.durations.len();
    let mid = path.durations[n / 2];
    // first hop runs at half speed, so it outlasts a mid hop even with jitter
    assert!(path.durations[0] > mid);
    assert!(motion::speed_factor(0.0) < motion::speed_factor(0.5));
    assert!(motion::speed_factor(1.0) < motion::speed_factor(0.5));
}

#[test]
fn test_disabled_motion_is_direct() {
    let config = MotionConfig {
        enabled: false,
        ..Default::default()
    };
    let mut model = MotionModel::new(config, TimingModel::seeded(1));
    let path = model.path(Point::new(0.0, 0.0), Point::new(100.0, 100.0));
    assert_eq!(path.points.len(), 2);
    assert!(model.approach(Point::new(1.0, 1.0), (100, 100)).is_empty());
    assert!(model.post_click(Point::new(50.0, 50.0), (100, 100)).is_none());
}

#[test]
fn test_post_click_drift_is_small_and_prompt() {
    let mut model = motion(19, 0.0);
    let at = Point::new(640.0, 360.0);
    for _ in 0..200 {
        let (drift, delay) = model.post_click(at, (1_280, 720)).unwrap();
        assert!((drift.x - at.x).abs() <= 10.0);
        assert!((drift.y - at.y).abs() <= 10.0);
        assert!(delay >= Duration::from_millis(50) && delay < Duration::from_millis(150));
    }
    let (edge, _) = model.post_click(Point::new(0.0, 720.0), (1_280, 720)).unwrap();
    assert!(edge.x >= 0.0 && edge.y <= 720.0);
}

#[test]
fn test_approach_stays_in_viewport() {
    let mut model = motion(17, 0.0);
    for _ in 0..200 {
        let waypoints = model.approach(Point::new(20.0, 1_070.0), (1_920, 1_080));
        assert!(waypoints.len() <= 3);
        for p in waypoints {
            assert!(p.x >= 0.0 && p.x <= 1_920.0);
            assert!(p.y >= 0.0 && p.y <= 1_080.0);
        }
    }
}

#[test]
fn test_click_point_inside_bounds() {
    let mut model = motion(18, 0.0);
    let rect = Rect {
        x: 100.0,
        y: 200.0,
        width: 80.0,
        height: 40.0,
    };
    for _ in 0..200 {
        let p = model.click_point(&rect);
        assert!(p.x >= 120.0 && p.x <= 160.0);
        assert!(p.y >= 210.0 && p.y <= 230.0);
    }
}

// ============================================================================
// ScrollModel
// ============================================================================

#[test]
fn test_scroll_deltas_sum_to_request() {
    for seed in 0..30 {
        let config = ScrollConfig {
            pause_probability: 0.3,
            scroll_back_probability: 0.5,
            ..Default::default()
        };
        let mut model = ScrollModel::new(config, TimingModel::seeded(seed));
        for (from, to) in [(0, 2_400), (1_000, 0), (0, 3), (50, 51)] {
            let steps = model.scroll_steps(from, to);
            assert_eq!(steps.iter().map(|s| s.delta).sum::<i64>(), to - from);
        }
    }
}

#[test]
fn test_scroll_zero_delta_has_no_steps() {
    let mut model = ScrollModel::new(ScrollConfig::default(), TimingModel::seeded(1));
    assert!(model.scroll_steps(300, 300).is_empty());
}

#[test]
fn test_scroll_inserts_pauses() {
    let config = ScrollConfig {
        pause_probability: 1.0,
        scroll_back_probability: 0.0,
        ..Default::default()
    };
    let mut model = ScrollModel::new(config, TimingModel::seeded(2));
    let steps = model.scroll_steps(0, 1_000);
    assert!(steps.iter().any(|s| s.delta == 0));
    assert_ne!(steps.last().map(|s| s.delta), Some(0));
}

#[test]
fn test_scroll_back_then_forward() {
    let config = ScrollConfig {
        pause_probability: 0.0,
        scroll_back_probability: 1.0,
        ..Default::default()
    };
    let mut model = ScrollModel::new(config, TimingModel::seeded(3));
    let steps = model.scroll_steps(0, 1_000);
    let n = steps.len();
    assert!(steps[n - 2].delta < 0);
    assert_eq!(steps[n - 1].delta, -steps[n - 2].delta);
}

#[test]
fn test_disabled_scroll_is_single_step() {
    let config = ScrollConfig {
        enabled: false,
        ..Default::default()
    };
    let mut model = ScrollModel::new(config, TimingModel::seeded(4));
    let steps = model.scroll_steps(0, -700);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].delta, -700);
}

// ============================================================================
// IdentityModel
// ============================================================================

#[test]
fn test_rotation_draws_from_curated_lists() {
    let mut model = IdentityModel::new(IdentityConfig::default(), StdRng::seed_from_u64(1));
    for _ in 0..100 {
        let profile = model.rotate();
        assert!(identity::USER_AGENTS.contains(&profile.user_agent.as_str()));
        assert!(identity::TIMEZONES.contains(&profile.timezone.as_str()));
        assert!(identity::ACCEPT_LANGUAGES.contains(&profile.accept_language.as_str()));
        let near_known = identity::VIEWPORTS.iter().any(|(w, h)| {
            (profile.viewport.width as i64 - *w as i64).abs() <= 5
                && (profile.viewport.height as i64 - *h as i64).abs() <= 5
        });
        assert!(near_known, "{:?}", profile.viewport);
        assert!(profile.script.contains("webdriver"));
        assert!(profile.script.contains("getImageData"));
    }
}

#[test]
fn test_disabled_rotation_returns_baseline() {
    let config = IdentityConfig {
        rotate_user_agent: false,
        randomize_viewport: false,
        randomize_timezone: false,
        vary_accept_language: false,
        hide_automation: false,
        canvas_noise: false,
    };
    let mut model = IdentityModel::new(config, StdRng::seed_from_u64(2));
    let a = model.rotate();
    let b = model.rotate();
    assert_eq!(a, b);
    assert_eq!(a.user_agent, identity::USER_AGENTS[0]);
    assert_eq!(a.viewport, Viewport { width: 1920, height: 1080 });
    assert!(a.script.is_empty());
}

#[test]
fn test_script_declares_header_languages() {
    let config = IdentityConfig {
        canvas_noise: false,
        ..Default::default()
    };
    let script = identity::de_detection_script(&config, &["en-GB".to_string(), "en".to_string()]);
    assert!(script.contains(r#"["en-GB","en"]"#));
    assert!(!script.contains("getImageData"));
}

#[test]
fn test_languages_from_header() {
    assert_eq!(
        identity::languages_from_header("en-GB,en;q=0.9,en-US;q=0.8"),
        vec!["en-GB", "en", "en-US"]
    );
    assert!(identity::languages_from_header("").is_empty());
}
