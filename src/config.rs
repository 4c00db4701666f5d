//! Configuration management for Outreach-Oxide
//!
//! Every knob is optional in the file; missing sections fall back to the
//! defaults below. Environment variables prefixed with `OUTREACH__` override
//! file values, e.g. `OUTREACH__CREDENTIALS__PASSWORD`.

use crate::stealth::timing::DelayProfile;
use crate::workflow::template::validate_template;
use crate::{Error, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "OUTREACH";

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub credentials: CredentialsConfig,
    pub search: SearchConfig,
    pub connection: ConnectionConfig,
    pub messaging: MessagingConfig,
    pub schedule: ScheduleConfig,
    pub pacing: PacingConfig,
    pub retry: RetryConfig,
    pub session: SessionConfig,
    pub stealth: StealthConfig,
    pub driver: DriverConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Target site layout. Nothing about the host is compiled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host, without trailing slash
    pub base_url: String,
    pub login_path: String,
    pub home_path: String,
    pub search_path: String,
    /// Page listing the account's established relationships
    pub connections_path: String,
    /// Path prefix that identifies a profile link, e.g. `/in/`
    pub profile_prefix: String,
    /// Cookie domain used for session capture
    pub cookie_domain: String,
    /// URL fragments that indicate a logged-in landing page
    pub logged_in_url_markers: Vec<String>,
    pub challenge: ChallengeMarkers,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.example.com".to_string(),
            login_path: "/login".to_string(),
            home_path: "/feed/".to_string(),
            search_path: "/search/results/people/".to_string(),
            connections_path: "/mynetwork/connections/".to_string(),
            profile_prefix: "/in/".to_string(),
            cookie_domain: ".example.com".to_string(),
            logged_in_url_markers: vec!["/feed".to_string()],
            challenge: ChallengeMarkers::default(),
        }
    }
}

impl SiteConfig {
    /// Absolute URL for a site path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Markers that reveal a verification wall after login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeMarkers {
    pub url_markers: Vec<String>,
    pub two_factor_markers: Vec<String>,
    pub captcha_markers: Vec<String>,
}

impl Default for ChallengeMarkers {
    fn default() -> Self {
        Self {
            url_markers: vec!["checkpoint".to_string(), "challenge".to_string()],
            two_factor_markers: vec![
                "two-step".to_string(),
                "two_factor".to_string(),
                "verification code".to_string(),
            ],
            captcha_markers: vec!["captcha".to_string(), "recaptcha".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub job_titles: Vec<String>,
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
    /// Result pages visited per run
    pub max_pages: u32,
    /// Unique new targets accepted per run
    pub max_targets: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            job_titles: Vec::new(),
            keywords: Vec::new(),
            locations: Vec::new(),
            max_pages: 5,
            max_targets: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub enabled: bool,
    pub daily_limit: u32,
    pub send_note: bool,
    pub note_templates: Vec<String>,
    pub max_note_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_limit: 50,
            send_note: true,
            note_templates: vec![
                "Hi {{firstName}}, I came across your profile and would love to connect."
                    .to_string(),
            ],
            max_note_length: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    pub enabled: bool,
    pub daily_limit: u32,
    /// Refresh pending connections against the relationship list first
    pub detect_accepted: bool,
    pub templates: Vec<String>,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_limit: 100,
            detect_accepted: true,
            templates: vec![
                "Thanks for connecting, {{firstName}}! Great to see your work at {{company}}."
                    .to_string(),
            ],
        }
    }
}

/// Business-hours window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub start_hour: u32,
    pub end_hour: u32,
    pub skip_weekends: bool,
    pub breaks: Vec<BreakConfig>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: 9,
            end_hour: 18,
            skip_weekends: true,
            breaks: vec![BreakConfig {
                start: "12:00".to_string(),
                end: "13:00".to_string(),
            }],
        }
    }
}

/// A pause inside the business-hours window, as `HH:MM` strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakConfig {
    pub start: String,
    pub end: String,
}

impl BreakConfig {
    /// Parse both ends into wall-clock times
    pub fn parse(&self) -> Result<(NaiveTime, NaiveTime)> {
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|e| {
                Error::configuration(format!("Invalid break time '{}': {}", s, e))
            })
        };
        Ok((parse(&self.start)?, parse(&self.end)?))
    }
}

/// Spacing between irreversible actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub between_actions: DelayProfile,
    /// Take a longer cooldown after this many actions (0 disables)
    pub cooldown_every: u32,
    pub cooldown: DelayProfile,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            between_actions: DelayProfile::uniform(5_000, 15_000),
            cooldown_every: 10,
            cooldown: DelayProfile::uniform(60_000, 180_000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Symmetric jitter as a fraction of the delay
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_age_hours: i64,
    /// Cookies that must be present and unexpired for a session to count
    pub required_cookies: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_hours: 12,
            required_cookies: vec!["session".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StealthConfig {
    /// Master seed for every behavioral model; entropy when absent
    pub seed: Option<u64>,
    pub timing: TimingConfig,
    pub motion: MotionConfig,
    pub typing: TypingConfig,
    pub scroll: ScrollConfig,
    pub identity: IdentityConfig,
}

/// Named delay profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub think: DelayProfile,
    pub page_load: DelayProfile,
    pub hover: DelayProfile,
    /// Wait after a dialog opens
    pub modal: DelayProfile,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            think: DelayProfile::between(2_000, 5_000),
            page_load: DelayProfile::Normal {
                mean_ms: 2_000.0,
                std_dev_ms: 500.0,
                min_ms: Some(500),
                max_ms: Some(5_000),
            },
            hover: DelayProfile::uniform(100, 500),
            modal: DelayProfile::uniform(500, 1_500),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub enabled: bool,
    pub min_steps: u32,
    pub max_steps: u32,
    pub overshoot_probability: f64,
    /// Total duration of one pointer move
    pub move_duration: DelayProfile,
    pub hover_before_click: bool,
    /// Wander across the viewport before approaching a target
    pub random_movement: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_steps: 20,
            max_steps: 50,
            overshoot_probability: 0.15,
            move_duration: DelayProfile::uniform(300, 900),
            hover_before_click: true,
            random_movement: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub enabled: bool,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub typo_probability: f64,
    pub shift_penalty: DelayProfile,
    pub sentence_pause: DelayProfile,
    pub space_pause: DelayProfile,
    pub space_pause_probability: f64,
    pub recognition: DelayProfile,
    pub backspace: DelayProfile,
    pub burst_min: usize,
    pub burst_max: usize,
    pub burst_pause: DelayProfile,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_delay_ms: 50,
            max_delay_ms: 150,
            typo_probability: 0.05,
            shift_penalty: DelayProfile::uniform(30, 80),
            sentence_pause: DelayProfile::uniform(100, 300),
            space_pause: DelayProfile::uniform(50, 150),
            space_pause_probability: 0.3,
            recognition: DelayProfile::uniform(200, 500),
            backspace: DelayProfile::uniform(50, 100),
            burst_min: 3,
            burst_max: 8,
            burst_pause: DelayProfile::uniform(100, 300),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub enabled: bool,
    /// Pixels per step before the speed curve is applied
    pub min_speed: u32,
    pub max_speed: u32,
    pub step_duration: DelayProfile,
    pub pause_probability: f64,
    pub pause: DelayProfile,
    pub scroll_back_probability: f64,
    /// Distance scrolled down a results page before extraction
    pub page_distance: i64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_speed: 60,
            max_speed: 180,
            step_duration: DelayProfile::uniform(20, 50),
            pause_probability: 0.1,
            pause: DelayProfile::uniform(200, 500),
            scroll_back_probability: 0.2,
            page_distance: 2_400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub rotate_user_agent: bool,
    pub randomize_viewport: bool,
    pub randomize_timezone: bool,
    pub vary_accept_language: bool,
    /// Inject the automation-marker override script
    pub hide_automation: bool,
    /// Perturb canvas readback
    pub canvas_noise: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            rotate_user_agent: true,
            randomize_viewport: true,
            randomize_timezone: true,
            vary_accept_language: true,
            hide_automation: true,
            canvas_noise: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// DevTools HTTP endpoint of a running browser
    pub cdp_endpoint: String,
    pub page_timeout_ms: u64,
    pub element_timeout_ms: u64,
    /// Selector probe overrides keyed by element role name
    pub selectors: HashMap<String, Vec<String>>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cdp_endpoint: "http://localhost:9222".to_string(),
            page_timeout_ms: 30_000,
            element_timeout_ms: 10_000,
            selectors: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "outreach.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        Self::build(None)
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::configuration(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::build(Some(path))
    }

    /// Parse an inline TOML document, without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        ::config::Config::builder()
            .add_source(::config::File::from_str(content, ::config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))
    }

    fn build(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::configuration(format!("Failed to load config: {}", e)))
    }

    /// Reject values that would make the run meaningless or panic later
    pub fn validate(&self) -> Result<()> {
        if self.site.base_url.trim().is_empty() {
            return Err(Error::configuration("site.base_url must not be empty"));
        }

        let s = &self.schedule;
        if s.start_hour >= s.end_hour || s.end_hour > 24 {
            return Err(Error::configuration(format!(
                "schedule window {}..{} is not a valid hour range",
                s.start_hour, s.end_hour
            )));
        }
        for b in &s.breaks {
            let (start, end) = b.parse()?;
            if start >= end {
                return Err(Error::configuration(format!(
                    "break {}..{} ends before it starts",
                    b.start, b.end
                )));
            }
        }

        let probabilities = [
            ("stealth.motion.overshoot_probability", self.stealth.motion.overshoot_probability),
            ("stealth.typing.typo_probability", self.stealth.typing.typo_probability),
            ("stealth.typing.space_pause_probability", self.stealth.typing.space_pause_probability),
            ("stealth.scroll.pause_probability", self.stealth.scroll.pause_probability),
            ("stealth.scroll.scroll_back_probability", self.stealth.scroll.scroll_back_probability),
            ("retry.jitter", self.retry.jitter),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::configuration(format!("{} must be within [0, 1], got {}", name, p)));
            }
        }

        let m = &self.stealth.motion;
        if m.min_steps == 0 || m.min_steps > m.max_steps {
            return Err(Error::configuration("stealth.motion step bounds are inverted"));
        }
        let t = &self.stealth.typing;
        if t.min_delay_ms > t.max_delay_ms || t.burst_min == 0 || t.burst_min > t.burst_max {
            return Err(Error::configuration("stealth.typing bounds are inverted"));
        }
        let sc = &self.stealth.scroll;
        if sc.min_speed == 0 || sc.min_speed > sc.max_speed {
            return Err(Error::configuration("stealth.scroll speed bounds are inverted"));
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::configuration("retry.max_attempts must be at least 1"));
        }

        for template in self
            .connection
            .note_templates
            .iter()
            .chain(self.messaging.templates.iter())
        {
            validate_template(template)
                .map_err(|e| Error::configuration(format!("template '{}': {}", template, e)))?;
        }

        Ok(())
    }
}
