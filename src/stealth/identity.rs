//! Browser identity rotation
//!
//! An [`IdentityProfile`] is drawn once per session from curated lists of
//! common desktop values and applied before the first navigation.

use crate::config::IdentityConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Desktop browsers seen in the wild
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Common desktop resolutions
pub const VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1366, 768),
    (1536, 864),
    (1440, 900),
    (1280, 720),
    (1600, 900),
    (2560, 1440),
    (1680, 1050),
];

pub const TIMEZONES: &[&str] = &[
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "America/Phoenix",
    "America/Detroit",
    "America/Indiana/Indianapolis",
];

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-US,en;q=0.8",
    "en-GB,en;q=0.9,en-US;q=0.8",
    "en-US,en;q=0.9,es;q=0.8",
];

/// Pixel jitter applied to each viewport dimension
const VIEWPORT_JITTER: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Everything the page sees about "who" is browsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub user_agent: String,
    pub viewport: Viewport,
    pub timezone: String,
    pub accept_language: String,
    /// Script evaluated on every new document; empty when disabled
    pub script: String,
}

impl IdentityProfile {
    /// Languages in preference order, as `navigator.languages` would list them
    pub fn languages(&self) -> Vec<String> {
        languages_from_header(&self.accept_language)
    }
}

/// Identity generator
#[derive(Debug)]
pub struct IdentityModel {
    rng: StdRng,
    config: IdentityConfig,
}

impl IdentityModel {
    pub fn new(config: IdentityConfig, rng: StdRng) -> Self {
        Self { rng, config }
    }

    /// Draw a fresh profile; disabled switches keep the baseline value
    pub fn rotate(&mut self) -> IdentityProfile {
        let user_agent = pick(&mut self.rng, USER_AGENTS, self.config.rotate_user_agent);
        let timezone = pick(&mut self.rng, TIMEZONES, self.config.randomize_timezone);
        let accept_language =
            pick(&mut self.rng, ACCEPT_LANGUAGES, self.config.vary_accept_language);

        let viewport = if self.config.randomize_viewport {
            let (w, h) = VIEWPORTS.choose(&mut self.rng).copied().unwrap_or(VIEWPORTS[0]);
            Viewport {
                width: jitter_dimension(&mut self.rng, w),
                height: jitter_dimension(&mut self.rng, h),
            }
        } else {
            Viewport {
                width: VIEWPORTS[0].0,
                height: VIEWPORTS[0].1,
            }
        };

        let script = de_detection_script(&self.config, &languages_from_header(&accept_language));

        IdentityProfile {
            user_agent,
            viewport,
            timezone,
            accept_language,
            script,
        }
    }
}

fn pick(rng: &mut StdRng, list: &[&str], rotate: bool) -> String {
    if rotate {
        list.choose(rng).unwrap_or(&list[0]).to_string()
    } else {
        list[0].to_string()
    }
}

fn jitter_dimension(rng: &mut StdRng, base: u32) -> u32 {
    let delta = rng.gen_range(-VIEWPORT_JITTER..=VIEWPORT_JITTER);
    (base as i32 + delta).max(1) as u32
}

/// `"en-US,en;q=0.9"` becomes `["en-US", "en"]`
pub fn languages_from_header(header: &str) -> Vec<String> {
    header
        .split(',')
        .filter_map(|part| part.split(';').next())
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(String::from)
        .collect()
}

/// Script that hides automation markers and, optionally, perturbs canvas reads
pub fn de_detection_script(config: &IdentityConfig, languages: &[String]) -> String {
    let mut script = String::new();

    if config.hide_automation {
        let langs = serde_json::to_string(languages).unwrap_or_else(|_| "[\"en-US\"]".to_string());
        script.push_str(&format!(
            r#"
(() => {{
    Object.defineProperty(Navigator.prototype, 'webdriver', {{ get: () => undefined }});

    const plugins = [
        {{ name: 'PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }},
        {{ name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }},
        {{ name: 'Chromium PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }},
    ];
    Object.defineProperty(navigator, 'plugins', {{ get: () => plugins }});
    Object.defineProperty(navigator, 'languages', {{ get: () => {langs} }});

    if (window.chrome && window.chrome.runtime && !window.chrome.runtime.id) {{
        window.chrome.runtime = undefined;
    }}

    if (navigator.permissions && navigator.permissions.query) {{
        const query = navigator.permissions.query.bind(navigator.permissions);
        navigator.permissions.query = (p) =>
            p && p.name === 'notifications'
                ? Promise.resolve({{ state: Notification.permission }})
                : query(p);
    }}
}})();
"#
        ));
    }

    if config.canvas_noise {
        script.push_str(
            r#"
(() => {
    const flip = (data) => {
        for (let i = 0; i < data.length; i += 4) {
            data[i] ^= (Math.random() * 2) | 0;
        }
    };
    const getImageData = CanvasRenderingContext2D.prototype.getImageData;
    CanvasRenderingContext2D.prototype.getImageData = function () {
        const image = getImageData.apply(this, arguments);
        flip(image.data);
        return image;
    };
    const toDataURL = HTMLCanvasElement.prototype.toDataURL;
    HTMLCanvasElement.prototype.toDataURL = function () {
        const ctx = this.getContext('2d');
        if (ctx && this.width > 0 && this.height > 0) {
            const shadow = document.createElement('canvas');
            shadow.width = this.width;
            shadow.height = this.height;
            const sctx = shadow.getContext('2d');
            sctx.drawImage(this, 0, 0);
            const image = getImageData.call(sctx, 0, 0, shadow.width, shadow.height);
            flip(image.data);
            sctx.putImageData(image, 0, 0);
            return toDataURL.apply(shadow, arguments);
        }
        return toDataURL.apply(this, arguments);
    };
})();
"#,
        );
    }

    script
}
