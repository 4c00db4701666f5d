//! Synthetic keystroke sequences
//!
//! Models keystroke cadence, adjacent-key typos with recognition and
//! correction, shift and punctuation penalties, and typing in bursts.

use super::timing::TimingModel;
use crate::config::TypingConfig;
use phf::phf_map;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Physical neighbours of each letter on a QWERTY layout
static QWERTY_NEIGHBORS: phf::Map<char, &'static str> = phf_map! {
    'q' => "wa",
    'w' => "qeas",
    'e' => "wrsd",
    'r' => "etdf",
    't' => "ryfg",
    'y' => "tugh",
    'u' => "yihj",
    'i' => "uojk",
    'o' => "ipkl",
    'p' => "ol",
    'a' => "qwsz",
    's' => "awedxz",
    'd' => "serfcx",
    'f' => "drtgvc",
    'g' => "ftyhbv",
    'h' => "gyujnb",
    'j' => "huikmn",
    'k' => "jiolm",
    'l' => "kop",
    'z' => "asx",
    'x' => "zsdc",
    'c' => "xdfv",
    'v' => "cfgb",
    'b' => "vghn",
    'n' => "bhjm",
    'm' => "njk",
};

/// Symbols that need the shift key on a US layout
const SHIFTED_SYMBOLS: &str = "~!@#$%^&*()_+{}|:\"<>?";

/// One element of a typed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Press a character key after waiting `delay`
    Char { ch: char, delay: Duration },
    /// Press backspace after waiting `delay`
    Backspace { delay: Duration },
    /// Do nothing for `delay`
    Pause { delay: Duration },
}

impl KeyEvent {
    pub fn delay(&self) -> Duration {
        match self {
            KeyEvent::Char { delay, .. }
            | KeyEvent::Backspace { delay }
            | KeyEvent::Pause { delay } => *delay,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySequence {
    pub events: Vec<KeyEvent>,
}

impl KeySequence {
    /// Text left in the field after every event is applied
    pub fn replay(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            match event {
                KeyEvent::Char { ch, .. } => out.push(*ch),
                KeyEvent::Backspace { .. } => {
                    out.pop();
                }
                KeyEvent::Pause { .. } => {}
            }
        }
        out
    }

    pub fn total_duration(&self) -> Duration {
        self.events.iter().map(KeyEvent::delay).sum()
    }

    pub fn typo_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, KeyEvent::Backspace { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyEvent> {
        self.events.iter()
    }
}

/// Keystroke sequence generator
#[derive(Debug)]
pub struct TypingModel {
    timing: TimingModel,
    config: TypingConfig,
}

impl TypingModel {
    pub fn new(config: TypingConfig, timing: TimingModel) -> Self {
        Self { timing, config }
    }

    pub fn keystrokes(&mut self, text: &str) -> KeySequence {
        let mut events = Vec::with_capacity(text.len() * 2);

        if !self.config.enabled {
            let delay = Duration::from_millis(self.config.min_delay_ms);
            events.extend(text.chars().map(|ch| KeyEvent::Char { ch, delay }));
            return KeySequence { events };
        }

        let chars: Vec<char> = text.chars().collect();
        let mut burst_left = self.burst_len();
        let mut prev: Option<char> = None;

        for (i, &ch) in chars.iter().enumerate() {
            if self.timing.chance(self.config.typo_probability) {
                if let Some(wrong) = self.adjacent_key(ch) {
                    let delay = self.keystroke_delay(wrong, prev);
                    events.push(KeyEvent::Char { ch: wrong, delay });
                    events.push(KeyEvent::Pause {
                        delay: self.timing.sample(&self.config.recognition),
                    });
                    events.push(KeyEvent::Backspace {
                        delay: self.timing.sample(&self.config.backspace),
                    });
                }
            }

            let delay = self.keystroke_delay(ch, prev);
            events.push(KeyEvent::Char { ch, delay });
            prev = Some(ch);

            burst_left -= 1;
            if burst_left == 0 && i + 1 < chars.len() {
                events.push(KeyEvent::Pause {
                    delay: self.timing.sample(&self.config.burst_pause),
                });
                burst_left = self.burst_len();
            }
        }

        KeySequence { events }
    }

    /// A physically adjacent key for `ch`, preserving case
    pub fn adjacent_key(&mut self, ch: char) -> Option<char> {
        let lower = ch.to_ascii_lowercase();
        let neighbors: Vec<char> = QWERTY_NEIGHBORS.get(&lower)?.chars().collect();
        let pick = *neighbors.choose(self.timing.rng())?;
        Some(if ch.is_ascii_uppercase() { pick.to_ascii_uppercase() } else { pick })
    }

    fn keystroke_delay(&mut self, ch: char, prev: Option<char>) -> Duration {
        let mut delay = self
            .timing
            .between(self.config.min_delay_ms, self.config.max_delay_ms);

        if ch.is_uppercase() || SHIFTED_SYMBOLS.contains(ch) {
            delay += self.timing.sample(&self.config.shift_penalty);
        }

        match prev {
            Some('.') | Some('!') | Some('?') => {
                delay += self.timing.sample(&self.config.sentence_pause);
            }
            Some(' ') if self.timing.chance(self.config.space_pause_probability) => {
                delay += self.timing.sample(&self.config.space_pause);
            }
            _ => {}
        }

        delay
    }

    fn burst_len(&mut self) -> usize {
        let lo = self.config.burst_min.max(1);
        let hi = self.config.burst_max.max(lo);
        self.timing.rng().gen_range(lo..=hi)
    }
}
