//! Daily quota and business-hours gate
//!
//! Each action kind owns a bucket whose capacity is the daily cap. Buckets
//! refill in full when the local calendar date changes. The activity window
//! closes outside business hours, on weekends (when configured) and during
//! break intervals.

use super::clock::Clock;
use crate::config::ScheduleConfig;
use crate::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Irreversible outreach actions that count against a daily cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Connection,
    Message,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Connection => "connection",
            ActionKind::Message => "message",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub date: NaiveDate,
    pub connections: u32,
    pub messages: u32,
    pub last_connection_at: Option<NaiveDateTime>,
    pub last_message_at: Option<NaiveDateTime>,
}

impl Quota {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            connections: 0,
            messages: 0,
            last_connection_at: None,
            last_message_at: None,
        }
    }

    pub fn count(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Connection => self.connections,
            ActionKind::Message => self.messages,
        }
    }

    pub fn record(&mut self, kind: ActionKind, at: NaiveDateTime) {
        match kind {
            ActionKind::Connection => {
                self.connections = self.connections.saturating_add(1);
                self.last_connection_at = Some(at);
            }
            ActionKind::Message => {
                self.messages = self.messages.saturating_add(1);
                self.last_message_at = Some(at);
            }
        }
    }
}

/// Daily caps per action kind; zero disables a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyLimits {
    pub connections: u32,
    pub messages: u32,
}

impl DailyLimits {
    pub fn capacity(&self, kind: ActionKind) -> u32 {
        match kind {
            ActionKind::Connection => self.connections,
            ActionKind::Message => self.messages,
        }
    }
}

/// Half-open `[start, end)` pause inside the working day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BreakInterval {
    pub fn contains(&self, t: NaiveTime) -> bool {
        t >= self.start && t < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityWindow {
    pub enabled: bool,
    pub start_hour: u32,
    pub end_hour: u32,
    pub skip_weekends: bool,
    pub breaks: Vec<BreakInterval>,
}

impl ActivityWindow {
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let breaks = config
            .breaks
            .iter()
            .map(|b| b.parse().map(|(start, end)| BreakInterval { start, end }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            enabled: config.enabled,
            start_hour: config.start_hour,
            end_hour: config.end_hour,
            skip_weekends: config.skip_weekends,
            breaks,
        })
    }

    /// A window that never closes
    pub fn always_open() -> Self {
        Self {
            enabled: false,
            start_hour: 0,
            end_hour: 24,
            skip_weekends: false,
            breaks: Vec::new(),
        }
    }

    pub fn contains(&self, now: NaiveDateTime) -> bool {
        if !self.enabled {
            return true;
        }
        if self.skip_weekends && matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let hour = now.hour();
        if hour < self.start_hour || hour >= self.end_hour {
            return false;
        }
        let t = now.time();
        !self.breaks.iter().any(|b| b.contains(t))
    }
}

/// Outcome of a gate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The action may proceed; `remaining` counts actions left today after it
    Open { remaining: u32 },
    OutsideWindow,
    Exhausted,
}

impl Gate {
    pub fn is_open(&self) -> bool {
        matches!(self, Gate::Open { .. })
    }
}

/// Result of a bucket draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumption {
    pub allowed: bool,
    pub remaining: u32,
}

/// Combined quota and schedule gate
#[derive(Debug)]
pub struct RateGovernor {
    clock: Arc<dyn Clock>,
    window: ActivityWindow,
    limits: DailyLimits,
    quota: Quota,
}

impl RateGovernor {
    pub fn new(clock: Arc<dyn Clock>, window: ActivityWindow, limits: DailyLimits) -> Self {
        let quota = Quota::new(clock.now().date());
        Self {
            clock,
            window,
            limits,
            quota,
        }
    }

    /// Resume today's counters from persisted state. Stale days are ignored
    /// and counters never move backwards.
    pub fn restore(&mut self, persisted: &Quota) {
        self.rollover();
        if persisted.date != self.quota.date {
            return;
        }
        self.quota.connections = self.quota.connections.max(persisted.connections);
        self.quota.messages = self.quota.messages.max(persisted.messages);
        self.quota.last_connection_at = self.quota.last_connection_at.or(persisted.last_connection_at);
        self.quota.last_message_at = self.quota.last_message_at.or(persisted.last_message_at);
        debug!(
            date = %self.quota.date,
            connections = self.quota.connections,
            messages = self.quota.messages,
            "Restored daily counters"
        );
    }

    /// Draw one token for `kind`
    pub fn try_consume(&mut self, kind: ActionKind) -> Consumption {
        self.rollover();
        let capacity = self.limits.capacity(kind);
        let used = self.quota.count(kind);
        if used >= capacity {
            return Consumption {
                allowed: false,
                remaining: 0,
            };
        }
        let now = self.clock.now();
        self.quota.record(kind, now);
        Consumption {
            allowed: true,
            remaining: capacity - used - 1,
        }
    }

    /// Tokens left for `kind` today
    pub fn remaining(&mut self, kind: ActionKind) -> u32 {
        self.rollover();
        self.limits.capacity(kind).saturating_sub(self.quota.count(kind))
    }

    pub fn is_within_activity_window(&self, now: NaiveDateTime) -> bool {
        self.window.contains(now)
    }

    /// Peek at both gates without consuming
    pub fn gate(&mut self, kind: ActionKind) -> Gate {
        if !self.window.contains(self.clock.now()) {
            return Gate::OutsideWindow;
        }
        match self.remaining(kind) {
            0 => Gate::Exhausted,
            n => Gate::Open { remaining: n - 1 },
        }
    }

    /// Check both gates and consume a token if they are open
    pub fn acquire(&mut self, kind: ActionKind) -> Gate {
        if !self.window.contains(self.clock.now()) {
            return Gate::OutsideWindow;
        }
        let drawn = self.try_consume(kind);
        if drawn.allowed {
            Gate::Open {
                remaining: drawn.remaining,
            }
        } else {
            Gate::Exhausted
        }
    }

    pub fn quota(&self) -> &Quota {
        &self.quota
    }

    pub fn limits(&self) -> DailyLimits {
        self.limits
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn rollover(&mut self) {
        let today = self.clock.now().date();
        if today != self.quota.date {
            info!(from = %self.quota.date, to = %today, "New day, daily quota refilled");
            self.quota = Quota::new(today);
        }
    }
}
