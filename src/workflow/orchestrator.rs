//! Drives one run through the phase state machine

use super::auth::{self, AuthOutcome};
use super::connect;
use super::context::{Flow, RunContext, StopSignal};
use super::humanize::Humanizer;
use super::messaging;
use super::parser::ProfileParser;
use super::report::{RunOutcome, RunReport};
use super::search;
use super::state::{FailureReason, PhaseState};
use crate::config::Config;
use crate::driver::PageDriver;
use crate::policy::{ActionKind, ActivityWindow, Clock, DailyLimits, RateGovernor, RetryPolicy};
use crate::stealth::{IdentityModel, ModelSeeds};
use crate::store::Store;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Why the phase sequence ended early
enum Halt {
    Stop,
    Rejected(String),
    Error(Error),
}

impl From<Error> for Halt {
    fn from(e: Error) -> Self {
        Halt::Error(e)
    }
}

#[derive(Debug)]
pub struct PhaseOrchestrator {
    state: PhaseState,
    ctx: RunContext,
    identity: IdentityModel,
}

impl PhaseOrchestrator {
    /// Wire the models and policies for one run. Every random source is
    /// derived from `stealth.seed`, so a seeded run replays exactly.
    pub fn new(
        config: Config,
        driver: Arc<dyn PageDriver>,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        stop: StopSignal,
    ) -> Result<Self> {
        let window = ActivityWindow::from_config(&config.schedule)?;
        let parser = ProfileParser::new(&config.site.base_url, &config.site.profile_prefix)?;
        let limits = DailyLimits {
            connections: if config.connection.enabled {
                config.connection.daily_limit
            } else {
                0
            },
            messages: if config.messaging.enabled {
                config.messaging.daily_limit
            } else {
                0
            },
        };

        let mut seeds = ModelSeeds::new(config.stealth.seed);
        let human = Humanizer::new(driver, &config.stealth, &mut seeds);
        let identity = IdentityModel::new(config.stealth.identity.clone(), seeds.next_rng());
        let retry = RetryPolicy::new(config.retry.clone(), seeds.next_rng());
        let governor = RateGovernor::new(Arc::clone(&clock), window, limits);

        let ctx = RunContext::new(config, store, clock, human, governor, retry, parser, stop);
        Ok(Self {
            state: PhaseState::Idle,
            ctx,
            identity,
        })
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    pub fn report(&self) -> &RunReport {
        &self.ctx.report
    }

    /// Execute every phase once and summarize. Never panics on site or
    /// store trouble; the outcome carries the reason instead.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> RunReport {
        let now = self.ctx.clock.now();
        if !self.ctx.governor.is_within_activity_window(now) {
            info!(now = %now, "Outside the activity window, nothing to do");
            self.ctx.report.outcome = RunOutcome::OutsideWindow;
            return self.finish();
        }

        let counters = self.ctx.store.daily_counters(now.date());
        if let Some(quota) = self.ctx.persist("load daily counters", counters) {
            self.ctx.governor.restore(&quota);
        }

        let outcome = match self.phases().await {
            Ok(()) => RunOutcome::Completed,
            Err(Halt::Stop) => {
                info!("Run stopped on request");
                self.settle_in(PhaseState::Stopped);
                RunOutcome::Stopped
            }
            Err(Halt::Rejected(reason)) => {
                error!(reason = %reason, "Authentication failed");
                self.settle_in(PhaseState::Failed(FailureReason::Authentication(reason.clone())));
                RunOutcome::Failed(format!("authentication failed: {}", reason))
            }
            Err(Halt::Error(Error::SecurityChallenge(kind))) => {
                error!(challenge = %kind, "{}", kind.instructions());
                self.settle_in(PhaseState::Failed(FailureReason::Challenge(kind)));
                RunOutcome::Challenge(kind)
            }
            Err(Halt::Error(e)) => {
                error!(error = %e, phase = %self.state, "Run failed");
                self.settle_in(PhaseState::Failed(FailureReason::Fatal(e.to_string())));
                RunOutcome::Failed(e.to_string())
            }
        };
        self.ctx.report.outcome = outcome;
        self.finish()
    }

    async fn phases(&mut self) -> std::result::Result<(), Halt> {
        self.enter(PhaseState::Authenticating)?;
        self.checkpoint()?;
        self.rotate_identity().await?;
        match auth::authenticate(&mut self.ctx).await? {
            AuthOutcome::Restored | AuthOutcome::LoggedIn => {}
            AuthOutcome::Challenge(kind) => return Err(Error::SecurityChallenge(kind).into()),
            AuthOutcome::Rejected(reason) => return Err(Halt::Rejected(reason)),
        }

        self.enter(PhaseState::Searching)?;
        self.checkpoint()?;
        let targets = if self.ctx.config.connection.enabled {
            search::search(&mut self.ctx).await?
        } else {
            Vec::new()
        };

        self.enter(PhaseState::Connecting)?;
        self.checkpoint()?;
        if connect::connect_all(&mut self.ctx, &targets).await? == Flow::Stop {
            return Err(Halt::Stop);
        }

        self.enter(PhaseState::Messaging)?;
        self.checkpoint()?;
        if messaging::message_all(&mut self.ctx).await? == Flow::Stop {
            return Err(Halt::Stop);
        }

        self.enter(PhaseState::Idle)?;
        Ok(())
    }

    fn checkpoint(&self) -> std::result::Result<(), Halt> {
        if self.ctx.stop_requested() {
            Err(Halt::Stop)
        } else {
            Ok(())
        }
    }

    /// Fresh browser identity for this run
    async fn rotate_identity(&mut self) -> Result<()> {
        let profile = self.identity.rotate();
        let driver = self.ctx.driver();
        driver.emulate(&profile).await?;
        if !profile.script.is_empty() {
            driver.inject_script(&profile.script).await?;
        }
        self.ctx.human.set_viewport(profile.viewport);
        info!(
            user_agent = %profile.user_agent,
            width = profile.viewport.width,
            height = profile.viewport.height,
            timezone = %profile.timezone,
            "Identity rotated"
        );
        Ok(())
    }

    fn enter(&mut self, next: PhaseState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        info!(from = %self.state, to = %next, "Phase transition");
        self.ctx.report.transitions.push(next.clone());
        self.state = next;
        Ok(())
    }

    /// Terminal transitions must not fail the run a second time
    fn settle_in(&mut self, next: PhaseState) {
        if let Err(e) = self.enter(next) {
            warn!(error = %e, "Ignoring rejected final transition");
        }
    }

    fn finish(&mut self) -> RunReport {
        let quota = self.ctx.governor.quota();
        self.ctx.report.connections_today = quota.count(ActionKind::Connection);
        self.ctx.report.messages_today = quota.count(ActionKind::Message);
        self.ctx.report.finished_at = Some(self.ctx.clock.now_utc());
        info!(outcome = %self.ctx.report.outcome, "Run finished");
        self.ctx.report.clone()
    }
}
