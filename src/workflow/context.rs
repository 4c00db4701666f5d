//! Shared run state handed to every phase

use super::humanize::Humanizer;
use super::parser::ProfileParser;
use super::report::RunReport;
use crate::config::Config;
use crate::driver::{ElementHandle, ElementRole, PageDriver, ReadTarget};
use crate::policy::{Clock, RateGovernor, RetryPolicy};
use crate::store::Store;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Requests a cooperative stop; cloneable, usable from signal handlers
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Observed by the run at every checkpoint
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

/// A connected handle/signal pair
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop is requested
    pub async fn stopped(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                // Sender gone without stopping; never resolves
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Whether a phase ran to its end or was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug)]
pub struct RunContext {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub human: Humanizer,
    pub governor: RateGovernor,
    pub retry: RetryPolicy,
    pub parser: ProfileParser,
    pub stop: StopSignal,
    pub report: RunReport,
    actions: u32,
}

impl RunContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        human: Humanizer,
        governor: RateGovernor,
        retry: RetryPolicy,
        parser: ProfileParser,
        stop: StopSignal,
    ) -> Self {
        let report = RunReport::new(clock.now_utc(), governor.limits());
        Self {
            config,
            store,
            clock,
            human,
            governor,
            retry,
            parser,
            stop,
            report,
            actions: 0,
        }
    }

    pub fn driver(&self) -> Arc<dyn PageDriver> {
        Arc::clone(self.human.driver())
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.config.driver.element_timeout_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.config.driver.page_timeout_ms)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Navigate with transient-failure retry, then settle on the page
    pub async fn open(&mut self, url: &str) -> Result<()> {
        let driver = self.driver();
        self.retry
            .execute_when(
                || {
                    let driver = Arc::clone(&driver);
                    let url = url.to_string();
                    async move { driver.navigate(&url).await }
                },
                Error::is_transient,
            )
            .await?;
        let timeout = self.page_timeout();
        self.human.settle(timeout).await
    }

    pub async fn find(&self, role: ElementRole) -> Result<Option<ElementHandle>> {
        self.human.driver().find(role, self.element_timeout()).await
    }

    /// Trimmed text of the first element for `role`, if any
    pub async fn read_text(&self, role: ElementRole) -> Result<Option<String>> {
        let Some(element) = self.find(role).await? else {
            return Ok(None);
        };
        Ok(self
            .human
            .driver()
            .read(&element, ReadTarget::Text)
            .await?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    /// Unwrap a store result, logging and counting a failure
    pub fn persist<T>(&mut self, what: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!(operation = what, error = %e, "Persistence failure");
                self.report.persistence_errors += 1;
                None
            }
        }
    }

    /// Pause between targets; `irreversible` counts toward the bulk cooldown
    pub async fn pace(&mut self, irreversible: bool) {
        let pacing = self.config.pacing.clone();
        self.human.pause(&pacing.between_actions).await;
        if irreversible {
            self.actions += 1;
            if pacing.cooldown_every > 0 && self.actions % pacing.cooldown_every == 0 {
                let rest = self.human.pause(&pacing.cooldown).await;
                info!(
                    actions = self.actions,
                    pause_ms = rest.as_millis() as u64,
                    "Cooldown after bulk actions"
                );
            }
        }
    }
}
