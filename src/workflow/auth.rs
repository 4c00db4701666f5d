//! Authentication phase: session restore, then credential login

use super::challenge::{self, ChallengeKind};
use super::context::RunContext;
use crate::driver::ElementRole;
use crate::store::SessionRecord;
use crate::{Error, Result};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Stored cookies were accepted by the site
    Restored,
    LoggedIn,
    Challenge(ChallengeKind),
    /// Login was not confirmed; carries the page's error text when shown
    Rejected(String),
}

#[instrument(skip(ctx))]
pub async fn authenticate(ctx: &mut RunContext) -> Result<AuthOutcome> {
    if restore_session(ctx).await? {
        return Ok(AuthOutcome::Restored);
    }
    login(ctx).await
}

/// Try the stored session; an unusable one is cleared
async fn restore_session(ctx: &mut RunContext) -> Result<bool> {
    let loaded = ctx.store.load_session();
    let Some(session) = ctx.persist("load session", loaded).flatten() else {
        debug!("No stored session");
        return Ok(false);
    };

    let now = ctx.clock.now_utc();
    let max_age = chrono::Duration::hours(ctx.config.session.max_age_hours);
    if !session.is_valid(now, &ctx.config.session.required_cookies, max_age) {
        info!(saved_at = %session.saved_at, "Stored session expired or incomplete, discarding");
        let cleared = ctx.store.clear_session();
        ctx.persist("clear session", cleared);
        return Ok(false);
    }

    ctx.driver().set_cookies(&session.cookies).await?;
    let home = ctx.config.site.url(&ctx.config.site.home_path);
    ctx.open(&home).await?;

    if is_logged_in(ctx).await? {
        info!(cookies = session.cookies.len(), "Session restored");
        return Ok(true);
    }

    warn!("Stored session was not accepted, logging in again");
    let cleared = ctx.store.clear_session();
    ctx.persist("clear session", cleared);
    Ok(false)
}

async fn login(ctx: &mut RunContext) -> Result<AuthOutcome> {
    let username = ctx.config.credentials.username.clone();
    let password = ctx.config.credentials.password.clone();
    if username.is_empty() || password.is_empty() {
        return Ok(AuthOutcome::Rejected("no credentials configured".to_string()));
    }

    let login_url = ctx.config.site.url(&ctx.config.site.login_path);
    ctx.open(&login_url).await?;

    let user_field = require(ctx, ElementRole::UsernameField).await?;
    ctx.human.fill(&user_field, &username).await?;
    ctx.human.think().await;

    let pass_field = require(ctx, ElementRole::PasswordField).await?;
    ctx.human.fill(&pass_field, &password).await?;

    let submit = require(ctx, ElementRole::SubmitButton).await?;
    ctx.human.click(&submit).await?;
    let timeout = ctx.page_timeout();
    ctx.human.settle(timeout).await?;

    let driver = ctx.driver();
    let url = driver.current_url().await?;
    let content = driver.content().await?;
    if let Some(kind) = challenge::detect(&url, &content, &ctx.config.site.challenge) {
        warn!(challenge = %kind, "{}", kind.instructions());
        return Ok(AuthOutcome::Challenge(kind));
    }

    if !is_logged_in(ctx).await? {
        let reason = ctx
            .read_text(ElementRole::LoginError)
            .await?
            .unwrap_or_else(|| "login was not confirmed".to_string());
        warn!(reason = %reason, "Login rejected");
        return Ok(AuthOutcome::Rejected(reason));
    }

    let cookies = driver.read_cookies(&ctx.config.site.cookie_domain).await?;
    let session = SessionRecord {
        cookies,
        saved_at: ctx.clock.now_utc(),
    };
    let saved = ctx.store.save_session(&session);
    ctx.persist("save session", saved);
    info!(cookies = session.cookies.len(), "Logged in, session saved");
    Ok(AuthOutcome::LoggedIn)
}

/// URL marker first, then the logged-in element probe
async fn is_logged_in(ctx: &RunContext) -> Result<bool> {
    let url = ctx.driver().current_url().await?;
    if ctx
        .config
        .site
        .logged_in_url_markers
        .iter()
        .any(|m| url.contains(m.as_str()))
    {
        return Ok(true);
    }
    Ok(ctx.find(ElementRole::LoggedInMarker).await?.is_some())
}

async fn require(ctx: &RunContext, role: ElementRole) -> Result<crate::driver::ElementHandle> {
    ctx.find(role)
        .await?
        .ok_or_else(|| Error::element_not_found(role.to_string()))
}
