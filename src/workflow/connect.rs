//! Connection phase: one invitation per target, under the daily cap

use super::context::{Flow, RunContext};
use super::parser::{clean_company_name, parse_full_name, parse_headline};
use super::template::{self, TemplateVars};
use crate::driver::ElementRole;
use crate::error::ErrorClass;
use crate::policy::{ActionKind, Gate};
use crate::store::{ConnectionRecord, ConnectionStatus};
use crate::Result;
use tracing::{debug, info, instrument, warn};

/// What happened to a single target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    Sent,
    /// The page offered no usable control; recorded as failed
    Unavailable,
    /// The governor refused at the last moment; nothing recorded
    Denied,
}

#[instrument(skip(ctx, targets), fields(targets = targets.len()))]
pub async fn connect_all(ctx: &mut RunContext, targets: &[String]) -> Result<Flow> {
    if !ctx.config.connection.enabled {
        debug!("Connection requests disabled");
        return Ok(Flow::Continue);
    }

    for target in targets {
        if ctx.stop_requested() {
            info!("Stop requested, leaving connection phase");
            return Ok(Flow::Stop);
        }

        match ctx.governor.gate(ActionKind::Connection) {
            Gate::Open { remaining } => debug!(target = %target, remaining, "Connection gate open"),
            gate => {
                info!(?gate, "Connection gate closed, ending phase");
                break;
            }
        }

        match connect_one(ctx, target).await {
            Ok(TargetOutcome::Denied) => break,
            Ok(outcome) => ctx.pace(outcome == TargetOutcome::Sent).await,
            Err(e) => match e.class() {
                ErrorClass::Transient | ErrorClass::TargetState => {
                    warn!(target = %target, error = %e, "Skipping target");
                    ctx.report.errors += 1;
                    ctx.pace(false).await;
                }
                _ => return Err(e),
            },
        }
    }

    Ok(Flow::Continue)
}

async fn connect_one(ctx: &mut RunContext, target: &str) -> Result<TargetOutcome> {
    let url = ctx.parser.profile_url(target);
    ctx.open(&url).await?;
    ctx.human.think().await;

    let vars = read_profile(ctx).await?;
    let mut record = ConnectionRecord::new(target, url, ctx.clock.now_utc());
    record.first_name = vars.first_name.clone();
    record.last_name = vars.last_name.clone();
    record.job_title = vars.job_title.clone();
    record.company = vars.company.clone();
    record.location = vars.location.clone();

    let connect = match ctx.find(ElementRole::ConnectButton).await? {
        Some(button) if button.enabled => button,
        _ => {
            info!(target = %target, "No connect control, already connected or pending");
            return Ok(record_failure(ctx, record));
        }
    };
    ctx.human.click(&connect).await?;
    ctx.human.modal_pause().await;

    if ctx.config.connection.send_note {
        let templates = ctx.config.connection.note_templates.clone();
        let chosen = template::choose(&templates, ctx.human.timing().rng());
        if let Some((index, text)) = chosen {
            let note = template::truncate_note(
                &template::render(text, &vars),
                ctx.config.connection.max_note_length,
            );
            if let Some(add_note) = ctx.find(ElementRole::AddNoteButton).await? {
                ctx.human.click(&add_note).await?;
                ctx.human.modal_pause().await;
                if let Some(field) = ctx.find(ElementRole::NoteField).await? {
                    ctx.human.fill(&field, &note).await?;
                    debug!(template = index, chars = note.chars().count(), "Note written");
                    record.note = Some(note);
                }
            }
        }
    }

    let Some(send) = ctx.find(ElementRole::SendButton).await? else {
        warn!(target = %target, "Invitation dialog has no send control");
        return Ok(record_failure(ctx, record));
    };

    let gate = ctx.governor.acquire(ActionKind::Connection);
    if !gate.is_open() {
        info!(?gate, target = %target, "Connection refused before sending");
        return Ok(TargetOutcome::Denied);
    }

    let now = ctx.clock.now();
    let counted = ctx.store.increment_counter(now.date(), ActionKind::Connection, now);
    ctx.persist("count connection", counted);

    if let Err(e) = ctx.human.click(&send).await {
        warn!(target = %target, error = %e, "Send click failed, quota already spent");
        return Err(e);
    }
    record.status = ConnectionStatus::Pending;

    let upserted = ctx.store.upsert_connection(&record);
    ctx.persist("save connection", upserted);
    let marked = ctx.store.mark_target_processed(target);
    ctx.persist("mark target", marked);

    ctx.report.connections_sent += 1;
    info!(
        target = %target,
        name = %record.full_name(),
        note = record.note.is_some(),
        "Connection request sent"
    );
    Ok(TargetOutcome::Sent)
}

/// Name, title, company and location from the profile header
async fn read_profile(ctx: &RunContext) -> Result<TemplateVars> {
    let mut vars = TemplateVars::default();
    if let Some(name) = ctx.read_text(ElementRole::ProfileName).await? {
        let (first, last) = parse_full_name(&name);
        vars.first_name = first;
        vars.last_name = last;
    }
    if let Some(headline) = ctx.read_text(ElementRole::ProfileHeadline).await? {
        let (title, company) = parse_headline(&headline);
        vars.job_title = title;
        vars.company = clean_company_name(&company);
    }
    if let Some(location) = ctx.read_text(ElementRole::ProfileLocation).await? {
        vars.location = location;
    }
    Ok(vars)
}

fn record_failure(ctx: &mut RunContext, mut record: ConnectionRecord) -> TargetOutcome {
    record.status = ConnectionStatus::Failed;
    let upserted = ctx.store.upsert_connection(&record);
    ctx.persist("save failed connection", upserted);
    let marked = ctx.store.mark_target_processed(&record.target_id);
    ctx.persist("mark target", marked);
    ctx.report.connections_failed += 1;
    TargetOutcome::Unavailable
}
