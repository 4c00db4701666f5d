//! Messaging phase: accepted-connection detection and one follow-up each

use super::connect::TargetOutcome;
use super::context::{Flow, RunContext};
use super::template::{self, TemplateVars};
use crate::driver::ElementRole;
use crate::error::ErrorClass;
use crate::policy::{ActionKind, Gate};
use crate::store::{ConnectionRecord, ConnectionStatus, MessageRecord, MessageStatus};
use crate::Result;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Promote pending connections that now appear in the relationship list
#[instrument(skip(ctx))]
pub async fn detect_accepted(ctx: &mut RunContext) -> Result<u32> {
    let listed = ctx.store.list_connections(Some(ConnectionStatus::Pending));
    let pending = ctx.persist("list pending connections", listed).unwrap_or_default();
    if pending.is_empty() {
        debug!("No pending connections to check");
        return Ok(0);
    }

    let url = ctx.config.site.url(&ctx.config.site.connections_path);
    ctx.open(&url).await?;
    ctx.human.scroll_page().await?;
    let content = ctx.driver().content().await?;
    let connected: HashSet<String> = ctx.parser.extract_ids(&content).into_iter().collect();

    let mut accepted = 0;
    for record in pending.iter().filter(|r| connected.contains(&r.target_id)) {
        let now = ctx.clock.now_utc();
        let updated = ctx
            .store
            .update_connection_status(&record.target_id, ConnectionStatus::Accepted, now);
        if let Some(true) = ctx.persist("mark accepted", updated) {
            info!(target = %record.target_id, "Connection accepted");
            accepted += 1;
        }
    }

    ctx.report.accepted_detected += accepted;
    Ok(accepted)
}

#[instrument(skip(ctx))]
pub async fn message_all(ctx: &mut RunContext) -> Result<Flow> {
    if !ctx.config.messaging.enabled {
        debug!("Messaging disabled");
        return Ok(Flow::Continue);
    }
    if ctx.config.messaging.templates.is_empty() {
        warn!("Messaging enabled but no templates configured");
        return Ok(Flow::Continue);
    }

    if ctx.config.messaging.detect_accepted {
        if ctx.stop_requested() {
            return Ok(Flow::Stop);
        }
        if let Err(e) = detect_accepted(ctx).await {
            match e.class() {
                ErrorClass::Transient | ErrorClass::TargetState => {
                    warn!(error = %e, "Accepted-connection check failed, following up on known connections");
                    ctx.report.errors += 1;
                }
                _ => return Err(e),
            }
        }
    }

    let listed = ctx.store.list_connections(Some(ConnectionStatus::Accepted));
    let accepted = ctx.persist("list accepted connections", listed).unwrap_or_default();

    for record in accepted {
        let already = ctx.store.has_message_for(record.id);
        match ctx.persist("check message attempt", already) {
            Some(false) => {}
            _ => continue,
        }

        if ctx.stop_requested() {
            info!("Stop requested, leaving messaging phase");
            return Ok(Flow::Stop);
        }

        match ctx.governor.gate(ActionKind::Message) {
            Gate::Open { remaining } => debug!(target = %record.target_id, remaining, "Message gate open"),
            gate => {
                info!(?gate, "Message gate closed, ending phase");
                break;
            }
        }

        match message_one(ctx, &record).await {
            Ok(TargetOutcome::Denied) => break,
            Ok(outcome) => ctx.pace(outcome == TargetOutcome::Sent).await,
            Err(e) => match e.class() {
                ErrorClass::Transient | ErrorClass::TargetState => {
                    warn!(target = %record.target_id, error = %e, "Skipping message");
                    ctx.report.errors += 1;
                    ctx.pace(false).await;
                }
                _ => return Err(e),
            },
        }
    }

    Ok(Flow::Continue)
}

async fn message_one(ctx: &mut RunContext, record: &ConnectionRecord) -> Result<TargetOutcome> {
    let vars = TemplateVars {
        first_name: record.first_name.clone(),
        last_name: record.last_name.clone(),
        job_title: record.job_title.clone(),
        company: record.company.clone(),
        location: record.location.clone(),
    };
    let templates = ctx.config.messaging.templates.clone();
    let Some((index, text)) = template::choose(&templates, ctx.human.timing().rng()) else {
        return Ok(TargetOutcome::Unavailable);
    };
    let content = template::render(text, &vars);

    ctx.open(&record.profile_url).await?;
    ctx.human.think().await;

    let Some(button) = ctx.find(ElementRole::MessageButton).await? else {
        warn!(target = %record.target_id, "No message control on profile");
        return Ok(record_message(ctx, record.id, content, index, MessageStatus::Failed));
    };
    ctx.human.click(&button).await?;
    ctx.human.modal_pause().await;

    let Some(field) = ctx.find(ElementRole::MessageField).await? else {
        warn!(target = %record.target_id, "Message dialog has no input");
        return Ok(record_message(ctx, record.id, content, index, MessageStatus::Failed));
    };
    ctx.human.fill(&field, &content).await?;
    ctx.human.think().await;

    let Some(send) = ctx.find(ElementRole::MessageSendButton).await? else {
        warn!(target = %record.target_id, "Message dialog has no send control");
        return Ok(record_message(ctx, record.id, content, index, MessageStatus::Failed));
    };

    let gate = ctx.governor.acquire(ActionKind::Message);
    if !gate.is_open() {
        info!(?gate, target = %record.target_id, "Message refused before sending");
        return Ok(TargetOutcome::Denied);
    }

    let now = ctx.clock.now();
    let counted = ctx.store.increment_counter(now.date(), ActionKind::Message, now);
    ctx.persist("count message", counted);

    if let Err(e) = ctx.human.click(&send).await {
        warn!(target = %record.target_id, error = %e, "Send click failed, quota already spent");
        return Err(e);
    }
    info!(target = %record.target_id, template = index, "Follow-up message sent");
    Ok(record_message(ctx, record.id, content, index, MessageStatus::Sent))
}

fn record_message(
    ctx: &mut RunContext,
    connection_id: Uuid,
    content: String,
    template_index: usize,
    status: MessageStatus,
) -> TargetOutcome {
    let message = MessageRecord {
        id: Uuid::new_v4(),
        connection_id,
        content,
        template_index,
        status,
        sent_at: ctx.clock.now_utc(),
    };
    let saved = ctx.store.record_message(&message);
    ctx.persist("save message", saved);
    match status {
        MessageStatus::Sent => {
            ctx.report.messages_sent += 1;
            TargetOutcome::Sent
        }
        MessageStatus::Failed => {
            ctx.report.messages_failed += 1;
            TargetOutcome::Unavailable
        }
    }
}
