//! Search phase: collect unprocessed profile targets from result pages

use super::context::RunContext;
use crate::config::{SearchConfig, SiteConfig};
use crate::driver::ElementRole;
use crate::error::ErrorClass;
use crate::Result;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Results URL for the configured titles, keywords and first location
pub fn query_url(site: &SiteConfig, search: &SearchConfig) -> String {
    let terms: Vec<&str> = search
        .job_titles
        .iter()
        .chain(search.keywords.iter())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    let mut url = format!(
        "{}?keywords={}",
        site.url(&site.search_path),
        urlencoding::encode(&terms.join(" "))
    );
    if let Some(location) = search.locations.iter().map(|l| l.trim()).find(|l| !l.is_empty()) {
        url.push_str("&location=");
        url.push_str(&urlencoding::encode(location));
    }
    url
}

/// Walk result pages and return new target ids in discovery order
///
/// A page that fails to load or paginate ends the walk; targets gathered
/// before it are still returned.
#[instrument(skip(ctx))]
pub async fn search(ctx: &mut RunContext) -> Result<Vec<String>> {
    let url = query_url(&ctx.config.site, &ctx.config.search);
    info!(
        url = %url,
        max_pages = ctx.config.search.max_pages,
        max_targets = ctx.config.search.max_targets,
        "Searching"
    );

    let mut targets = Vec::new();
    if let Err(e) = walk_pages(ctx, &url, &mut targets).await {
        match e.class() {
            ErrorClass::Transient | ErrorClass::TargetState => {
                warn!(error = %e, kept = targets.len(), "Search interrupted");
                ctx.report.errors += 1;
            }
            _ => return Err(e),
        }
    }

    ctx.report.targets_discovered = targets.len() as u32;
    info!(
        targets = targets.len(),
        skipped = ctx.report.targets_skipped,
        "Search finished"
    );
    Ok(targets)
}

async fn walk_pages(ctx: &mut RunContext, url: &str, targets: &mut Vec<String>) -> Result<()> {
    let max_pages = ctx.config.search.max_pages.max(1);
    let max_targets = ctx.config.search.max_targets;
    let mut seen = HashSet::new();

    ctx.open(url).await?;

    for page in 1..=max_pages {
        if ctx.stop_requested() {
            debug!(page, "Stop requested, ending search");
            break;
        }

        ctx.human.scroll_page().await?;
        let content = ctx.driver().content().await?;
        let ids = ctx.parser.extract_ids(&content);
        debug!(page, found = ids.len(), "Extracted profile links");

        for id in ids {
            if targets.len() >= max_targets {
                break;
            }
            if !seen.insert(id.clone()) {
                continue;
            }
            let processed = ctx.store.is_target_processed(&id);
            match ctx.persist("check processed target", processed) {
                Some(false) => targets.push(id),
                Some(true) => ctx.report.targets_skipped += 1,
                // Unknown state: leave it for a later run
                None => {}
            }
        }

        if targets.len() >= max_targets || page == max_pages {
            break;
        }

        match ctx.find(ElementRole::NextPage).await? {
            Some(next) if next.enabled => {
                ctx.human.click(&next).await?;
                let timeout = ctx.page_timeout();
                ctx.human.settle(timeout).await?;
            }
            _ => {
                debug!(page, "No further result pages");
                break;
            }
        }
    }
    Ok(())
}
