//! End-to-end workflow tests
//!
//! Multi-run scenarios against the scripted site with durable SQLite state,
//! the way an operator would schedule the binary.

mod common;

use common::{config, monday, show_connected, site, url, CONFIG_TOML};
use outreach_oxide::config::Config;
use outreach_oxide::driver::{ElementRole, MockPageDriver};
use outreach_oxide::policy::{ActionKind, Clock, ManualClock};
use outreach_oxide::store::{ConnectionStatus, MemoryStore, SqliteStore, Store};
use outreach_oxide::workflow::{stop_channel, PhaseOrchestrator, PhaseState, RunOutcome, RunReport};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

async fn run_once(
    config: Config,
    driver: &Arc<MockPageDriver>,
    store: Arc<dyn Store>,
    clock: &Arc<ManualClock>,
) -> RunReport {
    let (_stop, signal) = stop_channel();
    let mut orchestrator =
        PhaseOrchestrator::new(config, driver.clone(), store, clock.clone(), signal).unwrap();
    orchestrator.run().await
}

fn reopen(path: &Path) -> Arc<dyn Store> {
    Arc::new(SqliteStore::open(path).unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_outreach_lifecycle_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("outreach.db");
    let driver = site();
    let clock = Arc::new(ManualClock::new(monday(10, 0)));

    // Morning: log in, walk both result pages, invite everyone
    let morning = run_once(config(), &driver, reopen(&db), &clock).await;
    assert_eq!(morning.outcome, RunOutcome::Completed);
    assert_eq!(morning.targets_discovered, 3);
    assert_eq!(morning.connections_sent, 3);
    assert_eq!(driver.click_count(ElementRole::NextPage), 1);
    assert_eq!(driver.click_count(ElementRole::SubmitButton), 1);

    let store = reopen(&db);
    let grace = store.get_connection("grace").unwrap().unwrap();
    assert_eq!(grace.company, "Navy");
    assert_eq!(
        grace.note.as_deref(),
        Some("Hi Grace, fellow Engineer here. Would love to connect!")
    );
    assert!(store.load_session().unwrap().is_some());

    // Afternoon: two invitations were accepted
    show_connected(&driver, &["ada", "linus"]);
    clock.set(monday(14, 30));
    let afternoon = run_once(config(), &driver, reopen(&db), &clock).await;

    assert_eq!(afternoon.outcome, RunOutcome::Completed);
    assert_eq!(driver.click_count(ElementRole::SubmitButton), 1, "session was restored");
    assert_eq!(afternoon.connections_sent, 0);
    assert_eq!(afternoon.targets_skipped, 3);
    assert_eq!(afternoon.accepted_detected, 2);
    assert_eq!(afternoon.messages_sent, 2);
    assert_eq!(afternoon.connections_today, 3);
    assert_eq!(afternoon.messages_today, 2);

    let typed = driver.field_value(ElementRole::MessageField).unwrap();
    assert!(typed.contains("Thanks for connecting, Ada! How is life at Analytical Engines?"));
    assert!(typed.contains("Thanks for connecting, Linus! How is life?"));

    let store = reopen(&db);
    let ada = store.get_connection("ada").unwrap().unwrap();
    assert_eq!(ada.status, ConnectionStatus::Accepted);
    assert!(store.has_message_for(ada.id).unwrap());
    assert_eq!(
        store.get_connection("grace").unwrap().unwrap().status,
        ConnectionStatus::Pending
    );
    let today = store.daily_counters(clock.now().date()).unwrap();
    assert_eq!(today.count(ActionKind::Connection), 3);
    assert_eq!(today.count(ActionKind::Message), 2);

    // Next morning: nothing left to do, fresh quota
    clock.set(monday(10, 0) + chrono::Duration::days(1));
    let tuesday = run_once(config(), &driver, reopen(&db), &clock).await;

    assert_eq!(tuesday.outcome, RunOutcome::Completed);
    assert_eq!(tuesday.messages_sent, 0);
    assert_eq!(tuesday.connections_sent, 0);
    assert_eq!(tuesday.connections_today, 0);
    assert_eq!(driver.click_count(ElementRole::MessageSendButton), 2);
}

#[tokio::test(start_paused = true)]
async fn test_config_file_with_env_free_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(CONFIG_TOML.as_bytes()).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.site.base_url, "https://social.test");
    assert_eq!(config.search.max_pages, 2);
    assert_eq!(config.stealth.seed, Some(42));
    // Untouched sections keep their defaults
    assert_eq!(config.session.max_age_hours, 12);
    assert!(config.schedule.skip_weekends);

    let driver = site();
    let clock = Arc::new(ManualClock::new(monday(11, 0)));
    let report = run_once(config, &driver, Arc::new(MemoryStore::new()), &clock).await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.transitions.last(), Some(&PhaseState::Idle));
}

#[tokio::test(start_paused = true)]
async fn test_same_seed_replays_identical_interaction() {
    let clock = Arc::new(ManualClock::new(monday(10, 0)));

    let first = site();
    run_once(config(), &first, Arc::new(MemoryStore::new()), &clock).await;
    let second = site();
    run_once(config(), &second, Arc::new(MemoryStore::new()), &clock).await;
    assert_eq!(first.calls(), second.calls());

    let mut reseeded = config();
    reseeded.stealth.seed = Some(43);
    let third = site();
    run_once(reseeded, &third, Arc::new(MemoryStore::new()), &clock).await;
    assert_ne!(first.calls(), third.calls());
    assert_eq!(first.navigations(), third.navigations());
}

#[tokio::test(start_paused = true)]
async fn test_weekend_run_leaves_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("outreach.db");
    let driver = site();
    // Sunday
    let clock = Arc::new(ManualClock::new(monday(10, 0) - chrono::Duration::days(1)));

    let report = run_once(config(), &driver, reopen(&db), &clock).await;

    assert_eq!(report.outcome, RunOutcome::OutsideWindow);
    assert!(driver.calls().is_empty());
    let store = reopen(&db);
    assert!(store.list_connections(None).unwrap().is_empty());
    assert!(store.load_session().unwrap().is_none());
    assert_eq!(url("/in/ada/"), "https://social.test/in/ada/");
}
