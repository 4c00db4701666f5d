//! Driver tests

use super::connection::CdpTimeouts;
use super::*;
use crate::stealth::Point;
use crate::Error;
use std::collections::HashMap;
use std::time::Duration;

const LOGIN: &str = "https://www.example.com/login";
const FEED: &str = "https://www.example.com/feed/";

fn session_cookie() -> Cookie {
    Cookie {
        name: "session".into(),
        value: "abc".into(),
        domain: ".example.com".into(),
        path: "/".into(),
        expires: None,
        http_only: true,
        secure: true,
    }
}

// ============================================================================
// ElementRole
// ============================================================================

#[test]
fn test_role_names_round_trip() {
    for role in ElementRole::ALL {
        assert_eq!(role.as_str().parse::<ElementRole>().unwrap(), role);
    }
    assert_eq!(ElementRole::ConnectButton.to_string(), "connect_button");
}

#[test]
fn test_unknown_role_is_configuration_error() {
    let err = "launch_button".parse::<ElementRole>().unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

// ============================================================================
// SelectorTable
// ============================================================================

#[test]
fn test_every_role_has_default_probes() {
    let table = SelectorTable::default();
    for role in ElementRole::ALL {
        assert!(!table.probes(role).is_empty(), "{} has no probes", role);
    }
}

#[test]
fn test_overrides_replace_defaults() {
    let mut overrides = HashMap::new();
    overrides.insert(
        "connect_button".to_string(),
        vec!["button.connect".to_string(), "text=Invite".to_string()],
    );
    let table = SelectorTable::with_overrides(&overrides).unwrap();
    assert_eq!(
        table.probes(ElementRole::ConnectButton),
        &[
            Probe::Css("button.connect".into()),
            Probe::Text("Invite".into())
        ]
    );
    assert_eq!(
        table.probes(ElementRole::SendButton),
        SelectorTable::default().probes(ElementRole::SendButton)
    );
}

#[test]
fn test_overrides_reject_unknown_role_and_empty_list() {
    let mut overrides = HashMap::new();
    overrides.insert("nope".to_string(), vec!["div".to_string()]);
    assert!(SelectorTable::with_overrides(&overrides).is_err());

    let mut overrides = HashMap::new();
    overrides.insert("send_button".to_string(), vec![]);
    assert!(SelectorTable::with_overrides(&overrides).is_err());
}

#[test]
fn test_probe_parsing_and_js() {
    assert_eq!(Probe::parse("xpath=//button"), Probe::XPath("//button".into()));
    assert_eq!(Probe::parse(" text=Send "), Probe::Text("Send".into()));
    assert_eq!(Probe::parse("#id"), Probe::Css("#id".into()));

    let js = Probe::parse("button[aria-label='Send now']").query_js();
    assert!(js.contains(r"button[aria-label=\'Send now\']"));
    let js = Probe::parse("text=Connect").query_js();
    assert!(js.contains("'connect'"));
}

#[test]
fn test_command_timeouts() {
    let timeouts = CdpTimeouts::default();
    assert_eq!(timeouts.for_method("Page.navigate"), timeouts.navigation);
    assert_eq!(timeouts.for_method("Runtime.evaluate"), timeouts.execution);
    assert_eq!(timeouts.for_method("Network.getCookies"), timeouts.default);
}

// ============================================================================
// MockPageDriver
// ============================================================================

fn site() -> MockPageDriver {
    let driver = MockPageDriver::new();
    driver.set_login_url(LOGIN);
    driver.add_page(
        LOGIN,
        MockPage::new()
            .with_element(ElementRole::UsernameField, MockElement::new())
            .with_element(
                ElementRole::SubmitButton,
                MockElement::new()
                    .navigates_to(FEED)
                    .sets_cookies(vec![session_cookie()]),
            ),
    );
    driver.add_page(
        FEED,
        MockPage::new()
            .with_content("<nav id='global-nav'></nav>")
            .with_element(ElementRole::LoggedInMarker, MockElement::new().with_text("Home"))
            .protected_by("session"),
    );
    driver
}

#[tokio::test]
async fn test_mock_protected_page_redirects_without_cookie() {
    let driver = site();
    driver.navigate(FEED).await.unwrap();
    assert_eq!(driver.current_url().await.unwrap(), LOGIN);

    driver.set_cookies(&[session_cookie()]).await.unwrap();
    driver.navigate(FEED).await.unwrap();
    assert_eq!(driver.current_url().await.unwrap(), FEED);
    assert!(driver.content().await.unwrap().contains("global-nav"));
}

#[tokio::test]
async fn test_mock_click_navigates_and_sets_cookies() {
    let driver = site();
    driver.navigate(LOGIN).await.unwrap();
    let submit = driver
        .find(ElementRole::SubmitButton, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    driver.click(&submit, submit.bounds.center()).await.unwrap();

    assert_eq!(driver.current_url().await.unwrap(), FEED);
    assert_eq!(driver.cookies().len(), 1);
    assert_eq!(driver.click_count(ElementRole::SubmitButton), 1);
}

#[tokio::test]
async fn test_mock_typing_targets_focused_field() {
    let driver = site();
    driver.navigate(LOGIN).await.unwrap();
    let field = driver
        .find(ElementRole::UsernameField, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    driver.click(&field, Point::new(410.0, 310.0)).await.unwrap();
    for ch in "adq".chars() {
        driver.type_char(ch).await.unwrap();
    }
    driver.press_backspace().await.unwrap();
    driver.type_char('a').await.unwrap();

    assert_eq!(driver.field_value(ElementRole::UsernameField).as_deref(), Some("ada"));
}

#[tokio::test]
async fn test_mock_missing_element_and_flaky_navigation() {
    let driver = site();
    driver.navigate(LOGIN).await.unwrap();
    assert!(driver
        .find(ElementRole::ConnectButton, Duration::from_secs(1))
        .await
        .unwrap()
        .is_none());

    driver.fail_navigation(LOGIN, 1);
    let err = driver.navigate(LOGIN).await.unwrap_err();
    assert!(err.is_transient());
    driver.navigate(LOGIN).await.unwrap();
    assert_eq!(driver.navigations().len(), 3);
}

#[tokio::test]
async fn test_mock_read_text_and_attribute() {
    let driver = MockPageDriver::new();
    driver.add_page(
        "https://www.example.com/in/ada/",
        MockPage::new().with_element(
            ElementRole::ProfileName,
            MockElement::new()
                .with_text("Ada Lovelace")
                .with_attribute("title", "Ada"),
        ),
    );
    driver.navigate("https://www.example.com/in/ada/").await.unwrap();
    let name = driver
        .find(ElementRole::ProfileName, Duration::ZERO)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        driver.read(&name, ReadTarget::Text).await.unwrap().as_deref(),
        Some("Ada Lovelace")
    );
    assert_eq!(
        driver
            .read(&name, ReadTarget::Attribute("title".into()))
            .await
            .unwrap()
            .as_deref(),
        Some("Ada")
    );
    assert_eq!(
        driver
            .read(&name, ReadTarget::Attribute("href".into()))
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_mock_disabled_element_cannot_be_clicked() {
    let driver = MockPageDriver::new();
    driver.add_page(
        FEED,
        MockPage::new().with_element(ElementRole::SendButton, MockElement::new().disabled()),
    );
    driver.navigate(FEED).await.unwrap();
    let send = driver
        .find(ElementRole::SendButton, Duration::ZERO)
        .await
        .unwrap()
        .unwrap();
    assert!(!send.enabled);
    assert!(driver.click(&send, send.bounds.center()).await.is_err());
}
