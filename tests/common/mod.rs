//! Common test utilities
//!
//! A scripted site on the mock page driver and a configuration pointing at it.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use outreach_oxide::config::Config;
use outreach_oxide::driver::{Cookie, ElementRole, MockElement, MockPage, MockPageDriver};
use std::sync::Arc;

pub const BASE: &str = "https://social.test";

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

/// Monday 4 March 2024 at `h:m`
pub fn monday(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// Configuration as an operator would write it
pub const CONFIG_TOML: &str = r#"
[site]
base_url = "https://social.test"
cookie_domain = ".social.test"

[credentials]
username = "ada@example.com"
password = "hunter2"

[search]
job_titles = ["Engineer"]
max_pages = 2
max_targets = 10

[connection]
daily_limit = 20
note_templates = ["Hi {{firstName}}, fellow {{jobTitle}} here. Would love to connect!"]

[messaging]
templates = ["Thanks for connecting, {{firstName}}! How is life at {{company}}?"]

[stealth]
seed = 42
"#;

pub fn config() -> Config {
    let config = Config::from_toml_str(CONFIG_TOML).unwrap();
    config.validate().unwrap();
    config
}

pub fn session_cookie() -> Cookie {
    Cookie {
        name: "session".to_string(),
        value: "token-1".to_string(),
        domain: ".social.test".to_string(),
        path: "/".to_string(),
        expires: None,
        http_only: true,
        secure: true,
    }
}

pub fn profile(name: &str, headline: &str) -> MockPage {
    let mut page = MockPage::new()
        .with_content(format!("<main><h1>{}</h1></main>", name))
        .with_element(ElementRole::ProfileName, MockElement::new().with_text(name))
        .with_element(ElementRole::ProfileHeadline, MockElement::new().with_text(headline))
        .protected_by("session");
    for role in [
        ElementRole::ConnectButton,
        ElementRole::AddNoteButton,
        ElementRole::NoteField,
        ElementRole::SendButton,
        ElementRole::MessageButton,
        ElementRole::MessageField,
        ElementRole::MessageSendButton,
    ] {
        page = page.with_element(role, MockElement::new());
    }
    page
}

fn links(ids: &[&str]) -> String {
    ids.iter()
        .map(|id| format!(r#"<a href="https://social.test/in/{0}/">{0}</a>"#, id))
        .collect()
}

/// Two result pages: `ada` and `grace` on the first, `linus` on the second
pub fn site() -> Arc<MockPageDriver> {
    let driver = Arc::new(MockPageDriver::new());
    driver.set_login_url(url("/login"));
    driver.add_page(
        url("/login"),
        MockPage::new()
            .with_element(ElementRole::UsernameField, MockElement::new())
            .with_element(ElementRole::PasswordField, MockElement::new())
            .with_element(
                ElementRole::SubmitButton,
                MockElement::new()
                    .navigates_to(url("/feed/"))
                    .sets_cookies(vec![session_cookie()]),
            ),
    );
    driver.add_page(
        url("/feed/"),
        MockPage::new()
            .with_element(ElementRole::LoggedInMarker, MockElement::new())
            .protected_by("session"),
    );
    driver.add_page(
        url("/search/results/people/?keywords=Engineer"),
        MockPage::new()
            .with_content(links(&["ada", "grace"]))
            .with_element(
                ElementRole::NextPage,
                MockElement::new().navigates_to(url("/search/results/people/?keywords=Engineer&page=2")),
            )
            .protected_by("session"),
    );
    driver.add_page(
        url("/search/results/people/?keywords=Engineer&page=2"),
        MockPage::new()
            .with_content(links(&["grace", "linus"]))
            .with_element(ElementRole::NextPage, MockElement::new().disabled())
            .protected_by("session"),
    );
    driver.add_page(url("/in/ada/"), profile("Ada Lovelace", "Engineer at Analytical Engines"));
    driver.add_page(url("/in/grace/"), profile("Grace Hopper", "Engineer at Navy, Inc."));
    driver.add_page(url("/in/linus/"), profile("Linus", "Engineer"));
    driver
}

/// Relationship list showing `ids` as connected
pub fn show_connected(driver: &MockPageDriver, ids: &[&str]) {
    driver.add_page(
        url("/mynetwork/connections/"),
        MockPage::new().with_content(links(ids)).protected_by("session"),
    );
}
