//! Scripted in-memory site for tests
//!
//! Pages are registered by exact URL. Elements carry the text they expose and
//! what clicking them does (navigate, set cookies). Every driver call is
//! recorded so tests can assert on the exact interaction sequence.

use super::traits::PageDriver;
use super::types::{Cookie, ElementHandle, ElementRole, ReadTarget};
use crate::stealth::{IdentityProfile, Point, Rect};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One recorded driver interaction
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Navigate(String),
    WaitLoaded,
    Find(ElementRole),
    Read(ElementRole),
    MovePointer(Point),
    Click(ElementRole),
    TypeChar(char),
    Backspace,
    Scroll(i64),
    InjectScript,
    Emulate(String),
    ReadCookies(String),
    SetCookies(usize),
}

#[derive(Debug, Clone)]
pub struct MockElement {
    pub text: Option<String>,
    pub attributes: HashMap<String, String>,
    pub enabled: bool,
    pub bounds: Rect,
    pub navigates_to: Option<String>,
    pub sets_cookies: Vec<Cookie>,
    /// Clicks reach the page but the driver reports a timeout
    pub click_times_out: bool,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            text: None,
            attributes: HashMap::new(),
            enabled: true,
            bounds: Rect {
                x: 400.0,
                y: 300.0,
                width: 120.0,
                height: 32.0,
            },
            navigates_to: None,
            sets_cookies: Vec::new(),
            click_times_out: false,
        }
    }
}

impl MockElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigates_to = Some(url.into());
        self
    }

    pub fn sets_cookies(mut self, cookies: Vec<Cookie>) -> Self {
        self.sets_cookies = cookies;
        self
    }

    pub fn click_times_out(mut self) -> Self {
        self.click_times_out = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub content: String,
    pub elements: HashMap<ElementRole, MockElement>,
    /// Served only when this cookie is set; otherwise the site's login redirect applies
    pub requires_cookie: Option<String>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_element(mut self, role: ElementRole, element: MockElement) -> Self {
        self.elements.insert(role, element);
        self
    }

    pub fn protected_by(mut self, cookie: impl Into<String>) -> Self {
        self.requires_cookie = Some(cookie.into());
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    pages: HashMap<String, MockPage>,
    login_url: Option<String>,
    current_url: String,
    calls: Vec<DriverCall>,
    cookies: Vec<Cookie>,
    focused: Option<ElementRole>,
    fields: HashMap<ElementRole, String>,
    /// Remaining transient failures per URL
    flaky: HashMap<String, u32>,
    scripts: Vec<String>,
    identity: Option<IdentityProfile>,
}

impl MockState {
    fn page(&self) -> Option<&MockPage> {
        self.pages.get(&self.current_url)
    }

    fn has_cookie(&self, name: &str) -> bool {
        self.cookies.iter().any(|c| c.name == name && !c.value.is_empty())
    }

    fn go(&mut self, url: &str) {
        let mut target = url.to_string();
        if let (Some(page), Some(login)) = (self.pages.get(url), self.login_url.as_ref()) {
            if let Some(cookie) = &page.requires_cookie {
                if !self.has_cookie(cookie) {
                    target = login.clone();
                }
            }
        }
        self.current_url = target;
        self.focused = None;
    }
}

#[derive(Debug, Default)]
pub struct MockPageDriver {
    state: Mutex<MockState>,
}

impl MockPageDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_page(&self, url: impl Into<String>, page: MockPage) {
        self.state().pages.insert(url.into(), page);
    }

    /// Where protected pages send a visitor without the required cookie
    pub fn set_login_url(&self, url: impl Into<String>) {
        self.state().login_url = Some(url.into());
    }

    /// Make the next `times` navigations to `url` time out
    pub fn fail_navigation(&self, url: impl Into<String>, times: u32) {
        self.state().flaky.insert(url.into(), times);
    }

    pub fn preset_cookies(&self, cookies: Vec<Cookie>) {
        self.state().cookies = cookies;
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.state().calls.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<ElementRole> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::Click(role) => Some(role),
                _ => None,
            })
            .collect()
    }

    pub fn click_count(&self, role: ElementRole) -> usize {
        self.clicks().into_iter().filter(|r| *r == role).count()
    }

    /// Text currently held by an input, after backspaces
    pub fn field_value(&self, role: ElementRole) -> Option<String> {
        self.state().fields.get(&role).cloned()
    }

    pub fn cookies(&self) -> Vec<Cookie> {
        self.state().cookies.clone()
    }

    pub fn injected_scripts(&self) -> Vec<String> {
        self.state().scripts.clone()
    }

    pub fn identity(&self) -> Option<IdentityProfile> {
        self.state().identity.clone()
    }

    fn record(&self, call: DriverCall) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl PageDriver for MockPageDriver {
    async fn navigate(&self, url: &str) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::Navigate(url.to_string()));
        if let Some(left) = state.flaky.get_mut(url) {
            if *left > 0 {
                *left -= 1;
                return Err(Error::timeout(format!("Navigation to {} timed out", url)));
            }
        }
        state.go(url);
        Ok(())
    }

    async fn wait_loaded(&self, _timeout: Duration) -> Result<(), Error> {
        self.record(DriverCall::WaitLoaded);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, Error> {
        Ok(self.state().current_url.clone())
    }

    async fn content(&self) -> Result<String, Error> {
        Ok(self
            .state()
            .page()
            .map(|p| p.content.clone())
            .unwrap_or_default())
    }

    async fn find(&self, role: ElementRole, _timeout: Duration) -> Result<Option<ElementHandle>, Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::Find(role));
        let url = state.current_url.clone();
        Ok(state.page().and_then(|p| p.elements.get(&role)).map(|el| ElementHandle {
            id: format!("{}#{}", url, role),
            role,
            bounds: el.bounds,
            enabled: el.enabled,
        }))
    }

    async fn read(&self, element: &ElementHandle, target: ReadTarget) -> Result<Option<String>, Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::Read(element.role));
        let Some(el) = state.page().and_then(|p| p.elements.get(&element.role)) else {
            return Err(Error::element_not_found(element.role.to_string()));
        };
        Ok(match target {
            ReadTarget::Text => el.text.clone(),
            ReadTarget::Attribute(name) => el.attributes.get(&name).cloned(),
        })
    }

    async fn move_pointer(&self, to: Point) -> Result<(), Error> {
        self.record(DriverCall::MovePointer(to));
        Ok(())
    }

    async fn click(&self, element: &ElementHandle, _at: Point) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::Click(element.role));
        let Some(el) = state
            .page()
            .and_then(|p| p.elements.get(&element.role))
            .cloned()
        else {
            return Err(Error::element_not_found(element.role.to_string()));
        };
        if !el.enabled {
            return Err(Error::element_not_found(format!("{} is disabled", element.role)));
        }
        state.focused = Some(element.role);
        for cookie in el.sets_cookies {
            state.cookies.retain(|c| c.name != cookie.name);
            state.cookies.push(cookie);
        }
        if let Some(url) = el.navigates_to {
            state.go(&url);
        }
        if el.click_times_out {
            return Err(Error::timeout(format!("Click on {} timed out", element.role)));
        }
        Ok(())
    }

    async fn type_char(&self, ch: char) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::TypeChar(ch));
        if let Some(role) = state.focused {
            state.fields.entry(role).or_default().push(ch);
        }
        Ok(())
    }

    async fn press_backspace(&self) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::Backspace);
        if let Some(role) = state.focused {
            if let Some(value) = state.fields.get_mut(&role) {
                value.pop();
            }
        }
        Ok(())
    }

    async fn scroll_by(&self, delta: i64) -> Result<(), Error> {
        self.record(DriverCall::Scroll(delta));
        Ok(())
    }

    async fn inject_script(&self, source: &str) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::InjectScript);
        state.scripts.push(source.to_string());
        Ok(())
    }

    async fn emulate(&self, identity: &IdentityProfile) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::Emulate(identity.user_agent.clone()));
        state.identity = Some(identity.clone());
        Ok(())
    }

    async fn read_cookies(&self, domain: &str) -> Result<Vec<Cookie>, Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::ReadCookies(domain.to_string()));
        Ok(state.cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<(), Error> {
        let mut state = self.state();
        state.calls.push(DriverCall::SetCookies(cookies.len()));
        for cookie in cookies {
            state.cookies.retain(|c| c.name != cookie.name);
            state.cookies.push(cookie.clone());
        }
        Ok(())
    }
}
