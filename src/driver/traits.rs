//! Page driver capability
//!
//! The workflow only ever talks to the browser through [`PageDriver`]. How an
//! [`ElementRole`] maps onto concrete selectors is the adapter's business.

use super::types::{Cookie, ElementHandle, ElementRole, ReadTarget};
use crate::stealth::{IdentityProfile, Point};
use crate::Error;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait PageDriver: Send + Sync + std::fmt::Debug {
    /// Start loading `url` in the controlled tab
    async fn navigate(&self, url: &str) -> Result<(), Error>;

    /// Wait until the current document has finished loading
    async fn wait_loaded(&self, timeout: Duration) -> Result<(), Error>;

    async fn current_url(&self) -> Result<String, Error>;

    /// Serialized HTML of the current document
    async fn content(&self) -> Result<String, Error>;

    /// First element matching `role`, or `None` once `timeout` elapses
    async fn find(&self, role: ElementRole, timeout: Duration) -> Result<Option<ElementHandle>, Error>;

    async fn read(&self, element: &ElementHandle, target: ReadTarget) -> Result<Option<String>, Error>;

    /// Move the pointer to `to` without pressing
    async fn move_pointer(&self, to: Point) -> Result<(), Error>;

    /// Press and release at `at`, which lies inside `element`
    async fn click(&self, element: &ElementHandle, at: Point) -> Result<(), Error>;

    /// Type one character into the focused element
    async fn type_char(&self, ch: char) -> Result<(), Error>;

    async fn press_backspace(&self) -> Result<(), Error>;

    /// Wheel scroll by `delta` CSS pixels; positive scrolls down
    async fn scroll_by(&self, delta: i64) -> Result<(), Error>;

    /// Evaluate `source` on every new document before page scripts run
    async fn inject_script(&self, source: &str) -> Result<(), Error>;

    /// Apply user agent, language, viewport and timezone overrides
    async fn emulate(&self, identity: &IdentityProfile) -> Result<(), Error>;

    async fn read_cookies(&self, domain: &str) -> Result<Vec<Cookie>, Error>;

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<(), Error>;
}
