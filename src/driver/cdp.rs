//! [`PageDriver`] over the Chrome DevTools Protocol
//!
//! Attaches to an already running browser (`--remote-debugging-port`). The
//! HTTP endpoint is asked for its page targets and the first page tab is
//! driven through its WebSocket.

use super::connection::{CdpConnection, CdpTimeouts};
use super::selectors::{escape_js_str, SelectorTable};
use super::traits::PageDriver;
use super::types::{Cookie, ElementHandle, ElementRole, ReadTarget};
use crate::config::DriverConfig;
use crate::stealth::{IdentityProfile, Point, Rect};
use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Attribute used to re-find located elements
const REF_ATTRIBUTE: &str = "data-outreach-ref";

/// Entry of the DevTools `/json` target list
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FoundElement {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    enabled: bool,
}

#[derive(Debug)]
pub struct CdpPageDriver {
    connection: CdpConnection,
    selectors: SelectorTable,
    next_ref: AtomicU64,
    pointer: Mutex<Point>,
}

impl CdpPageDriver {
    /// Attach to the first page target behind `config.cdp_endpoint`
    pub async fn connect(config: &DriverConfig) -> Result<Self, Error> {
        let selectors = SelectorTable::with_overrides(&config.selectors)?;
        let ws_url = if config.cdp_endpoint.starts_with("ws://") || config.cdp_endpoint.starts_with("wss://") {
            config.cdp_endpoint.clone()
        } else {
            let targets = fetch_targets(&config.cdp_endpoint).await?;
            targets
                .into_iter()
                .find(|t| t.target_type == "page")
                .and_then(|t| t.web_socket_debugger_url)
                .ok_or_else(|| Error::cdp(format!("No page target at {}", config.cdp_endpoint)))?
        };

        let timeouts = CdpTimeouts {
            navigation: Duration::from_millis(config.page_timeout_ms).max(CdpTimeouts::default().navigation),
            ..CdpTimeouts::default()
        };
        let connection = CdpConnection::connect(ws_url, timeouts).await?;
        for domain in ["Page", "Runtime", "Network"] {
            connection.send(&format!("{}.enable", domain), json!({})).await?;
        }
        info!("Attached to page target {}", connection.url());

        Ok(Self {
            connection,
            selectors,
            next_ref: AtomicU64::new(1),
            pointer: Mutex::new(Point::new(0.0, 0.0)),
        })
    }

    pub async fn close(&self) -> Result<(), Error> {
        self.connection.close().await
    }

    /// Evaluate `expression` and return its JSON value
    async fn evaluate(&self, expression: &str) -> Result<Value, Error> {
        let result = self
            .connection
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("unknown exception");
            return Err(Error::script_execution_failed(text.to_string()));
        }
        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    /// One pass over the role's probes
    async fn probe_once(&self, role: ElementRole) -> Result<Option<ElementHandle>, Error> {
        for probe in self.selectors.probes(role) {
            let reference = self.next_ref.fetch_add(1, Ordering::SeqCst).to_string();
            let script = format!(
                r#"(() => {{
                    const el = {query};
                    if (!el) return null;
                    const r0 = el.getBoundingClientRect();
                    if (r0.width === 0 && r0.height === 0) return null;
                    if (r0.top < 0 || r0.bottom > window.innerHeight) el.scrollIntoView({{block: 'center'}});
                    el.setAttribute('{attr}', '{reference}');
                    const r = el.getBoundingClientRect();
                    return {{ x: r.x, y: r.y, width: r.width, height: r.height,
                              enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true' }};
                }})()"#,
                query = probe.query_js(),
                attr = REF_ATTRIBUTE,
            );
            let value = self.evaluate(&script).await?;
            if value.is_null() {
                continue;
            }
            let found: FoundElement = serde_json::from_value(value)?;
            debug!(role = %role, probe = ?probe, "Element found");
            return Ok(Some(ElementHandle {
                id: format!("[{}=\"{}\"]", REF_ATTRIBUTE, reference),
                role,
                bounds: Rect {
                    x: found.x,
                    y: found.y,
                    width: found.width,
                    height: found.height,
                },
                enabled: found.enabled,
            }));
        }
        Ok(None)
    }

    fn pointer(&self) -> Point {
        *self.pointer.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn mouse(&self, kind: &str, at: Point) -> Result<(), Error> {
        let (button, clicks) = if kind == "mouseMoved" { ("none", 0) } else { ("left", 1) };
        self.connection
            .send(
                "Input.dispatchMouseEvent",
                json!({
                    "type": kind,
                    "x": at.x,
                    "y": at.y,
                    "button": button,
                    "clickCount": clicks,
                }),
            )
            .await?;
        Ok(())
    }
}

/// List targets from the DevTools HTTP endpoint
pub async fn fetch_targets(endpoint: &str) -> Result<Vec<TargetInfo>, Error> {
    let http = endpoint.trim_end_matches('/');
    let url = format!("{}/json", http);
    debug!("Fetching targets from {}", url);
    let targets = reqwest::Client::new()
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<TargetInfo>>()
        .await?;
    Ok(targets)
}

fn cookie_from_cdp(raw: &Value) -> Option<Cookie> {
    let expires = raw
        .get("expires")
        .and_then(Value::as_f64)
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));
    Some(Cookie {
        name: raw.get("name")?.as_str()?.to_string(),
        value: raw.get("value")?.as_str()?.to_string(),
        domain: raw.get("domain")?.as_str()?.to_string(),
        path: raw.get("path").and_then(Value::as_str).unwrap_or("/").to_string(),
        expires,
        http_only: raw.get("httpOnly").and_then(Value::as_bool).unwrap_or(false),
        secure: raw.get("secure").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn cookie_to_cdp(cookie: &Cookie) -> Value {
    let mut value = json!({
        "name": cookie.name,
        "value": cookie.value,
        "domain": cookie.domain,
        "path": cookie.path,
        "httpOnly": cookie.http_only,
        "secure": cookie.secure,
    });
    if let Some(expires) = cookie.expires {
        value["expires"] = json!(expires.timestamp());
    }
    value
}

fn domain_matches(cookie_domain: &str, domain: &str) -> bool {
    let cookie_domain = cookie_domain.trim_start_matches('.');
    let domain = domain.trim_start_matches('.');
    cookie_domain == domain || cookie_domain.ends_with(&format!(".{}", domain))
}

#[async_trait]
impl PageDriver for CdpPageDriver {
    #[instrument(skip(self))]
    async fn navigate(&self, url: &str) -> Result<(), Error> {
        let result = self.connection.send("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(Error::navigation_failed(format!("{}: {}", url, error)));
        }
        Ok(())
    }

    async fn wait_loaded(&self, timeout: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.evaluate("document.readyState").await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(format!("Page not loaded after {:?}", timeout)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn current_url(&self) -> Result<String, Error> {
        Ok(self
            .evaluate("window.location.href")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn content(&self) -> Result<String, Error> {
        Ok(self
            .evaluate("document.documentElement.outerHTML")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn find(&self, role: ElementRole, timeout: Duration) -> Result<Option<ElementHandle>, Error> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(handle) = self.probe_once(role).await? {
                return Ok(Some(handle));
            }
            if Instant::now() >= deadline {
                debug!(role = %role, "Element not found within {:?}", timeout);
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn read(&self, element: &ElementHandle, target: ReadTarget) -> Result<Option<String>, Error> {
        let accessor = match &target {
            ReadTarget::Text => "(el.innerText || el.textContent || '').trim()".to_string(),
            ReadTarget::Attribute(name) => format!("el.getAttribute('{}')", escape_js_str(name)),
        };
        let script = format!(
            "(() => {{ const el = document.querySelector('{}'); if (!el) return null; return {}; }})()",
            escape_js_str(&element.id),
            accessor
        );
        Ok(self.evaluate(&script).await?.as_str().map(str::to_string))
    }

    async fn move_pointer(&self, to: Point) -> Result<(), Error> {
        self.mouse("mouseMoved", to).await?;
        *self.pointer.lock().unwrap_or_else(|e| e.into_inner()) = to;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle, at: Point) -> Result<(), Error> {
        if !element.enabled {
            return Err(Error::element_not_found(format!("{} is disabled", element.role)));
        }
        self.mouse("mousePressed", at).await?;
        self.mouse("mouseReleased", at).await?;
        *self.pointer.lock().unwrap_or_else(|e| e.into_inner()) = at;
        Ok(())
    }

    async fn type_char(&self, ch: char) -> Result<(), Error> {
        let text = ch.to_string();
        for kind in ["keyDown", "keyUp"] {
            let params = if kind == "keyDown" {
                json!({ "type": kind, "key": text, "text": text })
            } else {
                json!({ "type": kind, "key": text })
            };
            self.connection.send("Input.dispatchKeyEvent", params).await?;
        }
        Ok(())
    }

    async fn press_backspace(&self) -> Result<(), Error> {
        for kind in ["rawKeyDown", "keyUp"] {
            self.connection
                .send(
                    "Input.dispatchKeyEvent",
                    json!({
                        "type": kind,
                        "key": "Backspace",
                        "code": "Backspace",
                        "windowsVirtualKeyCode": 8,
                    }),
                )
                .await?;
        }
        Ok(())
    }

    async fn scroll_by(&self, delta: i64) -> Result<(), Error> {
        let at = self.pointer();
        self.connection
            .send(
                "Input.dispatchMouseEvent",
                json!({
                    "type": "mouseWheel",
                    "x": at.x,
                    "y": at.y,
                    "deltaX": 0,
                    "deltaY": delta,
                }),
            )
            .await?;
        Ok(())
    }

    async fn inject_script(&self, source: &str) -> Result<(), Error> {
        self.connection
            .send("Page.addScriptToEvaluateOnNewDocument", json!({ "source": source }))
            .await?;
        Ok(())
    }

    async fn emulate(&self, identity: &IdentityProfile) -> Result<(), Error> {
        self.connection
            .send(
                "Network.setUserAgentOverride",
                json!({
                    "userAgent": identity.user_agent,
                    "acceptLanguage": identity.accept_language,
                }),
            )
            .await?;
        self.connection
            .send(
                "Emulation.setDeviceMetricsOverride",
                json!({
                    "width": identity.viewport.width,
                    "height": identity.viewport.height,
                    "deviceScaleFactor": 1,
                    "mobile": false,
                }),
            )
            .await?;
        self.connection
            .send(
                "Emulation.setTimezoneOverride",
                json!({ "timezoneId": identity.timezone }),
            )
            .await?;
        Ok(())
    }

    async fn read_cookies(&self, domain: &str) -> Result<Vec<Cookie>, Error> {
        let host = domain.trim_start_matches('.');
        let result = self
            .connection
            .send(
                "Network.getCookies",
                json!({ "urls": [format!("https://{}/", host), format!("https://www.{}/", host)] }),
            )
            .await?;
        let cookies = result
            .get("cookies")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(cookie_from_cdp)
                    .filter(|c| domain_matches(&c.domain, domain))
                    .collect()
            })
            .unwrap_or_default();
        Ok(cookies)
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<(), Error> {
        let list: Vec<Value> = cookies.iter().map(cookie_to_cdp).collect();
        self.connection
            .send("Network.setCookies", json!({ "cookies": list }))
            .await?;
        Ok(())
    }
}
