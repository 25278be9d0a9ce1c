//! WebDriver backend for the core DOM accessor.
//!
//! One [`WebDriverDom`] wraps one fantoccini client, which wraps one
//! browser session. The accessor methods translate core queries into
//! WebDriver locators and fold the driver's error soup into the core
//! taxonomy: element misses become `NotFound`, invalidated references
//! become `Stale`, everything else is a broken `Session`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::key::Key as WdKey;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tracing::{debug, info};

use chatprobe_core::dom::{DomAccessor, Key, Query};
use chatprobe_core::error::DriverError;

/// How to reach the browser and what to load in it.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// WebDriver endpoint (chromedriver, geckodriver, selenium).
    pub webdriver: String,
    /// Page the session monitors.
    pub page: String,
    /// Show the browser window instead of running headless.
    pub headed: bool,
}

/// [`DomAccessor`] over a live WebDriver session.
pub struct WebDriverDom {
    client: Client,
}

/// Start a browser session and load the monitored page.
pub async fn connect(options: &ConnectOptions) -> Result<WebDriverDom> {
    let mut args = vec!["--disable-gpu", "--disable-dev-shm-usage"];
    if !options.headed {
        args.push("--headless=new");
    }
    let mut caps = serde_json::Map::new();
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

    debug!(url = %options.webdriver, "connecting to WebDriver");
    let client = ClientBuilder::native()
        .capabilities(caps)
        .connect(&options.webdriver)
        .await
        .with_context(|| format!("connecting to WebDriver at {}", options.webdriver))?;

    client
        .goto(&options.page)
        .await
        .with_context(|| format!("loading {}", options.page))?;
    info!(page = %options.page, "browser session started");

    Ok(WebDriverDom { client })
}

fn locator(query: &Query) -> Locator<'_> {
    match query {
        Query::Css(selector) => Locator::Css(selector),
        Query::XPath(expr) => Locator::XPath(expr),
    }
}

fn wd_key(key: Key) -> WdKey {
    match key {
        Key::Down => WdKey::Down,
        Key::Enter => WdKey::Enter,
        Key::Escape => WdKey::Escape,
    }
}

/// Fold a fantoccini error into the core taxonomy, tagging it with what
/// was being looked at.
fn map_err(error: CmdError, context: &dyn std::fmt::Display) -> DriverError {
    if error.is_no_such_element() {
        return DriverError::not_found(context);
    }
    if error.is_stale_element_reference() {
        return DriverError::stale(context.to_string());
    }
    DriverError::Session(format!("{context}: {error}"))
}

impl WebDriverDom {
    async fn active(&self) -> Result<Element, DriverError> {
        self.client
            .active_element()
            .await
            .map_err(|e| map_err(e, &"active element"))
    }
}

#[async_trait]
impl DomAccessor for WebDriverDom {
    type Handle = Element;

    async fn find(&self, query: &Query) -> Result<Vec<Element>, DriverError> {
        self.client
            .find_all(locator(query))
            .await
            .map_err(|e| map_err(e, query))
    }

    async fn find_in(&self, scope: &Element, query: &Query) -> Result<Vec<Element>, DriverError> {
        scope
            .find_all(locator(query))
            .await
            .map_err(|e| map_err(e, query))
    }

    async fn text_of(&self, handle: &Element) -> Result<String, DriverError> {
        handle.text().await.map_err(|e| map_err(e, &"element text"))
    }

    async fn attr_of(&self, handle: &Element, name: &str) -> Result<Option<String>, DriverError> {
        handle
            .attr(name)
            .await
            .map_err(|e| map_err(e, &format!("attribute {name}")))
    }

    async fn css_value_of(&self, handle: &Element, property: &str) -> Result<String, DriverError> {
        handle
            .css_value(property)
            .await
            .map_err(|e| map_err(e, &format!("css property {property}")))
    }

    async fn click(&self, handle: &Element) -> Result<(), DriverError> {
        handle.click().await.map_err(|e| map_err(e, &"click"))
    }

    async fn send_keys(&self, handle: &Element, text: &str) -> Result<(), DriverError> {
        handle
            .send_keys(text)
            .await
            .map_err(|e| map_err(e, &"send keys"))
    }

    async fn type_active(&self, text: &str) -> Result<(), DriverError> {
        let element = self.active().await?;
        element
            .send_keys(text)
            .await
            .map_err(|e| map_err(e, &"type into focused element"))
    }

    async fn press_active(&self, key: Key) -> Result<(), DriverError> {
        let element = self.active().await?;
        let sequence = String::from(char::from(wd_key(key)));
        element
            .send_keys(&sequence)
            .await
            .map_err(|e| map_err(e, &format!("press {key}")))
    }

    async fn export_image(&self, handle: &Element) -> Result<Vec<u8>, DriverError> {
        handle
            .screenshot()
            .await
            .map_err(|e| map_err(e, &"element screenshot"))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| map_err(e, &"close session"))
    }
}
