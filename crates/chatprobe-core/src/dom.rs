//! The DOM accessor seam.
//!
//! Everything in this crate reads the monitored page through [`DomAccessor`],
//! an opaque capability for locating and interacting with rendered fragments.
//! The production implementation wraps a WebDriver client; tests use a
//! scripted in-memory double. The trait deliberately mirrors what a driver
//! can portably do: find, read text/attributes/CSS, click, send keys, and
//! export an element's rendered image.
//!
//! Absence is a first-class outcome here. Any method may fail with
//! [`DriverError::NotFound`] or [`DriverError::Stale`]; callers decide
//! per call site whether that is routine (see [`crate::error`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// A declarative locator the accessor resolves against the live page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum Query {
    /// CSS selector.
    Css(String),
    /// XPath expression. Relative expressions (`./div`) are resolved
    /// against a scope handle via [`DomAccessor::find_in`].
    XPath(String),
}

impl Query {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Css(s) => write!(f, "css:{}", s),
            Query::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// Non-text keys the interaction scripts send to the focused element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Navigate to the first search result.
    Down,
    /// Submit a typed message.
    Enter,
    /// Leave the search view.
    Escape,
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Down => write!(f, "Down"),
            Key::Enter => write!(f, "Enter"),
            Key::Escape => write!(f, "Escape"),
        }
    }
}

/// Opaque access to the rendered page.
///
/// One accessor instance corresponds to one browser session. The underlying
/// driver is not safe for concurrent use, so the session monitor takes
/// exclusive ownership and all helper operations borrow it for the duration
/// of a call.
#[async_trait]
pub trait DomAccessor: Send + Sync {
    /// An opaque reference to a located fragment.
    type Handle: Send + Sync;

    /// Locate all fragments matching `query`, in document order.
    /// An empty vec and `NotFound` are both valid "absent" answers;
    /// which one a backend produces depends on the driver's endpoint.
    async fn find(&self, query: &Query) -> Result<Vec<Self::Handle>, DriverError>;

    /// Locate fragments matching `query` within `scope`.
    async fn find_in(
        &self,
        scope: &Self::Handle,
        query: &Query,
    ) -> Result<Vec<Self::Handle>, DriverError>;

    /// Presence check. Only `NotFound` coerces to `false`; a stale scope
    /// or broken session still propagates.
    async fn exists(&self, query: &Query) -> Result<bool, DriverError> {
        match self.find(query).await {
            Ok(handles) => Ok(!handles.is_empty()),
            Err(DriverError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Visible text content of a fragment.
    async fn text_of(&self, handle: &Self::Handle) -> Result<String, DriverError>;

    /// Value of an attribute, `None` when the attribute is absent.
    async fn attr_of(
        &self,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Computed CSS value of a property (e.g. `transform`).
    async fn css_value_of(
        &self,
        handle: &Self::Handle,
        property: &str,
    ) -> Result<String, DriverError>;

    /// Click a fragment.
    async fn click(&self, handle: &Self::Handle) -> Result<(), DriverError>;

    /// Send literal text to a fragment.
    async fn send_keys(&self, handle: &Self::Handle, text: &str) -> Result<(), DriverError>;

    /// Type literal text into whatever currently holds focus.
    async fn type_active(&self, text: &str) -> Result<(), DriverError>;

    /// Press a non-text key in whatever currently holds focus.
    async fn press_active(&self, key: Key) -> Result<(), DriverError>;

    /// Export a fragment's rendered content as binary image bytes.
    async fn export_image(&self, handle: &Self::Handle) -> Result<Vec<u8>, DriverError>;

    /// Release the underlying driver session. Called exactly once by the
    /// owner; implementations should tolerate a second call.
    async fn close(&self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_serializes_with_tag() {
        let q = Query::xpath("//canvas");
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, r#"{"by":"xpath","value":"//canvas"}"#);
    }

    #[test]
    fn query_display_names_the_strategy() {
        assert_eq!(Query::css("div.chat").to_string(), "css:div.chat");
        assert_eq!(Query::xpath("//div").to_string(), "xpath://div");
    }
}
