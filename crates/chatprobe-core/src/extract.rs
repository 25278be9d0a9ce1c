//! Converting loosely-structured UI fragments into typed records.
//!
//! All extraction is best-effort against a page that re-renders at will:
//! a fragment that doesn't carry the expected markers yields `Ok(None)`
//! ("not applicable") rather than an error, and transient accessor
//! failures are the caller's call to swallow or propagate.
//!
//! # Visual ordering
//!
//! The search-result list is virtualized: DOM document order has nothing
//! to do with what the user sees. The on-screen position of an item is
//! recovered from its CSS `transform` (last numeric token, the Y
//! translation). Sorting by that key must be stable; virtualization can
//! transiently produce duplicate offsets, and ties keep original order.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::DomAccessor;
use crate::error::DriverError;
use crate::locator::{LocatorTable, MESSAGE_META_ATTR};

/// Opaque QR image content. Compared by bytes, never parsed.
#[derive(Clone, PartialEq, Eq)]
pub struct QrPayload(Vec<u8>);

impl QrPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for QrPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for QrPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QrPayload({} bytes)", self.0.len())
    }
}

/// A chat message assembled from one message fragment.
///
/// The timestamp is passed through exactly as the page formats it; this
/// layer does not interpret dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub timestamp: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_image: bool,
}

/// One entry of a search-result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Section the entry belongs to, taken from the nearest preceding
    /// header in on-screen order (e.g. "CHATS", "CONTACTS").
    pub category: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,
}

/// Locate the QR canvas and export its rendered content.
///
/// Fails with `NotFound` when the canvas is gone. During QrAuth
/// steady-state that is a routine race (the page redraws the canvas
/// periodically); during a transition where presence was just confirmed
/// it is fatal.
pub async fn extract_qr<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
) -> Result<QrPayload, DriverError> {
    let canvases = dom.find(&locators.qr_code).await?;
    let canvas = canvases
        .first()
        .ok_or_else(|| DriverError::not_found(&locators.qr_code))?;
    Ok(dom.export_image(canvas).await?.into())
}

/// Assemble a [`Message`] from a message fragment.
///
/// Returns `Ok(None)` for fragments without the metadata attribute
/// (date dividers, system notices and the like), which callers filter out.
///
/// The body is the fragment's visible text exactly as the driver reports
/// it. WebDriver text includes descendants, so for a reply the quoted
/// text appears both inside `body` and in `quoted`; `quoted` identifies
/// the quote, it is not subtracted from the body.
pub async fn extract_message<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    fragment: &A::Handle,
) -> Result<Option<Message>, DriverError> {
    let Some(meta) = dom.attr_of(fragment, MESSAGE_META_ATTR).await? else {
        return Ok(None);
    };
    let Some((timestamp, sender)) = parse_prefix_metadata(&meta) else {
        return Ok(None);
    };

    let body = dom.text_of(fragment).await?;

    let quoted = match first_in(dom, fragment, &locators.chat_message_quote).await? {
        Some(quote) => Some(dom.text_of(&quote).await?),
        None => None,
    };
    let has_image = first_in(dom, fragment, &locators.chat_message_image)
        .await?
        .is_some();

    Ok(Some(Message {
        sender,
        timestamp,
        body,
        quoted,
        has_image,
    }))
}

/// Interpret one search-result fragment, in on-screen order.
///
/// Header fragments (a single child with no nested content) update
/// `category` as a side channel and yield nothing. Item fragments yield a
/// [`SearchResult`] tagged with the current category. Fragments matching
/// neither shape, and items seen before any header has established a
/// category, are "not applicable".
pub async fn extract_search_result<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    fragment: &A::Handle,
    category: &mut Option<String>,
) -> Result<Option<SearchResult>, DriverError> {
    let children = dom
        .find_in(fragment, &locators.search_item_child_divs)
        .await?;
    if let [only] = children.as_slice() {
        if dom.find_in(only, &locators.any_child).await?.is_empty() {
            *category = Some(dom.text_of(only).await?);
            return Ok(None);
        }
    }

    let Some(current) = category.clone() else {
        return Ok(None);
    };
    let Some(title_span) = first_in(dom, fragment, &locators.span_title).await? else {
        return Ok(None);
    };
    let title = match dom.attr_of(&title_span, "title").await? {
        Some(title) if !title.is_empty() => title,
        _ => dom.text_of(&title_span).await?,
    };

    let unread_count = match first_in(dom, fragment, &locators.search_item_unread).await? {
        Some(badge) => dom
            .attr_of(&badge, "aria-label")
            .await?
            .as_deref()
            .and_then(parse_unread_label),
        None => None,
    };

    Ok(Some(SearchResult {
        category: current,
        title,
        unread_count,
    }))
}

/// On-screen vertical position of a fragment, from its CSS transform.
/// `None` when the transform carries no numeric token.
pub async fn visual_offset<A: DomAccessor>(
    dom: &A,
    fragment: &A::Handle,
) -> Result<Option<i64>, DriverError> {
    let transform = dom.css_value_of(fragment, "transform").await?;
    Ok(parse_transform_y(&transform))
}

/// Parse the pre-formatted `"[<timestamp>] <sender>: "` metadata value.
/// The timestamp is kept raw, brackets stripped.
pub fn parse_prefix_metadata(meta: &str) -> Option<(String, String)> {
    let rest = meta.trim_start().strip_prefix('[')?;
    let (timestamp, rest) = rest.split_once(']')?;
    let sender = rest.trim().trim_end_matches(':').trim_end();
    if sender.is_empty() {
        return None;
    }
    Some((timestamp.to_string(), sender.to_string()))
}

/// Extract the last numeric token of a CSS transform value.
///
/// Works for both `translateY(120px)` and the computed
/// `matrix(1, 0, 0, 1, 0, 120)` form, whose final component is the Y
/// translation either way.
pub fn parse_transform_y(transform: &str) -> Option<i64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"-?\d+").expect("static regex"));
    re.find_iter(transform)
        .last()
        .and_then(|m| m.as_str().parse().ok())
}

/// Pull the count out of an `"N unread message(s)"` accessibility label.
pub fn parse_unread_label(label: &str) -> Option<u32> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d+").expect("static regex"));
    re.find(label).and_then(|m| m.as_str().parse().ok())
}

/// First match of `query` under `scope`, treating `NotFound` as empty.
/// Scoped lookups probe optional sub-fragments, so a driver that reports
/// misses as errors must not abort the extraction.
async fn first_in<A: DomAccessor>(
    dom: &A,
    scope: &A::Handle,
    query: &crate::dom::Query,
) -> Result<Option<A::Handle>, DriverError> {
    match dom.find_in(scope, query).await {
        Ok(mut handles) => {
            if handles.is_empty() {
                Ok(None)
            } else {
                Ok(Some(handles.remove(0)))
            }
        }
        Err(DriverError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
