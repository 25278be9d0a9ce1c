//! Interaction scripts: multi-step flows driven through the accessor.
//!
//! Every flow here leaves the page roughly where it found it (search
//! cancelled, an opened chat closed with Escape, the chat-list filter
//! restored) so the poll loop can resume classifying afterwards.
//! Timing knobs come from [`MonitorConfig`]; nothing here waits unbounded.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::dom::{DomAccessor, Key, Query};
use crate::error::DriverError;
use crate::extract::{self, Message, SearchResult};
use crate::locator::LocatorTable;
use crate::monitor::MonitorConfig;

/// How often a bounded wait re-probes for presence.
const WAIT_PROBE_INTERVAL: Duration = Duration::from_millis(50);

/// Poll until `query` matches something, up to `timeout`.
///
/// Transient accessor failures count as "not there yet" and are retried;
/// exhausting the bound produces [`DriverError::WaitTimeout`].
pub async fn wait_for<A: DomAccessor>(
    dom: &A,
    query: &Query,
    timeout: Duration,
) -> Result<(), DriverError> {
    let deadline = Instant::now() + timeout;
    loop {
        match dom.exists(query).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) if e.is_transient() => {}
            Err(e) => return Err(e),
        }
        if Instant::now() >= deadline {
            return Err(DriverError::WaitTimeout {
                query: query.to_string(),
                timeout,
            });
        }
        sleep(WAIT_PROBE_INTERVAL).await;
    }
}

/// Run a search and return its entries in on-screen order.
///
/// Entries are the item fragments of the result list, sorted by their
/// visual offset (fragments without a readable offset sort last) and
/// tagged with the nearest preceding section header.
pub async fn search<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    config: &MonitorConfig,
    text: &str,
) -> Result<Vec<SearchResult>, DriverError> {
    open_search(dom, locators, config, text).await?;
    let outcome = collect_search_results(dom, locators, None).await;
    leave_search(dom, locators).await?;
    outcome
}

/// Open a chat by name and return its currently rendered messages, oldest
/// first (document order of the message fragments).
pub async fn recent_messages<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    config: &MonitorConfig,
    chat: &str,
) -> Result<Vec<Message>, DriverError> {
    open_chat(dom, locators, config, chat).await?;

    let panel = require_first(dom, &locators.chat_div).await?;
    let mut messages = Vec::new();
    for row in dom.find_in(&panel, &locators.chat_component).await? {
        for fragment in dom.find_in(&row, &locators.chat_message).await? {
            if let Some(message) = extract::extract_message(dom, locators, &fragment).await? {
                messages.push(message);
            }
        }
    }

    dom.press_active(Key::Escape).await?;
    Ok(messages)
}

/// Open a chat by name and send `text` to it.
pub async fn send_message<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    config: &MonitorConfig,
    chat: &str,
    text: &str,
) -> Result<(), DriverError> {
    open_chat(dom, locators, config, chat).await?;

    let input = require_first(dom, &locators.chat_input_box).await?;
    dom.click(&input).await?;
    dom.send_keys(&input, text).await?;
    dom.press_active(Key::Enter).await?;
    dom.press_active(Key::Escape).await?;
    Ok(())
}

/// Switch the chat list to the unread filter, read its entries, and
/// switch back.
///
/// The filter is restored even when collection fails, so a transient
/// mid-scan error doesn't leave the list filtered for the next tick.
pub async fn unread_scan<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    config: &MonitorConfig,
) -> Result<Vec<SearchResult>, DriverError> {
    let unread = require_first(dom, &locators.unread_chats_button).await?;
    dom.click(&unread).await?;
    sleep(config.unread_scan_delay).await;

    let outcome = collect_unread(dom, locators).await;

    match dom.find(&locators.all_chats_button).await {
        Ok(buttons) => {
            if let Some(all) = buttons.first() {
                dom.click(all).await?;
            }
        }
        Err(e) if e.is_transient() => debug!(error = %e, "chat-list filter not restored"),
        Err(e) => return Err(e),
    }

    outcome
}

async fn collect_unread<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
) -> Result<Vec<SearchResult>, DriverError> {
    let panel = require_first(dom, &locators.unread_chat_div).await?;
    let items = dom.find_in(&panel, &locators.search_item).await?;
    // The unread list has no section headers; everything is a chat.
    sorted_results(dom, locators, items, Some("CHATS".to_string())).await
}

async fn collect_search_results<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    seed_category: Option<String>,
) -> Result<Vec<SearchResult>, DriverError> {
    let panel = require_first(dom, &locators.search_result).await?;
    let items = dom.find_in(&panel, &locators.search_item).await?;
    sorted_results(dom, locators, items, seed_category).await
}

/// Sort item fragments by visual offset (stable, unreadable offsets
/// last), then interpret them top to bottom.
async fn sorted_results<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    items: Vec<A::Handle>,
    seed_category: Option<String>,
) -> Result<Vec<SearchResult>, DriverError> {
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let offset = extract::visual_offset(dom, &item).await?.unwrap_or(i64::MAX);
        keyed.push((offset, item));
    }
    keyed.sort_by_key(|(offset, _)| *offset);

    let mut category = seed_category;
    let mut results = Vec::new();
    for (_, item) in &keyed {
        if let Some(result) =
            extract::extract_search_result(dom, locators, item, &mut category).await?
        {
            results.push(result);
        }
    }
    Ok(results)
}

/// Activate the search box and type `text` into it.
///
/// The search control renders as one of two buttons depending on whether
/// a search is already active; either one opens the box.
async fn open_search<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    config: &MonitorConfig,
    text: &str,
) -> Result<(), DriverError> {
    let mut clicked = false;
    for query in [&locators.search_button_inactive, &locators.search_button_active] {
        match dom.find(query).await {
            Ok(buttons) => {
                if let Some(button) = buttons.first() {
                    dom.click(button).await?;
                    clicked = true;
                    break;
                }
            }
            Err(e) if e.is_transient() => {}
            Err(e) => return Err(e),
        }
    }
    if !clicked {
        return Err(DriverError::not_found(&locators.search_button_inactive));
    }

    wait_for(dom, &locators.cancel_search_button, config.wait_timeout).await?;
    dom.type_active(text).await?;
    sleep(config.results_delay).await;
    Ok(())
}

/// Search for `chat` and open the top result with the keyboard.
async fn open_chat<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
    config: &MonitorConfig,
    chat: &str,
) -> Result<(), DriverError> {
    open_search(dom, locators, config, chat).await?;
    dom.press_active(Key::Down).await?;
    dom.press_active(Key::Enter).await?;
    wait_for(dom, &locators.chat_input_box, config.wait_timeout).await?;
    Ok(())
}

/// Close the search box, preferring the cancel button over Escape.
async fn leave_search<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
) -> Result<(), DriverError> {
    match dom.find(&locators.cancel_search_button).await {
        Ok(buttons) => {
            if let Some(cancel) = buttons.first() {
                return dom.click(cancel).await;
            }
        }
        Err(e) if e.is_transient() => {}
        Err(e) => return Err(e),
    }
    dom.press_active(Key::Escape).await
}

async fn require_first<A: DomAccessor>(
    dom: &A,
    query: &Query,
) -> Result<A::Handle, DriverError> {
    let mut handles = dom.find(query).await?;
    if handles.is_empty() {
        return Err(DriverError::not_found(query));
    }
    Ok(handles.remove(0))
}
