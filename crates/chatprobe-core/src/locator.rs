//! Registry of logical UI regions and the queries that locate them.
//!
//! The monitored page has no stable API; every region is found through an
//! incidental marker (an aria-label, a title attribute, a text fragment).
//! Markup changes with page updates, so every entry is replaceable at
//! runtime by name without touching code: load a JSON map of overrides
//! and [`LocatorTable::apply`] it.

use std::collections::HashMap;

use crate::dom::Query;

/// Attribute carrying a message's pre-formatted `"[timestamp] sender: "`
/// metadata. Fragments without it are not chat messages.
pub const MESSAGE_META_ATTR: &str = "data-pre-plain-text";

/// Queries for every logical region the monitor touches.
///
/// Field names double as the override keys accepted by [`set`](Self::set),
/// matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorTable {
    // Screen-state markers, most-advanced stage first.
    pub logged_in: Query,
    pub loading: Query,
    pub qr_code: Query,
    pub auth: Query,
    pub loading_chats: Query,

    // Chat-list filter buttons.
    pub all_chats_button: Query,
    pub unread_chats_button: Query,

    // Search controls.
    pub search_button_inactive: Query,
    pub search_button_active: Query,
    pub cancel_search_button: Query,

    // Search results.
    pub search_result: Query,
    pub search_item: Query,
    pub search_item_unread: Query,
    pub span_title: Query,
    pub search_item_child_divs: Query,
    pub any_child: Query,

    // Open chat.
    pub chat_div: Query,
    pub unread_chat_div: Query,
    pub chat_component: Query,
    pub chat_message: Query,
    pub chat_message_quote: Query,
    pub chat_message_image: Query,
    pub chat_input_box: Query,
}

impl Default for LocatorTable {
    fn default() -> Self {
        Self {
            logged_in: Query::xpath("//div[@title='Chats']"),
            loading: Query::xpath(
                "//div[//span[@data-icon='lock'] and contains(text(), 'End-to-end encrypted') and //progress]",
            ),
            qr_code: Query::xpath("//canvas[@aria-label='Scan this QR code to link a device!']"),
            auth: Query::xpath("//div[contains(text(), 'Use WhatsApp on your computer')]"),
            loading_chats: Query::xpath("//div[text()='Loading your chats']"),

            all_chats_button: Query::xpath("//div[text()='All']"),
            unread_chats_button: Query::xpath("//div[text()='Unread']"),

            search_button_inactive: Query::xpath("//button[@aria-label='Search or start new chat']"),
            search_button_active: Query::xpath("//button[@aria-label='Chat list']"),
            cancel_search_button: Query::xpath("//button[@aria-label='Cancel search']"),

            search_result: Query::xpath("//div[@aria-label='Search results.']"),
            search_item: Query::xpath(".//div[@role='listitem']"),
            search_item_unread: Query::xpath(".//span[contains(@aria-label, 'unread message')]"),
            span_title: Query::xpath(".//span[@title]"),
            search_item_child_divs: Query::xpath("./div"),
            any_child: Query::xpath("./*"),

            chat_div: Query::xpath("//div[@role='application']"),
            unread_chat_div: Query::xpath("//div[@aria-label='Chat list']"),
            chat_component: Query::xpath(".//div[@role='row']"),
            chat_message: Query::xpath(".//div[@data-pre-plain-text]"),
            chat_message_quote: Query::xpath(".//div[@aria-label='Quoted message']"),
            chat_message_image: Query::xpath(".//div[@aria-label='Open picture']"),
            chat_input_box: Query::xpath("//div[@aria-placeholder='Type a message']"),
        }
    }
}

impl LocatorTable {
    /// Replace one entry by name. Returns `false` for unknown names so a
    /// caller can report bad override keys instead of silently dropping
    /// them.
    pub fn set(&mut self, name: &str, query: Query) -> bool {
        match self.slot_mut(name) {
            Some(slot) => {
                *slot = query;
                true
            }
            None => false,
        }
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&Query> {
        self.slot_ref(&name.to_ascii_lowercase())
    }

    /// Bulk-apply overrides. Returns the names that did not match any
    /// entry (empty when everything applied).
    pub fn apply(&mut self, overrides: HashMap<String, Query>) -> Vec<String> {
        let mut rejected = Vec::new();
        for (name, query) in overrides {
            if !self.set(&name, query) {
                rejected.push(name);
            }
        }
        rejected.sort();
        rejected
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Query> {
        Some(match name.to_ascii_lowercase().as_str() {
            "logged_in" => &mut self.logged_in,
            "loading" => &mut self.loading,
            "qr_code" => &mut self.qr_code,
            "auth" => &mut self.auth,
            "loading_chats" => &mut self.loading_chats,
            "all_chats_button" => &mut self.all_chats_button,
            "unread_chats_button" => &mut self.unread_chats_button,
            "search_button_inactive" => &mut self.search_button_inactive,
            "search_button_active" => &mut self.search_button_active,
            "cancel_search_button" => &mut self.cancel_search_button,
            "search_result" => &mut self.search_result,
            "search_item" => &mut self.search_item,
            "search_item_unread" => &mut self.search_item_unread,
            "span_title" => &mut self.span_title,
            "search_item_child_divs" => &mut self.search_item_child_divs,
            "any_child" => &mut self.any_child,
            "chat_div" => &mut self.chat_div,
            "unread_chat_div" => &mut self.unread_chat_div,
            "chat_component" => &mut self.chat_component,
            "chat_message" => &mut self.chat_message,
            "chat_message_quote" => &mut self.chat_message_quote,
            "chat_message_image" => &mut self.chat_message_image,
            "chat_input_box" => &mut self.chat_input_box,
            _ => return None,
        })
    }

    fn slot_ref(&self, name: &str) -> Option<&Query> {
        Some(match name {
            "logged_in" => &self.logged_in,
            "loading" => &self.loading,
            "qr_code" => &self.qr_code,
            "auth" => &self.auth,
            "loading_chats" => &self.loading_chats,
            "all_chats_button" => &self.all_chats_button,
            "unread_chats_button" => &self.unread_chats_button,
            "search_button_inactive" => &self.search_button_inactive,
            "search_button_active" => &self.search_button_active,
            "cancel_search_button" => &self.cancel_search_button,
            "search_result" => &self.search_result,
            "search_item" => &self.search_item,
            "search_item_unread" => &self.search_item_unread,
            "span_title" => &self.span_title,
            "search_item_child_divs" => &self.search_item_child_divs,
            "any_child" => &self.any_child,
            "chat_div" => &self.chat_div,
            "unread_chat_div" => &self.unread_chat_div,
            "chat_component" => &self.chat_component,
            "chat_message" => &self.chat_message,
            "chat_message_quote" => &self.chat_message_quote,
            "chat_message_image" => &self.chat_message_image,
            "chat_input_box" => &self.chat_input_box,
            _ => return None,
        })
    }
}
