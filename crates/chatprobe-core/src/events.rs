//! Event registration and dispatch.
//!
//! The dispatcher is a closed registry: one handler slot per event name,
//! replace-on-register, no fan-out. That single-slot semantic is a
//! contract, not an accident: the last registration wins, and the poll
//! loop never triggers a name outside [`Event::ALL`].
//!
//! Handlers run synchronously at trigger time, inside the tick that
//! produced the event. A handler may spawn its own background work; the
//! dispatcher guarantees delivery of the trigger call only, never
//! completion of anything the handler schedules.

use std::collections::HashMap;

use crate::extract::{QrPayload, SearchResult};

/// The closed set of events the session monitor can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The poll loop has begun, before the first tick.
    Start,
    /// Entered the unauthenticated landing screen.
    Auth,
    /// Entered the QR screen; payload carries the fresh QR image.
    Qr,
    /// Steady-state QR screen redrew a different code.
    QrChange,
    /// Entered the post-auth loading screen; payload tells whether chats
    /// are still loading.
    Loading,
    /// Entered the logged-in screen.
    LoggedIn,
    /// An unread chat was discovered during a steady-state scan; fired
    /// once per item.
    UnreadChat,
    /// One poll iteration completed; fired after any state-specific event.
    Tick,
}

impl Event {
    /// Every event name, in firing-precedence order.
    pub const ALL: [Event; 8] = [
        Event::Start,
        Event::Auth,
        Event::Qr,
        Event::QrChange,
        Event::Loading,
        Event::LoggedIn,
        Event::UnreadChat,
        Event::Tick,
    ];

    /// Stable string name, used in JSON output and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "on_start",
            Event::Auth => "on_auth",
            Event::Qr => "on_qr",
            Event::QrChange => "on_qr_change",
            Event::Loading => "on_loading",
            Event::LoggedIn => "on_logged_in",
            Event::UnreadChat => "on_unread_chat",
            Event::Tick => "on_tick",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Data accompanying a trigger call.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// No payload (`Start`, `Auth`, `LoggedIn`, `Tick`).
    None,
    /// QR image bytes (`Qr`, `QrChange`).
    Qr(QrPayload),
    /// Whether chats are still loading (`Loading`).
    Loading(bool),
    /// A discovered unread chat (`UnreadChat`).
    UnreadChat(SearchResult),
}

/// A registered handler. `FnMut` so handlers can carry state (counters,
/// stop handles) across invocations.
pub type Handler = Box<dyn FnMut(&EventPayload) + Send>;

/// Single-slot event registry owned by one monitor instance.
#[derive(Default)]
pub struct EventDispatcher {
    slots: HashMap<Event, Handler>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`, replacing any previous handler.
    pub fn on<F>(&mut self, event: Event, handler: F)
    where
        F: FnMut(&EventPayload) + Send + 'static,
    {
        self.slots.insert(event, Box::new(handler));
    }

    /// Invoke the handler for `event` if one is registered; no-op
    /// otherwise. Returns whether a handler ran.
    pub fn trigger(&mut self, event: Event, payload: &EventPayload) -> bool {
        match self.slots.get_mut(&event) {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<&str> = self.slots.keys().map(Event::name).collect();
        registered.sort_unstable();
        f.debug_struct("EventDispatcher")
            .field("registered", &registered)
            .finish()
    }
}
