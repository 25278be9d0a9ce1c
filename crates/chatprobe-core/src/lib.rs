//! Core types and logic for chatprobe.
//!
//! This crate monitors a browser-rendered chat session through an opaque
//! [`dom::DomAccessor`] seam: a poll loop classifies what the page is
//! showing, detects transitions, and fires registered event handlers.
//! Backends (WebDriver in the CLI, a scripted double in tests) plug in
//! underneath without the core knowing about browsers.
//!
//! # Modules
//!
//! - [`dom`]: the accessor trait, queries and keys
//! - [`error`]: transient/fatal error taxonomy for driver interactions
//! - [`locator`]: named, runtime-replaceable queries for every UI region
//! - [`state`]: coarse screen-state classification
//! - [`extract`]: typed records (QR payloads, messages, search results)
//! - [`events`]: the closed event set and single-slot dispatcher
//! - [`actions`]: multi-step interaction scripts (search, send, scan)
//! - [`monitor`]: the poll loop that ties it all together
//!
//! # Screen states
//!
//! Classification checks the most advanced stage first, because screens
//! overlap briefly during transitions:
//!
//! | State | Marker |
//! |-------|--------|
//! | `LoggedIn` | chat list title |
//! | `Loading` | end-to-end-encryption banner with progress |
//! | `QrAuth` | QR canvas |
//! | `Unauthenticated` | landing-page text |
//!
//! No marker at all is an indeterminate tick: nothing fires except
//! `on_tick`, and the previous state stands.

pub mod actions;
pub mod dom;
pub mod error;
pub mod events;
pub mod extract;
pub mod locator;
pub mod monitor;
pub mod state;

#[cfg(test)]
pub(crate) mod fake;

pub use dom::{DomAccessor, Key, Query};
pub use error::DriverError;
pub use events::{Event, EventPayload};
pub use extract::{Message, QrPayload, SearchResult};
pub use locator::LocatorTable;
pub use monitor::{MonitorConfig, MonitorHandle, SessionMonitor};
pub use state::ScreenState;
