//! The session monitor: a poll loop that classifies the screen, detects
//! transitions, and fires events.
//!
//! One monitor owns one accessor (one browser session). [`SessionMonitor::run`]
//! consumes the monitor, loops until stopped or a fatal error, and releases
//! the session exactly once on the way out. A [`MonitorHandle`] obtained
//! before the loop starts stops it from another task or a handler.
//!
//! # Transition semantics
//!
//! A tick compares the freshly classified state to the previous one.
//! Indeterminate ticks (no marker matched) change nothing; the previous
//! state stands until a determinate reading contradicts it. Entering a
//! state fires that state's event once. Remaining in `QrAuth` re-reads the
//! QR and fires [`Event::QrChange`] only when the bytes differ; remaining
//! in `LoggedIn` scans for unread chats. Every tick ends with
//! [`Event::Tick`], determinate or not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, trace};

use crate::actions;
use crate::dom::DomAccessor;
use crate::error::DriverError;
use crate::events::{Event, EventDispatcher, EventPayload};
use crate::extract::{self, Message, QrPayload, SearchResult};
use crate::locator::LocatorTable;
use crate::state::{classify, ScreenState};

/// Timing knobs for the poll loop and the interaction scripts.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between poll ticks.
    pub poll_interval: Duration,
    /// Settle time after switching the chat list to the unread filter.
    pub unread_scan_delay: Duration,
    /// Settle time after typing a search query, before reading results.
    pub results_delay: Duration,
    /// Bound on every wait-for-appearance helper.
    pub wait_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            unread_scan_delay: Duration::from_millis(500),
            results_delay: Duration::from_secs(1),
            wait_timeout: Duration::from_secs(10),
        }
    }
}

/// Remote stop switch for a running monitor.
///
/// Cloneable and safe to call from handlers or other tasks; stopping an
/// already-stopped monitor is a no-op. The loop notices the flag at the
/// top of its next tick.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    running: Arc<AtomicBool>,
}

impl MonitorHandle {
    /// Request the loop to exit after the current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Owns a browser session and polls it for state changes.
pub struct SessionMonitor<A: DomAccessor> {
    dom: A,
    locators: LocatorTable,
    config: MonitorConfig,
    events: EventDispatcher,
    running: Arc<AtomicBool>,
}

impl<A: DomAccessor> SessionMonitor<A> {
    pub fn new(dom: A) -> Self {
        Self::with_config(dom, LocatorTable::default(), MonitorConfig::default())
    }

    pub fn with_config(dom: A, locators: LocatorTable, config: MonitorConfig) -> Self {
        Self {
            dom,
            locators,
            config,
            events: EventDispatcher::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn locators(&self) -> &LocatorTable {
        &self.locators
    }

    /// Mutable access for runtime locator overrides; only meaningful
    /// before [`run`](Self::run).
    pub fn locators_mut(&mut self) -> &mut LocatorTable {
        &mut self.locators
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Register a handler; replaces any previous one for the same event.
    pub fn on<F>(&mut self, event: Event, handler: F)
    where
        F: FnMut(&EventPayload) + Send + 'static,
    {
        self.events.on(event, handler);
    }

    /// A stop switch valid for this monitor's run.
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            running: self.running.clone(),
        }
    }

    /// Run a search through this monitor's session.
    pub async fn search(&self, text: &str) -> Result<Vec<SearchResult>, DriverError> {
        actions::search(&self.dom, &self.locators, &self.config, text).await
    }

    /// Read the rendered messages of a chat through this monitor's session.
    pub async fn recent_messages(&self, chat: &str) -> Result<Vec<Message>, DriverError> {
        actions::recent_messages(&self.dom, &self.locators, &self.config, chat).await
    }

    /// Send a message through this monitor's session.
    pub async fn send_message(&self, chat: &str, text: &str) -> Result<(), DriverError> {
        actions::send_message(&self.dom, &self.locators, &self.config, chat, text).await
    }

    /// Release the session without running the poll loop.
    pub async fn close(self) -> Result<(), DriverError> {
        self.dom.close().await
    }

    /// Run the poll loop until stopped or a fatal error.
    ///
    /// Consumes the monitor; the session is exclusive to the loop while it
    /// runs and released exactly once on exit, fatal errors included.
    pub async fn run(mut self) -> Result<(), DriverError> {
        self.running.store(true, Ordering::SeqCst);
        info!(poll_interval = ?self.config.poll_interval, "session monitor starting");

        let outcome = self.poll_loop().await;

        self.running.store(false, Ordering::SeqCst);
        let released = self.dom.close().await;
        match &outcome {
            Ok(()) => info!("session monitor stopped"),
            Err(e) => info!(error = %e, "session monitor aborted"),
        }
        outcome.and(released)
    }

    async fn poll_loop(&mut self) -> Result<(), DriverError> {
        self.events.trigger(Event::Start, &EventPayload::None);

        let mut previous: Option<ScreenState> = None;
        let mut previous_qr: Option<QrPayload> = None;

        while self.running.load(Ordering::SeqCst) {
            match classify(&self.dom, &self.locators).await? {
                None => trace!("screen indeterminate"),
                Some(current) if previous != Some(current) => {
                    debug!(from = ?previous, to = %current, "screen transition");
                    self.enter_state(current, &mut previous_qr).await?;
                    previous = Some(current);
                }
                Some(current) => {
                    self.steady_state(current, &mut previous_qr).await?;
                }
            }

            self.events.trigger(Event::Tick, &EventPayload::None);
            sleep(self.config.poll_interval).await;
        }
        Ok(())
    }

    /// Fire the entry event for a freshly entered state.
    ///
    /// On entering `QrAuth` the canvas was just confirmed present, so a
    /// failed export here is fatal rather than a redraw race.
    async fn enter_state(
        &mut self,
        state: ScreenState,
        previous_qr: &mut Option<QrPayload>,
    ) -> Result<(), DriverError> {
        match state {
            ScreenState::Unauthenticated => {
                self.events.trigger(Event::Auth, &EventPayload::None);
            }
            ScreenState::QrAuth => {
                let qr = extract::extract_qr(&self.dom, &self.locators).await?;
                *previous_qr = Some(qr.clone());
                self.events.trigger(Event::Qr, &EventPayload::Qr(qr));
            }
            ScreenState::Loading => {
                let still_loading = self.dom.exists(&self.locators.loading_chats).await?;
                self.events
                    .trigger(Event::Loading, &EventPayload::Loading(still_loading));
            }
            ScreenState::LoggedIn => {
                self.events.trigger(Event::LoggedIn, &EventPayload::None);
            }
        }
        Ok(())
    }

    /// Steady-state work for a state we were already in. Transient errors
    /// are races against the page's rendering and wait for the next tick.
    async fn steady_state(
        &mut self,
        state: ScreenState,
        previous_qr: &mut Option<QrPayload>,
    ) -> Result<(), DriverError> {
        match state {
            ScreenState::QrAuth => {
                match extract::extract_qr(&self.dom, &self.locators).await {
                    Ok(qr) => {
                        if previous_qr.as_ref() != Some(&qr) {
                            *previous_qr = Some(qr.clone());
                            self.events.trigger(Event::QrChange, &EventPayload::Qr(qr));
                        }
                    }
                    Err(e) if e.is_transient() => trace!(error = %e, "qr redraw race"),
                    Err(e) => return Err(e),
                }
            }
            ScreenState::LoggedIn => {
                match actions::unread_scan(&self.dom, &self.locators, &self.config).await {
                    Ok(results) => {
                        for result in results {
                            self.events
                                .trigger(Event::UnreadChat, &EventPayload::UnreadChat(result));
                        }
                    }
                    Err(e) if e.is_transient() => debug!(error = %e, "unread scan skipped"),
                    Err(e) => return Err(e),
                }
            }
            ScreenState::Unauthenticated | ScreenState::Loading => {}
        }
        Ok(())
    }
}
