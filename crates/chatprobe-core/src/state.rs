//! Coarse screen-state classification.
//!
//! The page never announces what it is showing; the classifier infers it
//! from marker fragments that happen to be present. Checks run most
//! advanced stage first because screens overlap briefly during transition
//! animations. A page that is simultaneously finishing the QR screen and
//! entering the loading screen must classify as Loading, not QrAuth.

use serde::{Deserialize, Serialize};

use crate::dom::DomAccessor;
use crate::error::DriverError;
use crate::locator::LocatorTable;

/// What the monitored page is currently showing.
///
/// Exactly one state holds at any poll tick. "None of the markers matched"
/// is represented as `None` at the classify call site: a transient
/// mid-render condition that never produces a transition event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenState {
    /// Landing screen, not yet authenticating.
    Unauthenticated,
    /// QR code shown, waiting for a device to scan it.
    QrAuth,
    /// Authenticated, chats still syncing.
    Loading,
    /// Fully logged in, chat list visible.
    LoggedIn,
}

impl std::fmt::Display for ScreenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenState::Unauthenticated => write!(f, "unauthenticated"),
            ScreenState::QrAuth => write!(f, "qr_auth"),
            ScreenState::Loading => write!(f, "loading"),
            ScreenState::LoggedIn => write!(f, "logged_in"),
        }
    }
}

/// Classify the current screen with ordered, short-circuiting presence
/// checks.
///
/// Returns `Ok(None)` when no marker matched (mid-render). Absence of a
/// marker is an expected outcome, so `NotFound` never surfaces from here;
/// any other accessor failure propagates untouched.
pub async fn classify<A: DomAccessor>(
    dom: &A,
    locators: &LocatorTable,
) -> Result<Option<ScreenState>, DriverError> {
    if dom.exists(&locators.logged_in).await? {
        return Ok(Some(ScreenState::LoggedIn));
    }
    if dom.exists(&locators.loading).await? {
        return Ok(Some(ScreenState::Loading));
    }
    if dom.exists(&locators.qr_code).await? {
        return Ok(Some(ScreenState::QrAuth));
    }
    if dom.exists(&locators.auth).await? {
        return Ok(Some(ScreenState::Unauthenticated));
    }
    Ok(None)
}
