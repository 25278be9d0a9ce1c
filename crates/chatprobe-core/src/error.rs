//! Error taxonomy for driver interactions.
//!
//! Failures from the DOM accessor fall into two camps:
//!
//! | Camp | Variants | Handling |
//! |------|----------|----------|
//! | **Transient** | `NotFound`, `Stale` | Retried next poll or skipped; never surfaced to the application |
//! | **Fatal** | `WaitTimeout`, `Session` | Propagated out of the poll loop, terminating it |
//!
//! A fragment that exists but doesn't match any known shape is *not* an
//! error: extraction returns `Ok(None)` ("not applicable") and callers
//! filter those out.

use std::time::Duration;

use thiserror::Error;

/// An error from the DOM accessor or the helpers built on top of it.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No element matched the query. Expected during rendering; the
    /// classifier and steady-state QR re-extraction coerce or swallow it.
    #[error("no element matching {query}")]
    NotFound {
        /// The query that produced no match.
        query: String,
    },

    /// A handle was invalidated by a re-render before it could be read.
    /// Routine during QR re-extraction; the next poll retries.
    #[error("stale element reference ({context})")]
    Stale {
        /// What was being read when the handle went stale.
        context: String,
    },

    /// A wait-for-appearance helper exhausted its bound. The underlying
    /// page may be hung; callers treat this as fatal for the operation.
    #[error("timed out after {timeout:?} waiting for {query}")]
    WaitTimeout {
        /// The query being waited on.
        query: String,
        /// The configured bound that was exhausted.
        timeout: Duration,
    },

    /// The driver connection is broken (browser crashed, socket lost).
    /// Always fatal; the application decides whether to start a fresh
    /// session.
    #[error("driver session failed: {0}")]
    Session(String),
}

impl DriverError {
    /// Convenience constructor carrying the query text.
    pub fn not_found(query: impl std::fmt::Display) -> Self {
        Self::NotFound {
            query: query.to_string(),
        }
    }

    /// Convenience constructor for stale-reference failures.
    pub fn stale(context: impl Into<String>) -> Self {
        Self::Stale {
            context: context.into(),
        }
    }

    /// Whether a retry on the next poll can succeed.
    ///
    /// `NotFound` and `Stale` are races against the page's own rendering;
    /// everything else means the session or the operation is lost.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Stale { .. })
    }
}
