//! Error Channel
//!
//! Every failure inside the engine is mapped onto a fixed taxonomy and routed
//! through [`ErrorChannel::report`]. Callers never see raw failures from the
//! load pipeline: they read the last recorded message, listen for the `error`
//! notification, or (in strict mode) receive the error as an `Err`.
//!
//! # Codes
//!
//! | Kind                       | Code  |
//! |----------------------------|-------|
//! | `Unavailable`              | `001` |
//! | `InvalidOptions`           | `002` |
//! | `InvalidCallback`          | `003` |
//! | `BusyConflict`             | `004` |
//! | `DataLoadFailure`          | `005` |
//! | `MediaLoadFailure`         | `006` |
//! | `InvalidDefaultKey`        | `010` |
//! | `InvalidEventRegistration` | `011` |

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{EngineEvent, EventBus};

/// Stable error taxonomy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The engine was used before its one-time setup completed
    Unavailable,
    /// Per-call options were not a key/value map
    InvalidOptions,
    /// A completion callback could not be used
    ///
    /// Callbacks are typed closures, so the engine never raises this itself;
    /// the code stays reserved for hosts that accept callbacks dynamically.
    InvalidCallback,
    /// A load was requested while another one is in flight
    BusyConflict,
    /// Remote data (image or fragment) failed to load
    DataLoadFailure,
    /// Embedded media failed to load
    MediaLoadFailure,
    /// `set_defaults` was given a key that has no default
    InvalidDefaultKey,
    /// `on`/`off` was given an unknown event name
    InvalidEventRegistration,
}

impl ErrorKind {
    /// Stable numeric code
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Unavailable => "001",
            Self::InvalidOptions => "002",
            Self::InvalidCallback => "003",
            Self::BusyConflict => "004",
            Self::DataLoadFailure => "005",
            Self::MediaLoadFailure => "006",
            Self::InvalidDefaultKey => "010",
            Self::InvalidEventRegistration => "011",
        }
    }

    /// Message template; `{var}` is replaced by the detail where present
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::Unavailable => "The showcase was called before it was available.",
            Self::InvalidOptions => "Invalid options argument supplied to the showcase.",
            Self::InvalidCallback => "Invalid callback argument supplied to the showcase.",
            Self::BusyConflict => "The showcase is currently busy loading other content.",
            Self::DataLoadFailure => "The showcase was unable to load the data content.",
            Self::MediaLoadFailure => "The showcase was unable to load the media content.",
            Self::InvalidDefaultKey => "The default option \"{var}\" does not exist.",
            Self::InvalidEventRegistration => "Invalid event type \"{var}\" for the showcase.",
        }
    }

    /// Whether failures of this kind are shown inside the showcase itself
    #[must_use]
    pub fn is_self_hosted(self) -> bool {
        matches!(self, Self::DataLoadFailure | Self::MediaLoadFailure)
    }

    /// Whether processing continues with a fallback after this error
    #[must_use]
    pub fn has_fallback(self) -> bool {
        matches!(
            self,
            Self::InvalidOptions | Self::InvalidDefaultKey | Self::InvalidEventRegistration
        )
    }
}

/// Error raised by the engine
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{} - {}", kind.code(), message)]
pub struct ShowcaseError {
    /// Error class
    pub kind: ErrorKind,
    /// Rendered message (template with detail applied)
    pub message: String,
    /// Underlying cause, if any (e.g. the host's fetch status)
    pub detail: Option<String>,
}

impl ShowcaseError {
    /// Create an error with no detail
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.template().replace("{var}", ""),
            detail: None,
        }
    }

    /// Create an error carrying a detail
    ///
    /// Templates with a `{var}` slot embed the detail in the message.
    #[must_use]
    pub fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            kind,
            message: kind.template().replace("{var}", &detail),
            detail: Some(detail),
        }
    }

    /// The `"{code} - {message}"` text recorded on the instance
    #[must_use]
    pub fn display_text(&self) -> String {
        self.to_string()
    }
}

/// Result type used across the engine
pub type Result<T> = std::result::Result<T, ShowcaseError>;

/// Routes reported errors to the last-error slot, the `error` notification,
/// and (in strict mode) back to the caller.
pub struct ErrorChannel {
    strict: bool,
    last: Mutex<Option<ShowcaseError>>,
}

impl ErrorChannel {
    /// Create a channel; `strict` re-raises every reported error
    #[must_use]
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            last: Mutex::new(None),
        }
    }

    /// Whether reported errors are re-raised
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Record and broadcast an error
    ///
    /// # Errors
    ///
    /// Returns the reported error back in strict mode.
    pub fn report(&self, error: ShowcaseError, events: &EventBus) -> Result<()> {
        tracing::warn!(
            code = error.kind.code(),
            kind = ?error.kind,
            detail = ?error.detail,
            "showcase error: {}",
            error.message
        );

        *self.last.lock() = Some(error.clone());
        events.emit(&EngineEvent::Error(error.clone()));

        if self.strict {
            Err(error)
        } else {
            Ok(())
        }
    }

    /// Most recent error text, empty if none was ever reported
    #[must_use]
    pub fn last_message(&self) -> String {
        self.last
            .lock()
            .as_ref()
            .map(ShowcaseError::display_text)
            .unwrap_or_default()
    }

    /// Most recent error
    #[must_use]
    pub fn last(&self) -> Option<ShowcaseError> {
        self.last.lock().clone()
    }
}

impl std::fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("strict", &self.strict)
            .field("last", &*self.last.lock())
            .finish()
    }
}
