//! Alert, confirm and prompt popups
//!
//! Popups use nothing but the engine's public load/close contract: the popup
//! is a markup target shown with `cloneData` set, and its callback is also
//! registered as a one-shot `disable` handler so that closing the showcase
//! any other way still answers it (with `None`).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::events::{EventKind, SubscriptionId};
use crate::options::{Extent, OptionOverrides};
use crate::showcase::{LifecycleState, ShowRequest, Showcase};
use crate::target::Target;

/// Default confirmation button text
pub const DEFAULT_BUTTON: &str = "OK";

/// Default cancel button text
pub const DEFAULT_CANCEL: &str = "CANCEL";

/// Input markup used by [`Showcase::prompt`] when none is given
pub const DEFAULT_PROMPT_INPUT: &str = r#"<input type="text" class="showcase-prompt">"#;

/// Messages longer than this get the wide popup
const WIDE_MESSAGE_CHARS: usize = 25;

/// How a popup was answered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopupAnswer {
    /// Alert dismissed with its button, or confirm accepted
    Accepted,
    /// Confirm cancelled
    Declined,
    /// Prompt submitted with these trimmed values
    Input(Vec<String>),
}

/// Popup buttons
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupButton {
    /// The confirming button (also `Enter`)
    Confirm,
    /// The cancel button of a confirm popup
    Cancel,
}

/// Popup callback; `None` when the showcase was closed without an answer
pub type PopupCallback = Box<dyn FnOnce(Option<PopupAnswer>) + Send>;

type SharedCallback = Arc<Mutex<Option<PopupCallback>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PopupKind {
    Alert { button: bool },
    Confirm,
    Prompt,
}

pub(crate) struct ActivePopup {
    kind: PopupKind,
    subscription: SubscriptionId,
    callback: SharedCallback,
}

/// Width for a popup message given the default width option
#[must_use]
pub fn popup_width(message: &str, default: Extent) -> f64 {
    let default = default.px().unwrap_or(0.0);
    if message.chars().count() > WIDE_MESSAGE_CHARS {
        default.max(400.0)
    } else {
        default.max(300.0)
    }
}

fn deliver(callback: &SharedCallback, answer: Option<PopupAnswer>) {
    let callback = callback.lock().take();
    if let Some(callback) = callback {
        callback(answer);
    }
}

impl Showcase {
    /// Show a message with an optional dismiss button
    ///
    /// `button: None` shows no button; `expire` closes the alert after that
    /// many seconds (0 disables).
    ///
    /// # Errors
    ///
    /// In strict mode, a rejected show is returned.
    pub fn alert(
        &self,
        message: &str,
        button: Option<&str>,
        callback: Option<PopupCallback>,
        expire: f64,
    ) -> Result<bool> {
        let markup = match button {
            Some(button) => format!(
                r#"<div class="showcase-popup"><p>{message}</p><button id="showcase-confirm">{button}</button></div>"#
            ),
            None => format!(r#"<div class="showcase-popup"><p>{message}</p></div>"#),
        };
        self.open_popup(
            PopupKind::Alert {
                button: button.is_some(),
            },
            message,
            markup,
            callback,
            expire,
            false,
        )
    }

    /// Ask a yes/no question; `buttons` are the confirm and cancel texts
    ///
    /// # Errors
    ///
    /// In strict mode, a rejected show is returned.
    pub fn confirm(
        &self,
        message: &str,
        buttons: Option<[&str; 2]>,
        callback: Option<PopupCallback>,
    ) -> Result<bool> {
        let [confirm, cancel] = buttons.unwrap_or([DEFAULT_BUTTON, DEFAULT_CANCEL]);
        let markup = format!(
            r#"<div class="showcase-popup"><p>{message}</p><button id="showcase-confirm">{confirm}</button><button>{cancel}</button></div>"#
        );
        self.open_popup(PopupKind::Confirm, message, markup, callback, 0.0, false)
    }

    /// Ask for input; `input` is the markup of the input controls
    ///
    /// # Errors
    ///
    /// In strict mode, a rejected show is returned.
    pub fn prompt(
        &self,
        message: &str,
        button: Option<&str>,
        input: Option<&str>,
        callback: Option<PopupCallback>,
    ) -> Result<bool> {
        let button = button.unwrap_or(DEFAULT_BUTTON);
        let input = input.unwrap_or(DEFAULT_PROMPT_INPUT);
        let markup = format!(
            r#"<div class="showcase-popup"><p>{message}</p>{input}<button id="showcase-confirm">{button}</button></div>"#
        );
        self.open_popup(PopupKind::Prompt, message, markup, callback, 0.0, false)
    }

    /// Press a button of the displayed popup
    ///
    /// Answers the callback, then closes. Returns false when no popup is
    /// displayed or it has no such button.
    pub fn popup_button(&self, button: PopupButton) -> bool {
        if self.state() != LifecycleState::Enabled {
            return false;
        }
        let Some(popup) = self.inner.popup.lock().take() else {
            return false;
        };

        let answer = match (popup.kind, button) {
            (PopupKind::Alert { button: true }, PopupButton::Confirm)
            | (PopupKind::Confirm, PopupButton::Confirm) => PopupAnswer::Accepted,
            (PopupKind::Confirm, PopupButton::Cancel) => PopupAnswer::Declined,
            (PopupKind::Prompt, PopupButton::Confirm) => {
                let values = self
                    .current_content()
                    .map(|handle| self.inner.host.input_values(handle))
                    .unwrap_or_default();
                PopupAnswer::Input(values.iter().map(|v| v.trim().to_string()).collect())
            }
            _ => {
                *self.inner.popup.lock() = Some(popup);
                return false;
            }
        };

        tracing::debug!(?button, ?answer, "popup answered");
        self.inner.events.remove(popup.subscription);
        deliver(&popup.callback, Some(answer));
        self.close(false);
        true
    }

    /// Buttonless alert shown in place of a load, even while busy
    pub(crate) fn open_alert(&self, message: &str, forced: bool) -> Result<bool> {
        let markup = format!(r#"<div class="showcase-popup"><p>{message}</p></div>"#);
        self.open_popup(
            PopupKind::Alert { button: false },
            message,
            markup,
            None,
            0.0,
            forced,
        )
    }

    /// Drop the displayed popup, answering its callback with `None`
    pub(crate) fn dismiss_popup(&self) {
        let Some(popup) = self.inner.popup.lock().take() else {
            return;
        };
        self.inner.events.remove(popup.subscription);
        deliver(&popup.callback, None);
    }

    fn open_popup(
        &self,
        kind: PopupKind,
        message: &str,
        markup: String,
        callback: Option<PopupCallback>,
        expire: f64,
        forced: bool,
    ) -> Result<bool> {
        let callback: SharedCallback = Arc::new(Mutex::new(callback));
        let on_disable = callback.clone();
        let subscription = self
            .inner
            .events
            .once(EventKind::Disable, move |_| deliver(&on_disable, None));

        let width = popup_width(message, self.inner.defaults.read().width);
        let overrides = OptionOverrides::new()
            .with_width(Extent::Px(width))
            .with_clone_data(true)
            .with_expire(expire);
        let request = ShowRequest::new([Target::markup(markup)]).options(overrides);

        match self.show_with(request, forced) {
            Ok(true) => {
                tracing::debug!(?kind, width, "popup shown");
                *self.inner.popup.lock() = Some(ActivePopup {
                    kind,
                    subscription,
                    callback,
                });
                Ok(true)
            }
            other => {
                self.inner.events.remove(subscription);
                other
            }
        }
    }
}
