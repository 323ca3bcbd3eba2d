//! Process-wide instance
//!
//! The session is created once with [`install`] and lives until process
//! exit. Calls made before installation fail synchronously with
//! `Unavailable`; there is no engine yet to display the error in.

use std::sync::{Arc, OnceLock};

use crate::config::EngineConfig;
use crate::error::{ErrorKind, Result, ShowcaseError};
use crate::host::HostSurface;
use crate::showcase::{ShowRequest, Showcase};

static INSTANCE: OnceLock<Showcase> = OnceLock::new();

/// Create the process-wide instance
///
/// Returns the existing instance if one was already installed; `host` and
/// `config` are then ignored.
///
/// # Errors
///
/// Strict-mode errors from applying `config.defaults`.
pub fn install(host: Arc<dyn HostSurface>, config: EngineConfig) -> Result<&'static Showcase> {
    if let Some(existing) = INSTANCE.get() {
        tracing::debug!("showcase already installed");
        return Ok(existing);
    }
    let showcase = Showcase::new(host, config)?;
    Ok(INSTANCE.get_or_init(|| showcase))
}

/// The installed instance
///
/// # Errors
///
/// `Unavailable` before [`install`].
pub fn instance() -> Result<&'static Showcase> {
    INSTANCE.get().ok_or_else(|| {
        tracing::warn!("showcase used before installation");
        ShowcaseError::new(ErrorKind::Unavailable)
    })
}

/// Show through the installed instance
///
/// # Errors
///
/// `Unavailable` before [`install`]; otherwise as [`Showcase::show`].
pub fn show(request: ShowRequest) -> Result<bool> {
    instance()?.show(request)
}

/// Whether [`install`] has run
#[must_use]
pub fn is_installed() -> bool {
    INSTANCE.get().is_some()
}
