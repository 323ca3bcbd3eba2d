//! Capability interfaces
//!
//! Callers that only need one part of the engine (a gallery that opens and
//! navigates, a toolbar that closes) depend on these traits rather than on
//! [`Showcase`] itself. [`Showcase`] implements all of them.

use async_trait::async_trait;

use crate::error::Result;
use crate::geometry::{FrameSize, TransitionWait};
use crate::navigation::Direction;
use crate::showcase::{ShowRequest, Showcase};

/// Something that can present content
pub trait Openable {
    /// Present a collection of targets
    ///
    /// # Errors
    ///
    /// Strict-mode errors from the request.
    fn open(&self, request: ShowRequest) -> Result<bool>;

    /// Re-display whatever was last shown
    ///
    /// # Errors
    ///
    /// Strict-mode errors from the request.
    fn reopen(&self) -> Result<bool>;
}

/// Something that can be closed
pub trait Closable {
    /// Close, optionally overriding a load in progress
    fn close(&self, force: bool) -> bool;

    /// Close as the user would
    fn dismiss(&self) -> bool {
        self.close(false)
    }
}

/// Something whose frame can be resized
#[async_trait]
pub trait Resizable: Send + Sync {
    /// Start a resize without waiting for it
    fn begin_resize(&self, size: FrameSize, animate: bool) -> Option<TransitionWait>;

    /// Resize and wait for the transition to settle
    async fn resize(&self, size: FrameSize, animate: bool) -> bool;

    /// The viewport changed size
    fn viewport_resized(&self);
}

/// Something that steps through a collection
pub trait Navigable {
    /// Move one step in `direction`
    fn navigate(&self, direction: Direction) -> bool;

    /// Active index
    fn current_index(&self) -> usize;
}

impl Openable for Showcase {
    fn open(&self, request: ShowRequest) -> Result<bool> {
        self.show(request)
    }

    fn reopen(&self) -> Result<bool> {
        self.enable()
    }
}

impl Closable for Showcase {
    fn close(&self, force: bool) -> bool {
        Showcase::close(self, force)
    }
}

#[async_trait]
impl Resizable for Showcase {
    fn begin_resize(&self, size: FrameSize, animate: bool) -> Option<TransitionWait> {
        Showcase::begin_resize(self, size, animate)
    }

    async fn resize(&self, size: FrameSize, animate: bool) -> bool {
        Showcase::resize(self, size, animate).await
    }

    fn viewport_resized(&self) {
        Showcase::viewport_resized(self);
    }
}

impl Navigable for Showcase {
    fn navigate(&self, direction: Direction) -> bool {
        Showcase::navigate(self, direction)
    }

    fn current_index(&self) -> usize {
        Showcase::current_index(self)
    }
}
