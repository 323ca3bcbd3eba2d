//! Showcase Core - Headless Modal Presentation Engine
//!
//! This crate presents one piece of content (an image, a video, a fetched
//! fragment or arbitrary markup) in a modal overlay above a host document,
//! with collection navigation, automatic expiry and transition-driven
//! open/close/resize animations. It never touches a document itself: a host
//! UI layer implements [`HostSurface`] and forwards its events back in.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Host UI layer                        │
//! │   attach / measure / apply_frame        transition_end /     │
//! │   load_image / fetch_fragment           boundary_click / key │
//! └──────────────┬──────────────────────────────────┬────────────┘
//!                │ HostSurface (down)               │ host events (up)
//! ┌──────────────┼──────────────────────────────────┼────────────┐
//! │              │        SHOWCASE CORE             │            │
//! │  ┌───────────┴──────────────────────────────────┴─────────┐  │
//! │  │                 Showcase (lifecycle)                   │  │
//! │  │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌────────┐  │  │
//! │  │  │  Loader  │  │ Geometry │  │Navigator │  │ Timers │  │  │
//! │  │  └──────────┘  └──────────┘  └──────────┘  └────────┘  │  │
//! │  └────────────────────────┬───────────────────────────────┘  │
//! │                           │ EventBus / ErrorChannel          │
//! └───────────────────────────┼──────────────────────────────────┘
//!                             v
//!             enable | disable | resize | navigate | error
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use showcase_core::{EngineConfig, ShowRequest, Showcase, Target};
//!
//! let host = Arc::new(MyDocumentHost::new());
//! let showcase = Showcase::new(host, EngineConfig::from_env())?;
//!
//! showcase.on("disable", |_| println!("closed"))?;
//! showcase.show(
//!     ShowRequest::new([Target::link("gallery/1.jpg"), Target::link("gallery/2.jpg")])
//!         .on_complete(|| println!("displayed")),
//! )?;
//! ```
//!
//! # Module Overview
//!
//! - [`showcase`]: Lifecycle state machine and load pipeline
//! - [`loader`]: Per-class content loading
//! - [`geometry`]: Frame sizing, aspect-ratio scaling and transition waits
//! - [`navigation`]: Wraparound index over the bound collection
//! - [`error`]: Error taxonomy and the error channel
//! - [`events`]: Named notifications
//! - [`options`]: Option set, defaults and per-call overrides
//! - [`target`]: Targets and their classification
//! - [`host`]: The host surface contract
//! - [`timers`]: Singleton timer slots
//! - [`config`]: Engine configuration (env, TOML file, defaults)
//! - [`popup`]: Alert, confirm and prompt popups
//! - [`capability`]: Open/close/resize/navigate interfaces
//! - [`global`]: Process-wide instance
//! - [`test_utils`]: Recording host for tests

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod global;
pub mod host;
pub mod loader;
pub mod navigation;
pub mod options;
pub mod popup;
pub mod showcase;
pub mod target;
pub mod test_utils;
pub mod timers;

// Re-exports for convenience
pub use capability::{Closable, Navigable, Openable, Resizable};
pub use config::{load_config, ConfigError, ConfigSource, EngineConfig};
pub use error::{ErrorChannel, ErrorKind, Result, ShowcaseError};
pub use events::{EngineEvent, EventBus, EventKind, SubscriptionId};
pub use geometry::{
    Dimension, FrameSize, ScaleContext, ScaleMode, Size, TransitionOutcome, TransitionProperty,
    TransitionWait,
};
pub use host::{
    Chrome, Content, ContentHandle, FragmentRequest, HostError, HostSurface, ImageLoadError,
    ImageState, MediaReadiness, NodeRef, OverlayState,
};
pub use navigation::{Direction, Navigator};
pub use options::{ControlText, Extent, OptionOverrides, Options};
pub use popup::{PopupAnswer, PopupButton, PopupCallback};
pub use showcase::{Key, LifecycleState, ShowRequest, Showcase};
pub use target::{Target, TargetClass, TargetSource};
