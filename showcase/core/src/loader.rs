//! Content Loader
//!
//! Turns the active [`Target`] into content ready to attach. The loader
//! never touches engine state: it receives a snapshot, performs whatever
//! host I/O the target needs, and reports a [`LoadOutcome`] that the engine
//! applies after checking the load is still current.
//!
//! # Dispatch
//!
//! ```text
//! Data ──┬── image pattern ── cached size? ── yes ──> Ready (no round-trip)
//!        │                         └── no ── load ──┬── ok ──────> Ready
//!        │                                          ├── 0x0 ─────> RetryLater (first attempt)
//!        │                                          └── failed ──> Failed(DataLoadFailure)
//!        ├── video pattern ── Redirect(synthesized video target)
//!        └── fragment ── fetch ── ok ──> Ready / error ──> Failed(DataLoadFailure)
//! Object ── image ──> Ready
//!        └── media ── ready? ──> Ready / failed ──> Failed(MediaLoadFailure) / wait
//! Element ──> Ready
//! ```

use crate::error::{ErrorKind, ShowcaseError};
use crate::geometry::Size;
use crate::host::{Content, FragmentRequest, HostSurface, ImageState, MediaReadiness};
use crate::options::Options;
use crate::target::{Target, TargetClass, TargetSource};

/// Video MIME subtype used when the source has no usable extension
pub const DEFAULT_VIDEO_SUBTYPE: &str = "webm";

/// Image loads that report `0x0` are re-attempted this many times
pub const MAX_IMAGE_RETRIES: u32 = 1;

/// Snapshot of everything one load attempt needs
#[derive(Clone, Debug)]
pub struct LoadRequest {
    /// The active target
    pub target: Target,
    /// Its class, computed when the snapshot was taken
    pub class: TargetClass,
    /// Cached natural size for the target's data source
    pub cached: Option<Size>,
    /// Retries already made for this target
    pub attempt: u32,
    /// Resolved options for the load
    pub options: Options,
}

/// Content that is ready to attach
#[derive(Clone, Debug, PartialEq)]
pub struct Prepared {
    /// What to attach
    pub content: Content,
    /// Natural size, when known without measuring
    pub natural: Option<Size>,
    /// Whether aspect-ratio scaling can apply
    pub scalable: bool,
    /// Whether the content is an embedded object (drives the background style)
    pub object: bool,
    /// Size to record in the size cache
    pub cache: Option<(String, Size)>,
}

/// Result of one load attempt
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// Content is ready
    Ready(Prepared),
    /// Replace the active target and classify again
    Redirect(Target),
    /// Re-attempt after the retry delay
    RetryLater,
    /// The load failed
    Failed(ShowcaseError),
}

/// Where a data source is routed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataRoute {
    /// Load as an image
    Image,
    /// Synthesize a video element
    Video {
        /// MIME subtype
        subtype: String,
    },
    /// Fetch as a markup fragment
    Fragment(FragmentRequest),
}

/// Route a data source: image pattern first, then video, else fragment
#[must_use]
pub fn route(source: &str, embedded_image: bool, options: &Options) -> DataRoute {
    if embedded_image || options.image_pattern.is_match(source) {
        DataRoute::Image
    } else if options.video_pattern.is_match(source) {
        DataRoute::Video {
            subtype: video_subtype(source),
        }
    } else {
        DataRoute::Fragment(FragmentRequest::parse(source))
    }
}

/// Final extension of a source, lowercased, or [`DEFAULT_VIDEO_SUBTYPE`]
#[must_use]
pub fn video_subtype(source: &str) -> String {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    path.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| DEFAULT_VIDEO_SUBTYPE.to_string(), str::to_ascii_lowercase)
}

/// Run one load attempt
pub async fn load(host: &dyn HostSurface, request: &LoadRequest) -> LoadOutcome {
    let clone_data = request.options.clone_data;

    match (&request.target.source, request.class) {
        (TargetSource::Link { href }, _) => load_data(host, request, href, false).await,
        (TargetSource::Image { source: Some(source), .. }, TargetClass::Data) => {
            load_data(host, request, source, true).await
        }
        (TargetSource::Image { node, source }, _) => {
            let natural = match host.image_state(*node) {
                ImageState::Decoded(size) => Some(size),
                ImageState::Broken | ImageState::Pending => None,
            };
            let natural = source
                .as_deref()
                .and(request.cached)
                .or(natural);
            LoadOutcome::Ready(Prepared {
                content: Content::Node {
                    node: *node,
                    clone_data,
                },
                natural,
                scalable: true,
                object: true,
                cache: source.clone().zip(natural),
            })
        }
        (TargetSource::Media { node }, _) => {
            let ready = match host.media_readiness(*node) {
                MediaReadiness::HaveData => Ok(()),
                MediaReadiness::Failed => Err(ShowcaseError::new(ErrorKind::MediaLoadFailure)),
                MediaReadiness::Pending => host.media_ready(*node).await.map_err(|e| {
                    ShowcaseError::with_detail(ErrorKind::MediaLoadFailure, e.to_string())
                }),
            };
            match ready {
                Ok(()) => LoadOutcome::Ready(Prepared {
                    content: Content::Node {
                        node: *node,
                        clone_data,
                    },
                    natural: None,
                    scalable: true,
                    object: request.class.is_object(),
                    cache: None,
                }),
                Err(e) => LoadOutcome::Failed(e),
            }
        }
        (TargetSource::Element { node }, _) => LoadOutcome::Ready(element(Content::Node {
            node: *node,
            clone_data,
        })),
        (TargetSource::Markup { markup }, _) => LoadOutcome::Ready(element(Content::Markup {
            markup: markup.clone(),
            clone_data,
        })),
        (TargetSource::Video { source, subtype }, _) => LoadOutcome::Ready(Prepared {
            content: Content::Video {
                source: source.clone(),
                subtype: subtype.clone(),
            },
            natural: None,
            scalable: true,
            object: false,
            cache: None,
        }),
    }
}

fn element(content: Content) -> Prepared {
    Prepared {
        content,
        natural: None,
        scalable: false,
        object: false,
        cache: None,
    }
}

async fn load_data(
    host: &dyn HostSurface,
    request: &LoadRequest,
    source: &str,
    embedded_image: bool,
) -> LoadOutcome {
    match route(source, embedded_image, &request.options) {
        DataRoute::Image => load_image(host, request, source).await,
        DataRoute::Video { subtype } => {
            tracing::debug!(source, %subtype, "synthesizing video element");
            LoadOutcome::Redirect(Target {
                source: TargetSource::Video {
                    source: source.to_string(),
                    subtype,
                },
                info: request.target.info.clone(),
            })
        }
        DataRoute::Fragment(fragment) => match host.fetch_fragment(&fragment).await {
            Ok(markup) => LoadOutcome::Ready(element(Content::Fragment {
                source: source.to_string(),
                markup,
            })),
            Err(e) => {
                tracing::debug!(url = %fragment.url, error = %e, "fragment fetch failed");
                LoadOutcome::Failed(ShowcaseError::with_detail(
                    ErrorKind::DataLoadFailure,
                    e.to_string(),
                ))
            }
        },
    }
}

async fn load_image(host: &dyn HostSurface, request: &LoadRequest, source: &str) -> LoadOutcome {
    let content = Content::Image {
        source: source.to_string(),
    };

    if let Some(size) = request.cached {
        tracing::trace!(source, "image size cached, skipping load wait");
        return LoadOutcome::Ready(Prepared {
            content,
            natural: Some(size),
            scalable: true,
            object: true,
            cache: None,
        });
    }

    match host.load_image(source).await {
        Ok(size) => LoadOutcome::Ready(Prepared {
            content,
            natural: Some(size),
            scalable: true,
            object: true,
            cache: Some((source.to_string(), size)),
        }),
        Err(e) if e.natural.is_zero() && request.attempt < MAX_IMAGE_RETRIES => {
            tracing::debug!(source, attempt = request.attempt, "image reported 0x0, retrying");
            LoadOutcome::RetryLater
        }
        Err(e) => LoadOutcome::Failed(ShowcaseError::with_detail(
            ErrorKind::DataLoadFailure,
            e.to_string(),
        )),
    }
}
