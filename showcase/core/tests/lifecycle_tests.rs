//! Lifecycle integration tests
//!
//! Drive the engine end to end through the recording host: open, navigate,
//! close, expiry, failsafe, error self-hosting and strict mode.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use showcase_core::test_utils::MockHost;
use showcase_core::{
    Content, Direction, EngineConfig, EngineEvent, ErrorKind, HostError, ImageLoadError, Key,
    LifecycleState, MediaReadiness, NodeRef, OptionOverrides, OverlayState, ShowRequest, Showcase,
    Size, Target, TransitionProperty,
};

// ============================================================================
// Helpers
// ============================================================================

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn setup() -> (Arc<MockHost>, Showcase) {
    setup_with(EngineConfig::default())
}

fn setup_with(config: EngineConfig) -> (Arc<MockHost>, Showcase) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let host = Arc::new(MockHost::new());
    let showcase = Showcase::new(host.clone(), config).unwrap();
    (host, showcase)
}

/// No animation and no fade, so every step settles without transition reports
fn still() -> OptionOverrides {
    OptionOverrides::new().with_animate(false).with_fade(false)
}

fn counter(showcase: &Showcase, event: &str) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    showcase
        .on(event, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    count
}

fn three_targets() -> Vec<Target> {
    vec![
        Target::markup("<p>one</p>"),
        Target::markup("<p>two</p>"),
        Target::markup("<p>three</p>"),
    ]
}

fn attached_markup(host: &MockHost) -> Vec<String> {
    host.attached()
        .into_iter()
        .filter_map(|(_, content)| match content {
            Content::Markup { markup, .. } => Some(markup),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Open and navigate
// ============================================================================

#[tokio::test]
async fn test_three_target_wraparound() {
    let (host, sc) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    sc.on("navigate", move |event| {
        if let EngineEvent::Navigate { index, .. } = event {
            log.lock().push(*index);
        }
    })
    .unwrap();

    assert!(sc.show(ShowRequest::new(three_targets()).options(still())).unwrap());
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(sc.current_index(), 0);
    assert!(host.chrome().navigation);

    assert!(sc.navigate(Direction::Left));
    settle().await;
    assert_eq!(sc.current_index(), 2);
    assert_eq!(attached_markup(&host), vec!["<p>three</p>".to_string()]);

    assert!(sc.navigate(Direction::Right));
    settle().await;
    assert_eq!(sc.current_index(), 0);
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(*seen.lock(), vec![2, 0]);
}

#[tokio::test]
async fn test_start_index_is_clamped() {
    let (_host, sc) = setup();
    sc.show(ShowRequest::new(three_targets()).options(still().with_current_index(7)))
        .unwrap();
    assert_eq!(sc.current_index(), 2);
    settle().await;

    sc.close(false);
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still().with_current_index(4)))
        .unwrap();
    assert_eq!(sc.current_index(), 0);
}

#[tokio::test]
async fn test_busy_rejects_navigate_and_show() {
    let (host, sc) = setup();
    sc.show(ShowRequest::new(three_targets()).options(still()))
        .unwrap();
    settle().await;

    assert!(sc.navigate(Direction::Right));
    assert_eq!(sc.state(), LifecycleState::Busy);
    let content = sc.current_content();
    let attached = host.attached().len();

    assert!(!sc.navigate(Direction::Right));
    assert!(!sc
        .show(ShowRequest::new([Target::markup("<p>other</p>")]))
        .unwrap());

    assert_eq!(sc.current_index(), 1);
    assert_eq!(sc.state(), LifecycleState::Busy);
    assert_eq!(sc.current_content(), content);
    assert_eq!(host.attached().len(), attached);
    assert_eq!(sc.last_error_kind(), Some(ErrorKind::BusyConflict));
    assert!(sc.last_error().starts_with("004 - "));
}

#[tokio::test]
async fn test_navigation_replaces_content_after_load() {
    let (host, sc) = setup();
    sc.show(ShowRequest::new(three_targets()).options(still()))
        .unwrap();
    settle().await;
    let first = sc.current_content().unwrap();

    sc.navigate(Direction::Right);
    // Hidden, not removed, while the next target loads
    assert!(host.detached().is_empty());
    assert!(!host.is_visible(first));

    settle().await;
    assert_eq!(host.detached(), vec![first]);
    let second = sc.current_content().unwrap();
    assert_ne!(first, second);
    assert!(host.is_visible(second));
}

#[tokio::test]
async fn test_single_target_does_not_navigate() {
    let (host, sc) = setup();
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still()))
        .unwrap();
    settle().await;
    assert!(!host.chrome().navigation);
    assert!(!sc.navigate(Direction::Right));
    assert!(!sc.key(Key::ArrowLeft));
}

#[tokio::test]
async fn test_completion_callback_runs_once() {
    let (_host, sc) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    sc.show(
        ShowRequest::new(three_targets())
            .options(still())
            .on_complete(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
    )
    .unwrap();
    settle().await;
    sc.navigate(Direction::Right);
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_info_prefers_target_text() {
    let (host, sc) = setup();
    sc.show(
        ShowRequest::new([
            Target::markup("<p>a</p>").with_info("Own info"),
            Target::markup("<p>b</p>"),
        ])
        .options(still().with_info_content("Fallback")),
    )
    .unwrap();
    settle().await;
    assert_eq!(host.chrome().info.as_deref(), Some("Own info"));

    sc.navigate(Direction::Right);
    settle().await;
    assert_eq!(host.chrome().info.as_deref(), Some("Fallback"));
}

// ============================================================================
// Close
// ============================================================================

#[tokio::test]
async fn test_close_waits_for_fade() {
    let (host, sc) = setup();
    let disables = counter(&sc, "disable");
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(OptionOverrides::new().with_animate(false)))
        .unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);

    assert!(sc.close(false));
    assert_eq!(sc.state(), LifecycleState::Unloading);
    assert_eq!(host.overlay(), OverlayState::FadingOut);
    assert!(!sc.close(false));
    assert_eq!(disables.load(Ordering::SeqCst), 1);

    assert!(sc.transition_end(TransitionProperty::Opacity));
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Disabled);
    assert_eq!(host.overlay(), OverlayState::Disabled);
    assert!(!host.chrome().close);
}

#[tokio::test]
async fn test_close_rejected_while_loading_unless_forced() {
    let (host, sc) = setup();
    host.set_image_delay(Duration::from_secs(5));
    sc.show(ShowRequest::new([Target::link("slow.jpg")]).options(still()))
        .unwrap();
    settle().await;

    assert!(!sc.close(false));
    assert_eq!(sc.state(), LifecycleState::Busy);
    assert!(sc.close(true));
    assert_eq!(sc.state(), LifecycleState::Disabled);
}

#[tokio::test]
async fn test_close_while_disabled_is_noop() {
    let (host, sc) = setup();
    let disables = counter(&sc, "disable");
    assert!(!sc.disable());
    assert!(!sc.key(Key::Escape));
    assert_eq!(sc.state(), LifecycleState::Disabled);
    assert_eq!(disables.load(Ordering::SeqCst), 0);
    assert_eq!(host.overlay(), OverlayState::Disabled);
}

#[tokio::test]
async fn test_escape_closes_and_media_pauses() {
    let (host, sc) = setup();
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still()))
        .unwrap();
    settle().await;
    assert!(sc.key(Key::Escape));
    assert_eq!(sc.state(), LifecycleState::Disabled);
    assert_eq!(host.pauses(), 1);
}

#[tokio::test]
async fn test_enable_restores_last_content() {
    let (host, sc) = setup();
    let enables = counter(&sc, "enable");
    sc.show(ShowRequest::new([Target::markup("<p>kept</p>")]).options(still()))
        .unwrap();
    settle().await;
    sc.close(false);
    let attached = host.attached().len();

    assert!(sc.enable().unwrap());
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(host.attached().len(), attached);
    assert!(host.chrome().close);
    assert_eq!(enables.load(Ordering::SeqCst), 2);
    assert!(!sc.enable().unwrap());
}

// ============================================================================
// Timers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_expire_closes_exactly_once() {
    let (host, sc) = setup();
    let disables = counter(&sc, "disable");
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still().with_expire(5.0)))
        .unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(host.expiry(), Some(Duration::from_secs(5)));

    tokio::time::advance(Duration::from_millis(4_999)).await;
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Disabled);
    assert_eq!(disables.load(Ordering::SeqCst), 1);
    assert_eq!(host.expiry(), None);

    // Re-enabling does not re-arm the consumed timer
    sc.enable().unwrap();
    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(disables.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fractional_expire() {
    let (_host, sc) = setup();
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still().with_expire(2.5)))
        .unwrap();
    settle().await;

    tokio::time::advance(Duration::from_millis(2_499)).await;
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Disabled);
}

#[tokio::test(start_paused = true)]
async fn test_navigate_cancels_running_expiry() {
    let (host, sc) = setup();
    let disables = counter(&sc, "disable");
    sc.show(ShowRequest::new(three_targets()).options(still().with_expire(5.0)))
        .unwrap();
    settle().await;
    assert_eq!(host.expiry(), Some(Duration::from_secs(5)));

    tokio::time::advance(Duration::from_secs(3)).await;
    settle().await;
    assert!(sc.navigate(Direction::Right));
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(sc.current_index(), 1);
    assert_eq!(host.expiry(), None);

    // Past the first deadline, and the consumed timer is not re-armed
    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(disables.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failsafe_click_aborts_without_callback() {
    let (host, sc) = setup();
    host.set_image_delay(Duration::from_secs(10));
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    sc.show(
        ShowRequest::new([Target::link("slow.jpg")])
            .options(still())
            .on_complete(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
    )
    .unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Busy);
    assert!(!sc.boundary_click());

    tokio::time::advance(Duration::from_millis(2_000)).await;
    settle().await;
    assert!(sc.failsafe_engaged());

    assert!(sc.boundary_click());
    assert_eq!(sc.state(), LifecycleState::Disabled);

    // The abandoned load finishing later changes nothing
    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Disabled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(host.attached().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failsafe_disarmed_after_load() {
    let (_host, sc) = setup();
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still()))
        .unwrap();
    settle().await;
    tokio::time::advance(Duration::from_secs(3)).await;
    settle().await;
    assert!(!sc.failsafe_engaged());
    assert!(!sc.boundary_click());
    assert_eq!(sc.state(), LifecycleState::Enabled);
}

// ============================================================================
// Load failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_zero_sized_image_retried_exactly_once() {
    let (host, sc) = setup();
    for _ in 0..3 {
        host.push_image_result(Err(ImageLoadError {
            natural: Size::default(),
            reason: "not decoded".into(),
        }));
    }
    sc.show(ShowRequest::new([Target::link("cat.jpg")]).options(still()))
        .unwrap();
    settle().await;
    assert_eq!(host.image_loads().len(), 1);
    assert_eq!(sc.state(), LifecycleState::Busy);

    tokio::time::advance(Duration::from_millis(999)).await;
    settle().await;
    assert_eq!(host.image_loads().len(), 1);

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(host.image_loads().len(), 2);
    assert_eq!(sc.last_error_kind(), Some(ErrorKind::DataLoadFailure));

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(host.image_loads().len(), 2);
    assert_eq!(sc.state(), LifecycleState::Enabled);
    let shown = attached_markup(&host);
    assert_eq!(shown.len(), 1);
    assert!(shown[0].contains("005 - "));
}

#[tokio::test]
async fn test_media_failure_is_self_hosted() {
    let (host, sc) = setup();
    let errors = counter(&sc, "error");
    host.set_media(NodeRef(5), MediaReadiness::Failed);
    sc.show(ShowRequest::new([Target::media(NodeRef(5))]).options(still()))
        .unwrap();
    settle().await;

    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(attached_markup(&host)[0].contains("006 - "));
}

#[tokio::test]
async fn test_pending_media_waits_for_data() {
    let (host, sc) = setup();
    host.set_media(NodeRef(8), MediaReadiness::Pending);
    sc.show(ShowRequest::new([Target::media(NodeRef(8))]).options(still()))
        .unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Busy);

    host.resolve_media(NodeRef(8), Ok(()));
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
}

#[tokio::test]
async fn test_fragment_fetch_uses_selector() {
    let (host, sc) = setup();
    host.set_fragment_result(Ok("<section>intro</section>".into()));
    sc.show(ShowRequest::new([Target::link("docs/page.html#intro")]).options(still()))
        .unwrap();
    settle().await;

    let fetched = host.fragments();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].url, "docs/page.html");
    assert_eq!(fetched[0].selector.as_deref(), Some("intro"));
    assert_eq!(sc.state(), LifecycleState::Enabled);
}

#[tokio::test]
async fn test_video_source_is_synthesized() {
    let (host, sc) = setup();
    sc.show(ShowRequest::new([Target::link("clips/intro.webm")]).options(still()))
        .unwrap();
    settle().await;

    let (_, content) = host.attached().pop().unwrap();
    assert_eq!(
        content,
        Content::Video {
            source: "clips/intro.webm".into(),
            subtype: "webm".into(),
        }
    );
}

// ============================================================================
// Gate
// ============================================================================

#[tokio::test]
async fn test_gate_delays_loading() {
    let (host, sc) = setup();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    sc.show(
        ShowRequest::new([Target::markup("<p/>")])
            .options(still())
            .gate(async move { rx.await.map_err(|_| String::new()) }),
    )
    .unwrap();
    settle().await;
    assert!(host.attached().is_empty());
    assert_eq!(sc.state(), LifecycleState::Busy);

    tx.send(()).unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
}

#[tokio::test]
async fn test_gate_rejection_with_message_alerts() {
    let (host, sc) = setup();
    sc.set_defaults(json!({ "animate": false, "fade": false }).as_object().cloned().unwrap())
        .unwrap();
    sc.show(
        ShowRequest::new([Target::markup("<p/>")])
            .gate(async { Err("Access denied".to_string()) }),
    )
    .unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert!(attached_markup(&host)[0].contains("Access denied"));
}

#[tokio::test]
async fn test_gate_rejection_without_message_closes() {
    let (_host, sc) = setup();
    sc.show(
        ShowRequest::new([Target::markup("<p/>")])
            .options(still())
            .gate(async { Err(String::new()) }),
    )
    .unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Disabled);
}

// ============================================================================
// Defaults, registration and strict mode
// ============================================================================

#[tokio::test]
async fn test_set_defaults_drops_unknown_keys() {
    let (_host, sc) = setup();
    let map = json!({ "width": 500, "colour": "red" });
    sc.set_defaults(map.as_object().cloned().unwrap()).unwrap();

    assert_eq!(sc.last_error_kind(), Some(ErrorKind::InvalidDefaultKey));
    assert!(sc.last_error().contains("\"colour\""));
    assert_eq!(sc.defaults().width, showcase_core::Extent::Px(500.0));

    sc.reset_defaults();
    assert_eq!(sc.defaults(), showcase_core::Options::default());
}

#[tokio::test]
async fn test_config_defaults_applied() {
    let mut config = EngineConfig::default();
    config.defaults = json!({ "expire": 3, "bogus": 1 }).as_object().cloned().unwrap();
    let (_host, sc) = setup_with(config);
    assert_eq!(sc.defaults().expire, 3.0);
    assert_eq!(sc.last_error_kind(), Some(ErrorKind::InvalidDefaultKey));
}

#[tokio::test]
async fn test_unknown_event_registration_ignored() {
    let (_host, sc) = setup();
    assert_eq!(sc.on("explode", |_| {}).unwrap(), None);
    assert_eq!(sc.last_error_kind(), Some(ErrorKind::InvalidEventRegistration));
    assert!(sc.off(Some("explode"), None).is_ok());
}

#[tokio::test]
async fn test_strict_mode_raises() {
    let (host, sc) = setup_with(EngineConfig::default().with_strict(true));
    assert_eq!(
        sc.on("explode", |_| {}).unwrap_err().kind,
        ErrorKind::InvalidEventRegistration
    );

    host.set_image_delay(Duration::from_secs(1));
    sc.show(ShowRequest::new([Target::link("a.png")]).options(still()))
        .unwrap();
    let err = sc
        .show(ShowRequest::new([Target::link("b.png")]))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BusyConflict);
}

#[tokio::test]
async fn test_strict_mode_closes_on_load_failure() {
    let (host, sc) = setup_with(EngineConfig::default().with_strict(true));
    host.set_fragment_result(Err(HostError::Status(404)));
    sc.show(ShowRequest::new([Target::link("missing.html")]).options(still()))
        .unwrap();
    settle().await;

    assert_eq!(sc.state(), LifecycleState::Disabled);
    assert!(attached_markup(&host).is_empty());
    assert_eq!(sc.last_error_kind(), Some(ErrorKind::DataLoadFailure));
}
