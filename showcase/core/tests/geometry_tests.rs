//! Geometry integration tests
//!
//! Sizing, aspect-ratio scaling, the size cache and transition-driven
//! resizes, observed through the frame limits the host receives.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use showcase_core::geometry::MinOverride;
use showcase_core::test_utils::MockHost;
use showcase_core::{
    Dimension, EngineConfig, Extent, FrameSize, LifecycleState, OptionOverrides, ScaleMode,
    ShowRequest, Showcase, Size, Target, TransitionProperty,
};

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn setup() -> (Arc<MockHost>, Showcase) {
    let host = Arc::new(MockHost::new());
    let showcase = Showcase::new(host.clone(), EngineConfig::default()).unwrap();
    (host, showcase)
}

fn still() -> OptionOverrides {
    OptionOverrides::new().with_animate(false).with_fade(false)
}

#[tokio::test]
async fn test_width_with_auto_height_keeps_ratio() {
    let (host, sc) = setup();
    host.set_natural("wide.png", Size::new(200.0, 50.0));
    sc.show(ShowRequest::new([Target::link("wide.png")]).options(still().with_width(Extent::Px(100.0))))
        .unwrap();
    settle().await;

    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(host.frame(), FrameSize::px(100.0, 25.0));
    let context = sc.scale_context().unwrap();
    assert_eq!(context.mode, ScaleMode::Natural);
    assert_eq!(context.origin, Size::new(200.0, 50.0));
}

#[tokio::test]
async fn test_element_uses_natural_size() {
    let (host, sc) = setup();
    host.set_natural("<div>card</div>", Size::new(420.0, 180.0));
    sc.show(ShowRequest::new([Target::markup("<div>card</div>")]).options(still()))
        .unwrap();
    settle().await;

    assert_eq!(host.frame(), FrameSize::px(420.0, 180.0));
    assert_eq!(sc.scale_context(), None);
}

#[tokio::test]
async fn test_numeric_options_fix_content_extent() {
    let (host, sc) = setup();
    host.set_declared_min(Size::new(100.0, 100.0));
    sc.show(
        ShowRequest::new([Target::markup("<p/>")]).options(
            still()
                .with_width(Extent::Px(5_000.0))
                .with_height(Extent::Px(60.0)),
        ),
    )
    .unwrap();
    settle().await;

    let extents = host.extents();
    assert_eq!(extents.len(), 2);
    assert_eq!(extents[0].1, 1_280.0);
    assert_eq!(extents[0].2, MinOverride::Keep);
    assert_eq!(extents[1].1, 60.0);
    assert_eq!(extents[1].2, MinOverride::Lower(60.0));
    assert_eq!(host.frame(), FrameSize::px(1_280.0, 60.0));
}

#[tokio::test]
async fn test_zero_measurement_fills_container() {
    let (host, sc) = setup();
    host.set_natural("<p>empty</p>", Size::new(0.0, 0.0));
    sc.show(ShowRequest::new([Target::markup("<p>empty</p>")]).options(still()))
        .unwrap();
    settle().await;

    assert_eq!(host.frame(), FrameSize::new(Dimension::Full, Dimension::Full));
}

#[tokio::test]
async fn test_size_cache_skips_second_load() {
    let (host, sc) = setup();
    host.set_natural("cat.jpg", Size::new(300.0, 200.0));
    sc.show(ShowRequest::new([Target::link("cat.jpg")]).options(still()))
        .unwrap();
    settle().await;
    assert_eq!(host.image_loads().len(), 1);
    assert_eq!(sc.cached_size("cat.jpg"), Some(Size::new(300.0, 200.0)));

    sc.close(false);
    sc.show(ShowRequest::new([Target::link("cat.jpg")]).options(still()))
        .unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(host.image_loads().len(), 1);
    assert_eq!(host.frame(), FrameSize::px(300.0, 200.0));
}

#[tokio::test]
async fn test_animated_load_waits_for_transitions() {
    let (host, sc) = setup();
    host.set_natural("<p>grow</p>", Size::new(400.0, 300.0));
    sc.show(
        ShowRequest::new([Target::markup("<p>grow</p>")])
            .options(OptionOverrides::new().with_fade(false)),
    )
    .unwrap();
    settle().await;

    assert_eq!(sc.state(), LifecycleState::Busy);
    assert_eq!(
        sc.pending_transitions(),
        BTreeSet::from([TransitionProperty::MaxWidth, TransitionProperty::MaxHeight])
    );
    assert_eq!(host.frames().last(), Some(&(FrameSize::px(400.0, 300.0), true)));

    assert!(!sc.transition_end(TransitionProperty::MaxWidth));
    assert!(!sc.transition_end(TransitionProperty::Opacity));
    assert!(sc.transition_end(TransitionProperty::MaxHeight));
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert!(sc.pending_transitions().is_empty());
}

#[tokio::test]
async fn test_resize_within_epsilon_is_synchronous() {
    let (host, sc) = setup();
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still()))
        .unwrap();
    settle().await;
    let frame = host.frame();

    let same = sc.begin_resize(frame, true).unwrap();
    assert!(same.is_ready());

    let nudged = sc
        .begin_resize(FrameSize::px(321.5, 241.0), true)
        .unwrap();
    assert!(nudged.is_ready());
    assert!(sc.pending_transitions().is_empty());
    assert!(host.chrome().close);
}

#[tokio::test]
async fn test_animated_resize_hides_and_restores_controls() {
    let (host, sc) = setup();
    let resizes = Arc::new(AtomicUsize::new(0));
    let r = resizes.clone();
    sc.on("resize", move |_| {
        r.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still()))
        .unwrap();
    settle().await;
    let before = resizes.load(Ordering::SeqCst);

    let resizing = sc.clone();
    let task = tokio::spawn(async move { resizing.resize(FrameSize::px(600.0, 240.0), true).await });
    settle().await;

    assert_eq!(
        sc.pending_transitions(),
        BTreeSet::from([TransitionProperty::MaxWidth])
    );
    assert!(!host.chrome().close);
    assert_eq!(resizes.load(Ordering::SeqCst), before + 1);

    assert!(sc.transition_end(TransitionProperty::MaxWidth));
    assert!(task.await.unwrap());
    assert!(host.chrome().close);
}

#[tokio::test]
async fn test_resize_ignored_while_busy() {
    let (host, sc) = setup();
    host.set_image_delay(std::time::Duration::from_secs(5));
    sc.show(ShowRequest::new([Target::link("slow.png")]).options(still()))
        .unwrap();
    settle().await;
    assert!(sc.begin_resize(FrameSize::px(10.0, 10.0), false).is_none());
    assert!(!sc.resize(FrameSize::px(10.0, 10.0), false).await);
}

#[tokio::test]
async fn test_viewport_resize_rescales() {
    let (host, sc) = setup();
    host.set_natural("pano.png", Size::new(200.0, 100.0));
    sc.show(ShowRequest::new([Target::link("pano.png")]).options(still().with_width(Extent::Px(100.0))))
        .unwrap();
    settle().await;
    assert_eq!(host.frame(), FrameSize::px(100.0, 50.0));

    host.set_container(Size::new(80.0, 800.0));
    sc.viewport_resized();
    assert_eq!(host.frame(), FrameSize::px(100.0, 40.0));

    // Repeating the event settles on the same frame
    sc.viewport_resized();
    assert_eq!(host.frame(), FrameSize::px(100.0, 40.0));
}

#[tokio::test]
async fn test_viewport_resize_waits_for_running_load() {
    let (host, sc) = setup();
    let completed = Arc::new(AtomicUsize::new(0));
    let c = completed.clone();
    host.set_natural("pano.png", Size::new(400.0, 200.0));
    sc.show(
        ShowRequest::new([Target::link("pano.png")])
            .options(
                OptionOverrides::new()
                    .with_fade(false)
                    .with_width(Extent::Px(100.0)),
            )
            .on_complete(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
    )
    .unwrap();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Busy);
    let frame = BTreeSet::from([TransitionProperty::MaxWidth, TransitionProperty::MaxHeight]);
    assert_eq!(sc.pending_transitions(), frame);

    sc.viewport_resized();
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Busy);
    assert_eq!(sc.pending_transitions(), frame);
    assert_eq!(completed.load(Ordering::SeqCst), 0);

    sc.transition_end(TransitionProperty::MaxWidth);
    assert!(sc.transition_end(TransitionProperty::MaxHeight));
    settle().await;
    assert_eq!(sc.state(), LifecycleState::Enabled);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(host.frame(), FrameSize::px(100.0, 50.0));
}

#[tokio::test]
async fn test_viewport_resize_ignored_without_scaling() {
    let (host, sc) = setup();
    sc.show(ShowRequest::new([Target::markup("<p/>")]).options(still()))
        .unwrap();
    settle().await;
    let applied = host.frames().len();

    sc.viewport_resized();
    assert_eq!(host.frames().len(), applied);
}
