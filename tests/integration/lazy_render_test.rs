// Lazy (visibility-gated) rendering

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;

use filigrane::watermark::{
    ChannelVisibility, IntersectionEvent, RenderOutcome, VisibilityObserver, WatermarkError,
    WatermarkOptions, WatermarkView,
};

use super::test_harness::{FailingResolver, StaticResolver, TestHost};

fn lazy_options() -> WatermarkOptions {
    WatermarkOptions {
        content: "SECRET".to_string(),
        lazy: true,
        ..Default::default()
    }
}

async fn wait_for_observer(visibility: &ChannelVisibility, element: &str) {
    while visibility.observer_count(element) == 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_renders_once_on_first_intersection() {
    let resolver = Arc::new(StaticResolver::new(200, 100));
    let visibility = Arc::new(ChannelVisibility::new());
    let test_host = TestHost::with_visibility(resolver.clone(), 400.0, visibility.clone());
    let view = Arc::new(WatermarkView::new(lazy_options(), test_host.host.clone()).unwrap());
    let element = view.image_element().to_string();

    let task = {
        let view = Arc::clone(&view);
        tokio::spawn(async move { view.on_ready().await })
    };

    wait_for_observer(&visibility, &element).await;
    assert_eq!(view.state().name(), "observing");
    assert_eq!(view.display_url(), Some(view.options().lazy_image_url.as_str()));

    // Out of view: nothing happens
    visibility.push(&element, 0.0);
    tokio::task::yield_now().await;
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

    // Toggle in and out several times
    visibility.push(&element, 0.25);
    visibility.push(&element, 0.0);
    visibility.push(&element, 1.0);

    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, RenderOutcome::Rendered(_)));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(test_host.surfaces.created.load(Ordering::SeqCst), 1);

    // Observation is over; later intersections reach nobody
    assert_eq!(visibility.observer_count(&element), 0);
    assert_eq!(visibility.push(&element, 1.0), 0);
    assert_eq!(view.display_url(), None);
}

#[tokio::test]
async fn test_failed_lazy_render_is_not_retried() {
    let resolver = Arc::new(FailingResolver::default());
    let visibility = Arc::new(ChannelVisibility::new());
    let test_host = TestHost::with_visibility(resolver.clone(), 400.0, visibility.clone());
    let view = Arc::new(WatermarkView::new(lazy_options(), test_host.host.clone()).unwrap());
    let element = view.image_element().to_string();

    let task = {
        let view = Arc::clone(&view);
        tokio::spawn(async move { view.on_ready().await })
    };

    wait_for_observer(&visibility, &element).await;
    visibility.push(&element, 0.5);

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, WatermarkError::ImageFetch(_)));
    assert_eq!(view.state().name(), "failed");
    // Loading indicator stays up
    assert!(view.display_url().is_some());

    // The trigger does not re-arm
    assert_eq!(visibility.push(&element, 1.0), 0);
    assert!(matches!(
        view.on_ready().await.unwrap(),
        RenderOutcome::AlreadyStarted
    ));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}

struct ClosedObserver;

impl VisibilityObserver for ClosedObserver {
    fn observe(&self, _target: &str) -> mpsc::UnboundedReceiver<IntersectionEvent> {
        let (_tx, rx) = mpsc::unbounded_channel();
        rx
    }
}

#[tokio::test]
async fn test_observer_gone_before_visible() {
    let resolver = Arc::new(StaticResolver::new(200, 100));
    let test_host = TestHost::with_visibility(resolver.clone(), 400.0, Arc::new(ClosedObserver));
    let view = WatermarkView::new(lazy_options(), test_host.host.clone()).unwrap();

    let outcome = view.on_ready().await.unwrap();
    assert!(matches!(outcome, RenderOutcome::NotVisible));
    assert_eq!(view.state().name(), "idle");
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    assert!(test_host.surfaces.calls().is_empty());
}
