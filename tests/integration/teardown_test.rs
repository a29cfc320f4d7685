// Tearing a view down while the pipeline is suspended

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use filigrane::watermark::{ImageFetchError, RenderOutcome, WatermarkOptions, WatermarkView};

use super::test_harness::{solid_image, GatedResolver, StaticResolver, TestHost};

fn eager_options() -> WatermarkOptions {
    WatermarkOptions {
        content: "SECRET".to_string(),
        lazy: false,
        ..Default::default()
    }
}

async fn wait_until_started(resolver: &GatedResolver) {
    while !resolver.started.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_destroy_while_fetch_pending_then_fetch_succeeds() {
    let (resolver, release) = GatedResolver::new();
    let resolver = Arc::new(resolver);
    let test_host = TestHost::new(resolver.clone(), 400.0);
    let view = Arc::new(WatermarkView::new(eager_options(), test_host.host.clone()).unwrap());

    let task = {
        let view = Arc::clone(&view);
        tokio::spawn(async move { view.on_ready().await })
    };

    wait_until_started(&resolver).await;
    assert_eq!(view.state().name(), "loading");

    view.destroy().await;
    release.send(Ok(solid_image(200, 100))).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, RenderOutcome::Abandoned));

    // Nothing was drawn and the destroyed state was not overwritten
    assert_eq!(test_host.surfaces.created.load(Ordering::SeqCst), 0);
    assert!(test_host.surfaces.calls().is_empty());
    assert_eq!(view.state().name(), "destroyed");
    assert!(view.surface().is_none());
}

#[tokio::test]
async fn test_destroy_while_fetch_pending_then_fetch_fails() {
    let (resolver, release) = GatedResolver::new();
    let resolver = Arc::new(resolver);
    let test_host = TestHost::new(resolver.clone(), 400.0);
    let view = Arc::new(WatermarkView::new(eager_options(), test_host.host.clone()).unwrap());

    let task = {
        let view = Arc::clone(&view);
        tokio::spawn(async move { view.on_ready().await })
    };

    wait_until_started(&resolver).await;
    view.destroy().await;
    release
        .send(Err(ImageFetchError::new("bg.png", "connection reset")))
        .unwrap();

    // A late failure is swallowed, not raised
    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, RenderOutcome::Abandoned));
    assert_eq!(view.state().name(), "destroyed");
}

#[tokio::test]
async fn test_dropping_view_abandons_pending_render() {
    let (resolver, release) = GatedResolver::new();
    let resolver = Arc::new(resolver);
    let test_host = TestHost::new(resolver.clone(), 400.0);
    let view = WatermarkView::new(eager_options(), test_host.host.clone()).unwrap();

    let render = async move {
        let outcome = view.on_ready().await;
        drop(view);
        outcome
    };
    let task = tokio::spawn(render);

    wait_until_started(&resolver).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    // The host completing afterwards has nobody to deliver to
    assert!(release.send(Ok(solid_image(10, 10))).is_err());
    assert!(test_host.surfaces.calls().is_empty());
}

#[tokio::test]
async fn test_on_ready_after_destroy_is_noop() {
    let (resolver, _release) = GatedResolver::new();
    let resolver = Arc::new(resolver);
    let test_host = TestHost::new(resolver.clone(), 400.0);
    let view = WatermarkView::new(eager_options(), test_host.host.clone()).unwrap();

    view.destroy().await;
    let outcome = view.on_ready().await.unwrap();
    assert!(matches!(outcome, RenderOutcome::Abandoned));
    assert!(!resolver.started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_destroyed_views_release_their_exports() {
    let test_host = TestHost::new(Arc::new(StaticResolver::new(200, 100)), 400.0);

    for _ in 0..50 {
        let view = WatermarkView::new(eager_options(), test_host.host.clone()).unwrap();
        assert!(matches!(
            view.on_ready().await.unwrap(),
            RenderOutcome::Rendered(_)
        ));
        let artifact = view.request_preview().await.unwrap();
        assert!(test_host
            .host
            .exports
            .cached(artifact.source_surface)
            .await
            .is_some());

        view.destroy().await;
        drop(view);
    }

    assert_eq!(test_host.exporter.conversions.load(Ordering::SeqCst), 50);
    assert_eq!(test_host.host.exports.entry_count().await, 0);
}
