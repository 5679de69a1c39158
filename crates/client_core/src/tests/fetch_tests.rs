use super::*;
use shared::domain::SurfacePoint;

use crate::test_support::{pair, RecordingSurface, ScriptedSource, SurfaceEvent};

fn fetch_loop(source: Arc<ScriptedSource>, continuation: ContinuationStyle) -> FetchLoop {
    FetchLoop::new(source, continuation)
}

#[tokio::test]
async fn tiles_render_in_strictly_increasing_order_until_sentinel() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok("QQ=="),
        Ok("Qg=="),
        Ok("Qw=="),
        Ok("_1_2_3_500_2_1e10_fire"),
    ]));
    let surface = RecordingSurface::default();
    let mut episode = Episode::new(1, NavigationIntent::Reset);

    let outcome = fetch_loop(source.clone(), ContinuationStyle::Bare)
        .run(&mut episode, &surface)
        .await;

    assert_eq!(outcome.state(), EpisodeState::Completed);
    assert_eq!(episode.state(), EpisodeState::Completed);
    assert_eq!(episode.tiles_rendered(), 3);
    assert_eq!(episode.requests_sent(), 4);

    let orders: Vec<u32> = surface.tiles().iter().map(|t| t.render_order.0).collect();
    assert_eq!(orders, [1, 3, 5]);
    assert!(orders.windows(2).all(|w| w[0] < w[1]));

    let view = outcome.view().expect("view");
    assert_eq!(view.iterations, "500");
    assert_eq!(view.palette, "fire");
}

#[tokio::test]
async fn intent_is_sent_once_then_continuation_carries_nothing() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok("QQ=="),
        Ok("Qg=="),
        Ok("_1_2_3_500_2_1e10_fire"),
    ]));
    let surface = RecordingSurface::default();
    let mut episode = Episode::new(7, NavigationIntent::Pan(SurfacePoint::new(120, 47)));

    fetch_loop(source.clone(), ContinuationStyle::Bare)
        .run(&mut episode, &surface)
        .await;

    let queries = source.queries();
    assert_eq!(queries.len(), 3);
    assert_eq!(queries[0], [pair("newpt", "120|47")]);
    assert!(queries[1].is_empty());
    assert!(queries[2].is_empty());
}

#[tokio::test]
async fn marker_continuation_sends_ctd() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok("QQ=="),
        Ok("_1_2_3_500_2_1e10_fire"),
    ]));
    let surface = RecordingSurface::default();
    let mut episode = Episode::new(1, NavigationIntent::ZoomIn);

    fetch_loop(source.clone(), ContinuationStyle::Marker)
        .run(&mut episode, &surface)
        .await;

    let queries = source.queries();
    assert_eq!(queries[0], [pair("in", "1")]);
    assert_eq!(queries[1], [pair("ctd", "1")]);
}

#[tokio::test]
async fn empty_first_body_is_a_silent_end() {
    let source = Arc::new(ScriptedSource::new(vec![Ok("")]));
    let surface = RecordingSurface::default();
    let mut episode = Episode::new(1, NavigationIntent::Reset);

    let outcome = fetch_loop(source.clone(), ContinuationStyle::Bare)
        .run(&mut episode, &surface)
        .await;

    assert!(matches!(outcome, EpisodeOutcome::SilentEnd));
    assert_eq!(episode.state(), EpisodeState::SilentEnd);
    assert!(surface.tiles().is_empty());
    assert!(surface.fields().is_empty());
    assert_eq!(surface.diagnostics(), ["no more data"]);
    assert_eq!(source.queries().len(), 1);
}

#[tokio::test]
async fn transport_failure_stops_without_retry() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok("QQ=="),
        Err("connection reset"),
        Ok("Qg=="),
    ]));
    let surface = RecordingSurface::default();
    let mut episode = Episode::new(3, NavigationIntent::ZoomOut);

    let outcome = fetch_loop(source.clone(), ContinuationStyle::Bare)
        .run(&mut episode, &surface)
        .await;

    assert!(matches!(
        outcome,
        EpisodeOutcome::Failed(EpisodeError::Transport(_))
    ));
    assert_eq!(episode.state(), EpisodeState::Failed);
    assert_eq!(surface.tiles().len(), 1);
    assert_eq!(source.queries().len(), 2);
    let diagnostics = surface.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].contains("connection reset"));
}

#[tokio::test]
async fn malformed_sentinel_fails_without_touching_form() {
    let source = Arc::new(ScriptedSource::new(vec![Ok("QQ=="), Ok("_1_2_3")]));
    let surface = RecordingSurface::default();
    let mut episode = Episode::new(1, NavigationIntent::Reset);

    let outcome = fetch_loop(source, ContinuationStyle::Bare)
        .run(&mut episode, &surface)
        .await;

    assert!(matches!(
        outcome,
        EpisodeOutcome::Failed(EpisodeError::Protocol(ProtocolError::MalformedSentinel { .. }))
    ));
    assert!(surface.fields().is_empty());
}

#[tokio::test]
async fn fetch_loop_never_clears_the_surface() {
    let source = Arc::new(ScriptedSource::new(vec![Ok("QQ=="), Ok("Qg==")]));
    let surface = RecordingSurface::default();
    let mut episode = Episode::new(1, NavigationIntent::Reset);

    fetch_loop(source, ContinuationStyle::Bare)
        .run(&mut episode, &surface)
        .await;

    assert!(!surface
        .events()
        .iter()
        .any(|event| matches!(event, SurfaceEvent::Clear)));
}

#[test]
fn fragment_decodes_standard_base64() {
    let tile = TileFragment {
        payload: "aGVsbG8=\n".to_string(),
        render_order: StackingIndex::FIRST,
    };
    assert_eq!(tile.decode().expect("decode"), b"hello");
}
