#![cfg(all(feature = "physics", not(target_arch = "wasm32")))]

use std::time::{Duration, Instant};

use marble_engine::{
    BodyDef, BodyId, EngineConfig, ExecutorPort, ExecutorThread, Request, Response,
};

const WAIT: Duration = Duration::from_secs(10);

fn next(thread: &ExecutorThread) -> Response {
    thread.recv_timeout(WAIT).expect("executor thread did not answer")
}

#[test]
fn round_trip_over_channels() {
    let mut thread = ExecutorThread::spawn(EngineConfig::default()).unwrap();

    thread.post(Request::Initialize {
        bodies: vec![
            BodyDef::marble(BodyId(1), 0.0, 0.0, 10.0),
            BodyDef::track_block(BodyId(2), -100.0, 100.0, 200.0, 20.0),
        ],
    });
    match next(&thread) {
        Response::Initialize { epoch, bodies } => {
            assert_eq!(epoch, 1);
            assert_eq!((bodies[1].x, bodies[1].y), (0.0, 110.0));
        }
        other => panic!("expected initialize, got {other:?}"),
    }

    thread.post(Request::Update);
    let deadline = Instant::now() + WAIT;
    let frames = loop {
        assert!(Instant::now() < deadline, "no update arrived");
        match next(&thread) {
            Response::Update { epoch: 1, frames } => break frames,
            Response::ClearPreview { .. } | Response::Preview { .. } => continue,
            other => panic!("unexpected response {other:?}"),
        }
    };
    assert_eq!(frames.len(), 20);
    assert!(frames.windows(2).all(|w| w[0].id < w[1].id));
}

#[test]
fn preview_arrives_tagged_with_epoch() {
    let mut config = EngineConfig::default();
    config.preview.budget_few = 600;
    let mut thread = ExecutorThread::spawn(config).unwrap();

    thread.post(Request::Initialize {
        bodies: vec![BodyDef::marble(BodyId(1), 0.0, 0.0, 10.0)],
    });

    let deadline = Instant::now() + WAIT;
    let mut cleared = false;
    loop {
        assert!(Instant::now() < deadline, "preview never arrived");
        match next(&thread) {
            Response::Initialize { .. } => {}
            Response::ClearPreview { epoch } => {
                assert_eq!(epoch, 1);
                cleared = true;
            }
            Response::Preview { epoch, frames } => {
                assert!(cleared, "clear-preview precedes the preview");
                assert_eq!(epoch, 1);
                assert!(!frames.is_empty());
                break;
            }
            other => panic!("unexpected response {other:?}"),
        }
    }
}

#[test]
fn unknown_requests_are_ignored_and_drop_joins() {
    let mut thread = ExecutorThread::spawn(EngineConfig::default()).unwrap();
    let request: Request = serde_json::from_str(r#"{"action":"destroy"}"#).unwrap();
    thread.post(request);
    thread.post(Request::Initialize { bodies: Vec::new() });

    assert!(matches!(next(&thread), Response::Initialize { epoch: 1, .. }));
    assert!(thread.poll().is_empty());
    drop(thread);
}
