//! WASM exports for the marble-track core.
//!
//! Two independent instances live in two JS contexts:
//! - the worker calls the `executor_*` functions (see [`worker`]);
//! - the main thread calls the `playback_*` functions below and shuttles
//!   the JSON strings between the two with `postMessage`.

use std::cell::RefCell;

use log::warn;
use marble_engine::EngineConfig;
use wasm_bindgen::prelude::*;

pub mod runner;
#[cfg(feature = "physics")]
pub mod worker;

pub use runner::{JsNoteSink, PlaybackRunner};

thread_local! {
    static RUNNER: RefCell<Option<PlaybackRunner>> = const { RefCell::new(None) };
}

pub(crate) fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Empty input means defaults; a bad config is logged and replaced by defaults.
pub(crate) fn parse_config(config_json: &str) -> EngineConfig {
    if config_json.trim().is_empty() {
        return EngineConfig::default();
    }
    EngineConfig::from_json(config_json).unwrap_or_else(|err| {
        warn!("invalid engine config, using defaults: {err}");
        EngineConfig::default()
    })
}

fn with_runner<R>(f: impl FnOnce(&mut PlaybackRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                warn!("playback used before playback_init");
                None
            }
        }
    })
}

/// Log and swallow a failed JSON input; returns whether it was applied.
fn report<E: std::fmt::Display>(result: Option<Result<(), E>>) -> bool {
    match result {
        Some(Ok(())) => true,
        Some(Err(err)) => {
            warn!("{err}");
            false
        }
        None => false,
    }
}

#[wasm_bindgen]
pub fn playback_init(config_json: &str, on_note: js_sys::Function, on_preview_note: js_sys::Function) {
    init_logging();
    let config = parse_config(config_json);
    let sink = Box::new(JsNoteSink::new(on_note, on_preview_note));
    RUNNER.with(|cell| *cell.borrow_mut() = Some(PlaybackRunner::new(config, sink)));
    log::info!("marble playback ready");
}

#[wasm_bindgen]
pub fn playback_set_bodies(bodies_json: &str) -> bool {
    report(with_runner(|r| r.set_bodies(bodies_json)))
}

#[wasm_bindgen]
pub fn playback_begin_transform(bodies_json: &str) -> bool {
    report(with_runner(|r| r.begin_transform(bodies_json)))
}

#[wasm_bindgen]
pub fn playback_end_transform(bodies_json: &str) -> bool {
    report(with_runner(|r| r.end_transform(bodies_json)))
}

#[wasm_bindgen]
pub fn playback_set_note_defaults(settings_json: &str) -> bool {
    report(with_runner(|r| r.set_note_defaults(settings_json)))
}

#[wasm_bindgen]
pub fn playback_receive(response_json: &str) -> bool {
    report(with_runner(|r| r.receive(response_json)))
}

#[wasm_bindgen]
pub fn playback_play() {
    with_runner(|r| r.play());
}

#[wasm_bindgen]
pub fn playback_pause() {
    with_runner(|r| r.pause());
}

#[wasm_bindgen]
pub fn playback_toggle() {
    with_runner(|r| r.toggle());
}

#[wasm_bindgen]
pub fn playback_stop() {
    with_runner(|r| r.stop());
}

/// One `requestAnimationFrame` callback, `dt` seconds after the last.
#[wasm_bindgen]
pub fn playback_tick(dt: f32) {
    with_runner(|r| r.tick(dt));
}

#[wasm_bindgen]
pub fn playback_take_requests() -> String {
    with_runner(|r| r.take_requests()).unwrap_or_else(|| "[]".into())
}

#[wasm_bindgen]
pub fn playback_take_events() -> String {
    with_runner(|r| r.take_events()).unwrap_or_else(|| "[]".into())
}

#[wasm_bindgen]
pub fn playback_preview_json() -> String {
    with_runner(|r| r.preview_json()).unwrap_or_else(|| "null".into())
}

#[wasm_bindgen]
pub fn playback_layout_json() -> String {
    with_runner(|r| r.layout_json()).unwrap_or_else(|| "[]".into())
}

#[wasm_bindgen]
pub fn playback_state() -> String {
    with_runner(|r| r.state_json()).unwrap_or_else(|| "null".into())
}

#[wasm_bindgen]
pub fn playback_audition(id: u32) -> bool {
    with_runner(|r| r.audition(id)).unwrap_or(false)
}

// ---- Pose buffer (read from wasm memory by JS) ----

#[wasm_bindgen]
pub fn playback_poses_ptr() -> *const u8 {
    with_runner(|r| r.poses_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn playback_poses_len() -> u32 {
    with_runner(|r| r.poses_len()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn playback_poses_stride() -> u32 {
    with_runner(|r| r.poses_stride()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn playback_poses_version() -> f64 {
    with_runner(|r| r.poses_version()).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn playback_camera_x() -> f32 {
    with_runner(|r| r.camera_x()).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn playback_camera_y() -> f32 {
    with_runner(|r| r.camera_y()).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn playback_destroy() {
    RUNNER.with(|cell| cell.borrow_mut().take());
}
