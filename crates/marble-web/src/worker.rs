//! Worker-side exports. JS owns the `onmessage` loop: each incoming message
//! goes through `executor_handle`, and `executor_pump` is called from a
//! timer for as long as `executor_wake_in` reports pending preview work.

use std::cell::RefCell;

use log::warn;
use marble_engine::bridge::protocol::{decode_request, names_rebuild};
use marble_engine::{EngineConfig, Executor, Response};
use wasm_bindgen::prelude::*;

use crate::runner::to_json_or;

thread_local! {
    static EXECUTOR: RefCell<Option<Executor>> = const { RefCell::new(None) };
}

fn with_executor<R>(f: impl FnOnce(&mut Executor) -> R) -> Option<R> {
    EXECUTOR.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(executor) => Some(f(executor)),
            None => {
                warn!("executor used before executor_init");
                None
            }
        }
    })
}

fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Decode one request, run it and encode the replies as a JSON array.
///
/// A malformed rebuild is answered with an error under a new epoch, so the
/// sender's epoch count stays in step. Other malformed requests are logged
/// and produce no replies.
pub fn handle_json(executor: &mut Executor, request_json: &str, now_ms: f64) -> String {
    let responses = match decode_request(request_json) {
        Ok(request) => executor.handle(request, now_ms),
        Err(err) if names_rebuild(request_json) => vec![executor.reject(err.to_string())],
        Err(err) => {
            warn!("{err}");
            Vec::new()
        }
    };
    encode_responses(&responses)
}

fn encode_responses(responses: &[Response]) -> String {
    to_json_or(&responses, "[]")
}

#[wasm_bindgen]
pub fn executor_init(config_json: &str) {
    crate::init_logging();
    let config = crate::parse_config(config_json);
    EXECUTOR.with(|cell| *cell.borrow_mut() = Some(Executor::new(config)));
    log::info!("marble executor ready");
}

#[wasm_bindgen]
pub fn executor_handle(request_json: &str) -> String {
    let now = now_ms();
    with_executor(|executor| handle_json(executor, request_json, now)).unwrap_or_else(|| "[]".into())
}

#[wasm_bindgen]
pub fn executor_pump() -> String {
    let now = now_ms();
    with_executor(|executor| encode_responses(&executor.pump(now))).unwrap_or_else(|| "[]".into())
}

#[wasm_bindgen]
pub fn executor_has_work() -> bool {
    with_executor(|executor| executor.has_work()).unwrap_or(false)
}

/// Milliseconds until the next pump is useful, or -1 when idle.
#[wasm_bindgen]
pub fn executor_wake_in() -> f64 {
    let now = now_ms();
    with_executor(|executor| executor.wake_in(now))
        .flatten()
        .unwrap_or(-1.0)
}

#[wasm_bindgen]
pub fn executor_epoch() -> f64 {
    with_executor(|executor| executor.epoch() as f64).unwrap_or(0.0)
}

#[wasm_bindgen]
pub fn executor_destroy() {
    EXECUTOR.with(|cell| cell.borrow_mut().take());
}
