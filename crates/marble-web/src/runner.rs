use js_sys::Function;
use log::warn;
use marble_engine::bridge::protocol::{decode_response, encode};
use marble_engine::{
    BodyDef, BodyId, EngineConfig, NoteBridge, NoteSettings, NoteSink, NoteTrigger,
    PoseInstance, ProtocolError, QueuePort, Request, Scheduler,
};
use wasm_bindgen::JsValue;

/// Main-thread playback wired to a `postMessage` transport.
///
/// wasm-bindgen cannot export generic structs, so `lib.rs` keeps one runner
/// in a `thread_local!` and exports free functions around it. Requests are
/// collected with [`PlaybackRunner::take_requests`] and posted to the worker
/// by JS; worker replies come back through [`PlaybackRunner::receive`].
pub struct PlaybackRunner {
    scheduler: Scheduler<QueuePort>,
}

impl PlaybackRunner {
    pub fn new(config: EngineConfig, sink: Box<dyn NoteSink>) -> Self {
        let bridge = NoteBridge::new(NoteSettings::default(), sink);
        Self {
            scheduler: Scheduler::new(config, QueuePort::new(), bridge),
        }
    }

    pub fn set_bodies(&mut self, bodies_json: &str) -> Result<(), ProtocolError> {
        let bodies = parse_bodies(bodies_json)?;
        self.scheduler.set_bodies(bodies);
        Ok(())
    }

    pub fn begin_transform(&mut self, bodies_json: &str) -> Result<(), ProtocolError> {
        let bodies = parse_bodies(bodies_json)?;
        self.scheduler.begin_transform(bodies);
        Ok(())
    }

    pub fn end_transform(&mut self, bodies_json: &str) -> Result<(), ProtocolError> {
        let bodies = parse_bodies(bodies_json)?;
        self.scheduler.end_transform(bodies);
        Ok(())
    }

    pub fn set_note_defaults(&mut self, settings_json: &str) -> Result<(), ProtocolError> {
        let settings: NoteSettings = serde_json::from_str(settings_json)?;
        self.scheduler.set_note_defaults(settings);
        Ok(())
    }

    pub fn play(&mut self) {
        self.scheduler.play();
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn toggle(&mut self) {
        self.scheduler.toggle();
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn tick(&mut self, dt: f32) {
        self.scheduler.tick(dt);
    }

    /// Queue one worker reply for the next tick.
    pub fn receive(&mut self, response_json: &str) -> Result<(), ProtocolError> {
        let response = decode_response(response_json)?;
        self.scheduler.port_mut().deliver(response);
        Ok(())
    }

    /// JSON array of requests to post to the worker.
    pub fn take_requests(&mut self) -> String {
        let requests: Vec<Request> = self.scheduler.port_mut().take_outgoing();
        to_json_or(&requests, "[]")
    }

    /// JSON array of playback events since the last call.
    pub fn take_events(&mut self) -> String {
        to_json_or(&self.scheduler.take_events(), "[]")
    }

    pub fn preview_json(&self) -> String {
        to_json_or(&self.scheduler.preview(), "null")
    }

    pub fn layout_json(&self) -> String {
        to_json_or(&self.scheduler.layout(), "[]")
    }

    pub fn state_json(&self) -> String {
        to_json_or(&self.scheduler.state(), "null")
    }

    pub fn audition(&mut self, id: u32) -> bool {
        self.scheduler.audition(BodyId(id)).is_some()
    }

    // ---- Pose buffer ----

    pub fn poses_ptr(&self) -> *const u8 {
        self.scheduler.poses().as_ptr()
    }

    /// Number of `PoseInstance` records behind `poses_ptr`.
    pub fn poses_len(&self) -> u32 {
        self.scheduler.poses().len() as u32
    }

    pub fn poses_stride(&self) -> u32 {
        PoseInstance::STRIDE_BYTES as u32
    }

    pub fn poses_version(&self) -> f64 {
        self.scheduler.poses().version() as f64
    }

    pub fn camera_x(&self) -> f32 {
        self.scheduler.camera().center.x
    }

    pub fn camera_y(&self) -> f32 {
        self.scheduler.camera().center.y
    }

    pub fn scheduler(&self) -> &Scheduler<QueuePort> {
        &self.scheduler
    }
}

/// Audio layer implemented by two JS callbacks, each receiving the
/// resolved trigger as a JSON string.
pub struct JsNoteSink {
    on_note: Function,
    on_preview_note: Function,
}

impl JsNoteSink {
    pub fn new(on_note: Function, on_preview_note: Function) -> Self {
        Self {
            on_note,
            on_preview_note,
        }
    }

    fn call(callback: &Function, trigger: &NoteTrigger) {
        let payload = to_json_or(trigger, "null");
        if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(&payload)) {
            warn!("note callback threw: {err:?}");
        }
    }
}

impl NoteSink for JsNoteSink {
    fn play_note(&mut self, trigger: &NoteTrigger) {
        Self::call(&self.on_note, trigger);
    }

    fn play_preview_note(&mut self, trigger: &NoteTrigger) {
        Self::call(&self.on_preview_note, trigger);
    }
}

fn parse_bodies(json: &str) -> Result<Vec<BodyDef>, ProtocolError> {
    Ok(serde_json::from_str(json)?)
}

pub(crate) fn to_json_or<T: serde::Serialize>(value: &T, fallback: &str) -> String {
    encode(value).unwrap_or_else(|err| {
        warn!("{err}");
        fallback.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use marble_engine::Silent;

    const BODIES: &str = r#"[
        {"id": 1, "kind": "marble", "x": 0, "y": 0, "radius": 10, "cameraTracking": true},
        {"id": 2, "kind": "note-block", "x": -25, "y": 100, "width": 50, "height": 10}
    ]"#;

    fn runner() -> PlaybackRunner {
        PlaybackRunner::new(EngineConfig::default(), Box::new(Silent))
    }

    #[test]
    fn layout_changes_become_requests() {
        let mut runner = runner();
        runner.set_bodies(BODIES).unwrap();
        let requests: serde_json::Value = serde_json::from_str(&runner.take_requests()).unwrap();
        assert_eq!(requests[0]["action"], "initialize");
        assert_eq!(requests[0]["bodies"][1]["kind"], "note-block");
        assert_eq!(runner.take_requests(), "[]");
    }

    #[test]
    fn malformed_layout_is_an_error() {
        let mut runner = runner();
        assert!(runner.set_bodies("[{\"id\": 1}]").is_err());
        assert!(runner.receive("not json").is_err());
        assert_eq!(runner.take_requests(), "[]");
    }

    #[test]
    fn replies_drive_playback() {
        let mut runner = runner();
        runner.set_bodies(BODIES).unwrap();
        runner.take_requests();

        runner
            .receive(r#"{"action":"initialize","epoch":1,"bodies":[{"id":1,"kind":"marble","x":0,"y":0,"radius":10,"cameraTracking":true}]}"#)
            .unwrap();
        runner.tick(0.0);
        assert_eq!(runner.poses_len(), 1);

        runner.play();
        runner.tick(0.0);
        let requests = runner.take_requests();
        assert_eq!(requests, r#"[{"action":"update"}]"#);

        runner
            .receive(r#"{"action":"update","epoch":1,"frames":[{"id":0,"bodies":[{"id":1,"x":0,"y":30,"rotation":0}],"terminal":false,"notes":[],"noteTriggered":false,"noteConsumed":false}]}"#)
            .unwrap();
        runner.tick(1.0 / 60.0);
        assert_eq!(runner.camera_y(), 30.0);

        let events: serde_json::Value = serde_json::from_str(&runner.take_events()).unwrap();
        assert_eq!(events[0]["event"], "layout-ready");
        assert_eq!(events[1]["event"], "started");
        assert_eq!(runner.state_json(), r#""playing""#);
    }

    #[test]
    fn audition_only_for_note_blocks() {
        let mut runner = runner();
        runner.set_bodies(BODIES).unwrap();
        assert!(runner.audition(2));
        assert!(!runner.audition(1));
        assert_eq!(runner.preview_json(), "null");
    }
}
