use std::collections::VecDeque;

use log::{debug, info, warn};
use serde::Serialize;

use crate::api::config::EngineConfig;
use crate::api::types::{BodyId, Epoch, Pose};
use crate::audio::notes::{NoteBridge, NoteSettings, NoteTrigger};
use crate::bridge::port::ExecutorPort;
use crate::bridge::protocol::{Frame, FrameBody, PreviewHorizon, Request, Response};
use crate::components::body::{Body, BodyDef};
use crate::core::time::FramePacer;
use crate::playback::interpolate::lerp_pose;
use crate::renderer::camera::Camera2D;
use crate::renderer::instance::{PoseBuffer, PoseInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// A terminal frame was consumed.
    Settled,
    /// The user pressed stop.
    User,
    /// The layout changed during playback.
    Edited,
}

/// Notifications for the UI, drained with [`Scheduler::take_events`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PlaybackEvent {
    Started,
    Paused,
    Stopped { reason: StopReason },
    /// Canonical positions of the current layout arrived.
    LayoutReady,
    PreviewReady,
    PreviewCleared,
    /// The executor refused the last layout.
    Rejected { message: String },
}

/// Render-thread side of playback.
///
/// Requests frame batches from the executor, paces their consumption
/// against render time, interpolates poses between them and forwards note
/// strikes to the audio bridge. At most one update request is in flight.
pub struct Scheduler<P: ExecutorPort> {
    config: EngineConfig,
    port: P,
    bridge: NoteBridge,
    state: PlaybackState,
    /// Mirror of the executor's epoch: bumped for every rebuild we send.
    epoch: Epoch,
    /// Pre-playback layout as supplied by the render surface.
    definitions: Vec<BodyDef>,
    /// Canonical layout from the last accepted initialize.
    layout: Vec<BodyDef>,
    unrendered: VecDeque<Frame>,
    rendered: Vec<FrameBody>,
    pacer: FramePacer,
    busy: bool,
    /// A terminal frame is buffered; request nothing more this run.
    settled: bool,
    last_frame_id: Option<u64>,
    poses: PoseBuffer,
    camera: Camera2D,
    tracked: Option<BodyId>,
    preview: Option<PreviewHorizon>,
    transforming: bool,
    events: Vec<PlaybackEvent>,
}

impl<P: ExecutorPort> Scheduler<P> {
    pub fn new(config: EngineConfig, port: P, bridge: NoteBridge) -> Self {
        let mut camera = Camera2D::new(config.playback.viewport);
        camera.set_smoothing(config.playback.camera_smoothing);
        camera.set_bounds(config.physics.bounds);
        Self {
            pacer: FramePacer::new(config.physics.tick_duration),
            config,
            port,
            bridge,
            state: PlaybackState::Stopped,
            epoch: 0,
            definitions: Vec::new(),
            layout: Vec::new(),
            unrendered: VecDeque::new(),
            rendered: Vec::new(),
            busy: false,
            settled: false,
            last_frame_id: None,
            poses: PoseBuffer::new(),
            camera,
            tracked: None,
            preview: None,
            transforming: false,
            events: Vec::new(),
        }
    }

    // -- Layout --

    /// New layout from the render surface. Stops playback first.
    ///
    /// A layout the executor would refuse, or could not even decode, is
    /// rejected here: nothing is sent and the epoch is unchanged.
    pub fn set_bodies(&mut self, bodies: Vec<BodyDef>) {
        if !self.validate(&bodies) {
            return;
        }
        self.halt(StopReason::Edited);
        self.definitions = bodies;
        let bodies = self.definitions.clone();
        if self.transforming {
            self.rebuild(Request::DisablePreview { bodies });
        } else {
            self.rebuild(Request::Initialize { bodies });
        }
    }

    /// A drag or rotate started: rebuild with previews suppressed.
    pub fn begin_transform(&mut self, bodies: Vec<BodyDef>) {
        if !self.validate(&bodies) {
            return;
        }
        self.halt(StopReason::Edited);
        self.transforming = true;
        self.definitions = bodies;
        let bodies = self.definitions.clone();
        self.rebuild(Request::DisablePreview { bodies });
    }

    /// The transform finished: rebuild and allow previews again.
    pub fn end_transform(&mut self, bodies: Vec<BodyDef>) {
        if !self.validate(&bodies) {
            return;
        }
        self.halt(StopReason::Edited);
        self.transforming = false;
        self.definitions = bodies;
        let bodies = self.definitions.clone();
        self.rebuild(Request::EnablePreview { bodies });
    }

    /// Ask for the preview to be recomputed without touching the world.
    pub fn refresh_preview(&mut self) {
        self.port.post(Request::RequestPreviewRefresh);
    }

    // -- Controls --

    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Playing => return,
            PlaybackState::Stopped => {
                self.unrendered.clear();
                self.pacer.reset();
                self.settled = false;
                self.last_frame_id = None;
                self.rendered = layout_poses(&self.layout);
            }
            PlaybackState::Paused => {}
        }
        info!("playback started (epoch {})", self.epoch);
        self.state = PlaybackState::Playing;
        self.events.push(PlaybackEvent::Started);
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            self.events.push(PlaybackEvent::Paused);
        }
    }

    pub fn toggle(&mut self) {
        if self.state == PlaybackState::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop and reset the world. Does nothing when already stopped.
    pub fn stop(&mut self) {
        self.halt(StopReason::User);
    }

    // -- Render loop --

    /// One render callback, `dt` seconds after the previous one.
    pub fn tick(&mut self, dt: f32) {
        for response in self.port.poll() {
            self.receive(response);
        }
        if self.state != PlaybackState::Playing {
            return;
        }

        if self.unrendered.len() < self.config.playback.low_water_mark && !self.busy && !self.settled {
            self.port.post(Request::Update);
            self.busy = true;
        }

        let advance = self.pacer.advance(dt, self.unrendered.len());
        for _ in 0..advance.exhausted {
            let Some(frame) = self.unrendered.pop_front() else {
                break;
            };
            self.consume(frame);
            if self.state != PlaybackState::Playing {
                return;
            }
        }

        self.interpolate(advance.progress);
        self.publish();
        if let Some(target) = self.tracked.and_then(|id| self.pose_of(id)) {
            self.camera.follow(target, dt);
        }
    }

    /// Apply one executor response.
    pub fn receive(&mut self, response: Response) {
        let epoch = response.epoch();
        if epoch != self.epoch {
            debug!(
                "dropping stale {} response (epoch {epoch}, now {})",
                action(&response),
                self.epoch
            );
            if matches!(response, Response::Update { .. }) {
                self.busy = false;
            }
            return;
        }

        match response {
            Response::Initialize { bodies, .. } => {
                self.layout = bodies;
                self.tracked = self.layout.iter().find(|d| d.camera_tracking).map(|d| d.id);
                if self.state == PlaybackState::Stopped {
                    self.show_layout();
                }
                if !self.transforming && self.preview.take().is_some() {
                    self.events.push(PlaybackEvent::PreviewCleared);
                }
                self.events.push(PlaybackEvent::LayoutReady);
            }
            Response::Error { message, .. } => {
                warn!("layout rejected: {message}");
                self.events.push(PlaybackEvent::Rejected { message });
            }
            Response::Update { frames, .. } => {
                self.busy = false;
                if self.state == PlaybackState::Stopped {
                    return;
                }
                self.enqueue(frames);
            }
            Response::Preview { epoch, frames } => {
                self.preview = Some(PreviewHorizon { epoch, frames });
                self.events.push(PlaybackEvent::PreviewReady);
            }
            Response::ClearPreview { .. } => {
                self.preview = None;
                self.events.push(PlaybackEvent::PreviewCleared);
            }
        }
    }

    // -- Audio --

    /// Play a note block's note outside playback.
    pub fn audition(&mut self, id: BodyId) -> Option<NoteTrigger> {
        let def = self.definitions.iter().find(|d| d.id == id)?;
        self.bridge.audition(def)
    }

    pub fn set_note_defaults(&mut self, defaults: NoteSettings) {
        self.bridge.set_defaults(defaults);
    }

    // -- Accessors --

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Frames received but not yet shown.
    pub fn buffered(&self) -> usize {
        self.unrendered.len()
    }

    pub fn poses(&self) -> &PoseBuffer {
        &self.poses
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn preview(&self) -> Option<&PreviewHorizon> {
        self.preview.as_ref()
    }

    pub fn layout(&self) -> &[BodyDef] {
        &self.layout
    }

    pub fn definitions(&self) -> &[BodyDef] {
        &self.definitions
    }

    pub fn take_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    // -- private helpers --

    fn validate(&mut self, bodies: &[BodyDef]) -> bool {
        match Body::from_defs(bodies) {
            Ok(_) => true,
            Err(err) => {
                warn!("layout not sent: {err}");
                self.events.push(PlaybackEvent::Rejected {
                    message: err.to_string(),
                });
                false
            }
        }
    }

    fn rebuild(&mut self, request: Request) {
        debug_assert!(request.rebuilds());
        self.epoch += 1;
        self.port.post(request);
    }

    /// Leave playback. A settled or user stop resets the world to the
    /// pre-playback layout; an edit sends its own rebuild.
    fn halt(&mut self, reason: StopReason) {
        if self.state == PlaybackState::Stopped {
            return;
        }
        info!("playback stopped: {reason:?}");
        self.state = PlaybackState::Stopped;
        self.unrendered.clear();
        self.pacer.reset();
        self.settled = false;
        self.events.push(PlaybackEvent::Stopped { reason });
        if reason != StopReason::Edited {
            let bodies = self.definitions.clone();
            self.rebuild(Request::Initialize { bodies });
        }
    }

    fn enqueue(&mut self, frames: Vec<Frame>) {
        for frame in frames {
            if self.settled || self.last_frame_id.is_some_and(|last| frame.id <= last) {
                warn!("discarding out-of-order frame {} (last {:?})", frame.id, self.last_frame_id);
                continue;
            }
            self.last_frame_id = Some(frame.id);
            self.settled = frame.terminal;
            self.unrendered.push_back(frame);
        }
    }

    fn consume(&mut self, mut frame: Frame) {
        self.rendered = std::mem::take(&mut frame.bodies);

        if frame.has_unconsumed_note() {
            frame.note_consumed = true;
            for id in &frame.notes {
                match self.definitions.iter().find(|d| d.id == *id) {
                    Some(def) => {
                        self.bridge.trigger(def);
                    }
                    None => debug!("struck note {id} is not in the layout"),
                }
            }
        }

        if frame.terminal {
            self.publish();
            self.halt(StopReason::Settled);
        }
    }

    fn interpolate(&mut self, progress: f32) {
        let Some(head) = self.unrendered.front() else {
            return;
        };
        let rendered = &self.rendered;
        let next: Vec<FrameBody> = head
            .bodies
            .iter()
            .map(|target| {
                let from = rendered
                    .iter()
                    .find(|b| b.id == target.id)
                    .map_or(target.pose(), FrameBody::pose);
                FrameBody::new(target.id, lerp_pose(from, target.pose(), progress))
            })
            .collect();
        self.rendered = next;
    }

    fn show_layout(&mut self) {
        self.rendered = layout_poses(&self.layout);
        self.publish();
    }

    fn publish(&mut self) {
        self.poses
            .publish(self.rendered.iter().map(|b| PoseInstance::new(b.id, b.pose())));
    }

    fn pose_of(&self, id: BodyId) -> Option<glam::Vec2> {
        self.rendered
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.pose().position())
    }
}

/// Canonical definitions carry center-origin poses.
fn layout_poses(layout: &[BodyDef]) -> Vec<FrameBody> {
    layout
        .iter()
        .map(|def| FrameBody::new(def.id, Pose::new(def.x, def.y, def.rotation)))
        .collect()
}

fn action(response: &Response) -> &'static str {
    match response {
        Response::Initialize { .. } => "initialize",
        Response::Preview { .. } => "preview",
        Response::ClearPreview { .. } => "clear-preview",
        Response::Update { .. } => "update",
        Response::Error { .. } => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::notes::NoteSink;
    use crate::bridge::port::QueuePort;
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f32 = 1.0 / 60.0;
    const MARBLE: BodyId = BodyId(1);
    const NOTE: BodyId = BodyId(2);

    #[derive(Default, Clone)]
    struct Heard(Rc<RefCell<Vec<BodyId>>>);

    impl NoteSink for Heard {
        fn play_note(&mut self, trigger: &NoteTrigger) {
            self.0.borrow_mut().push(trigger.body);
        }

        fn play_preview_note(&mut self, _trigger: &NoteTrigger) {}
    }

    fn layout() -> Vec<BodyDef> {
        vec![
            BodyDef::marble(MARBLE, 0.0, 0.0, 10.0).with_camera_tracking(true),
            BodyDef::note_block(NOTE, 0.0, 100.0, 50.0, 10.0),
        ]
    }

    fn frame(id: u64, y: f32) -> Frame {
        Frame {
            id,
            bodies: vec![FrameBody::new(MARBLE, Pose::new(0.0, y, 0.0))],
            ..Frame::default()
        }
    }

    fn note_frame(id: u64, y: f32) -> Frame {
        Frame {
            notes: vec![NOTE],
            note_triggered: true,
            ..frame(id, y)
        }
    }

    fn marble_y(scheduler: &Scheduler<QueuePort>) -> f32 {
        scheduler.poses().get(MARBLE).map(|p| p.y).unwrap_or(f32::NAN)
    }

    /// A scheduler with an accepted layout, playing, one update in flight.
    fn playing() -> (Scheduler<QueuePort>, Heard) {
        let heard = Heard::default();
        let bridge = NoteBridge::new(NoteSettings::default(), Box::new(heard.clone()));
        let mut scheduler = Scheduler::new(EngineConfig::default(), QueuePort::new(), bridge);
        scheduler.set_bodies(layout());
        scheduler.receive(Response::Initialize { epoch: 1, bodies: layout() });
        scheduler.play();
        scheduler.tick(0.0);
        scheduler.take_events();
        (scheduler, heard)
    }

    fn deliver(scheduler: &mut Scheduler<QueuePort>, epoch: Epoch, frames: Vec<Frame>) {
        scheduler.port_mut().deliver(Response::Update { epoch, frames });
    }

    #[test]
    fn only_one_update_in_flight() {
        let (mut scheduler, _) = playing();
        let sent = scheduler.port_mut().take_outgoing();
        assert_eq!(sent.len(), 2, "initialize then one update");
        assert_eq!(sent[1], Request::Update);
        assert!(scheduler.is_busy());

        scheduler.tick(DT);
        scheduler.tick(DT);
        assert!(scheduler.port_mut().take_outgoing().is_empty());

        deliver(&mut scheduler, 1, (0..5).map(|i| frame(i, i as f32)).collect());
        scheduler.tick(0.0);
        assert_eq!(scheduler.buffered(), 5);
        assert_eq!(scheduler.port_mut().take_outgoing(), vec![Request::Update]);
    }

    #[test]
    fn interpolates_toward_head_then_consumes() {
        let (mut scheduler, _) = playing();
        deliver(&mut scheduler, 1, vec![frame(0, 10.0), frame(1, 20.0)]);

        scheduler.tick(DT / 2.0);
        assert_eq!(marble_y(&scheduler), 5.0);
        assert_eq!(scheduler.buffered(), 2);

        scheduler.tick(DT / 2.0);
        assert_eq!(marble_y(&scheduler), 10.0);
        assert_eq!(scheduler.buffered(), 1);
    }

    #[test]
    fn note_frame_triggers_exactly_once() {
        let (mut scheduler, heard) = playing();
        deliver(&mut scheduler, 1, vec![frame(0, 1.0), note_frame(1, 2.0)]);
        scheduler.tick(DT);
        scheduler.tick(DT);
        assert_eq!(*heard.0.borrow(), vec![NOTE]);

        // A redelivered frame is discarded, not replayed.
        deliver(&mut scheduler, 1, vec![note_frame(1, 2.0), frame(2, 3.0)]);
        scheduler.tick(DT);
        scheduler.tick(DT);
        assert_eq!(*heard.0.borrow(), vec![NOTE]);
        assert_eq!(marble_y(&scheduler), 3.0);
    }

    #[test]
    fn terminal_frame_stops_exactly_once() {
        let (mut scheduler, _) = playing();
        scheduler.port_mut().take_outgoing();
        let mut last = frame(1, 2.0);
        last.terminal = true;
        deliver(&mut scheduler, 1, vec![frame(0, 1.0), last]);

        for _ in 0..4 {
            scheduler.tick(DT);
        }
        assert_eq!(scheduler.state(), PlaybackState::Stopped);
        assert_eq!(
            scheduler.take_events(),
            vec![PlaybackEvent::Stopped { reason: StopReason::Settled }]
        );
        assert_eq!(marble_y(&scheduler), 2.0);
        assert_eq!(scheduler.epoch(), 2);
        assert_eq!(
            scheduler.port_mut().take_outgoing(),
            vec![Request::Initialize { bodies: layout() }]
        );

        // Late frames from the finished run change nothing.
        let version = scheduler.poses().version();
        deliver(&mut scheduler, 1, vec![frame(2, 50.0)]);
        scheduler.tick(DT);
        scheduler.stop();
        assert_eq!(scheduler.poses().version(), version);
        assert!(scheduler.take_events().is_empty());
        assert!(scheduler.port_mut().take_outgoing().is_empty());
    }

    #[test]
    fn no_requests_after_terminal_is_buffered() {
        let (mut scheduler, _) = playing();
        scheduler.port_mut().take_outgoing();
        let mut last = frame(0, 1.0);
        last.terminal = true;
        deliver(&mut scheduler, 1, vec![last]);

        scheduler.tick(0.0);
        assert!(!scheduler.is_busy());
        assert!(scheduler.port_mut().take_outgoing().is_empty());
    }

    #[test]
    fn user_stop_resets_world_once() {
        let (mut scheduler, _) = playing();
        scheduler.port_mut().take_outgoing();

        scheduler.stop();
        scheduler.stop();
        assert_eq!(
            scheduler.take_events(),
            vec![PlaybackEvent::Stopped { reason: StopReason::User }]
        );
        assert_eq!(
            scheduler.port_mut().take_outgoing(),
            vec![Request::Initialize { bodies: layout() }]
        );

        // The reply to the update sent before the stop is stale but frees the slot.
        deliver(&mut scheduler, 1, vec![frame(0, 1.0)]);
        scheduler.tick(DT);
        assert!(!scheduler.is_busy());
        assert_eq!(scheduler.buffered(), 0);
    }

    #[test]
    fn pause_keeps_buffer_and_resumes() {
        let (mut scheduler, _) = playing();
        deliver(&mut scheduler, 1, vec![frame(0, 1.0), frame(1, 2.0)]);
        scheduler.pause();
        scheduler.tick(DT);
        assert_eq!(scheduler.buffered(), 2);

        scheduler.toggle();
        scheduler.tick(DT);
        assert_eq!(scheduler.buffered(), 1);
        assert_eq!(
            scheduler.take_events(),
            vec![PlaybackEvent::Paused, PlaybackEvent::Started]
        );
    }

    #[test]
    fn editing_while_playing_stops_then_rebuilds() {
        let (mut scheduler, _) = playing();
        scheduler.port_mut().take_outgoing();

        let edited = vec![BodyDef::marble(MARBLE, 5.0, 0.0, 10.0)];
        scheduler.set_bodies(edited.clone());
        assert_eq!(scheduler.state(), PlaybackState::Stopped);
        assert_eq!(
            scheduler.take_events(),
            vec![PlaybackEvent::Stopped { reason: StopReason::Edited }]
        );
        assert_eq!(
            scheduler.port_mut().take_outgoing(),
            vec![Request::Initialize { bodies: edited }]
        );
        assert_eq!(scheduler.epoch(), 2);
    }

    #[test]
    fn transforms_toggle_preview_suppression() {
        let mut scheduler = Scheduler::new(EngineConfig::default(), QueuePort::new(), NoteBridge::silent());
        scheduler.begin_transform(layout());
        scheduler.set_bodies(layout());
        scheduler.end_transform(layout());
        assert_eq!(
            scheduler.port_mut().take_outgoing(),
            vec![
                Request::DisablePreview { bodies: layout() },
                Request::DisablePreview { bodies: layout() },
                Request::EnablePreview { bodies: layout() },
            ]
        );
        assert_eq!(scheduler.epoch(), 3);
    }

    #[test]
    fn stale_previews_are_dropped() {
        let mut scheduler = Scheduler::new(EngineConfig::default(), QueuePort::new(), NoteBridge::silent());
        scheduler.set_bodies(layout());
        scheduler.set_bodies(layout());
        assert_eq!(scheduler.epoch(), 2);

        scheduler.receive(Response::Initialize { epoch: 1, bodies: layout() });
        scheduler.receive(Response::ClearPreview { epoch: 1 });
        scheduler.receive(Response::Preview { epoch: 1, frames: vec![frame(0, 1.0)] });
        assert!(scheduler.preview().is_none());
        assert!(scheduler.layout().is_empty());
        assert!(scheduler.take_events().is_empty());

        scheduler.receive(Response::Initialize { epoch: 2, bodies: layout() });
        scheduler.receive(Response::ClearPreview { epoch: 2 });
        scheduler.receive(Response::Preview { epoch: 2, frames: vec![frame(0, 1.0)] });
        assert_eq!(scheduler.preview().map(|p| p.epoch), Some(2));
        assert_eq!(
            scheduler.take_events(),
            vec![
                PlaybackEvent::LayoutReady,
                PlaybackEvent::PreviewCleared,
                PlaybackEvent::PreviewReady,
            ]
        );
    }

    #[test]
    fn rejected_layout_is_reported() {
        let mut scheduler = Scheduler::new(EngineConfig::default(), QueuePort::new(), NoteBridge::silent());
        scheduler.set_bodies(layout());
        scheduler.receive(Response::Error { epoch: 1, message: "bad".into() });
        assert_eq!(
            scheduler.take_events(),
            vec![PlaybackEvent::Rejected { message: "bad".into() }]
        );
    }

    #[test]
    fn invalid_layout_is_refused_before_sending() {
        let (mut scheduler, _) = playing();
        scheduler.port_mut().take_outgoing();

        let broken = vec![BodyDef::marble(MARBLE, f32::INFINITY, 0.0, 10.0)];
        scheduler.set_bodies(broken.clone());
        scheduler.begin_transform(broken.clone());
        scheduler.end_transform(broken);

        assert!(scheduler.port_mut().take_outgoing().is_empty());
        assert_eq!(scheduler.epoch(), 1);
        assert_eq!(scheduler.state(), PlaybackState::Playing);
        assert_eq!(scheduler.definitions(), layout().as_slice());
        let events = scheduler.take_events();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| matches!(e, PlaybackEvent::Rejected { .. })));
    }

    #[test]
    fn camera_stays_inside_world_bounds() {
        use crate::api::config::WorldBounds;

        let mut config = EngineConfig::default();
        config.physics.bounds =
            WorldBounds::new(glam::Vec2::new(-1000.0, -1000.0), glam::Vec2::new(1000.0, 1000.0));
        let mut scheduler = Scheduler::new(config, QueuePort::new(), NoteBridge::silent());
        scheduler.set_bodies(layout());
        scheduler.receive(Response::Initialize { epoch: 1, bodies: layout() });
        scheduler.play();
        scheduler.tick(0.0);

        deliver(&mut scheduler, 1, vec![frame(0, 950.0), frame(1, 960.0)]);
        scheduler.tick(DT);
        // 600 px tall viewport: the center stops 300 px above the bottom edge.
        assert_eq!(scheduler.camera().center, glam::Vec2::new(0.0, 700.0));
    }

    #[test]
    fn camera_follows_tracked_body() {
        let (mut scheduler, _) = playing();
        deliver(&mut scheduler, 1, vec![frame(0, 40.0), frame(1, 80.0)]);
        scheduler.tick(DT);
        assert_eq!(scheduler.camera().center, glam::Vec2::new(0.0, 40.0));
    }

    #[test]
    fn audition_plays_preview_note() {
        let mut scheduler = Scheduler::new(EngineConfig::default(), QueuePort::new(), NoteBridge::silent());
        scheduler.set_bodies(layout());
        let trigger = scheduler.audition(NOTE).unwrap();
        assert_eq!(trigger.pitch_name(), "C4");
        assert!(scheduler.audition(MARBLE).is_none());
        assert!(scheduler.audition(BodyId(99)).is_none());
    }

    #[cfg(feature = "physics")]
    #[test]
    fn plays_to_settlement_over_loopback() {
        use crate::api::config::WorldBounds;
        use crate::bridge::port::LoopbackPort;

        let mut config = EngineConfig::default();
        config.physics.bounds =
            WorldBounds::new(glam::Vec2::new(-100.0, -100.0), glam::Vec2::new(100.0, 100.0));
        let port = LoopbackPort::new(config.clone());
        let mut scheduler = Scheduler::new(config, port, NoteBridge::silent());

        scheduler.set_bodies(vec![BodyDef::marble(MARBLE, 0.0, 0.0, 5.0)]);
        scheduler.tick(DT);
        assert_eq!(scheduler.layout().len(), 1);

        scheduler.play();
        let mut last_y = 0.0;
        let mut ticks = 0;
        while scheduler.state() == PlaybackState::Playing {
            scheduler.tick(DT);
            if let Some(pose) = scheduler.poses().get(MARBLE) {
                assert!(pose.y >= last_y);
                last_y = pose.y;
            }
            ticks += 1;
            assert!(ticks < 1_000, "playback never settled");
        }
        assert!(last_y > 50.0);

        let stops = scheduler
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, PlaybackEvent::Stopped { .. }))
            .collect::<Vec<_>>();
        assert_eq!(stops, vec![PlaybackEvent::Stopped { reason: StopReason::Settled }]);

        // The reset layout comes back and nothing moves afterwards.
        scheduler.tick(DT);
        assert_eq!(scheduler.poses().get(MARBLE), Some(Pose::new(0.0, 0.0, 0.0)));
        let version = scheduler.poses().version();
        for _ in 0..10 {
            scheduler.tick(DT);
        }
        assert_eq!(scheduler.poses().version(), version);
    }
}
