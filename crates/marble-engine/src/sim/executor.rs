use log::{debug, error, info};

use crate::api::config::EngineConfig;
use crate::api::types::{BodyId, Epoch};
use crate::bridge::protocol::{Frame, Request, Response};
use crate::components::body::{Body, BodyDef, BuildError};
use crate::sim::preview::PreviewPipeline;
use crate::sim::world::Simulation;

/// Owner of the authoritative simulation world.
///
/// Runs in its own execution context and talks to the scheduler only through
/// [`Request`]s and [`Response`]s. Every rebuild request bumps the epoch,
/// including rejected ones, so the scheduler can mirror it by counting the
/// rebuilds it sends.
pub struct Executor {
    config: EngineConfig,
    world: Simulation,
    /// Validated bodies of the current world, used to seed previews.
    bodies: Vec<Body>,
    epoch: Epoch,
    next_frame_id: u64,
    settled: bool,
    preview_enabled: bool,
    preview: PreviewPipeline,
}

impl Executor {
    pub fn new(config: EngineConfig) -> Self {
        info!(
            "executor started (tick {:.4}s, batch {})",
            config.physics.tick_duration, config.physics.batch_size
        );
        Self {
            world: Simulation::build(&config.physics, &[]),
            preview: PreviewPipeline::new(config.preview.clone()),
            config,
            bodies: Vec::new(),
            epoch: 0,
            next_frame_id: 0,
            settled: false,
            preview_enabled: true,
        }
    }

    /// Handle one request to completion.
    pub fn handle(&mut self, request: Request, now_ms: f64) -> Vec<Response> {
        match request {
            Request::Initialize { bodies } => vec![self.rebuild(&bodies)],
            Request::DisablePreview { bodies } => {
                self.preview_enabled = false;
                vec![self.rebuild(&bodies)]
            }
            Request::EnablePreview { bodies } => {
                self.preview_enabled = true;
                vec![self.rebuild(&bodies)]
            }
            Request::RequestPreviewRefresh => {
                self.request_preview();
                self.pump(now_ms)
            }
            Request::Update => {
                let frames = self.update();
                vec![Response::Update { epoch: self.epoch, frames }]
            }
            Request::Unknown => {
                debug!("ignoring unknown request");
                Vec::new()
            }
        }
    }

    /// Answer a rebuild request that could not be decoded. It still bumps
    /// the epoch, as the sender counted it; the world is left as it is.
    pub fn reject(&mut self, message: impl Into<String>) -> Response {
        self.epoch += 1;
        let message = message.into();
        error!("epoch {}: rejected request: {message}", self.epoch);
        Response::Error {
            epoch: self.epoch,
            message,
        }
    }

    /// Replace the world with one built from `defs`.
    ///
    /// All definitions are validated before anything is touched: on error the
    /// previous world stays in place. Returns the canonical center-origin
    /// definitions.
    pub fn initialize(&mut self, defs: &[BodyDef]) -> Result<Vec<BodyDef>, BuildError> {
        let bodies = Body::from_defs(defs)?;

        self.world = Simulation::build(&self.config.physics, &bodies);
        self.bodies = bodies;
        self.next_frame_id = 0;
        self.settled = false;
        self.request_preview();

        Ok(defs
            .iter()
            .zip(&self.bodies)
            .map(|(def, body)| def.with_center_pose(body.center, body.rotation))
            .collect())
    }

    /// Advance the world by one batch, one frame per tick.
    ///
    /// The batch is cut short when the world settles and the last frame is
    /// marked terminal. Once settled, every further call answers with a
    /// single terminal frame of the settled state.
    pub fn update(&mut self) -> Vec<Frame> {
        if self.settled {
            return vec![self.frame(true, Vec::new())];
        }

        let mut frames = Vec::with_capacity(self.config.physics.batch_size);
        for _ in 0..self.config.physics.batch_size {
            let report = self.world.step();
            let terminal = report.quiescent;
            frames.push(self.frame(terminal, report.notes));
            if terminal {
                debug!("world settled at frame {}", self.next_frame_id - 1);
                self.settled = true;
                break;
            }
        }
        frames
    }

    /// Start and advance background preview work.
    pub fn pump(&mut self, now_ms: f64) -> Vec<Response> {
        let mut responses = Vec::new();
        if self.preview_enabled && self.preview.can_start(now_ms) {
            self.preview
                .start(self.epoch, &self.config.physics, &self.bodies, now_ms);
            responses.push(Response::ClearPreview { epoch: self.epoch });
        }
        if let Some(horizon) = self.preview.advance() {
            responses.push(Response::Preview {
                epoch: horizon.epoch,
                frames: horizon.frames,
            });
        }
        responses
    }

    /// Whether `pump` has anything to do right now or after a throttle delay.
    pub fn has_work(&self) -> bool {
        self.preview.is_running() || (self.preview_enabled && self.preview.is_pending())
    }

    /// Milliseconds until `pump` should next be called, or `None` when idle.
    pub fn wake_in(&self, now_ms: f64) -> Option<f64> {
        if self.has_work() {
            self.preview.wake_in(now_ms)
        } else {
            None
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn preview_enabled(&self) -> bool {
        self.preview_enabled
    }

    pub fn world(&self) -> &Simulation {
        &self.world
    }

    // -- private helpers --

    fn rebuild(&mut self, defs: &[BodyDef]) -> Response {
        self.epoch += 1;
        match self.initialize(defs) {
            Ok(bodies) => {
                debug!("epoch {}: built {} bodies", self.epoch, bodies.len());
                Response::Initialize { epoch: self.epoch, bodies }
            }
            Err(err) => {
                error!("epoch {}: rejected track: {err}", self.epoch);
                Response::Error {
                    epoch: self.epoch,
                    message: err.to_string(),
                }
            }
        }
    }

    fn request_preview(&mut self) {
        if self.preview_enabled && self.world.dynamic_count() > 0 {
            self.preview.request();
        }
    }

    fn frame(&mut self, terminal: bool, notes: Vec<BodyId>) -> Frame {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        Frame {
            id,
            bodies: self.world.snapshot(),
            terminal,
            note_triggered: !notes.is_empty(),
            notes,
            note_consumed: false,
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
