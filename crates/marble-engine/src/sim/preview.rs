use log::debug;

use crate::api::config::{PhysicsConfig, PreviewConfig};
use crate::api::types::{BodyId, Epoch};
use crate::bridge::protocol::{Frame, PreviewHorizon};
use crate::components::body::Body;
use crate::sim::world::Simulation;

/// One preview computation over a disposable world.
struct PreviewJob {
    epoch: Epoch,
    world: Simulation,
    stride: u32,
    budget: u32,
    ticks: u32,
    frames: Vec<Frame>,
    /// Notes struck since the last sample.
    struck: Vec<BodyId>,
}

impl PreviewJob {
    fn new(epoch: Epoch, world: Simulation, config: &PreviewConfig) -> Self {
        let moving = world.dynamic_count();
        let stride = config.stride(moving);
        let budget = config.tick_budget(moving);
        Self {
            epoch,
            world,
            stride,
            budget,
            ticks: 0,
            frames: Vec::with_capacity((budget / stride) as usize + 1),
            struck: Vec::new(),
        }
    }

    /// Run up to `max_ticks` ticks. Returns `true` once the job is finished.
    fn run(&mut self, max_ticks: u32) -> bool {
        for _ in 0..max_ticks {
            if self.ticks >= self.budget {
                return true;
            }
            let report = self.world.step();
            self.ticks += 1;
            for id in report.notes {
                if !self.struck.contains(&id) {
                    self.struck.push(id);
                }
            }

            if report.quiescent {
                self.sample(true);
                return true;
            }
            if self.ticks % self.stride == 0 {
                self.sample(false);
            }
        }
        self.ticks >= self.budget
    }

    fn sample(&mut self, terminal: bool) {
        let notes = std::mem::take(&mut self.struck);
        self.frames.push(Frame {
            id: self.frames.len() as u64,
            bodies: self.world.snapshot_dynamic(),
            terminal,
            note_triggered: !notes.is_empty(),
            notes,
            note_consumed: false,
        });
    }

    fn finish(self) -> PreviewHorizon {
        debug!(
            "preview for epoch {} finished: {} ticks, {} samples",
            self.epoch,
            self.ticks,
            self.frames.len()
        );
        PreviewHorizon {
            epoch: self.epoch,
            frames: self.frames,
        }
    }
}

/// Throttled, chunked ghost-trail computation.
///
/// Requests only set a pending flag. A pending preview starts once the
/// previous one has finished and `min_interval_ms` has passed since the last
/// start, so any burst of requests collapses into at most one extra run.
pub struct PreviewPipeline {
    config: PreviewConfig,
    job: Option<PreviewJob>,
    pending: bool,
    last_started_ms: Option<f64>,
}

impl PreviewPipeline {
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            config,
            job: None,
            pending: false,
            last_started_ms: None,
        }
    }

    /// Ask for a preview of the current definitions.
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        self.job.is_some()
    }

    /// Whether a pending preview may start at `now_ms`.
    pub fn can_start(&self, now_ms: f64) -> bool {
        self.pending && self.job.is_none() && self.throttle_remaining(now_ms) <= 0.0
    }

    /// Milliseconds until the pipeline has work to do, or `None` when idle.
    pub fn wake_in(&self, now_ms: f64) -> Option<f64> {
        if self.job.is_some() {
            Some(0.0)
        } else if self.pending {
            Some(self.throttle_remaining(now_ms).max(0.0))
        } else {
            None
        }
    }

    /// Start the pending preview on a fresh world built from `bodies`.
    pub fn start(&mut self, epoch: Epoch, physics: &PhysicsConfig, bodies: &[Body], now_ms: f64) {
        let world = Simulation::build(physics, bodies);
        debug!("preview started for epoch {epoch} ({} moving bodies)", world.dynamic_count());
        self.job = Some(PreviewJob::new(epoch, world, &self.config));
        self.pending = false;
        self.last_started_ms = Some(now_ms);
    }

    /// Run one chunk of the current job. Returns the horizon once it completes.
    pub fn advance(&mut self) -> Option<PreviewHorizon> {
        let finished = self.job.as_mut()?.run(self.config.chunk_ticks);
        if finished {
            self.job.take().map(PreviewJob::finish)
        } else {
            None
        }
    }

    fn throttle_remaining(&self, now_ms: f64) -> f64 {
        self.last_started_ms
            .map_or(0.0, |started| started + self.config.min_interval_ms - now_ms)
    }
}
