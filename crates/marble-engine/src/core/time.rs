/// Paces consumption of fixed-duration frames against variable render time.
/// Each frame stands for one tick of `dt` seconds; the pacer remembers how
/// much of the head frame has already been shown.
#[derive(Debug, Clone)]
pub struct FramePacer {
    /// The fixed duration of one frame.
    dt: f32,
    /// Time already credited against the head frame.
    elapsed_in_head: f32,
}

/// Result of crediting one render callback's elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    /// Number of frames fully shown and to be discarded from the queue front.
    pub exhausted: usize,
    /// Fraction of the head frame's remaining duration covered this call
    /// (0.0 to 1.0). Interpolate from the last rendered state by this much.
    pub progress: f32,
}

impl FramePacer {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            elapsed_in_head: 0.0,
        }
    }

    /// Credit `elapsed` seconds against a queue of `available` frames.
    ///
    /// Frames are exhausted while the elapsed time covers what remains of the
    /// head. Time left over once the queue runs dry is dropped, so simulated
    /// time never runs ahead of the frames actually received.
    pub fn advance(&mut self, elapsed: f32, available: usize) -> Advance {
        let mut left = elapsed.max(0.0);
        let mut exhausted = 0;

        while exhausted < available {
            let remaining = self.remaining();
            if left >= remaining {
                left -= remaining;
                self.elapsed_in_head = 0.0;
                exhausted += 1;
            } else {
                let progress = if remaining > 0.0 { left / remaining } else { 1.0 };
                self.elapsed_in_head += left;
                return Advance { exhausted, progress };
            }
        }

        Advance { exhausted, progress: 0.0 }
    }

    /// Time left before the head frame is exhausted.
    pub fn remaining(&self) -> f32 {
        (self.dt - self.elapsed_in_head).max(0.0)
    }

    /// Forget partial progress, e.g. when playback restarts.
    pub fn reset(&mut self) {
        self.elapsed_in_head = 0.0;
    }

    /// The fixed duration of one frame.
    pub fn dt(&self) -> f32 {
        self.dt
    }
}
