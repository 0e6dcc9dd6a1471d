use serde::{Deserialize, Serialize};

use crate::api::types::BodyId;
use crate::components::body::{BodyDef, BodyKind};
use crate::components::note::{NoteName, Setting};

/// Global synth defaults substituted for "auto" note settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteSettings {
    pub note: NoteName,
    pub octave: i32,
    /// Master volume, 0.0 to 1.0.
    pub volume: f32,
}

impl Default for NoteSettings {
    fn default() -> Self {
        Self {
            note: NoteName::C,
            octave: 4,
            volume: 0.5,
        }
    }
}

/// A fully resolved synth trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTrigger {
    pub body: BodyId,
    pub note: NoteName,
    pub octave: i32,
    pub volume: f32,
}

impl NoteTrigger {
    /// Scientific pitch name, e.g. `C#4`.
    pub fn pitch_name(&self) -> String {
        format!("{}{}", self.note.as_str(), self.octave)
    }

    /// MIDI note number (C4 = 60).
    pub fn midi(&self) -> i32 {
        (self.octave + 1) * 12 + self.note.semitone()
    }

    /// Equal-tempered frequency in Hz, A4 = 440 Hz.
    pub fn frequency(&self) -> f32 {
        440.0 * 2f32.powf((self.midi() - 69) as f32 / 12.0)
    }
}

/// The audio layer.
pub trait NoteSink {
    /// A marble struck a note block during playback.
    fn play_note(&mut self, trigger: &NoteTrigger);

    /// The synth panel's preview button.
    fn play_preview_note(&mut self, trigger: &NoteTrigger);
}

/// Sink that drops every trigger.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl NoteSink for Silent {
    fn play_note(&mut self, _trigger: &NoteTrigger) {}

    fn play_preview_note(&mut self, _trigger: &NoteTrigger) {}
}

/// Turns struck note blocks into synth triggers.
///
/// The bridge trusts the frame's note flag; de-duplication of contacts
/// happens in the executor.
pub struct NoteBridge {
    defaults: NoteSettings,
    sink: Box<dyn NoteSink>,
}

impl NoteBridge {
    pub fn new(defaults: NoteSettings, sink: Box<dyn NoteSink>) -> Self {
        Self { defaults, sink }
    }

    pub fn silent() -> Self {
        Self::new(NoteSettings::default(), Box::new(Silent))
    }

    pub fn defaults(&self) -> NoteSettings {
        self.defaults
    }

    pub fn set_defaults(&mut self, defaults: NoteSettings) {
        self.defaults = defaults;
    }

    /// Resolve "auto" settings of a note block. Other kinds have no note.
    pub fn resolve(&self, def: &BodyDef) -> Option<NoteTrigger> {
        if def.kind != BodyKind::NoteBlock {
            return None;
        }
        let volume = match def.volume {
            Setting::Auto => self.defaults.volume,
            Setting::Fixed(scale) => self.defaults.volume * scale,
        };
        Some(NoteTrigger {
            body: def.id,
            note: def.note.unwrap_or(self.defaults.note),
            octave: def.octave.unwrap_or(self.defaults.octave),
            volume,
        })
    }

    /// Play the note of a struck block.
    pub fn trigger(&mut self, def: &BodyDef) -> Option<NoteTrigger> {
        let trigger = self.resolve(def)?;
        self.sink.play_note(&trigger);
        Some(trigger)
    }

    /// Play a block's note outside playback.
    pub fn audition(&mut self, def: &BodyDef) -> Option<NoteTrigger> {
        let trigger = self.resolve(def)?;
        self.sink.play_preview_note(&trigger);
        Some(trigger)
    }
}
