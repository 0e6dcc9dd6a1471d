use std::collections::HashSet;
use std::ops::Not;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::types::BodyId;
use crate::components::note::{NoteName, Setting};
use crate::core::geometry::{center_to_top_left, top_left_to_center};

/// The three kinds of body a track is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyKind {
    Marble,
    TrackBlock,
    NoteBlock,
}

/// Serialized body definition exchanged with the render surface, the
/// executor and the persistence layer.
/// Must stay in sync with the TypeScript `BodyDef` type.
///
/// Rectangles are placed by their top-left corner unless
/// `measured_from_center` is set. Marbles are always placed by their center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyDef {
    pub id: BodyId,
    pub kind: BodyKind,
    pub x: f32,
    pub y: f32,
    /// Rotation in radians.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// Marble gradient start color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_start: Option<String>,
    /// Marble gradient end color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_end: Option<String>,
    /// Block front layer color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_color: Option<String>,
    /// Block back layer color (drawn offset for depth).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_color: Option<String>,
    /// Overrides the kind's default (marbles dynamic, blocks static).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
    #[serde(default, skip_serializing_if = "Not::not")]
    pub camera_tracking: bool,
    #[serde(default, skip_serializing_if = "Setting::is_auto")]
    pub note: Setting<NoteName>,
    #[serde(default, skip_serializing_if = "Setting::is_auto")]
    pub octave: Setting<i32>,
    #[serde(default, skip_serializing_if = "Setting::is_auto")]
    pub volume: Setting<f32>,
    #[serde(default, skip_serializing_if = "Not::not")]
    pub measured_from_center: bool,
}

impl BodyDef {
    fn bare(id: BodyId, kind: BodyKind, x: f32, y: f32) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            rotation: 0.0,
            radius: None,
            width: None,
            height: None,
            color_start: None,
            color_end: None,
            front_color: None,
            back_color: None,
            is_static: None,
            camera_tracking: false,
            note: Setting::Auto,
            octave: Setting::Auto,
            volume: Setting::Auto,
            measured_from_center: false,
        }
    }

    /// A marble centered at (x, y).
    pub fn marble(id: BodyId, x: f32, y: f32, radius: f32) -> Self {
        Self {
            radius: Some(radius),
            ..Self::bare(id, BodyKind::Marble, x, y)
        }
    }

    /// A track block with its top-left corner at (x, y).
    pub fn track_block(id: BodyId, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::bare(id, BodyKind::TrackBlock, x, y)
        }
    }

    /// A note block with its top-left corner at (x, y), all settings auto.
    pub fn note_block(id: BodyId, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::bare(id, BodyKind::NoteBlock, x, y)
        }
    }

    // -- Builder pattern --

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = Some(is_static);
        self
    }

    pub fn with_camera_tracking(mut self, tracking: bool) -> Self {
        self.camera_tracking = tracking;
        self
    }

    pub fn with_note(mut self, note: Setting<NoteName>, octave: Setting<i32>, volume: Setting<f32>) -> Self {
        self.note = note;
        self.octave = octave;
        self.volume = volume;
        self
    }

    pub fn with_colors(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        match self.kind {
            BodyKind::Marble => {
                self.color_start = Some(first.into());
                self.color_end = Some(second.into());
            }
            BodyKind::TrackBlock | BodyKind::NoteBlock => {
                self.front_color = Some(first.into());
                self.back_color = Some(second.into());
            }
        }
        self
    }

    /// Whether the body takes part in integration.
    pub fn resolved_static(&self) -> bool {
        self.is_static.unwrap_or(match self.kind {
            BodyKind::Marble => false,
            BodyKind::TrackBlock | BodyKind::NoteBlock => true,
        })
    }

    /// Copy of this definition placed at a center-origin pose.
    pub fn with_center_pose(&self, center: Vec2, rotation: f32) -> Self {
        Self {
            x: center.x,
            y: center.y,
            rotation,
            measured_from_center: true,
            ..self.clone()
        }
    }

    /// Top-left corner of a rectangle definition, or the center of a marble.
    pub fn anchor(&self) -> Vec2 {
        let position = Vec2::new(self.x, self.y);
        match (self.kind, self.width, self.height) {
            (BodyKind::Marble, _, _) => position,
            (_, Some(w), Some(h)) if self.measured_from_center => {
                center_to_top_left(position, Vec2::new(w, h), self.rotation)
            }
            _ => position,
        }
    }
}

/// Shape-specific part of a validated body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Marble { radius: f32 },
    TrackBlock { half_extents: Vec2 },
    NoteBlock { half_extents: Vec2 },
}

impl BodyShape {
    pub fn kind(&self) -> BodyKind {
        match self {
            BodyShape::Marble { .. } => BodyKind::Marble,
            BodyShape::TrackBlock { .. } => BodyKind::TrackBlock,
            BodyShape::NoteBlock { .. } => BodyKind::NoteBlock,
        }
    }

    pub fn half_extents(&self) -> Option<Vec2> {
        match *self {
            BodyShape::Marble { .. } => None,
            BodyShape::TrackBlock { half_extents } | BodyShape::NoteBlock { half_extents } => {
                Some(half_extents)
            }
        }
    }
}

/// Validated, simulation-ready body in center-origin coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: BodyId,
    pub center: Vec2,
    pub rotation: f32,
    pub is_static: bool,
    pub shape: BodyShape,
}

/// A body definition that cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("marble {0} has no radius")]
    MissingRadius(BodyId),
    #[error("{kind:?} {id} needs both width and height")]
    MissingDimensions { id: BodyId, kind: BodyKind },
    #[error("body {id} has invalid {field}: {value}")]
    InvalidDimension {
        id: BodyId,
        field: &'static str,
        value: f32,
    },
    #[error("body {0} has a non-finite position or rotation")]
    NonFiniteGeometry(BodyId),
    #[error("body id {0} appears more than once")]
    DuplicateId(BodyId),
}

fn dimension(id: BodyId, field: &'static str, value: f32) -> Result<f32, BuildError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(BuildError::InvalidDimension { id, field, value })
    }
}

impl Body {
    /// Validate a definition and convert it to center-origin geometry.
    pub fn from_def(def: &BodyDef) -> Result<Self, BuildError> {
        if !(def.x.is_finite() && def.y.is_finite() && def.rotation.is_finite()) {
            return Err(BuildError::NonFiniteGeometry(def.id));
        }
        if let Setting::Fixed(volume) = def.volume {
            if !(volume.is_finite() && volume >= 0.0) {
                return Err(BuildError::InvalidDimension { id: def.id, field: "volume", value: volume });
            }
        }
        let position = Vec2::new(def.x, def.y);

        let (center, shape) = match def.kind {
            BodyKind::Marble => {
                let radius = def.radius.ok_or(BuildError::MissingRadius(def.id))?;
                let radius = dimension(def.id, "radius", radius)?;
                (position, BodyShape::Marble { radius })
            }
            BodyKind::TrackBlock | BodyKind::NoteBlock => {
                let (Some(width), Some(height)) = (def.width, def.height) else {
                    return Err(BuildError::MissingDimensions { id: def.id, kind: def.kind });
                };
                let size = Vec2::new(
                    dimension(def.id, "width", width)?,
                    dimension(def.id, "height", height)?,
                );
                let center = if def.measured_from_center {
                    position
                } else {
                    top_left_to_center(position, size, def.rotation)
                };
                let half_extents = size * 0.5;
                let shape = if def.kind == BodyKind::TrackBlock {
                    BodyShape::TrackBlock { half_extents }
                } else {
                    BodyShape::NoteBlock { half_extents }
                };
                (center, shape)
            }
        };

        Ok(Self {
            id: def.id,
            center,
            rotation: def.rotation,
            is_static: def.resolved_static(),
            shape,
        })
    }

    /// Validate a whole track. Fails on the first bad definition so that a
    /// world is never built from part of a track.
    pub fn from_defs(defs: &[BodyDef]) -> Result<Vec<Self>, BuildError> {
        let mut seen = HashSet::with_capacity(defs.len());
        defs.iter()
            .map(|def| {
                if !seen.insert(def.id) {
                    return Err(BuildError::DuplicateId(def.id));
                }
                Self::from_def(def)
            })
            .collect()
    }

    pub fn kind(&self) -> BodyKind {
        self.shape.kind()
    }
}
