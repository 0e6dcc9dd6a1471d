use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

const AUTO: &str = "auto";

/// A value a note block may leave to the global synth defaults.
///
/// On the wire this is either the value itself or the string `"auto"`.
/// A missing field deserializes as `Auto`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting<T> {
    Auto,
    Fixed(T),
}

impl<T> Setting<T> {
    pub fn is_auto(&self) -> bool {
        matches!(self, Setting::Auto)
    }

    /// The fixed value, if any.
    pub fn fixed(&self) -> Option<&T> {
        match self {
            Setting::Auto => None,
            Setting::Fixed(value) => Some(value),
        }
    }
}

impl<T: Copy> Setting<T> {
    pub fn unwrap_or(&self, fallback: T) -> T {
        match self {
            Setting::Auto => fallback,
            Setting::Fixed(value) => *value,
        }
    }
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Auto
    }
}

impl<T: Serialize> Serialize for Setting<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Setting::Auto => serializer.serialize_str(AUTO),
            Setting::Fixed(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Fixed(T),
            Keyword(String),
        }

        match Repr::<T>::deserialize(deserializer)? {
            Repr::Fixed(value) => Ok(Setting::Fixed(value)),
            Repr::Keyword(word) if word == AUTO => Ok(Setting::Auto),
            Repr::Keyword(word) => Err(de::Error::custom(format!(
                "expected a value or \"auto\", found {word:?}"
            ))),
        }
    }
}

/// Pitch class of a note block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// Semitones above C.
    pub fn semitone(self) -> i32 {
        match self {
            NoteName::C => 0,
            NoteName::CSharp => 1,
            NoteName::D => 2,
            NoteName::DSharp => 3,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::FSharp => 6,
            NoteName::G => 7,
            NoteName::GSharp => 8,
            NoteName::A => 9,
            NoteName::ASharp => 10,
            NoteName::B => 11,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }
}
