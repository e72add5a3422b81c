use std::{fmt, str::FromStr};

use crate::{Result, SonifyError};

/// One of the twelve pitch classes, measured upwards from A so that the
/// base frequency of the engine sounds as `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    A,
    ASharp,
    B,
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
    ];

    /// Semitones above the base pitch.
    pub fn semitones(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = SonifyError;

    fn from_str(s: &str) -> Result<Self> {
        let normalised = s.trim().to_ascii_uppercase();
        let class = match normalised.as_str() {
            "A" => PitchClass::A,
            "A#" | "BB" => PitchClass::ASharp,
            "B" => PitchClass::B,
            "C" => PitchClass::C,
            "C#" | "DB" => PitchClass::CSharp,
            "D" => PitchClass::D,
            "D#" | "EB" => PitchClass::DSharp,
            "E" => PitchClass::E,
            "F" => PitchClass::F,
            "F#" | "GB" => PitchClass::FSharp,
            "G" => PitchClass::G,
            "G#" | "AB" => PitchClass::GSharp,
            _ => return Err(SonifyError::invalid(format!("unknown note `{s}`"))),
        };
        Ok(class)
    }
}
