//! Cue definitions: which tones make up each alarm.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
}

impl Waveform {
    /// Sample at `phase` cycles (only the fractional part matters), in `[-1, 1]`.
    pub fn sample(self, phase: f64) -> f64 {
        let p = phase.rem_euclid(1.0);
        match self {
            Waveform::Sine => (TAU * p).sin(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
        }
    }
}

/// One scheduled tone, relative to the start of its cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration_s: f64,
    pub waveform: Waveform,
    /// Peak gain before the master volume.
    pub volume: f64,
    pub offset_s: f64,
}

impl Tone {
    const fn new(frequency_hz: f64, duration_s: f64, waveform: Waveform, volume: f64, offset_s: f64) -> Self {
        Self {
            frequency_hz,
            duration_s,
            waveform,
            volume,
            offset_s,
        }
    }

    pub fn end_s(&self) -> f64 {
        self.offset_s + self.duration_s
    }

    fn shifted(self, by_s: f64) -> Self {
        Self {
            offset_s: self.offset_s + by_s,
            ..self
        }
    }
}

/// Alarm style chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmStyle {
    /// Three square beeps, five times.
    #[default]
    Standard,
    /// Rising sine chord, three times.
    Gentle,
    /// Quick C-E-G arpeggio, four times.
    Digital,
    /// Two-tone sawtooth siren, six times.
    Intense,
}

impl AlarmStyle {
    pub const ALL: [AlarmStyle; 4] = [
        AlarmStyle::Standard,
        AlarmStyle::Gentle,
        AlarmStyle::Digital,
        AlarmStyle::Intense,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlarmStyle::Standard => "standard",
            AlarmStyle::Gentle => "gentle",
            AlarmStyle::Digital => "digital",
            AlarmStyle::Intense => "intense",
        }
    }
}

impl fmt::Display for AlarmStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmStyle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AlarmStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "alarm style".to_string(),
                message: format!("'{s}' is not one of standard, gentle, digital, intense"),
            })
    }
}

/// Something the synthesizer can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Alarm(AlarmStyle),
    LoginSuccess,
    Error,
}

struct Pattern {
    repeats: u32,
    period_s: f64,
    tones: &'static [Tone],
}

use Waveform::{Sawtooth, Sine, Square};

const STANDARD: Pattern = Pattern {
    repeats: 5,
    period_s: 1.0,
    tones: &[
        Tone::new(880.0, 0.1, Square, 0.5, 0.0),
        Tone::new(880.0, 0.1, Square, 0.5, 0.15),
        Tone::new(880.0, 0.2, Square, 0.5, 0.3),
    ],
};

const GENTLE: Pattern = Pattern {
    repeats: 3,
    period_s: 1.5,
    tones: &[
        Tone::new(330.0, 0.5, Sine, 0.4, 0.0),
        Tone::new(415.0, 0.5, Sine, 0.4, 0.2),
        Tone::new(494.0, 1.0, Sine, 0.3, 0.4),
    ],
};

const DIGITAL: Pattern = Pattern {
    repeats: 4,
    period_s: 0.4,
    tones: &[
        Tone::new(523.25, 0.1, Square, 0.2, 0.0),
        Tone::new(659.25, 0.1, Square, 0.2, 0.1),
        Tone::new(783.99, 0.1, Square, 0.2, 0.2),
    ],
};

const INTENSE: Pattern = Pattern {
    repeats: 6,
    period_s: 0.5,
    tones: &[
        Tone::new(880.0, 0.1, Sawtooth, 0.6, 0.0),
        Tone::new(1100.0, 0.1, Sawtooth, 0.6, 0.1),
    ],
};

const LOGIN_SUCCESS: Pattern = Pattern {
    repeats: 1,
    period_s: 0.0,
    tones: &[
        Tone::new(440.0, 0.1, Sine, 0.5, 0.0),
        Tone::new(554.0, 0.1, Sine, 0.5, 0.1),
        Tone::new(659.0, 0.2, Square, 0.5, 0.2),
    ],
};

const ERROR: Pattern = Pattern {
    repeats: 1,
    period_s: 0.0,
    tones: &[Tone::new(150.0, 0.3, Sawtooth, 0.5, 0.0)],
};

impl Cue {
    fn pattern(self) -> &'static Pattern {
        match self {
            Cue::Alarm(AlarmStyle::Standard) => &STANDARD,
            Cue::Alarm(AlarmStyle::Gentle) => &GENTLE,
            Cue::Alarm(AlarmStyle::Digital) => &DIGITAL,
            Cue::Alarm(AlarmStyle::Intense) => &INTENSE,
            Cue::LoginSuccess => &LOGIN_SUCCESS,
            Cue::Error => &ERROR,
        }
    }

    /// Every tone in the cue, repeats expanded, ordered by offset.
    pub fn tones(self) -> Vec<Tone> {
        let pattern = self.pattern();
        let mut out = Vec::with_capacity(pattern.tones.len() * pattern.repeats as usize);
        for i in 0..pattern.repeats {
            let shift = f64::from(i) * pattern.period_s;
            out.extend(pattern.tones.iter().map(|t| t.shifted(shift)));
        }
        out.sort_by(|a, b| a.offset_s.total_cmp(&b.offset_s));
        out
    }

    /// Seconds until the last tone ends.
    pub fn duration_s(self) -> f64 {
        self.tones().iter().map(Tone::end_s).fold(0.0, f64::max)
    }
}
