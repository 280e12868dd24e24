//! Tone synthesis for alarms and UI cues.
//!
//! Cues are tables of timed tones ([`Cue::tones`]) rendered into mono
//! samples ([`render`]) and handed to an [`AudioOutput`]. The stock output
//! writes a WAV file and can pass it to an external player.

mod output;
mod synth;
mod tone;

pub use output::{AudioBackend, AudioOutput, OutputState, WavFileBackend};
pub use synth::{envelope, render, ToneSynthesizer, DECAY_FLOOR};
pub use tone::{AlarmStyle, Cue, Tone, Waveform};
