use tracing::{debug, warn};

use super::output::{AudioBackend, AudioOutput, OutputState};
use super::tone::{AlarmStyle, Cue, Tone};
use crate::dispatch::AlarmPlayer;
use crate::error::AudioError;

/// Gain a tone decays to by its end. Exponential ramps cannot reach zero.
pub const DECAY_FLOOR: f64 = 0.01;

/// Gain at `progress` (0..=1) through a tone: an exponential ramp from
/// `volume` down to [`DECAY_FLOOR`].
pub fn envelope(volume: f64, progress: f64) -> f64 {
    if volume <= DECAY_FLOOR {
        return volume.max(0.0);
    }
    let p = progress.clamp(0.0, 1.0);
    volume * (DECAY_FLOOR / volume).powf(p)
}

/// Mix every tone of `cue` into mono samples scaled by `master_volume`.
pub fn render(cue: Cue, sample_rate: u32, master_volume: f64) -> Vec<f32> {
    let rate = f64::from(sample_rate);
    let tones = cue.tones();
    let total = (cue.duration_s() * rate).round() as usize;
    let mut mix = vec![0.0_f64; total];
    for tone in &tones {
        add_tone(&mut mix, tone, rate);
    }
    let master = master_volume.clamp(0.0, 1.0);
    mix.into_iter()
        .map(|s| (s * master).clamp(-1.0, 1.0) as f32)
        .collect()
}

fn add_tone(mix: &mut [f64], tone: &Tone, rate: f64) {
    let start = (tone.offset_s * rate).round() as usize;
    let len = (tone.duration_s * rate).round() as usize;
    if len == 0 {
        return;
    }
    for i in 0..len {
        let Some(slot) = mix.get_mut(start + i) else {
            break;
        };
        let t = i as f64 / rate;
        let gain = envelope(tone.volume, i as f64 / len as f64);
        *slot += tone.waveform.sample(tone.frequency_hz * t) * gain;
    }
}

/// Plays cues on a lazily opened output.
///
/// The output is created on first use, reopened if it was closed, and
/// resumed if suspended. Playback failures are logged and dropped.
pub struct ToneSynthesizer {
    backend: Box<dyn AudioBackend>,
    output: Option<Box<dyn AudioOutput>>,
    master_volume: f64,
}

impl ToneSynthesizer {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            output: None,
            master_volume: 1.0,
        }
    }

    /// Master volume in percent; values above 100 are capped.
    pub fn with_volume(mut self, percent: u8) -> Self {
        self.master_volume = f64::from(percent.min(100)) / 100.0;
        self
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Open or resume the output so it is ready to play.
    pub fn ensure_ready(&mut self) -> Result<&mut Box<dyn AudioOutput>, AudioError> {
        let output = match self.output.take() {
            Some(out) if out.state() != OutputState::Closed => out,
            _ => {
                debug!("opening audio output");
                self.backend.open()?
            }
        };
        let output = self.output.insert(output);
        if output.state() == OutputState::Suspended {
            output.resume()?;
        }
        Ok(output)
    }

    /// Play `cue`, logging any failure.
    pub fn play(&mut self, cue: Cue) {
        if let Err(e) = self.try_play(cue) {
            warn!(cue = ?cue, error = %e, "tone playback failed");
        }
    }

    pub fn try_play(&mut self, cue: Cue) -> Result<(), AudioError> {
        let master = self.master_volume;
        let output = self.ensure_ready()?;
        let samples = render(cue, output.sample_rate(), master);
        output.play(&samples)
    }

    /// Close the output. The next cue opens a fresh one.
    pub fn shutdown(&mut self) {
        if let Some(mut out) = self.output.take() {
            out.close();
        }
    }
}

impl AlarmPlayer for ToneSynthesizer {
    fn play_alarm(&mut self, style: AlarmStyle) {
        self.play(Cue::Alarm(style));
    }
}
