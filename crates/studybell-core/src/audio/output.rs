//! Where rendered samples go.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::error::AudioError;

/// Lifecycle of an output, mirroring browser audio contexts: created
/// suspended, resumed before first use, closed for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Running,
    Suspended,
    Closed,
}

pub trait AudioOutput: Send {
    fn state(&self) -> OutputState;
    fn resume(&mut self) -> Result<(), AudioError>;
    fn sample_rate(&self) -> u32;
    /// Mono `f32` samples in `[-1, 1]`.
    fn play(&mut self, samples: &[f32]) -> Result<(), AudioError>;
    fn close(&mut self);
}

/// Opens outputs on demand.
pub trait AudioBackend: Send {
    fn open(&mut self) -> Result<Box<dyn AudioOutput>, AudioError>;
}

/// Renders each cue to a WAV file, optionally handing it to an external
/// player command.
#[derive(Debug, Clone)]
pub struct WavFileBackend {
    path: PathBuf,
    sample_rate: u32,
    player: Option<String>,
}

impl WavFileBackend {
    pub fn new(path: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            player: None,
        }
    }

    /// Command run after each write, e.g. `aplay -q`. The WAV path is
    /// appended as the last argument.
    pub fn with_player(mut self, player: Option<String>) -> Self {
        self.player = player.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioBackend for WavFileBackend {
    fn open(&mut self) -> Result<Box<dyn AudioOutput>, AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::Unavailable("sample rate must be positive".to_string()));
        }
        Ok(Box::new(WavFileOutput {
            path: self.path.clone(),
            sample_rate: self.sample_rate,
            player: self.player.clone(),
            state: OutputState::Suspended,
        }))
    }
}

struct WavFileOutput {
    path: PathBuf,
    sample_rate: u32,
    player: Option<String>,
    state: OutputState,
}

impl WavFileOutput {
    fn write_wav(&self, path: &Path, samples: &[f32]) -> Result<(), AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &s in samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// A fresh file next to the output path, removed when the returned
    /// handle drops. Each playback gets its own so a second cue never
    /// rewrites a file a player is still reading.
    fn playback_file(&self) -> Result<TempPath, AudioError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("alarm");
        let file = tempfile::Builder::new()
            .prefix(&format!("{stem}-"))
            .suffix(".wav")
            .tempfile_in(dir)?;
        Ok(file.into_temp_path())
    }

    fn spawn_player(&self, command: &str, file: TempPath) {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return;
        };
        let spawned = Command::new(program)
            .args(parts)
            .arg(&*file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                // Reap in the background so playback never blocks a tick;
                // the file goes away once the player is done with it.
                std::thread::spawn(move || {
                    let _ = child.wait();
                    drop(file);
                });
            }
            Err(e) => warn!(player = program, error = %e, "failed to start audio player"),
        }
    }
}

impl AudioOutput for WavFileOutput {
    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        match self.state {
            OutputState::Closed => Err(AudioError::Closed),
            OutputState::Running => Ok(()),
            OutputState::Suspended => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| AudioError::ResumeFailed(format!("{}: {e}", parent.display())))?;
                }
                self.state = OutputState::Running;
                Ok(())
            }
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        if self.state != OutputState::Running {
            return Err(AudioError::Closed);
        }
        self.write_wav(&self.path, samples)?;
        debug!(path = %self.path.display(), samples = samples.len(), "wrote alarm audio");
        if let Some(player) = &self.player {
            let file = self.playback_file()?;
            self.write_wav(&file, samples)?;
            self.spawn_player(player, file);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.state = OutputState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_starts_suspended_and_writes_after_resume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("alarm.wav");
        let mut backend = WavFileBackend::new(&path, 8000);
        let mut out = backend.open().unwrap();
        assert_eq!(out.state(), OutputState::Suspended);
        assert!(out.play(&[0.0; 4]).is_err());

        out.resume().unwrap();
        out.play(&[0.0, 0.5, -0.5, 0.25]).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.0, 0.5, -0.5, 0.25]);
    }

    #[test]
    fn closed_output_cannot_resume() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = WavFileBackend::new(dir.path().join("a.wav"), 8000).open().unwrap();
        out.close();
        assert!(matches!(out.resume(), Err(AudioError::Closed)));
    }

    #[test]
    fn zero_sample_rate_is_unavailable() {
        assert!(WavFileBackend::new("a.wav", 0).open().is_err());
    }

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if done() {
                return true;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        done()
    }

    fn wav_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|x| x == "wav"))
            .collect();
        files.sort();
        files
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn each_playback_gets_its_own_file() {
        let out_dir = tempfile::tempdir().unwrap();
        let heard = tempfile::tempdir().unwrap();
        // GNU cp copies each file it is handed into the target directory.
        let player = format!("cp -t {}", heard.path().display());
        let mut out = WavFileBackend::new(out_dir.path().join("alarm.wav"), 8000)
            .with_player(Some(player))
            .open()
            .unwrap();
        out.resume().unwrap();
        out.play(&[0.25; 4]).unwrap();
        out.play(&[-0.5; 6]).unwrap();

        assert!(wait_for(|| wav_files(heard.path()).len() == 2));
        let mut lengths: Vec<u32> = wav_files(heard.path())
            .iter()
            .map(|p| hound::WavReader::open(p).unwrap().len())
            .collect();
        lengths.sort();
        assert_eq!(lengths, vec![4, 6]);

        // Only the latest render stays behind once the players exit.
        let alarm = out_dir.path().join("alarm.wav");
        assert!(wait_for(|| wav_files(out_dir.path()) == vec![alarm.clone()]));
        assert_eq!(hound::WavReader::open(&alarm).unwrap().len(), 6);
    }

    #[test]
    fn blank_player_is_ignored() {
        let backend = WavFileBackend::new("a.wav", 8000).with_player(Some("  ".to_string()));
        assert!(backend.player.is_none());
    }
}
