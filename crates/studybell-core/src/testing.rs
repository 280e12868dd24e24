//! Test doubles shared by unit tests, integration tests and the CLI tests.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, NaiveDateTime};

use crate::audio::{AlarmStyle, AudioBackend, AudioOutput, OutputState};
use crate::dispatch::{AlarmPlayer, NotificationPermission, PlatformNotification, PlatformNotifier};
use crate::error::{AudioError, NotifyError};
use crate::schedule::{ScheduleEntry, Weekday};

/// 2026-10-12 (a Monday) at `h:m:s`.
pub fn monday_at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 12)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .unwrap_or_default()
}

pub fn entry(id: &str, subject: &str, day: Weekday, start: &str, end: &str) -> ScheduleEntry {
    ScheduleEntry {
        id: id.to_string(),
        subject: subject.to_string(),
        day,
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct NotifierLog {
    sent: Vec<PlatformNotification>,
    requests: usize,
}

/// Records every notification it is asked to deliver.
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    permission: NotificationPermission,
    answer: NotificationPermission,
    fail: bool,
    log: Arc<Mutex<NotifierLog>>,
}

impl RecordingNotifier {
    fn with(permission: NotificationPermission, answer: NotificationPermission) -> Self {
        Self {
            permission,
            answer,
            fail: false,
            log: Arc::default(),
        }
    }

    pub fn granted() -> Self {
        Self::with(NotificationPermission::Granted, NotificationPermission::Granted)
    }

    pub fn denied() -> Self {
        Self::with(NotificationPermission::Denied, NotificationPermission::Denied)
    }

    /// Undecided until prompted; the prompt answers `answer`.
    pub fn undecided(answer: NotificationPermission) -> Self {
        Self::with(NotificationPermission::Default, answer)
    }

    /// Every delivery fails.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn sent(&self) -> Vec<PlatformNotification> {
        lock(&self.log).sent.clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.log).requests
    }
}

impl PlatformNotifier for RecordingNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&mut self) -> NotificationPermission {
        lock(&self.log).requests += 1;
        self.permission = self.answer;
        self.permission
    }

    fn notify(&mut self, notification: &PlatformNotification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::DeliveryFailed("recording notifier set to fail".to_string()));
        }
        lock(&self.log).sent.push(notification.clone());
        Ok(())
    }
}

/// Records requested alarm styles instead of playing them.
#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    plays: Arc<Mutex<Vec<AlarmStyle>>>,
}

impl RecordingPlayer {
    pub fn plays(&self) -> Vec<AlarmStyle> {
        lock(&self.plays).clone()
    }
}

impl AlarmPlayer for RecordingPlayer {
    fn play_alarm(&mut self, style: AlarmStyle) {
        lock(&self.plays).push(style);
    }
}

#[derive(Debug, Default)]
struct BackendLog {
    played: Vec<usize>,
    opens: usize,
    resumes: usize,
}

/// In-memory audio backend. Records sample counts per cue.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    initial: OutputState,
    fail: bool,
    sample_rate: u32,
    log: Arc<Mutex<BackendLog>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            initial: OutputState::Running,
            fail: false,
            sample_rate: 8000,
            log: Arc::default(),
        }
    }
}

impl MemoryBackend {
    /// Outputs start suspended and need a resume.
    pub fn suspended() -> Self {
        Self {
            initial: OutputState::Suspended,
            ..Self::default()
        }
    }

    /// Opening always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sample count of each cue played, in order.
    pub fn played(&self) -> Vec<usize> {
        lock(&self.log).played.clone()
    }

    pub fn opens(&self) -> usize {
        lock(&self.log).opens
    }

    pub fn resumes(&self) -> usize {
        lock(&self.log).resumes
    }
}

impl AudioBackend for MemoryBackend {
    fn open(&mut self) -> Result<Box<dyn AudioOutput>, AudioError> {
        if self.fail {
            return Err(AudioError::Unavailable("memory backend set to fail".to_string()));
        }
        lock(&self.log).opens += 1;
        Ok(Box::new(MemoryOutput {
            state: self.initial,
            sample_rate: self.sample_rate,
            log: Arc::clone(&self.log),
        }))
    }
}

struct MemoryOutput {
    state: OutputState,
    sample_rate: u32,
    log: Arc<Mutex<BackendLog>>,
}

impl AudioOutput for MemoryOutput {
    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.state == OutputState::Closed {
            return Err(AudioError::Closed);
        }
        lock(&self.log).resumes += 1;
        self.state = OutputState::Running;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        if self.state != OutputState::Running {
            return Err(AudioError::Closed);
        }
        lock(&self.log).played.push(samples.len());
        Ok(())
    }

    fn close(&mut self) {
        self.state = OutputState::Closed;
    }
}
