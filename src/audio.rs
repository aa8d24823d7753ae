//! Sound cues raised by the simulation and the sinks that play them.
//!
//! The core never loads assets; a front end plugs in its own [`AudioSink`].
//! Missing audio is not an error, the [`NullAudio`] sink simply drops cues.

use serde::Serialize;

use crate::types::RuntimeEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCue {
    Intro,
    Waka,
    PowerPellet,
    GhostEaten,
    Death,
    LevelWin,
    GameOver,
}

impl RuntimeEvent {
    /// The cue this event triggers, if any. Each cue has exactly one source event.
    pub fn audio_cue(&self) -> Option<AudioCue> {
        match self {
            RuntimeEvent::SessionStarted { .. } => Some(AudioCue::Intro),
            RuntimeEvent::PelletEaten { .. } => Some(AudioCue::Waka),
            RuntimeEvent::PowerPelletEaten { .. } => Some(AudioCue::PowerPellet),
            RuntimeEvent::GhostEaten { .. } => Some(AudioCue::GhostEaten),
            RuntimeEvent::PlayerDied { .. } => Some(AudioCue::Death),
            RuntimeEvent::LevelCleared { .. } => Some(AudioCue::LevelWin),
            RuntimeEvent::GameOver { .. } => Some(AudioCue::GameOver),
            _ => None,
        }
    }
}

pub trait AudioSink: Send {
    fn play(&mut self, cue: AudioCue);

    fn stop_all(&mut self) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: AudioCue) {}
}

/// Logs every cue at debug level. Useful for headless runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAudio;

impl AudioSink for TracingAudio {
    fn play(&mut self, cue: AudioCue) {
        tracing::debug!(?cue, "Audio cue");
    }

    fn stop_all(&mut self) {
        tracing::debug!("Audio stopped");
    }
}
