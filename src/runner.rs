//! Front-end facing wrapper around [`GameEngine`].
//!
//! A [`GameRunner`] owns one session plus its collaborators: something that
//! draws, something that plays sounds and an optional score store. Front ends
//! either call [`GameRunner::tick`] themselves or hand the runner to
//! [`GameRunner::run_realtime`], which paces ticks with a tokio interval.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::audio::AudioSink;
use crate::engine::GameEngine;
use crate::score_store::ScoreStore;
use crate::types::{Direction, EntityView, LevelView, RuntimeEvent, SessionStatus, Snapshot};

pub trait Renderer: Send {
    /// Called at most once per tick, after the tick has fully resolved.
    fn draw(&mut self, level: &LevelView, entities: &[EntityView], snapshot: &Snapshot);
}

/// Discards every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw(&mut self, _level: &LevelView, _entities: &[EntityView], _snapshot: &Snapshot) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerCommand {
    Turn(Direction),
    Retry,
    Quit,
}

pub struct GameRunner {
    engine: GameEngine,
    renderer: Box<dyn Renderer>,
    audio: Box<dyn AudioSink>,
    scores: Option<ScoreStore>,
    autopilot: bool,
    score_saved: bool,
    level_view: LevelView,
}

impl GameRunner {
    pub fn new(
        engine: GameEngine,
        renderer: Box<dyn Renderer>,
        audio: Box<dyn AudioSink>,
        scores: Option<ScoreStore>,
    ) -> Self {
        let level_view = engine.level_view();
        Self {
            engine,
            renderer,
            audio,
            scores,
            autopilot: false,
            score_saved: false,
            level_view,
        }
    }

    pub fn with_autopilot(mut self, enabled: bool) -> Self {
        self.autopilot = enabled;
        self
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn level_view(&self) -> &LevelView {
        &self.level_view
    }

    pub fn set_direction(&mut self, dir: Direction) {
        self.engine.set_direction(dir);
    }

    pub fn retry(&mut self) {
        self.audio.stop_all();
        self.engine.retry();
        self.level_view = self.engine.level_view();
        self.score_saved = false;
    }

    /// Advances the session by one tick and notifies every collaborator.
    /// Returns the snapshot with the events raised since the previous call.
    pub fn tick(&mut self) -> Snapshot {
        if self.autopilot && !self.engine.is_ended() {
            let dir = self.engine.autopilot_direction();
            self.engine.set_direction(dir);
        }
        let dt_ms = self.engine.tick_interval_ms();
        self.engine.step(dt_ms);
        let snapshot = self.engine.build_snapshot(true);

        for event in &snapshot.events {
            if matches!(event, RuntimeEvent::LevelStarted { .. }) {
                self.level_view = self.engine.level_view();
            }
            if let Some(cue) = event.audio_cue() {
                self.audio.play(cue);
            }
        }

        if self.engine.take_redraw_request() {
            let entities = self.engine.entities();
            self.renderer.draw(&self.level_view, &entities, &snapshot);
        }

        if snapshot.status.is_terminal() && !self.score_saved {
            self.score_saved = true;
            if let Some(store) = &self.scores {
                store.record_session(
                    self.engine.player_name(),
                    self.engine.level(),
                    self.engine.score(),
                );
            }
        }
        snapshot
    }

    /// Ticks on a timer until the session ends (when `exit_on_end` is set), a
    /// [`RunnerCommand::Quit`] arrives or the command channel closes while
    /// nothing is left to play.
    pub async fn run_realtime(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<RunnerCommand>,
        exit_on_end: bool,
    ) -> SessionStatus {
        let mut period = self.engine.tick_interval_ms();
        let mut ticker = build_interval(period);
        let mut listening = true;
        tracing::info!(
            level = self.engine.level(),
            mode = ?self.engine.mode(),
            period,
            "Realtime loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.engine.is_ended() {
                        if exit_on_end || !listening {
                            break;
                        }
                        continue;
                    }
                    self.tick();
                    let next = self.engine.tick_interval_ms();
                    if next != period {
                        tracing::debug!(from = period, to = next, "Tick interval changed");
                        period = next;
                        ticker = build_interval(period);
                    }
                }
                command = commands.recv(), if listening => match command {
                    Some(RunnerCommand::Turn(dir)) => self.set_direction(dir),
                    Some(RunnerCommand::Retry) => self.retry(),
                    Some(RunnerCommand::Quit) => break,
                    None => listening = false,
                },
            }
        }

        self.audio.stop_all();
        let status = self.engine.status();
        tracing::info!(
            ?status,
            score = self.engine.score(),
            tick = self.engine.tick(),
            "Realtime loop stopped"
        );
        status
    }
}

fn build_interval(period_ms: u64) -> Interval {
    let period = Duration::from_millis(period_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
