use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AMBUSH_LOOKAHEAD, BASE_TICK_MS, BONUS_SPAWN_INTERVAL_MS, DEFAULT_LIVES, DEPLETION_SPEEDUP_MS,
    EATEN_RETURN_DELAY_MS, ENDLESS_ROUND_SPEEDUP_MS, HOUSE_RELEASE_INTERVAL_MS, MIN_TICK_MS,
    POWER_DURATION_MS, SCATTER_CYCLE_TICKS, SCATTER_RATIO, SHY_RADIUS, SLOWED_MOVE_PERIOD,
    SLOW_DURATION_MS, VULNERABLE_MOVE_PERIOD, WHIMSICAL_CHASE_CHANCE,
};
use crate::error::ConfigError;

/// Tunable rules of a session. Every field falls back to its default when absent
/// from a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub initial_lives: u32,
    pub base_tick_ms: u64,
    pub min_tick_ms: u64,
    pub depletion_speedup_ms: u64,
    pub endless_round_speedup_ms: u64,
    pub power_duration_ms: u64,
    pub bonus_spawn_interval_ms: u64,
    pub slow_duration_ms: u64,
    pub house_release_interval_ms: u64,
    pub eaten_return_delay_ms: u64,
    pub scatter_cycle_ticks: u64,
    pub scatter_ratio: f32,
    pub vulnerable_move_period: u64,
    pub slowed_move_period: u64,
    pub ambush_lookahead: i32,
    pub shy_radius: f32,
    pub whimsical_chase_chance: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_lives: DEFAULT_LIVES,
            base_tick_ms: BASE_TICK_MS,
            min_tick_ms: MIN_TICK_MS,
            depletion_speedup_ms: DEPLETION_SPEEDUP_MS,
            endless_round_speedup_ms: ENDLESS_ROUND_SPEEDUP_MS,
            power_duration_ms: POWER_DURATION_MS,
            bonus_spawn_interval_ms: BONUS_SPAWN_INTERVAL_MS,
            slow_duration_ms: SLOW_DURATION_MS,
            house_release_interval_ms: HOUSE_RELEASE_INTERVAL_MS,
            eaten_return_delay_ms: EATEN_RETURN_DELAY_MS,
            scatter_cycle_ticks: SCATTER_CYCLE_TICKS,
            scatter_ratio: SCATTER_RATIO,
            vulnerable_move_period: VULNERABLE_MOVE_PERIOD,
            slowed_move_period: SLOWED_MOVE_PERIOD,
            ambush_lookahead: AMBUSH_LOOKAHEAD,
            shy_radius: SHY_RADIUS,
            whimsical_chase_chance: WHIMSICAL_CHASE_CHANCE,
        }
    }
}

impl GameConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a JSON config file, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), "Loaded game config");
        Ok(config)
    }

    /// Interval until the next tick. Shrinks with each endless round and as the
    /// level's collectibles are eaten, never below `min_tick_ms`.
    pub fn tick_interval_ms(&self, endless_round: u32, eaten_fraction: f32) -> u64 {
        let floor = self.min_tick_ms.max(1);
        let round_cut = self
            .endless_round_speedup_ms
            .saturating_mul(endless_round as u64);
        let depletion_cut =
            (self.depletion_speedup_ms as f32 * eaten_fraction.clamp(0.0, 1.0)).round() as u64;
        self.base_tick_ms
            .saturating_sub(round_cut)
            .saturating_sub(depletion_cut)
            .max(floor)
    }

    /// Whether `tick` falls in the back end of the behaviour cycle, where ghosts
    /// wander randomly regardless of personality.
    pub fn is_scatter_tick(&self, tick: u64) -> bool {
        if self.scatter_cycle_ticks == 0 || self.scatter_ratio <= 0.0 {
            return false;
        }
        let window = ((self.scatter_cycle_ticks as f32) * self.scatter_ratio.min(1.0)).round() as u64;
        tick % self.scatter_cycle_ticks >= self.scatter_cycle_ticks.saturating_sub(window)
    }
}
