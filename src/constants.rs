pub const DEFAULT_LIVES: u32 = 3;
pub const MAX_LIVES: u32 = 9;

pub const PELLET_POINTS: u32 = 10;
pub const POWER_PELLET_BONUS: u32 = 40;
pub const GHOST_POINTS: u32 = 200;

pub const BASE_TICK_MS: u64 = 200;
pub const MIN_TICK_MS: u64 = 50;
pub const DEPLETION_SPEEDUP_MS: u64 = 60;
pub const ENDLESS_ROUND_SPEEDUP_MS: u64 = 15;

pub const POWER_DURATION_MS: u64 = 10_000;
pub const BONUS_SPAWN_INTERVAL_MS: u64 = 15_000;
pub const SLOW_DURATION_MS: u64 = 10_000;
pub const HOUSE_RELEASE_INTERVAL_MS: u64 = 5_000;
pub const EATEN_RETURN_DELAY_MS: u64 = 3_000;

pub const SCATTER_CYCLE_TICKS: u64 = 80;
pub const SCATTER_RATIO: f32 = 0.25;
pub const VULNERABLE_MOVE_PERIOD: u64 = 2;
pub const SLOWED_MOVE_PERIOD: u64 = 2;

pub const AMBUSH_LOOKAHEAD: i32 = 4;
pub const SHY_RADIUS: f32 = 8.0;
pub const WHIMSICAL_CHASE_CHANCE: f32 = 0.5;

pub const HIGH_SCORE_LIMIT: usize = 10;
pub const DEFAULT_PLAYER_NAME: &str = "PLAYER";

pub const DOOR_CODE: char = '=';
pub const PELLET_CODES: [char; 2] = ['o', '.'];
pub const POWER_PELLET_CODE: char = 'O';
pub const PLAYER_CODES: [char; 2] = ['P', 'C'];

/// Smallest layout that still has something to eat, used when a level cannot be loaded.
pub const EMERGENCY_LAYOUT: [&str; 5] = [
    "WWWWWWW",
    "W.....W",
    "W.WWW.W",
    "W..P..W",
    "WWWWWWW",
];
