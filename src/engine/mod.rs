use std::collections::BTreeSet;

use crate::config::GameConfig;
use crate::constants::{DEFAULT_PLAYER_NAME, GHOST_POINTS, MAX_LIVES, PELLET_POINTS, POWER_PELLET_BONUS};
use crate::levels::LevelCatalog;
use crate::rng::Rng;
use crate::types::{
    BonusEffect, BonusView, CollectibleKind, CollectibleView, Direction, EntityView, GameMode,
    GhostPersonality, GhostState, GhostView, LevelView, PlayerView, RuntimeEvent, SessionStatus,
    Snapshot, Vec2,
};
use crate::world::{emergency_world, World};

mod autopilot;
mod ghost_system;
mod player_system;
mod timers;
mod utils;

use self::timers::{DeferredAction, Timers};

#[derive(Clone, Debug)]
struct PlayerInternal {
    view: PlayerView,
    desired_dir: Direction,
    spawn: Vec2,
}

#[derive(Clone, Debug)]
struct GhostInternal {
    view: GhostView,
    spawn: Vec2,
    pace_dir: Direction,
    /// Set while eaten; the ghost is out of play until the return fires.
    unavailable_until: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct GameEngineOptions {
    pub mode: GameMode,
    pub start_level: u32,
    pub seed: Option<u64>,
    pub player_name: String,
}

impl Default for GameEngineOptions {
    fn default() -> Self {
        Self {
            mode: GameMode::Story,
            start_level: 1,
            seed: None,
            player_name: DEFAULT_PLAYER_NAME.to_string(),
        }
    }
}

/// One game session. Everything advances through [`GameEngine::step`]; timer
/// driven transitions are deferred actions on the same logical clock.
#[derive(Clone, Debug)]
pub struct GameEngine {
    pub config: GameConfig,
    pub world: World,

    catalog: LevelCatalog,
    rng: Rng,
    mode: GameMode,
    start_level: u32,
    level: u32,
    endless_round: u32,
    player: PlayerInternal,
    ghosts: Vec<GhostInternal>,
    bonus: Option<BonusView>,
    timers: Timers,
    events: Vec<RuntimeEvent>,

    status: SessionStatus,
    message: String,
    tick_counter: u64,
    elapsed_ms: u64,
    power_until: Option<u64>,
    slow_until: Option<u64>,
    redraw_requested: bool,
}

impl GameEngine {
    pub fn new(config: GameConfig, catalog: LevelCatalog, options: GameEngineOptions) -> Self {
        let rng = options.seed.map_or_else(Rng::from_entropy, Rng::new);
        let start_level = options.start_level.clamp(1, catalog.count().max(1));
        let world = emergency_world();
        let spawn = world.player_spawn;

        let mut engine = Self {
            player: PlayerInternal {
                view: PlayerView {
                    name: options.player_name,
                    x: spawn.x,
                    y: spawn.y,
                    dir: Direction::None,
                    lives: config.initial_lives,
                    score: 0,
                },
                desired_dir: Direction::None,
                spawn,
            },
            config,
            world,
            catalog,
            rng,
            mode: options.mode,
            start_level,
            level: start_level,
            endless_round: 0,
            ghosts: Vec::new(),
            bonus: None,
            timers: Timers::default(),
            events: Vec::new(),
            status: SessionStatus::Playing,
            message: String::new(),
            tick_counter: 0,
            elapsed_ms: 0,
            power_until: None,
            slow_until: None,
            redraw_requested: false,
        };
        engine.start_session();
        engine
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.status.is_terminal() {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        let player_start = self.player_pos();
        self.resolve_intent();
        self.apply_player_pickups();
        self.move_player();
        self.apply_player_pickups();

        let mut handled = BTreeSet::new();
        let lives_before = self.player.view.lives;
        self.resolve_ghost_collisions(None, &[], &mut handled);

        if !self.status.is_terminal() {
            let ghost_start: Vec<Vec2> = self
                .ghosts
                .iter()
                .map(|ghost| Vec2::new(ghost.view.x, ghost.view.y))
                .collect();
            self.update_ghosts();
            let player_from = (self.player.view.lives == lives_before).then_some(player_start);
            self.resolve_ghost_collisions(player_from, &ghost_start, &mut handled);
        }

        if !self.status.is_terminal() && self.world.remaining_collectibles() == 0 {
            self.clear_level();
        }

        if !self.status.is_terminal() {
            for action in self.timers.take_due(self.elapsed_ms) {
                self.run_deferred(action);
            }
        }

        self.redraw_requested = true;
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            now_ms: self.elapsed_ms,
            tick_interval_ms: self.tick_interval_ms(),
            mode: self.mode,
            level: self.level,
            endless_round: self.endless_round,
            status: self.status,
            message: self.message.clone(),
            player: self.player.view.clone(),
            ghosts: self.ghosts.iter().map(|ghost| ghost.view.clone()).collect(),
            collectibles: self
                .world
                .collectibles
                .iter()
                .map(|(pos, kind)| CollectibleView {
                    x: pos.x,
                    y: pos.y,
                    kind: *kind,
                })
                .collect(),
            bonus: self.bonus.clone(),
            power_until: self.power_until,
            slow_until: self.slow_until,
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    /// Every drawable thing currently in play. Eaten ghosts are left out until
    /// they are back in the house.
    pub fn entities(&self) -> Vec<EntityView> {
        let mut entities: Vec<EntityView> = self
            .world
            .walls()
            .map(|(pos, shape)| EntityView::Wall {
                x: pos.x,
                y: pos.y,
                shape,
            })
            .collect();
        if let Some(door) = self.world.door {
            entities.push(EntityView::Door {
                x: door.x,
                y: door.y,
            });
        }
        entities.extend(
            self.world
                .collectibles
                .iter()
                .map(|(pos, kind)| EntityView::Collectible {
                    x: pos.x,
                    y: pos.y,
                    collectible: *kind,
                }),
        );
        if let Some(bonus) = &self.bonus {
            entities.push(EntityView::Bonus {
                x: bonus.x,
                y: bonus.y,
                effect: bonus.effect,
            });
        }
        entities.push(EntityView::Player {
            x: self.player.view.x,
            y: self.player.view.y,
            dir: self.player.view.dir,
        });
        entities.extend(
            self.ghosts
                .iter()
                .filter(|ghost| ghost.unavailable_until.is_none())
                .map(|ghost| EntityView::Ghost {
                    id: ghost.view.id,
                    x: ghost.view.x,
                    y: ghost.view.y,
                    personality: ghost.view.personality,
                    state: ghost.view.state,
                }),
        );
        entities
    }

    pub fn level_view(&self) -> LevelView {
        self.world.to_view(self.level)
    }

    /// Last call before the next tick wins. `None` drops any pending turn.
    pub fn set_direction(&mut self, dir: Direction) {
        self.player.desired_dir = dir;
    }

    /// True once after every completed tick.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.config
            .tick_interval_ms(self.endless_round, self.world.eaten_fraction())
    }

    /// Restarts from the session's first level with a zero score and full lives.
    pub fn retry(&mut self) {
        tracing::info!(level = self.start_level, "Retrying session");
        self.start_session();
    }

    pub fn score(&self) -> u32 {
        self.player.view.score
    }

    pub fn lives(&self) -> u32 {
        self.player.view.lives
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_ended(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn endless_round(&self) -> u32 {
        self.endless_round
    }

    pub fn player_name(&self) -> &str {
        &self.player.view.name
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn player_pos(&self) -> Vec2 {
        Vec2::new(self.player.view.x, self.player.view.y)
    }

    fn start_session(&mut self) {
        self.status = SessionStatus::Playing;
        self.endless_round = 0;
        self.player.view.score = 0;
        self.player.view.lives = self.config.initial_lives;
        self.events.push(RuntimeEvent::SessionStarted {
            level: self.start_level,
            mode: self.mode,
        });
        self.load_level(self.start_level);
    }

    /// Rebuilds the whole board; only the player's name, score and lives carry over.
    fn load_level(&mut self, number: u32) {
        self.level = number;
        self.world = self.catalog.load_or_emergency(number);

        let spawn = self.world.player_spawn;
        self.player.spawn = spawn;
        self.player.view.x = spawn.x;
        self.player.view.y = spawn.y;
        self.player.view.dir = Direction::None;
        self.player.desired_dir = Direction::None;

        self.ghosts = self
            .world
            .ghost_spawns
            .iter()
            .enumerate()
            .map(|(id, spawn)| GhostInternal {
                view: GhostView {
                    id,
                    x: spawn.position.x,
                    y: spawn.position.y,
                    dir: Direction::None,
                    personality: spawn.personality,
                    state: GhostState::InHouse,
                },
                spawn: spawn.position,
                pace_dir: Direction::Left,
                unavailable_until: None,
            })
            .collect();

        self.bonus = None;
        self.power_until = None;
        self.slow_until = None;
        self.timers.clear();
        let now = self.elapsed_ms;
        self.timers.schedule(
            now.saturating_add(self.config.house_release_interval_ms),
            DeferredAction::HouseRelease,
        );
        self.timers.schedule(
            now.saturating_add(self.config.bonus_spawn_interval_ms),
            DeferredAction::BonusSpawn,
        );

        self.message = match self.mode {
            GameMode::Story => format!("Level {number}"),
            GameMode::Endless => format!("Round {} - Level {number}", self.endless_round + 1),
        };
        tracing::info!(
            level = number,
            mode = ?self.mode,
            round = self.endless_round,
            collectibles = self.world.total_collectibles,
            ghosts = self.ghosts.len(),
            "Level started"
        );
        self.events.push(RuntimeEvent::LevelStarted { level: number });
    }

    fn clear_level(&mut self) {
        let cleared = self.level;
        tracing::info!(level = cleared, score = self.player.view.score, "Level cleared");
        self.events.push(RuntimeEvent::LevelCleared { level: cleared });
        match self.mode {
            GameMode::Story if cleared >= self.catalog.count() => self.finish(SessionStatus::Completed),
            GameMode::Story => self.load_level(cleared + 1),
            GameMode::Endless => {
                self.endless_round += 1;
                let count = self.catalog.count().max(1) as i32;
                let next = self.rng.int(1, count) as u32;
                self.load_level(next);
            }
        }
    }

    fn finish(&mut self, status: SessionStatus) {
        let score = self.player.view.score;
        self.status = status;
        self.timers.clear();
        match status {
            SessionStatus::Completed => {
                self.message = "All levels cleared!".to_string();
                self.events.push(RuntimeEvent::Completed { score });
            }
            _ => {
                self.message = "Game Over".to_string();
                self.events.push(RuntimeEvent::GameOver { score });
            }
        }
        tracing::info!(?status, score, level = self.level, "Session ended");
    }

    fn run_deferred(&mut self, action: DeferredAction) {
        let now = self.elapsed_ms;
        match action {
            DeferredAction::PowerExpiry => self.end_power_mode(),
            DeferredAction::SlowExpiry => self.end_slow_effect(),
            DeferredAction::BonusSpawn => {
                self.spawn_bonus();
                self.timers.schedule(
                    now.saturating_add(self.config.bonus_spawn_interval_ms),
                    DeferredAction::BonusSpawn,
                );
            }
            DeferredAction::HouseRelease => {
                self.release_next_ghost();
                self.timers.schedule(
                    now.saturating_add(self.config.house_release_interval_ms),
                    DeferredAction::HouseRelease,
                );
            }
            DeferredAction::GhostReturn { ghost_id } => self.return_ghost(ghost_id),
        }
    }

    /// Handles every ghost sharing the player's tile, or swapping tiles with it
    /// when `player_from`/`ghost_from` give the positions at the start of the move.
    /// Each ghost is resolved at most once per tick. Ghosts still in the house
    /// are not in play.
    fn resolve_ghost_collisions(
        &mut self,
        mut player_from: Option<Vec2>,
        ghost_from: &[Vec2],
        handled: &mut BTreeSet<usize>,
    ) {
        for idx in 0..self.ghosts.len() {
            if self.status.is_terminal() {
                return;
            }
            let candidate = &self.ghosts[idx];
            if handled.contains(&idx)
                || candidate.unavailable_until.is_some()
                || candidate.view.state == GhostState::InHouse
            {
                continue;
            }
            let player = self.player_pos();
            let ghost = Vec2::new(self.ghosts[idx].view.x, self.ghosts[idx].view.y);
            let overlap = ghost == player;
            let swapped = match (player_from, ghost_from.get(idx)) {
                (Some(player_before), Some(ghost_before)) => {
                    player_before == ghost && *ghost_before == player
                }
                _ => false,
            };
            if !overlap && !swapped {
                continue;
            }

            handled.insert(idx);
            if self.ghosts[idx].view.state == GhostState::Vulnerable {
                self.eat_ghost(idx);
            } else {
                self.kill_player();
                player_from = None;
            }
        }
    }

    fn eat_ghost(&mut self, idx: usize) {
        let due = self
            .elapsed_ms
            .saturating_add(self.config.eaten_return_delay_ms);
        let ghost = &mut self.ghosts[idx];
        ghost.view.state = GhostState::Eaten;
        ghost.unavailable_until = Some(due);
        let ghost_id = ghost.view.id;
        self.player.view.score += GHOST_POINTS;
        self.timers
            .schedule(due, DeferredAction::GhostReturn { ghost_id });
        tracing::debug!(ghost_id, due, "Ghost eaten");
        self.events.push(RuntimeEvent::GhostEaten { ghost_id });
    }

    fn kill_player(&mut self) {
        let lives_left = self.player.view.lives.saturating_sub(1);
        self.player.view.lives = lives_left;
        tracing::debug!(lives_left, "Player caught");
        self.events.push(RuntimeEvent::PlayerDied { lives_left });
        if lives_left == 0 {
            self.finish(SessionStatus::GameOver);
            return;
        }
        let spawn = self.player.spawn;
        self.player.view.x = spawn.x;
        self.player.view.y = spawn.y;
        self.player.view.dir = Direction::None;
        self.player.desired_dir = Direction::None;
        self.message = format!("Caught! {lives_left} lives left");
    }
}
