use smallvec::SmallVec;

use super::utils::{ghost_step, offset, random_tile, retreat_corner};
use super::*;

/// Read-only view of the tick state every ghost plans against.
pub(super) struct GhostContext<'a> {
    pub world: &'a World,
    pub config: &'a GameConfig,
    pub player_pos: Vec2,
    pub player_dir: Direction,
    pub tick: u64,
    pub slowed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct GhostMove {
    pub ghost_id: usize,
    pub to: Vec2,
    pub dir: Direction,
}

impl GhostContext<'_> {
    fn move_period(&self, state: GhostState) -> u64 {
        let mut period = 1;
        if self.slowed {
            period = period.max(self.config.slowed_move_period);
        }
        if state == GhostState::Vulnerable {
            period = period.max(self.config.vulnerable_move_period);
        }
        period.max(1)
    }

    fn target(&self, ghost: &GhostView, rng: &mut Rng) -> Vec2 {
        let ghost_pos = Vec2::new(ghost.x, ghost.y);
        match ghost.personality {
            GhostPersonality::Chaser => self.player_pos,
            GhostPersonality::Ambusher => {
                offset(self.player_pos, self.player_dir, self.config.ambush_lookahead)
            }
            GhostPersonality::Whimsical => {
                if rng.bool(self.config.whimsical_chase_chance) {
                    self.player_pos
                } else {
                    random_tile(self.world, rng)
                }
            }
            GhostPersonality::Shy => {
                if ghost_pos.distance(self.player_pos) < self.config.shy_radius {
                    retreat_corner(self.world)
                } else {
                    self.player_pos
                }
            }
        }
    }
}

/// Decides one ghost's move for this tick without touching shared state.
pub(super) fn plan_ghost_move(
    ctx: &GhostContext<'_>,
    ghost: &GhostInternal,
    rng: &mut Rng,
) -> Option<GhostMove> {
    let view = &ghost.view;
    if view.state == GhostState::Eaten {
        return None;
    }
    if ctx.tick % ctx.move_period(view.state) != 0 {
        return None;
    }
    let pos = Vec2::new(view.x, view.y);

    if view.state == GhostState::InHouse {
        return pace_in_house(ctx.world, ghost, pos);
    }

    let mut legal: SmallVec<[(Direction, Vec2); 4]> = Direction::MOVES
        .into_iter()
        .filter_map(|dir| ghost_step(ctx.world, pos, dir).map(|to| (dir, to)))
        .collect();
    if legal.len() > 1 {
        legal.retain(|(dir, _)| *dir != view.dir.opposite());
    }
    if legal.is_empty() {
        return None;
    }

    rng.shuffle(&mut legal);
    let (dir, to) = if view.state == GhostState::Vulnerable || ctx.config.is_scatter_tick(ctx.tick) {
        legal[rng.pick_index(legal.len())]
    } else {
        let target = ctx.target(view, rng);
        legal
            .iter()
            .copied()
            .min_by_key(|(_, to)| to.distance_squared(target))
            .unwrap_or(legal[0])
    };
    Some(GhostMove {
        ghost_id: view.id,
        to,
        dir,
    })
}

fn pace_in_house(world: &World, ghost: &GhostInternal, pos: Vec2) -> Option<GhostMove> {
    let forward = ghost.pace_dir;
    [forward, forward.opposite()]
        .into_iter()
        .find_map(|dir| {
            ghost_step(world, pos, dir).map(|to| GhostMove {
                ghost_id: ghost.view.id,
                to,
                dir,
            })
        })
}

impl GameEngine {
    /// Plans every ghost against the same snapshot of positions, then writes all
    /// moves in one pass.
    pub(super) fn update_ghosts(&mut self) {
        let ctx = GhostContext {
            world: &self.world,
            config: &self.config,
            player_pos: self.player_pos(),
            player_dir: self.player.view.dir,
            tick: self.tick_counter,
            slowed: self.slow_until.is_some(),
        };
        let rng = &mut self.rng;
        let moves: Vec<GhostMove> = self
            .ghosts
            .iter()
            .filter_map(|ghost| plan_ghost_move(&ctx, ghost, rng))
            .collect();

        for planned in moves {
            let Some(ghost) = self.ghosts.get_mut(planned.ghost_id) else {
                continue;
            };
            ghost.view.x = planned.to.x;
            ghost.view.y = planned.to.y;
            ghost.view.dir = planned.dir;
            if ghost.view.state == GhostState::InHouse {
                ghost.pace_dir = planned.dir;
            }
        }
    }

    /// Promotes the lowest-numbered ghost still in the house onto the door. During
    /// power mode it comes out Vulnerable.
    pub(super) fn release_next_ghost(&mut self) {
        let door = self.world.door;
        let exit = self.world.house_exit;
        let state = if self.power_until.is_some() {
            GhostState::Vulnerable
        } else {
            GhostState::Normal
        };
        let Some(ghost) = self
            .ghosts
            .iter_mut()
            .find(|ghost| ghost.view.state == GhostState::InHouse)
        else {
            return;
        };
        if let Some(door) = door {
            ghost.view.x = door.x;
            ghost.view.y = door.y;
        }
        ghost.view.state = state;
        ghost.view.dir = exit;
        let ghost_id = ghost.view.id;
        tracing::debug!(ghost_id, ?state, "Ghost released from house");
        self.events.push(RuntimeEvent::GhostReleased { ghost_id });
    }

    pub(super) fn return_ghost(&mut self, ghost_id: usize) {
        let Some(ghost) = self.ghosts.get_mut(ghost_id) else {
            return;
        };
        if ghost.view.state != GhostState::Eaten {
            return;
        }
        ghost.view.x = ghost.spawn.x;
        ghost.view.y = ghost.spawn.y;
        ghost.view.state = GhostState::InHouse;
        ghost.view.dir = Direction::None;
        ghost.pace_dir = Direction::Left;
        ghost.unavailable_until = None;
        tracing::debug!(ghost_id, "Eaten ghost back in house");
        self.events.push(RuntimeEvent::GhostReturned { ghost_id });
    }

    pub(super) fn set_power_mode(&mut self, active: bool) {
        for ghost in &mut self.ghosts {
            match (active, ghost.view.state) {
                (true, GhostState::Normal) => ghost.view.state = GhostState::Vulnerable,
                (false, GhostState::Vulnerable) => ghost.view.state = GhostState::Normal,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::world::parse_level;

    fn ghost_at(id: usize, pos: Vec2, personality: GhostPersonality, dir: Direction) -> GhostInternal {
        GhostInternal {
            view: GhostView {
                id,
                x: pos.x,
                y: pos.y,
                dir,
                personality,
                state: GhostState::Normal,
            },
            spawn: pos,
            pace_dir: Direction::Left,
            unavailable_until: None,
        }
    }

    fn context<'a>(world: &'a World, config: &'a GameConfig, player_pos: Vec2) -> GhostContext<'a> {
        GhostContext {
            world,
            config,
            player_pos,
            player_dir: Direction::None,
            tick: 1,
            slowed: false,
        }
    }

    fn no_scatter() -> GameConfig {
        GameConfig {
            scatter_ratio: 0.0,
            ..GameConfig::default()
        }
    }

    #[test]
    fn chaser_steps_toward_player() {
        let world = parse_level(&["WWWWWWW", "WP....W", "WWWWWWW"]).expect("valid layout");
        let config = no_scatter();
        let ctx = context(&world, &config, Vec2::new(1, 1));
        let ghost = ghost_at(0, Vec2::new(4, 1), GhostPersonality::Chaser, Direction::None);
        for seed in 0..20 {
            let mut rng = Rng::new(seed);
            let planned = plan_ghost_move(&ctx, &ghost, &mut rng).expect("ghost moves");
            assert_eq!(planned.dir, Direction::Left);
            assert_eq!(planned.to, Vec2::new(3, 1));
        }
    }

    #[test]
    fn reversal_only_when_no_other_move() {
        let world = parse_level(&["WWWWWWW", "WP....W", "WWWWWWW"]).expect("valid layout");
        let config = no_scatter();
        let ctx = context(&world, &config, Vec2::new(1, 1));

        // Heading right in a corridor: the only non-reversing move is away from the player.
        let ghost = ghost_at(0, Vec2::new(4, 1), GhostPersonality::Chaser, Direction::Right);
        let mut rng = Rng::new(3);
        let planned = plan_ghost_move(&ctx, &ghost, &mut rng).expect("ghost moves");
        assert_eq!(planned.dir, Direction::Right);

        // Dead end: reversing is the only legal move.
        let ghost = ghost_at(0, Vec2::new(5, 1), GhostPersonality::Chaser, Direction::Right);
        let planned = plan_ghost_move(&ctx, &ghost, &mut rng).expect("ghost moves");
        assert_eq!(planned.dir, Direction::Left);
    }

    #[test]
    fn shy_ghost_retreats_when_close() {
        let world = parse_level(&[
            "WWWWWWW",
            "W.....W",
            "W.WWW.W",
            "W..P..W",
            "WWWWWWW",
        ])
        .expect("valid layout");
        let config = no_scatter();
        let ctx = context(&world, &config, Vec2::new(5, 3));
        let ghost = ghost_at(0, Vec2::new(5, 1), GhostPersonality::Shy, Direction::None);
        let mut rng = Rng::new(9);
        assert_eq!(ctx.target(&ghost.view, &mut rng), retreat_corner(&world));
        // A chaser would go down toward the player; the shy ghost heads for the corner.
        let planned = plan_ghost_move(&ctx, &ghost, &mut rng).expect("ghost moves");
        assert_eq!(planned.dir, Direction::Left);
    }

    #[test]
    fn ambusher_targets_ahead_of_player() {
        let world = parse_level(&["WWWWWWWWWWW", "WP........W", "WWWWWWWWWWW"]).expect("valid layout");
        let config = no_scatter();
        let mut ctx = context(&world, &config, Vec2::new(2, 1));
        ctx.player_dir = Direction::Right;
        let ghost = ghost_at(0, Vec2::new(9, 1), GhostPersonality::Ambusher, Direction::None);
        let mut rng = Rng::new(1);
        assert_eq!(ctx.target(&ghost.view, &mut rng), Vec2::new(6, 1));
    }

    fn open_room() -> World {
        parse_level(&[
            "WWWWWWW",
            "W.....W",
            "W.....W",
            "WP....W",
            "W.....W",
            "W.....W",
            "WWWWWWW",
        ])
        .expect("valid layout")
    }

    #[test]
    fn whimsical_ghost_either_chases_or_picks_a_random_tile() {
        let world = open_room();
        let player = Vec2::new(1, 3);
        let ghost = ghost_at(0, Vec2::new(4, 3), GhostPersonality::Whimsical, Direction::None);

        let always = GameConfig {
            whimsical_chase_chance: 1.0,
            ..no_scatter()
        };
        let ctx = context(&world, &always, player);
        for seed in 0..20 {
            assert_eq!(ctx.target(&ghost.view, &mut Rng::new(seed)), player);
        }

        let never = GameConfig {
            whimsical_chase_chance: 0.0,
            ..no_scatter()
        };
        let ctx = context(&world, &never, player);
        let targets: Vec<Vec2> = (0..40)
            .map(|seed| ctx.target(&ghost.view, &mut Rng::new(seed)))
            .collect();
        assert!(targets
            .iter()
            .all(|pos| (0..world.width).contains(&pos.x) && (0..world.height).contains(&pos.y)));
        assert!(targets.iter().any(|pos| *pos != player));

        let config = no_scatter();
        let ctx = context(&world, &config, player);
        let chased = (0..40)
            .filter(|seed| ctx.target(&ghost.view, &mut Rng::new(*seed)) == player)
            .count();
        assert!(chased > 0 && chased < 40);
    }

    #[test]
    fn scatter_ticks_ignore_the_target() {
        let world = open_room();
        let config = GameConfig::default();
        let mut ctx = context(&world, &config, Vec2::new(1, 3));
        let ghost = ghost_at(0, Vec2::new(4, 3), GhostPersonality::Chaser, Direction::None);

        ctx.tick = 1;
        assert!(!config.is_scatter_tick(ctx.tick));
        for seed in 0..20 {
            let planned = plan_ghost_move(&ctx, &ghost, &mut Rng::new(seed)).expect("ghost moves");
            assert_eq!(planned.dir, Direction::Left);
        }

        ctx.tick = config.scatter_cycle_ticks - 1;
        assert!(config.is_scatter_tick(ctx.tick));
        let mut seen = HashSet::new();
        for seed in 0..40 {
            let planned = plan_ghost_move(&ctx, &ghost, &mut Rng::new(seed)).expect("ghost moves");
            assert_eq!(ghost_step(&world, Vec2::new(4, 3), planned.dir), Some(planned.to));
            seen.insert(planned.dir);
        }
        assert!(seen.len() > 1);
        assert!(seen.iter().any(|dir| *dir != Direction::Left));
    }

    #[test]
    fn vulnerable_ghosts_wander_without_reversing() {
        let world = open_room();
        let config = no_scatter();
        let mut ctx = context(&world, &config, Vec2::new(1, 3));
        ctx.tick = config.vulnerable_move_period;
        let mut ghost = ghost_at(0, Vec2::new(4, 3), GhostPersonality::Chaser, Direction::Right);
        ghost.view.state = GhostState::Vulnerable;

        let mut seen = HashSet::new();
        for seed in 0..40 {
            let planned = plan_ghost_move(&ctx, &ghost, &mut Rng::new(seed)).expect("ghost moves");
            assert_ne!(planned.dir, Direction::Left);
            assert_eq!(ghost_step(&world, Vec2::new(4, 3), planned.dir), Some(planned.to));
            seen.insert(planned.dir);
        }
        assert_eq!(
            seen,
            HashSet::from([Direction::Up, Direction::Down, Direction::Right])
        );
    }

    #[test]
    fn vulnerable_ghosts_move_every_other_tick() {
        let world = parse_level(&["WWWWWWW", "WP....W", "WWWWWWW"]).expect("valid layout");
        let config = no_scatter();
        let mut ctx = context(&world, &config, Vec2::new(1, 1));
        let mut ghost = ghost_at(0, Vec2::new(3, 1), GhostPersonality::Chaser, Direction::None);
        ghost.view.state = GhostState::Vulnerable;
        let mut rng = Rng::new(5);
        ctx.tick = 3;
        assert_eq!(plan_ghost_move(&ctx, &ghost, &mut rng), None);
        ctx.tick = 4;
        assert!(plan_ghost_move(&ctx, &ghost, &mut rng).is_some());
    }

    #[test]
    fn slowed_ghosts_skip_ticks() {
        let world = parse_level(&["WWWWWWW", "WP....W", "WWWWWWW"]).expect("valid layout");
        let config = no_scatter();
        let mut ctx = context(&world, &config, Vec2::new(1, 1));
        ctx.slowed = true;
        let ghost = ghost_at(0, Vec2::new(3, 1), GhostPersonality::Chaser, Direction::None);
        let mut rng = Rng::new(5);
        let moved: usize = (1..=10)
            .filter(|tick| {
                ctx.tick = *tick;
                plan_ghost_move(&ctx, &ghost, &mut rng).is_some()
            })
            .count();
        assert_eq!(moved, 5);
    }

    #[test]
    fn eaten_ghosts_do_not_move() {
        let world = parse_level(&["WWWWWWW", "WP....W", "WWWWWWW"]).expect("valid layout");
        let config = no_scatter();
        let ctx = context(&world, &config, Vec2::new(1, 1));
        let mut ghost = ghost_at(0, Vec2::new(3, 1), GhostPersonality::Chaser, Direction::None);
        ghost.view.state = GhostState::Eaten;
        let mut rng = Rng::new(5);
        assert_eq!(plan_ghost_move(&ctx, &ghost, &mut rng), None);
    }

    #[test]
    fn house_pacing_bounces_between_walls() {
        let world =
            parse_level(&["WWWWWWW", "W..P..W", "WWW=WWW", "W 1   W", "WWWWWWW"]).expect("valid layout");
        let config = no_scatter();
        let mut ctx = context(&world, &config, Vec2::new(3, 1));
        let mut ghost = ghost_at(0, Vec2::new(2, 3), GhostPersonality::Chaser, Direction::None);
        ghost.view.state = GhostState::InHouse;
        let mut rng = Rng::new(5);
        let mut xs = Vec::new();
        for tick in 1..=12 {
            ctx.tick = tick;
            if let Some(planned) = plan_ghost_move(&ctx, &ghost, &mut rng) {
                ghost.view.x = planned.to.x;
                ghost.view.y = planned.to.y;
                ghost.pace_dir = planned.dir;
            }
            assert_eq!(ghost.view.y, 3);
            xs.push(ghost.view.x);
        }
        assert!(xs.iter().all(|x| (1..=5).contains(x)));
        assert!(xs.contains(&1) && xs.contains(&5));
    }
}
