use pathfinding::prelude::bfs;

use super::utils::{direction_between, manhattan, player_step};
use super::*;

const DANGER_RADIUS: i32 = 2;

impl GameEngine {
    /// Scripted player input: run from a nearby threat, otherwise take the
    /// shortest safe path to the closest collectible.
    pub fn autopilot_direction(&self) -> Direction {
        let pos = self.player_pos();
        let threats: Vec<Vec2> = self
            .ghosts
            .iter()
            .filter(|ghost| ghost.view.state == GhostState::Normal)
            .map(|ghost| Vec2::new(ghost.view.x, ghost.view.y))
            .collect();

        if threats
            .iter()
            .any(|threat| manhattan(*threat, pos) <= DANGER_RADIUS)
        {
            return self.choose_escape_direction(pos, &threats);
        }
        self.choose_collectible_direction(pos, &threats)
            .unwrap_or(self.player.view.dir)
    }

    fn choose_escape_direction(&self, pos: Vec2, threats: &[Vec2]) -> Direction {
        Direction::MOVES
            .into_iter()
            .filter_map(|dir| player_step(&self.world, pos, dir).map(|to| (dir, to)))
            .max_by_key(|(_, to)| {
                threats
                    .iter()
                    .map(|threat| manhattan(*threat, *to))
                    .min()
                    .unwrap_or(i32::MAX)
            })
            .map(|(dir, _)| dir)
            .unwrap_or(Direction::None)
    }

    fn choose_collectible_direction(&self, pos: Vec2, threats: &[Vec2]) -> Option<Direction> {
        let path = bfs(
            &pos,
            |cell| {
                Direction::MOVES
                    .into_iter()
                    .filter_map(|dir| player_step(&self.world, *cell, dir))
                    .filter(|next| !threats.contains(next))
                    .collect::<Vec<_>>()
            },
            |cell| self.world.collectibles.contains_key(cell),
        )?;
        let next = *path.get(1)?;
        Some(direction_between(&self.world, pos, next))
    }
}
