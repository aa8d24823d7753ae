use crate::rng::Rng;
use crate::types::{Direction, Vec2};
use crate::world::{Tile, World};

pub(super) fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Unwrapped offset; targets may lie outside the grid.
pub(super) fn offset(pos: Vec2, dir: Direction, distance: i32) -> Vec2 {
    let (dx, dy) = dir.delta();
    Vec2::new(pos.x + dx * distance, pos.y + dy * distance)
}

pub(super) fn random_tile(world: &World, rng: &mut Rng) -> Vec2 {
    Vec2::new(
        rng.int(0, world.width - 1),
        rng.int(0, world.height - 1),
    )
}

pub(super) fn retreat_corner(world: &World) -> Vec2 {
    Vec2::new(0, world.height - 1)
}

/// Where a ghost ends up moving `dir` from `from`, if it may. The door is never
/// entered by walking, and a ghost on the door may only leave away from the house.
pub(super) fn ghost_step(world: &World, from: Vec2, dir: Direction) -> Option<Vec2> {
    if dir == Direction::None {
        return None;
    }
    let to = world.step(from, dir);
    match world.tile(to) {
        Tile::Wall(_) | Tile::Door => None,
        Tile::Empty if world.is_door(from) && dir == world.house_exit.opposite() => None,
        Tile::Empty => Some(to),
    }
}

pub(super) fn player_step(world: &World, from: Vec2, dir: Direction) -> Option<Vec2> {
    if dir == Direction::None {
        return None;
    }
    let to = world.step(from, dir);
    (!world.blocks_player(to)).then_some(to)
}

pub(super) fn direction_between(world: &World, from: Vec2, to: Vec2) -> Direction {
    Direction::MOVES
        .into_iter()
        .find(|dir| world.step(from, *dir) == to)
        .unwrap_or(Direction::None)
}
