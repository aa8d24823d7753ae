use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::constants::{
    DOOR_CODE, EMERGENCY_LAYOUT, PELLET_CODES, PLAYER_CODES, POWER_PELLET_CODE,
};
use crate::error::LevelError;
use crate::types::{CollectibleKind, Direction, GhostPersonality, LevelView, Vec2, WallShape};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Empty,
    Wall(WallShape),
    Door,
}

impl Tile {
    pub fn blocks_player(self) -> bool {
        !matches!(self, Tile::Empty)
    }

    fn code(self) -> char {
        match self {
            Tile::Empty => ' ',
            Tile::Wall(shape) => shape.code(),
            Tile::Door => DOOR_CODE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GhostSpawn {
    pub position: Vec2,
    pub personality: GhostPersonality,
}

/// A parsed level: the static tile grid plus the initial placement of every entity.
#[derive(Clone, Debug)]
pub struct World {
    pub width: i32,
    pub height: i32,
    tiles: Vec<Tile>,
    pub collectibles: BTreeMap<Vec2, CollectibleKind>,
    pub total_collectibles: usize,
    pub player_spawn: Vec2,
    pub ghost_spawns: Vec<GhostSpawn>,
    pub door: Option<Vec2>,
    /// Direction a ghost standing on the door takes to leave the house.
    pub house_exit: Direction,
    /// Open tiles the player can walk to from its spawn.
    pub reachable: BTreeSet<Vec2>,
}

/// Parses an ordered list of text rows into a [`World`].
///
/// The first row fixes the width; shorter rows are padded with empty tiles and
/// longer ones are cut. Unrecognised characters are empty space. Only the first
/// player marker in row-major order counts.
pub fn parse_level<S: AsRef<str>>(rows: &[S]) -> Result<World, LevelError> {
    let mut rows: Vec<&str> = rows
        .iter()
        .map(|row| row.as_ref().trim_end_matches('\r'))
        .collect();
    while rows.last().is_some_and(|row| row.is_empty()) {
        rows.pop();
    }
    let Some(first) = rows.first() else {
        return Err(LevelError::Empty);
    };
    let width = first.chars().count();
    if width == 0 {
        return Err(LevelError::ZeroWidth);
    }

    let mut world = scan_rows(&rows, width);
    if world.tile(world.player_spawn).blocks_player() {
        return Err(LevelError::NoOpenTile);
    }
    world.drop_unreachable_collectibles();
    if world.collectibles.is_empty() {
        return Err(LevelError::NoCollectibles);
    }
    Ok(world)
}

/// The built-in layout used whenever a level cannot be loaded.
pub fn emergency_world() -> World {
    scan_rows(&EMERGENCY_LAYOUT, EMERGENCY_LAYOUT[0].len())
}

fn scan_rows(rows: &[&str], width: usize) -> World {
    let height = rows.len();
    let mut tiles = vec![Tile::Empty; width * height];
    let mut collectibles = BTreeMap::new();
    let mut player_spawn: Option<Vec2> = None;
    let mut ghost_spawns = Vec::new();
    let mut door = None;

    for (y, row) in rows.iter().enumerate() {
        for (x, code) in row.chars().take(width).enumerate() {
            let pos = Vec2::new(x as i32, y as i32);
            let tile = &mut tiles[y * width + x];
            if let Some(shape) = WallShape::from_code(code) {
                *tile = Tile::Wall(shape);
            } else if code == DOOR_CODE {
                *tile = Tile::Door;
                if door.is_none() {
                    door = Some(pos);
                }
            } else if PELLET_CODES.contains(&code) {
                collectibles.insert(pos, CollectibleKind::Pellet);
            } else if code == POWER_PELLET_CODE {
                collectibles.insert(pos, CollectibleKind::PowerPellet);
            } else if PLAYER_CODES.contains(&code) {
                if player_spawn.is_none() {
                    player_spawn = Some(pos);
                } else {
                    tracing::debug!(x, y, "Ignoring duplicate player spawn");
                }
            } else if let Some(personality) = GhostPersonality::from_code(code) {
                ghost_spawns.push(GhostSpawn {
                    position: pos,
                    personality,
                });
            }
        }
    }

    let player_spawn = player_spawn.unwrap_or_else(|| {
        let synthesized = synthesize_spawn(&tiles, width, &collectibles);
        tracing::debug!(x = synthesized.x, y = synthesized.y, "No player spawn in layout, synthesized one");
        synthesized
    });
    let house_exit = house_exit_direction(door, &ghost_spawns);
    let total_collectibles = collectibles.len();

    let mut world = World {
        width: width as i32,
        height: height as i32,
        tiles,
        collectibles,
        total_collectibles,
        player_spawn,
        ghost_spawns,
        door,
        house_exit,
        reachable: BTreeSet::new(),
    };
    world.reachable = world.build_reachable(player_spawn);
    world
}

/// First open tile without a collectible, then any open tile.
fn synthesize_spawn(
    tiles: &[Tile],
    width: usize,
    collectibles: &BTreeMap<Vec2, CollectibleKind>,
) -> Vec2 {
    let to_pos = |idx: usize| Vec2::new((idx % width) as i32, (idx / width) as i32);
    let open = || {
        tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| !tile.blocks_player())
            .map(|(idx, _)| to_pos(idx))
    };
    open()
        .find(|pos| !collectibles.contains_key(pos))
        .or_else(|| open().next())
        .unwrap_or(Vec2::new(0, 0))
}

fn house_exit_direction(door: Option<Vec2>, ghost_spawns: &[GhostSpawn]) -> Direction {
    let Some(door) = door else {
        return Direction::Up;
    };
    if ghost_spawns.is_empty() {
        return Direction::Up;
    }
    let count = ghost_spawns.len() as i32;
    let avg_x = ghost_spawns.iter().map(|spawn| spawn.position.x).sum::<i32>() / count;
    let avg_y = ghost_spawns.iter().map(|spawn| spawn.position.y).sum::<i32>() / count;
    if avg_y > door.y {
        Direction::Up
    } else if avg_y < door.y {
        Direction::Down
    } else if avg_x > door.x {
        Direction::Left
    } else {
        Direction::Right
    }
}

impl World {
    /// Removes collectibles the player cannot walk to from its spawn.
    fn drop_unreachable_collectibles(&mut self) {
        let before = self.collectibles.len();
        let reachable = &self.reachable;
        self.collectibles.retain(|pos, _| reachable.contains(pos));
        let dropped = before - self.collectibles.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropping collectibles the player cannot reach");
        }
        self.total_collectibles = self.collectibles.len();
    }

    /// Folds any coordinate back onto the grid; the map is a torus.
    pub fn wrap(&self, pos: Vec2) -> Vec2 {
        Vec2::new(pos.x.rem_euclid(self.width), pos.y.rem_euclid(self.height))
    }

    pub fn step(&self, pos: Vec2, dir: Direction) -> Vec2 {
        let (dx, dy) = dir.delta();
        self.wrap(Vec2::new(pos.x + dx, pos.y + dy))
    }

    pub fn tile(&self, pos: Vec2) -> Tile {
        let pos = self.wrap(pos);
        self.tiles[(pos.y * self.width + pos.x) as usize]
    }

    pub fn blocks_player(&self, pos: Vec2) -> bool {
        self.tile(pos).blocks_player()
    }

    pub fn is_door(&self, pos: Vec2) -> bool {
        self.tile(pos) == Tile::Door
    }

    pub fn remaining_collectibles(&self) -> usize {
        self.collectibles.len()
    }

    pub fn eaten_fraction(&self) -> f32 {
        if self.total_collectibles == 0 {
            return 1.0;
        }
        1.0 - self.collectibles.len() as f32 / self.total_collectibles as f32
    }

    pub fn take_collectible(&mut self, pos: Vec2) -> Option<CollectibleKind> {
        self.collectibles.remove(&pos)
    }

    pub fn walls(&self) -> impl Iterator<Item = (Vec2, WallShape)> + '_ {
        let width = self.width;
        self.tiles.iter().enumerate().filter_map(move |(idx, tile)| match tile {
            Tile::Wall(shape) => Some((
                Vec2::new(idx as i32 % width, idx as i32 / width),
                *shape,
            )),
            _ => None,
        })
    }

    pub fn to_view(&self, number: u32) -> LevelView {
        LevelView {
            number,
            width: self.width,
            height: self.height,
            tiles: self
                .tiles
                .chunks(self.width as usize)
                .map(|row| row.iter().map(|tile| tile.code()).collect())
                .collect(),
            door: self.door,
        }
    }

    fn build_reachable(&self, start: Vec2) -> BTreeSet<Vec2> {
        let mut visited = BTreeSet::new();
        if self.blocks_player(start) {
            return visited;
        }
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);
        while let Some(pos) = queue.pop_front() {
            for dir in Direction::MOVES {
                let next = self.step(pos, dir);
                if self.blocks_player(next) || !visited.insert(next) {
                    continue;
                }
                queue.push_back(next);
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_layout_with_one_pellet() {
        let world = parse_level(&["WWW", "WoP", "WWW"]).expect("valid layout");
        assert_eq!((world.width, world.height), (3, 3));
        assert_eq!(world.player_spawn, Vec2::new(2, 1));
        assert_eq!(
            world.collectibles.get(&Vec2::new(1, 1)),
            Some(&CollectibleKind::Pellet)
        );
        assert_eq!(world.total_collectibles, 1);
        assert!(world.ghost_spawns.is_empty());
    }

    #[test]
    fn first_player_marker_wins() {
        let world = parse_level(&["WWWWW", "W.P.W", "W.C.W", "WWWWW"]).expect("valid layout");
        assert_eq!(world.player_spawn, Vec2::new(2, 1));
        assert!(!world.blocks_player(Vec2::new(2, 2)));
        assert!(!world.collectibles.contains_key(&Vec2::new(2, 2)));
    }

    #[test]
    fn unknown_characters_are_empty_space() {
        let world = parse_level(&["WWWWW", "W?P.W", "WWWWW"]).expect("valid layout");
        assert_eq!(world.tile(Vec2::new(1, 1)), Tile::Empty);
        assert!(!world.collectibles.contains_key(&Vec2::new(1, 1)));
    }

    #[test]
    fn first_row_defines_width_and_short_rows_are_padded() {
        let world = parse_level(&["WWWWW", "WP.", "WWWWWWW"]).expect("valid layout");
        assert_eq!(world.width, 5);
        assert_eq!(world.tile(Vec2::new(4, 1)), Tile::Empty);
        assert_eq!(world.to_view(1).tiles[2], "WWWWW");
    }

    #[test]
    fn missing_player_gets_synthesized_spawn() {
        let world = parse_level(&["WWWW", "W .W", "WWWW"]).expect("valid layout");
        assert_eq!(world.player_spawn, Vec2::new(1, 1));
    }

    #[test]
    fn wall_shapes_are_impassable_and_preserved() {
        let world = parse_level(&["AHB", "VPV", "VoV", "DHE"]).expect("valid layout");
        let shapes: Vec<WallShape> = world.walls().map(|(_, shape)| shape).collect();
        assert!(shapes.contains(&WallShape::CornerTopLeft));
        assert!(shapes.contains(&WallShape::CornerBottomRight));
        assert!(world
            .walls()
            .all(|(pos, _)| world.blocks_player(pos)));
    }

    #[test]
    fn ghost_codes_map_to_fixed_personalities() {
        let world =
            parse_level(&["WWWWWWW", "W.....W", "WWW=WWW", "W12P34W", "WWWWWWW"]).expect("valid");
        let personalities: Vec<GhostPersonality> = world
            .ghost_spawns
            .iter()
            .map(|spawn| spawn.personality)
            .collect();
        assert_eq!(
            personalities,
            vec![
                GhostPersonality::Chaser,
                GhostPersonality::Ambusher,
                GhostPersonality::Whimsical,
                GhostPersonality::Shy
            ]
        );
        assert_eq!(world.door, Some(Vec2::new(3, 2)));
        assert_eq!(world.house_exit, Direction::Up);
        assert!(world.blocks_player(Vec2::new(3, 2)));
    }

    #[test]
    fn degenerate_layouts_are_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(parse_level(&empty), Err(LevelError::Empty)));
        assert!(matches!(parse_level(&["", "WPW"]), Err(LevelError::ZeroWidth)));
        assert!(matches!(parse_level(&["WWW", "WWW"]), Err(LevelError::NoOpenTile)));
        assert!(matches!(
            parse_level(&["WWW", "W W", "WWW"]),
            Err(LevelError::NoCollectibles)
        ));
    }

    #[test]
    fn emergency_world_always_has_something_to_eat() {
        let world = emergency_world();
        assert!(world.remaining_collectibles() > 0);
        assert!(!world.blocks_player(world.player_spawn));
        assert!(world
            .collectibles
            .keys()
            .all(|pos| world.reachable.contains(pos)));
    }

    #[test]
    fn stepping_wraps_around_every_edge() {
        let world = parse_level(&["....", ".P..", "...."]).expect("valid layout");
        assert_eq!(world.step(Vec2::new(0, 1), Direction::Left), Vec2::new(3, 1));
        assert_eq!(world.step(Vec2::new(3, 1), Direction::Right), Vec2::new(0, 1));
        assert_eq!(world.step(Vec2::new(2, 0), Direction::Up), Vec2::new(2, 2));
        assert_eq!(world.step(Vec2::new(2, 2), Direction::Down), Vec2::new(2, 0));
        for x in -10..10 {
            for y in -10..10 {
                let pos = world.wrap(Vec2::new(x, y));
                assert!((0..world.width).contains(&pos.x));
                assert!((0..world.height).contains(&pos.y));
            }
        }
    }

    #[test]
    fn reachable_excludes_sealed_pockets() {
        let world = parse_level(&["WWWWWW", "WP.W.W", "WWWWWW"]).expect("valid layout");
        assert!(world.reachable.contains(&Vec2::new(2, 1)));
        assert!(!world.reachable.contains(&Vec2::new(4, 1)));
    }

    #[test]
    fn sealed_collectibles_are_dropped_so_the_level_stays_winnable() {
        let world = parse_level(&["WWWWWWW", "WP.WoOW", "WWWWWWW"]).expect("valid layout");
        assert_eq!(world.total_collectibles, 1);
        assert_eq!(world.remaining_collectibles(), 1);
        assert!(world
            .collectibles
            .keys()
            .all(|pos| world.reachable.contains(pos)));

        assert!(matches!(
            parse_level(&["WWWWWW", "WP W.W", "WWWWWW"]),
            Err(LevelError::NoCollectibles)
        ));
    }

    #[test]
    fn eaten_fraction_tracks_consumption() {
        let mut world = parse_level(&["WWWWW", "WP.oW", "WWWWW"]).expect("valid layout");
        assert_eq!(world.eaten_fraction(), 0.0);
        assert_eq!(world.take_collectible(Vec2::new(2, 1)), Some(CollectibleKind::Pellet));
        assert_eq!(world.take_collectible(Vec2::new(2, 1)), None);
        assert!((world.eaten_fraction() - 0.5).abs() < f32::EPSILON);
    }
}
