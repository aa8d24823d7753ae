use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    #[default]
    None,
}

impl Direction {
    /// The four axis-aligned moves, in the scan order used before shuffling.
    pub const MOVES: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" | "w" | "k" => Some(Self::Up),
            "down" | "s" | "j" => Some(Self::Down),
            "left" | "a" | "h" => Some(Self::Left),
            "right" | "d" | "l" => Some(Self::Right),
            "none" | "" => Some(Self::None),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::None => (0, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::None => Direction::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPersonality {
    Chaser,
    Ambusher,
    Whimsical,
    Shy,
}

impl GhostPersonality {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '1' => Some(Self::Chaser),
            '2' => Some(Self::Ambusher),
            '3' => Some(Self::Whimsical),
            '4' => Some(Self::Shy),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostState {
    Normal,
    Vulnerable,
    Eaten,
    InHouse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectibleKind {
    Pellet,
    PowerPellet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusEffect {
    ExtraLife,
    SlowGhosts,
}

/// Cosmetic wall outline carried through from the layout so renderers can pick a sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallShape {
    Block,
    Horizontal,
    Vertical,
    CornerTopLeft,
    CornerTopRight,
    CornerBottomLeft,
    CornerBottomRight,
}

impl WallShape {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'W' => Some(Self::Block),
            'H' => Some(Self::Horizontal),
            'V' => Some(Self::Vertical),
            'A' => Some(Self::CornerTopLeft),
            'B' => Some(Self::CornerTopRight),
            'D' => Some(Self::CornerBottomLeft),
            'E' => Some(Self::CornerBottomRight),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Self::Block => 'W',
            Self::Horizontal => 'H',
            Self::Vertical => 'V',
            Self::CornerTopLeft => 'A',
            Self::CornerTopRight => 'B',
            Self::CornerBottomLeft => 'D',
            Self::CornerBottomRight => 'E',
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Story,
    Endless,
}

impl GameMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "story" => Some(Self::Story),
            "endless" | "survivor" => Some(Self::Endless),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Playing,
    GameOver,
    Completed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Playing)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Vec2) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self.distance_squared(other) as f32).sqrt()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub lives: u32,
    pub score: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub id: usize,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub personality: GhostPersonality,
    pub state: GhostState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectibleView {
    pub x: i32,
    pub y: i32,
    pub kind: CollectibleKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BonusView {
    pub x: i32,
    pub y: i32,
    pub effect: BonusEffect,
    #[serde(rename = "spawnedAt")]
    pub spawned_at: u64,
}

/// Static part of a level, sent to renderers once per level.
#[derive(Clone, Debug, Serialize)]
pub struct LevelView {
    pub number: u32,
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<String>,
    pub door: Option<Vec2>,
}

/// Closed set of everything a renderer may draw.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityView {
    Wall {
        x: i32,
        y: i32,
        shape: WallShape,
    },
    Door {
        x: i32,
        y: i32,
    },
    Collectible {
        x: i32,
        y: i32,
        #[serde(rename = "type")]
        collectible: CollectibleKind,
    },
    Bonus {
        x: i32,
        y: i32,
        effect: BonusEffect,
    },
    Player {
        x: i32,
        y: i32,
        dir: Direction,
    },
    Ghost {
        id: usize,
        x: i32,
        y: i32,
        personality: GhostPersonality,
        state: GhostState,
    },
}

impl EntityView {
    pub fn position(&self) -> Vec2 {
        match *self {
            EntityView::Wall { x, y, .. }
            | EntityView::Door { x, y }
            | EntityView::Collectible { x, y, .. }
            | EntityView::Bonus { x, y, .. }
            | EntityView::Player { x, y, .. }
            | EntityView::Ghost { x, y, .. } => Vec2::new(x, y),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    SessionStarted {
        level: u32,
        mode: GameMode,
    },
    LevelStarted {
        level: u32,
    },
    PelletEaten {
        x: i32,
        y: i32,
    },
    PowerPelletEaten {
        x: i32,
        y: i32,
    },
    PowerModeEnded,
    GhostEaten {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
    },
    GhostReturned {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
    },
    GhostReleased {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
    },
    PlayerDied {
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    BonusSpawned {
        bonus: BonusView,
    },
    BonusCollected {
        effect: BonusEffect,
    },
    SlowEffectEnded,
    LevelCleared {
        level: u32,
    },
    GameOver {
        score: u32,
    },
    Completed {
        score: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    #[serde(rename = "tickIntervalMs")]
    pub tick_interval_ms: u64,
    pub mode: GameMode,
    pub level: u32,
    #[serde(rename = "endlessRound")]
    pub endless_round: u32,
    pub status: SessionStatus,
    pub message: String,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub collectibles: Vec<CollectibleView>,
    pub bonus: Option<BonusView>,
    #[serde(rename = "powerUntil")]
    pub power_until: Option<u64>,
    #[serde(rename = "slowUntil")]
    pub slow_until: Option<u64>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    pub date: String,
    pub name: String,
    pub level: String,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution() {
        for dir in Direction::MOVES {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.opposite(), dir);
        }
        assert_eq!(Direction::None.opposite(), Direction::None);
    }

    #[test]
    fn direction_words_parse_to_moves() {
        assert_eq!(Direction::parse_move("a"), Some(Direction::Left));
        assert_eq!(Direction::parse_move("none"), Some(Direction::None));
        assert_eq!(Direction::parse_move("sideways"), None);
    }

    #[test]
    fn wall_codes_round_trip_through_shape() {
        for code in ['W', 'H', 'V', 'A', 'B', 'D', 'E'] {
            let shape = WallShape::from_code(code).expect("known wall code");
            assert_eq!(shape.code(), code);
        }
        assert_eq!(WallShape::from_code('C'), None);
    }

    #[test]
    fn squared_distance_avoids_sqrt() {
        let a = Vec2::new(1, 1);
        let b = Vec2::new(4, 5);
        assert_eq!(a.distance_squared(b), 25);
        assert!((a.distance(b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn entity_view_serializes_with_kind_tag() {
        let view = EntityView::Collectible {
            x: 2,
            y: 3,
            collectible: CollectibleKind::PowerPellet,
        };
        let json = serde_json::to_value(&view).expect("serialize entity");
        assert_eq!(json["kind"], "collectible");
        assert_eq!(json["type"], "power_pellet");
        assert_eq!(view.position(), Vec2::new(2, 3));
    }
}
