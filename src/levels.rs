use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LevelError;
use crate::world::{emergency_world, parse_level, World};

const BUILTIN_LEVELS: [&str; 5] = [
    include_str!("../levels/level1.txt"),
    include_str!("../levels/level2.txt"),
    include_str!("../levels/level3.txt"),
    include_str!("../levels/level4.txt"),
    include_str!("../levels/level5.txt"),
];

/// Numbered level layouts: compiled in, read from `levelN.txt` files, or
/// supplied in memory.
#[derive(Clone, Debug, Default)]
pub enum LevelCatalog {
    #[default]
    Builtin,
    Directory { dir: PathBuf, count: u32 },
    Inline(Vec<Vec<String>>),
}

impl LevelCatalog {
    pub fn from_layouts(layouts: &[&[&str]]) -> Self {
        Self::Inline(
            layouts
                .iter()
                .map(|rows| rows.iter().map(|row| row.to_string()).collect())
                .collect(),
        )
    }

    /// Uses `dir/level1.txt`, `dir/level2.txt`, ... up to the first gap.
    /// Falls back to the built-in set when `level1.txt` is missing.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut count = 0;
        while level_path(&dir, count + 1).is_file() {
            count += 1;
        }
        if count == 0 {
            tracing::warn!(dir = %dir.display(), "No level files found, using built-in levels");
            return Self::Builtin;
        }
        tracing::info!(dir = %dir.display(), count, "Using level directory");
        Self::Directory { dir, count }
    }

    pub fn count(&self) -> u32 {
        match self {
            Self::Builtin => BUILTIN_LEVELS.len() as u32,
            Self::Directory { count, .. } => *count,
            Self::Inline(levels) => levels.len() as u32,
        }
    }

    pub fn rows(&self, number: u32) -> Result<Vec<String>, LevelError> {
        if number == 0 || number > self.count() {
            return Err(LevelError::UnknownLevel(number));
        }
        let text = match self {
            Self::Builtin => BUILTIN_LEVELS[(number - 1) as usize].to_string(),
            Self::Directory { dir, .. } => {
                let path = level_path(dir, number);
                fs::read_to_string(&path).map_err(|source| LevelError::Io { path, source })?
            }
            Self::Inline(levels) => return Ok(levels[(number - 1) as usize].clone()),
        };
        Ok(text.lines().map(str::to_string).collect())
    }

    pub fn load(&self, number: u32) -> Result<World, LevelError> {
        let rows = self.rows(number)?;
        parse_level(&rows)
    }

    /// Never fails: any load error swaps in the emergency layout.
    pub fn load_or_emergency(&self, number: u32) -> World {
        match self.load(number) {
            Ok(world) => world,
            Err(error) => {
                tracing::warn!(level = number, %error, "Level failed to load, using emergency layout");
                emergency_world()
            }
        }
    }
}

fn level_path(dir: &Path, number: u32) -> PathBuf {
    dir.join(format!("level{number}.txt"))
}
