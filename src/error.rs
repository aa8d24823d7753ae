//! Error types for level loading, score persistence and configuration.
//!
//! None of these ever reach the player: the engine falls back to the emergency
//! layout and the score store skips what it cannot read.

use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum LevelError {
    #[error("IO error reading level {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Level layout has no rows")]
    Empty,

    #[error("Level layout's first row is empty")]
    ZeroWidth,

    #[error("Level layout has no open tile for the player")]
    NoOpenTile,

    #[error("Level layout has no collectibles")]
    NoCollectibles,

    #[error("Unknown level: {0}")]
    UnknownLevel(u32),
}

#[derive(thiserror::Error, Debug)]
pub enum ScoreStoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] io::Error),

    #[error("Config parsing failed: {0}")]
    Parse(#[from] serde_json::Error),
}
