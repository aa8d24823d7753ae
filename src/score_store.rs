use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::constants::{DEFAULT_PLAYER_NAME, HIGH_SCORE_LIMIT};
use crate::error::ScoreStoreError;
use crate::types::ScoreEntry;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Append-only high-score file, one `date|NAME|Level N|SCORE PTS` line per session.
pub struct ScoreStore {
    file_path: PathBuf,
}

impl ScoreStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn save(&self, name: &str, level: u32, score: u32) -> Result<(), ScoreStoreError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let date = Local::now().format(DATE_FORMAT).to_string();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{}", format_score_line(&date, name, level, score))?;
        Ok(())
    }

    /// Saves a finished session. Failures are logged and otherwise ignored.
    pub fn record_session(&self, name: &str, level: u32, score: u32) {
        match self.save(name, level, score) {
            Ok(()) => tracing::info!(
                path = %self.file_path.display(),
                name,
                level,
                score,
                "Recorded high score"
            ),
            Err(error) => tracing::warn!(
                path = %self.file_path.display(),
                %error,
                "Failed to record high score"
            ),
        }
    }

    /// Best `limit` entries, highest score first. Unreadable lines are skipped.
    pub fn top(&self, limit: usize) -> Vec<ScoreEntry> {
        let bytes = match fs::read(&self.file_path) {
            Ok(bytes) => bytes,
            Err(error) => {
                if error.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %self.file_path.display(), %error, "Failed to read high scores");
                }
                return Vec::new();
            }
        };

        let mut entries: Vec<ScoreEntry> = bytes
            .split(|byte| *byte == b'\n')
            .filter_map(decode_score_line)
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(limit);
        entries
    }

    pub fn load_best(&self) -> Vec<ScoreEntry> {
        self.top(HIGH_SCORE_LIMIT)
    }

    /// Deletes the whole store. A store that does not exist is already clear.
    pub fn clear(&self) -> Result<(), ScoreStoreError> {
        match fs::remove_file(&self.file_path) {
            Ok(()) => {
                tracing::info!(path = %self.file_path.display(), "Cleared high scores");
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| if ch == '|' || ch.is_control() { ' ' } else { ch })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        cleaned.to_uppercase()
    }
}

fn decode_score_line(raw: &[u8]) -> Option<ScoreEntry> {
    let Ok(line) = std::str::from_utf8(raw) else {
        tracing::debug!(bytes = raw.len(), "Skipping high score line that is not UTF-8");
        return None;
    };
    if line.trim().is_empty() {
        return None;
    }
    let parsed = parse_score_line(line);
    if parsed.is_none() {
        tracing::debug!(line, "Skipping malformed high score line");
    }
    parsed
}

pub fn format_score_line(date: &str, name: &str, level: u32, score: u32) -> String {
    format!("{date}|{}|Level {level}|{score} PTS", normalize_name(name))
}

pub fn parse_score_line(line: &str) -> Option<ScoreEntry> {
    let parts: Vec<&str> = line.split('|').map(str::trim).collect();
    let [date, name, level, score] = parts.as_slice() else {
        return None;
    };
    let score = score.strip_suffix("PTS").unwrap_or(*score).trim().parse().ok()?;
    Some(ScoreEntry {
        date: date.to_string(),
        name: name.to_string(),
        level: level.to_string(),
        score,
    })
}
