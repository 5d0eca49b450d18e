//! Plain-text persistence for highway-producing rule sets.
//!
//! Each discovery is appended as a block:
//!
//! ```text
//!
//! === Successful Rules Found at 2024-05-01 12:00:00 ===
//! Steps taken: 4200
//! Rules:
//!   Color 0 -> 1 (Turn: 1)
//!   Color 1 -> 0 (Turn: -1)
//! ==================================================
//! ```
//!
//! Consumers decide when to stop searching by counting header markers.

use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use antlab_core::{DiscoveryLog, HighwayDiscovery, RuleSnapshot};
use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, warn};

/// Header prefix that opens every discovery block.
pub const DISCOVERY_MARKER: &str = "=== Successful Rules Found";
/// File name used when no log path is configured.
pub const DEFAULT_LOG_PATH: &str = "successful_rules.txt";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SEPARATOR_WIDTH: usize = 50;

/// Storage error wrapper.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("discovery log i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed discovery log at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// One discovery block read back from a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedDiscovery {
    pub timestamp: NaiveDateTime,
    pub steps: u64,
    pub rules: Vec<RuleSnapshot>,
}

/// Renders one discovery block exactly as it is written to disk.
#[must_use]
pub fn format_discovery(discovery: &HighwayDiscovery, timestamp: NaiveDateTime) -> String {
    let mut block = String::new();
    let _ = writeln!(block);
    let _ = writeln!(
        block,
        "{DISCOVERY_MARKER} at {} ===",
        timestamp.format(TIMESTAMP_FORMAT)
    );
    let _ = writeln!(block, "Steps taken: {}", discovery.steps);
    let _ = writeln!(block, "Rules:");
    for rule in &discovery.rules {
        let _ = writeln!(
            block,
            "  Color {} -> {} (Turn: {})",
            rule.color, rule.next, rule.turn
        );
    }
    let _ = writeln!(block, "{}", "=".repeat(SEPARATOR_WIDTH));
    block
}

/// Append-only discovery log backed by a text file.
#[derive(Debug)]
pub struct RuleLog {
    path: PathBuf,
    file: File,
}

impl RuleLog {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `discovery` stamped with the current local time.
    pub fn append(&mut self, discovery: &HighwayDiscovery) -> Result<(), StorageError> {
        self.append_at(discovery, Local::now().naive_local())
    }

    /// Appends `discovery` with an explicit timestamp.
    pub fn append_at(
        &mut self,
        discovery: &HighwayDiscovery,
        timestamp: NaiveDateTime,
    ) -> Result<(), StorageError> {
        let block = format_discovery(discovery, timestamp);
        self.file
            .write_all(block.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|source| StorageError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            path = %self.path.display(),
            steps = discovery.steps,
            rules = discovery.rules.len(),
            "appended discovery",
        );
        Ok(())
    }

    /// Number of discovery blocks currently in the file.
    pub fn count(&self) -> Result<usize, StorageError> {
        count_discoveries(&self.path)
    }
}

impl DiscoveryLog for RuleLog {
    fn record(&mut self, discovery: &HighwayDiscovery) {
        if let Err(err) = self.append(discovery) {
            warn!(
                episode = discovery.episode,
                steps = discovery.steps,
                "failed to persist discovery: {err}"
            );
        }
    }
}

fn read_log(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Counts header markers in the log at `path`; a missing file holds zero.
pub fn count_discoveries(path: impl AsRef<Path>) -> Result<usize, StorageError> {
    Ok(read_log(path.as_ref())?
        .map(|contents| contents.matches(DISCOVERY_MARKER).count())
        .unwrap_or(0))
}

/// Parses every discovery block in the log at `path`; a missing file holds none.
pub fn read_discoveries(path: impl AsRef<Path>) -> Result<Vec<LoggedDiscovery>, StorageError> {
    match read_log(path.as_ref())? {
        Some(contents) => parse_discoveries(&contents),
        None => Ok(Vec::new()),
    }
}

/// Parses discovery blocks from log text.
pub fn parse_discoveries(contents: &str) -> Result<Vec<LoggedDiscovery>, StorageError> {
    let mut discoveries = Vec::new();
    let mut current: Option<LoggedDiscovery> = None;
    let mut in_rules = false;

    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        let parse_err = |message: &str| StorageError::Parse {
            line: line_no,
            message: message.to_string(),
        };

        if let Some(rest) = line.strip_prefix(DISCOVERY_MARKER) {
            if current.is_some() {
                return Err(parse_err("header before previous block was closed"));
            }
            let stamp = rest
                .trim()
                .strip_prefix("at ")
                .and_then(|s| s.strip_suffix("==="))
                .map(str::trim)
                .ok_or_else(|| parse_err("header lacks a timestamp"))?;
            let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
                .map_err(|err| parse_err(&format!("bad timestamp '{stamp}': {err}")))?;
            current = Some(LoggedDiscovery {
                timestamp,
                steps: 0,
                rules: Vec::new(),
            });
            in_rules = false;
            continue;
        }

        let Some(block) = current.as_mut() else {
            if line.is_empty() {
                continue;
            }
            return Err(parse_err("content outside a discovery block"));
        };

        if let Some(steps) = line.strip_prefix("Steps taken:") {
            block.steps = steps
                .trim()
                .parse()
                .map_err(|_| parse_err("step count is not an integer"))?;
        } else if line == "Rules:" {
            in_rules = true;
        } else if line.len() >= SEPARATOR_WIDTH && line.chars().all(|c| c == '=') {
            if let Some(done) = current.take() {
                discoveries.push(done);
            }
            in_rules = false;
        } else if in_rules && line.starts_with("Color ") {
            block.rules.push(parse_rule(line).ok_or_else(|| parse_err("bad rule line"))?);
        } else if !line.is_empty() {
            return Err(parse_err("unexpected line"));
        }
    }

    if current.is_some() {
        return Err(StorageError::Parse {
            line: contents.lines().count(),
            message: "unterminated discovery block".to_string(),
        });
    }
    Ok(discoveries)
}

/// Parses `Color c -> n (Turn: t)`.
fn parse_rule(line: &str) -> Option<RuleSnapshot> {
    let rest = line.strip_prefix("Color ")?;
    let (color, rest) = rest.split_once(" -> ")?;
    let (next, rest) = rest.split_once(" (Turn: ")?;
    let turn = rest.strip_suffix(')')?;
    Some(RuleSnapshot {
        color: color.trim().parse().ok()?,
        next: next.trim().parse().ok()?,
        turn: turn.trim().parse().ok()?,
    })
}
