//! Template file parsing.
//!
//! A template file is an optional frontmatter block followed by one or more
//! response sections:
//!
//! ```text
//! ---
//! loop: true
//! interval: 1000
//! ---
//! <p id="clock">tick {{.LoopIteration}}</p>
//! ===
//! <p id="clock">tock {{.LoopIteration}}</p>
//! ```
//!
//! # Design Decisions
//! - Delimiters must sit alone on their line (surrounding whitespace ignored)
//! - Sections are trimmed, but empty sections are kept: an empty section is an
//!   intentionally empty response
//! - A malformed frontmatter block fails the whole file
//! - Numeric options are signed; zero or negative means "not set"

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker line opening and closing the frontmatter block.
pub const FRONTMATTER_DELIMITER: &str = "---";

/// Marker line separating sections.
pub const SECTION_DELIMITER: &str = "===";

/// Delay used between sequential live sections when a file sets none.
pub const DEFAULT_DELAY_MS: u64 = 5000;

/// Options block at the top of a template file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Frontmatter {
    /// Loop through sections instead of stopping at the last one.
    #[serde(rename = "loop")]
    pub looping: bool,

    /// Milliseconds between live loop iterations (≤ 0 = no timer).
    #[serde(rename = "interval")]
    pub interval_ms: i64,

    /// Passes through this file's sections before moving on (≤ 0 = forever).
    pub count: i64,

    /// HTTP status override (≤ 0 = protocol default).
    pub status: i64,

    /// Milliseconds before the next sequential live section (≤ 0 = default).
    #[serde(rename = "delay")]
    pub delay_ms: i64,
}

impl Frontmatter {
    /// Whether a live stream for this file runs on a timer.
    pub fn is_timed_loop(&self) -> bool {
        self.looping && self.interval_ms > 0
    }

    /// Timer period of a timed loop.
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.interval_ms).unwrap_or(0))
    }

    /// Passes through the file, `None` when it loops forever.
    pub fn passes(&self) -> Option<usize> {
        usize::try_from(self.count).ok().filter(|&n| n > 0)
    }

    /// Delay before the following sequential section, with the default applied.
    pub fn effective_delay_ms(&self, default_ms: u64) -> u64 {
        match u64::try_from(self.delay_ms) {
            Ok(ms) if ms > 0 => ms,
            _ => default_ms,
        }
    }
}

/// Errors raised while reading a template file.
#[derive(Debug, Error)]
pub enum TemplateFileError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed frontmatter in {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A template file split into options and sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    pub options: Frontmatter,
    /// Trimmed section bodies, never empty (an empty file has one empty section).
    pub sections: Vec<String>,
    pub source_path: PathBuf,
    /// Sequence index from the filename, `-1` when absent.
    pub seq_index: i64,
}

impl ParsedFile {
    /// Read and parse a template file from disk.
    pub fn load(path: &Path, seq_index: i64) -> Result<Self, TemplateFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| TemplateFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (options, sections) =
            parse_template(&content).map_err(|source| TemplateFileError::Frontmatter {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            options,
            sections,
            source_path: path.to_path_buf(),
            seq_index,
        })
    }
}

/// Split raw file content into frontmatter options and trimmed sections.
pub fn parse_template(content: &str) -> Result<(Frontmatter, Vec<String>), serde_yaml::Error> {
    let (options, body) = match split_frontmatter(content) {
        Some((block, body)) => (parse_frontmatter(block)?, body),
        None => (Frontmatter::default(), content),
    };

    Ok((options, split_sections(body)))
}

/// Locate the frontmatter block. Returns `(block, body)` when the content opens
/// with a delimiter line and a closing delimiter line exists.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let trimmed = content.trim();
    let mut lines = trimmed.split_inclusive('\n');

    let first = lines.next()?;
    if first.trim() != FRONTMATTER_DELIMITER {
        return None;
    }

    let block_start = first.len();
    let mut offset = block_start;
    for line in lines {
        if line.trim() == FRONTMATTER_DELIMITER {
            return Some((&trimmed[block_start..offset], &trimmed[offset + line.len()..]));
        }
        offset += line.len();
    }

    None
}

fn parse_frontmatter(block: &str) -> Result<Frontmatter, serde_yaml::Error> {
    let value: serde_yaml::Value = serde_yaml::from_str(block)?;
    if value.is_null() {
        return Ok(Frontmatter::default());
    }
    serde_yaml::from_value(value)
}

/// Split a body on section delimiter lines, trimming each section.
pub fn split_sections(body: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();

    for line in body.split_inclusive('\n') {
        if line.trim() == SECTION_DELIMITER {
            sections.push(current.trim().to_string());
            current.clear();
        } else {
            current.push_str(line);
        }
    }
    sections.push(current.trim().to_string());

    sections
}
