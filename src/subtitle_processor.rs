use std::fmt;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;

// @module: Subtitle parsing and manipulation

// @const: SRT timing line regex; anything after the end timestamp is captured as coordinates
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2,}:\d{2}:\d{2},\d{3})(?:\s+(\S.*))?$").unwrap()
});

// @const: SDH description patterns ([MUSIC], (SIGHS), "JOHN: ")
static SDH_BRACKETS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").unwrap());
static SDH_PARENS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").unwrap());
static SDH_SPEAKER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z\s]*:\s*").unwrap());

// @struct: Single subtitle block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Index as written in the source document
    pub index: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Display lines, never empty
    pub lines: Vec<String>,

    // @field: Text after the end timestamp (e.g. `X1:100 X2:200`), kept verbatim
    pub coordinates: Option<String>,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(index: usize, start_time_ms: u64, end_time_ms: u64, lines: Vec<String>) -> Self {
        SubtitleEntry {
            index,
            start_time_ms,
            end_time_ms,
            lines,
            coordinates: None,
        }
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
        let parts: Vec<&str> = timestamp.trim().split([':', ',']).collect();
        let invalid = || SubtitleError::Parse(format!("Invalid timestamp format: {}", timestamp));

        if parts.len() != 4 {
            return Err(invalid());
        }

        let mut values = [0u64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part.parse().map_err(|_| invalid())?;
        }
        let [hours, minutes, seconds, millis] = values;

        // Validate time components
        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(invalid());
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// The `start --> end` line of this block
    pub fn timing_line(&self) -> String {
        let mut line = format!(
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        );
        if let Some(coordinates) = &self.coordinates {
            line.push(' ');
            line.push_str(coordinates);
        }
        line
    }

    /// Lines joined with a newline
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Copy of this block carrying different text, same index and timing
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            lines,
            ..self.clone()
        }
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{}", self.timing_line())?;
        writeln!(f, "{}", self.text())
    }
}

/// Collection of subtitle entries with metadata
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries, in document order
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Create an empty subtitle collection
    pub fn new(source_file: PathBuf) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
        }
    }

    /// Read and parse an SRT file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path).map_err(|e| SubtitleError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let entries = Self::parse_srt_string(&content)?;
        debug!("Parsed {} blocks from {}", entries.len(), path.display());

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries,
        })
    }

    /// Render the collection as an SRT document, blocks separated by one blank line
    pub fn to_srt_string(&self) -> String {
        render_srt(&self.entries)
    }

    /// Remove SDH descriptions from every block.
    ///
    /// A block whose text would disappear entirely keeps its original text,
    /// so cleaning never changes the number of blocks.
    pub fn strip_sdh(&mut self) {
        let mut cleaned_blocks = 0;
        for entry in &mut self.entries {
            let cleaned: Vec<String> = entry.lines.iter()
                .map(|line| clean_sdh_line(line))
                .filter(|line| !line.is_empty())
                .collect();

            if cleaned.is_empty() {
                continue;
            }
            if cleaned != entry.lines {
                cleaned_blocks += 1;
                entry.lines = cleaned;
            }
        }
        if cleaned_blocks > 0 {
            debug!("Removed SDH descriptions from {} blocks", cleaned_blocks);
        }
    }

    /// Normalize line endings to `\n` and drop a leading byte order mark
    pub fn normalize_line_endings(content: &str) -> String {
        content
            .trim_start_matches('\u{feff}')
            .replace("\r\n", "\n")
            .replace('\r', "\n")
    }

    /// Parse SRT format string into subtitle entries.
    ///
    /// A whitespace-only line always closes the current block. Markup inside
    /// the text is kept verbatim. Stray text outside a block is dropped with
    /// a warning. Indices are kept exactly as written, in document order.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
        let normalized = Self::normalize_line_endings(content);
        if normalized.trim().is_empty() {
            return Err(SubtitleError::Parse("document is empty".to_string()));
        }

        let mut entries = Vec::new();

        // State variables for parsing
        let mut current_index: Option<usize> = None;
        let mut current_timing: Option<Timing> = None;
        let mut current_lines: Vec<String> = Vec::new();

        let mut finish_block = |index: Option<usize>, timing: Option<Timing>, lines: &mut Vec<String>| {
            if let (Some(index), Some(timing)) = (index, timing) {
                if lines.is_empty() {
                    warn!("Skipping empty subtitle block {}", index);
                } else {
                    let mut entry = SubtitleEntry::new(index, timing.start_ms, timing.end_ms, std::mem::take(lines));
                    entry.coordinates = timing.coordinates;
                    entries.push(entry);
                }
            }
            lines.clear();
        };

        for (line_number, line) in normalized.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                finish_block(current_index.take(), current_timing.take(), &mut current_lines);
                continue;
            }

            // Index line opens a block
            if current_index.is_none() {
                match trimmed.parse::<usize>() {
                    Ok(index) => current_index = Some(index),
                    Err(_) => warn!("Unexpected text at line {} outside a block: {}", line_number + 1, trimmed),
                }
                continue;
            }

            // Timing line must follow the index
            if current_timing.is_none() {
                match Self::parse_timing_line(trimmed) {
                    Some(timing) => current_timing = Some(timing),
                    None => {
                        warn!("Missing timestamp at line {}: {}", line_number + 1, trimmed);
                        // The index line was probably text; a new index may start here
                        current_index = trimmed.parse::<usize>().ok();
                    }
                }
                continue;
            }

            current_lines.push(trimmed.to_string());
        }

        // Add the last entry if there is one
        finish_block(current_index, current_timing, &mut current_lines);

        if entries.is_empty() {
            warn!("No valid subtitle entries found in content");
            return Err(SubtitleError::Parse(
                "no valid subtitle blocks were found".to_string(),
            ));
        }

        Ok(entries)
    }

    /// Parse a `start --> end [coordinates]` line.
    ///
    /// Minutes and seconds must stay below 60 so the line renders back unchanged.
    fn parse_timing_line(line: &str) -> Option<Timing> {
        let caps = TIMESTAMP_REGEX.captures(line)?;
        let start_ms = SubtitleEntry::parse_timestamp(caps.get(1)?.as_str()).ok()?;
        let end_ms = SubtitleEntry::parse_timestamp(caps.get(2)?.as_str()).ok()?;
        Some(Timing {
            start_ms,
            end_ms,
            coordinates: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }
}

/// Parsed timing line of the block being read
struct Timing {
    start_ms: u64,
    end_ms: u64,
    coordinates: Option<String>,
}

/// Render blocks as an SRT document, separated by one blank line
pub fn render_srt(entries: &[SubtitleEntry]) -> String {
    entries.iter()
        .map(|entry| entry.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove bracketed and parenthesized descriptions and a leading speaker tag
pub fn clean_sdh_line(line: &str) -> String {
    let without_brackets = SDH_BRACKETS_REGEX.replace_all(line, "");
    let without_parens = SDH_PARENS_REGEX.replace_all(&without_brackets, "");
    let without_speaker = SDH_SPEAKER_REGEX.replace(without_parens.trim_start(), "");
    without_speaker.trim().to_string()
}
