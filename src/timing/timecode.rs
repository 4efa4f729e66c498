//! `HH:MM:SS,mmm` time codes and the SRT-style block format built on them.
//!
//! Block format, one per lyric line:
//!
//! ```text
//! 1
//! 00:00:01,000 --> 00:00:03,500
//! Hi there
//!
//! ```
//!
//! Parsing is forgiving at the block level (bad blocks are skipped and reported) and strict at
//! the field level (a time code is either well formed or rejected).

use crate::{
    foundation::error::{LyricError, LyricResult},
    timing::lyric::TimedLyric,
};

const RANGE_ARROW: &str = "-->";

/// Parses `H:MM:SS,mmm` / `HH:MM:SS,mmm` into seconds.
pub fn parse_time_code(text: &str) -> LyricResult<f64> {
    let s = text.trim();
    let bad = || LyricError::malformed_time_code(format!("'{s}' is not HH:MM:SS,mmm"));

    let (hms, millis) = s.split_once(',').ok_or_else(bad)?;
    let mut fields = hms.split(':');
    let (Some(h), Some(m), Some(sec), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(bad());
    };

    let hours = fixed_digits(h, 1, 2).ok_or_else(bad)?;
    let minutes = fixed_digits(m, 2, 2).ok_or_else(bad)?;
    let seconds = fixed_digits(sec, 2, 2).ok_or_else(bad)?;
    let millis = fixed_digits(millis, 3, 3).ok_or_else(bad)?;

    if minutes >= 60 || seconds >= 60 {
        return Err(LyricError::malformed_time_code(format!(
            "'{s}' has minutes or seconds out of range"
        )));
    }

    let total_ms = ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis;
    Ok(total_ms as f64 / 1000.0)
}

fn fixed_digits(field: &str, min_len: usize, max_len: usize) -> Option<u64> {
    if field.len() < min_len || field.len() > max_len {
        return None;
    }
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Formats seconds as `HH:MM:SS,mmm`.
///
/// Sub-millisecond precision is truncated. Negative and non-finite inputs format as zero.
/// Values of 100 hours or more widen the hour field, which [`parse_time_code`] rejects.
pub fn format_time_code(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        // The epsilon keeps e.g. 1.234 (stored as 1.23399999...) from truncating to 1.233.
        (seconds * 1000.0 + 1e-6).floor() as u64
    } else {
        0
    };

    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// A block that could not be turned into a lyric.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedBlock {
    /// 1-based position of the block in the input.
    pub position: usize,
    pub reason: String,
}

/// Result of a block-level parse: what parsed, and what was skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubtitleImport {
    pub lyrics: Vec<TimedLyric>,
    pub skipped: Vec<SkippedBlock>,
}

/// Splits `content` into blank-line separated blocks and parses each one.
pub fn parse_subtitle_blocks(content: &str) -> SubtitleImport {
    let normalized = content.replace("\r\n", "\n");
    let mut out = SubtitleImport::default();

    for (i, block) in split_blocks(&normalized).iter().enumerate() {
        match parse_block(block) {
            Ok(lyric) => out.lyrics.push(lyric),
            Err(reason) => {
                tracing::debug!(block = i + 1, %reason, "skipping subtitle block");
                out.skipped.push(SkippedBlock {
                    position: i + 1,
                    reason,
                });
            }
        }
    }

    out
}

/// Like [`parse_subtitle_blocks`], but an input where nothing parses is an error.
pub fn import_subtitles(content: &str) -> LyricResult<Vec<TimedLyric>> {
    let import = parse_subtitle_blocks(content);
    if import.lyrics.is_empty() {
        return Err(LyricError::malformed_time_code(format!(
            "no subtitle block could be parsed ({} skipped)",
            import.skipped.len()
        )));
    }
    if !import.skipped.is_empty() {
        tracing::warn!(
            parsed = import.lyrics.len(),
            skipped = import.skipped.len(),
            "some subtitle blocks were skipped"
        );
    }
    Ok(import.lyrics)
}

/// Serializes lyrics as numbered blocks separated by blank lines.
pub fn serialize_subtitle_blocks(lyrics: &[TimedLyric]) -> String {
    lyrics
        .iter()
        .enumerate()
        .map(|(i, l)| {
            format!(
                "{}\n{} {RANGE_ARROW} {}\n{}\n",
                i + 1,
                format_time_code(l.start_time),
                format_time_code(l.end_time),
                l.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in content.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_block(lines: &[&str]) -> Result<TimedLyric, String> {
    if lines.len() < 2 {
        return Err("block has fewer than two lines".to_string());
    }
    let time_idx = lines
        .iter()
        .position(|l| l.contains(RANGE_ARROW))
        .ok_or_else(|| "no time-range line".to_string())?;

    let (start, end) = parse_time_range(lines[time_idx]).map_err(|e| e.to_string())?;
    // Cue text is kept as written; only stray carriage returns are dropped.
    let text = lines[time_idx + 1..]
        .iter()
        .map(|l| l.trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join("\n");
    if text.trim().is_empty() {
        return Err("block has no text".to_string());
    }
    Ok(TimedLyric::new(text, start, end))
}

/// `00:00:01,000 --> 00:00:03,500`, tolerating trailing cue settings after the end time.
fn parse_time_range(line: &str) -> LyricResult<(f64, f64)> {
    let (left, right) = line
        .split_once(RANGE_ARROW)
        .ok_or_else(|| LyricError::malformed_time_code("missing '-->'"))?;
    let start = left
        .split_whitespace()
        .last()
        .ok_or_else(|| LyricError::malformed_time_code("missing start time"))?;
    let end = right
        .split_whitespace()
        .next()
        .ok_or_else(|| LyricError::malformed_time_code("missing end time"))?;
    Ok((parse_time_code(start)?, parse_time_code(end)?))
}
