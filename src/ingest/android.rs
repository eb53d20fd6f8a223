// src/ingest/android.rs
//! Android log scraping
//!
//! Locates NMEA payloads embedded in free-form logcat lines and recovers a
//! timestamp from the log line prefix. Log folders are processed in reverse
//! name order (newest rotation first, matching logd file naming).

use crate::error::Result;
use crate::gps::data::Stream;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Marker logd attaches to raw (uncorrected) coordinate messages
pub const RAW_TAG: &str = "s:1*78";

/// One scanned log line with its recovered timestamp and NMEA payloads
#[derive(Debug)]
pub struct ScannedLine {
    pub timestamp: Option<NaiveDateTime>,
    pub sentences: Vec<String>,
    pub stream: Stream,
}

pub struct AndroidLogScanner {
    nmea: Regex,
    // Logcat timestamp variants, most specific first
    ts_full: Regex,
    ts_monthday: Regex,
    ts_timeonly: Regex,
}

impl AndroidLogScanner {
    pub fn new() -> Self {
        Self {
            // '$' excluded so several sentences on one line match separately
            nmea: Regex::new(r"\$G[PN][A-Z]{3}[^\r\n$]*").unwrap(),
            ts_full: Regex::new(r"(\d{4})-(\d{2})-(\d{2})\s+(\d{2}):(\d{2}):(\d{2})\.(\d{3})")
                .unwrap(),
            ts_monthday: Regex::new(r"(\d{2})-(\d{2})\s+(\d{2}):(\d{2}):(\d{2})\.(\d{3})").unwrap(),
            ts_timeonly: Regex::new(r"(\d{2}):(\d{2}):(\d{2})\.(\d{3})").unwrap(),
        }
    }

    /// Scan one log line. Returns None when the line carries no NMEA payload.
    ///
    /// `base_date` supplies the date parts the short timestamp formats lack.
    pub fn scan_line(&self, line: &str, base_date: NaiveDate) -> Option<ScannedLine> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let sentences: Vec<String> = self
            .nmea
            .find_iter(line)
            .map(|m| m.as_str().trim().to_string())
            .collect();
        if sentences.is_empty() {
            return None;
        }

        let stream = if line.contains(RAW_TAG) {
            Stream::Raw
        } else {
            Stream::Primary
        };

        Some(ScannedLine {
            timestamp: self.line_timestamp(line, base_date),
            sentences,
            stream,
        })
    }

    /// Extract a timestamp from the log line prefix, best effort
    pub fn line_timestamp(&self, line: &str, base_date: NaiveDate) -> Option<NaiveDateTime> {
        if let Some(c) = self.ts_full.captures(line) {
            let date = NaiveDate::from_ymd_opt(
                c[1].parse().ok()?,
                c[2].parse().ok()?,
                c[3].parse().ok()?,
            )?;
            let time = NaiveTime::from_hms_milli_opt(
                c[4].parse().ok()?,
                c[5].parse().ok()?,
                c[6].parse().ok()?,
                c[7].parse().ok()?,
            )?;
            return Some(date.and_time(time));
        }

        if let Some(c) = self.ts_monthday.captures(line) {
            let date = base_date
                .with_month(c[1].parse().ok()?)?
                .with_day(c[2].parse().ok()?)?;
            let time = NaiveTime::from_hms_milli_opt(
                c[3].parse().ok()?,
                c[4].parse().ok()?,
                c[5].parse().ok()?,
                c[6].parse().ok()?,
            )?;
            return Some(date.and_time(time));
        }

        if let Some(c) = self.ts_timeonly.captures(line) {
            let time = NaiveTime::from_hms_milli_opt(
                c[1].parse().ok()?,
                c[2].parse().ok()?,
                c[3].parse().ok()?,
                c[4].parse().ok()?,
            )?;
            return Some(base_date.and_time(time));
        }

        None
    }
}

impl Default for AndroidLogScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// List log files in a folder, reverse name order.
///
/// A single log file (auto-detection classifies files with embedded NMEA as
/// Android log content) is returned as a one-element list.
pub fn log_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if folder.is_file() {
        return Ok(vec![folder.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    files.sort();
    files.reverse();
    Ok(files)
}
