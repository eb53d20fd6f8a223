// src/converter.rs
//! End-to-end conversion pipeline
//!
//! Resolves the input format, decodes fixes, segments them into tracks per
//! stream, and writes the output KML document.

use crate::{
    config::ConvertConfig,
    error::{ConvertError, Result},
    gps::data::{Fix, Stream},
    gps::nmea::NmeaDecoder,
    ingest::{self, android, kml_file, nmea_file, InputFormat},
    kml::KmlWriter,
    track::{Track, TrackBuilder},
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: InputFormat,
    pub date_filter: Option<NaiveDate>,
    pub name: String,
    pub description: String,
    pub include_raw: bool,
    pub strict: bool,
}

/// What a finished run produced, for the stdout summary
pub struct RunSummary {
    pub track_count: usize,
    pub total_points: usize,
    pub time_range: Option<(NaiveDateTime, NaiveDateTime)>,
    pub lat_range: Option<(f64, f64)>,
    pub lon_range: Option<(f64, f64)>,
    pub alt_range: Option<(f64, f64)>,
    pub avg_speed: Option<f64>,
    pub per_track: Vec<(String, usize, String)>,
}

impl RunSummary {
    fn from_tracks(tracks: &[Track]) -> Self {
        let all: Vec<&Fix> = tracks.iter().flat_map(|t| t.fixes.iter()).collect();

        let time_range = match (all.first(), all.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        };

        let min_max = |values: Vec<f64>| -> Option<(f64, f64)> {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), v| (lo.min(*v), hi.max(*v)),
                ))
            }
        };

        let speeds: Vec<f64> = all.iter().filter_map(|f| f.speed).filter(|s| *s > 0.0).collect();
        let avg_speed = if speeds.is_empty() {
            None
        } else {
            Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
        };

        Self {
            track_count: tracks.len(),
            total_points: all.len(),
            time_range,
            lat_range: min_max(all.iter().map(|f| f.latitude).collect()),
            lon_range: min_max(all.iter().map(|f| f.longitude).collect()),
            alt_range: min_max(all.iter().filter_map(|f| f.altitude).collect()),
            avg_speed,
            per_track: tracks
                .iter()
                .map(|t| (t.name.clone(), t.point_count(), t.format_duration()))
                .collect(),
        }
    }

    pub fn print(&self) {
        println!(
            "Found {} separate tracks with {} total GPS coordinates",
            self.track_count, self.total_points
        );
        if let Some((start, end)) = self.time_range {
            println!("Time range: {} to {}", start, end);
        }
        if let Some((lo, hi)) = self.lat_range {
            println!("Latitude range: {:.6} to {:.6}", lo, hi);
        }
        if let Some((lo, hi)) = self.lon_range {
            println!("Longitude range: {:.6} to {:.6}", lo, hi);
        }
        if let Some((lo, hi)) = self.alt_range {
            println!("Altitude range: {:.1}m to {:.1}m", lo, hi);
        }
        if let Some(avg) = self.avg_speed {
            println!("Average speed: {:.1} km/h", avg);
        }

        println!("\nTrack Summary:");
        for (name, points, duration) in &self.per_track {
            println!("  {}: {} points, {} duration", name, points, duration);
        }
    }
}

/// Run the full conversion and write the output KML
pub fn convert(options: &ConvertOptions, config: &ConvertConfig) -> Result<RunSummary> {
    if !options.input.exists() {
        return Err(ConvertError::Other(format!(
            "Input path '{}' not found",
            options.input.display()
        )));
    }

    let fixes = collect_fixes(options)?;

    let fixes = match options.date_filter {
        Some(date) => {
            let before = fixes.len();
            let kept: Vec<Fix> = fixes
                .into_iter()
                .filter(|f| f.timestamp.date() == date)
                .collect();
            println!("Filtered to {} of {} fixes for date {}", kept.len(), before, date);
            kept
        }
        None => fixes,
    };

    if fixes.is_empty() {
        eprintln!("Warning: no GPS fixes found in input");
        return Err(ConvertError::NoFixes);
    }

    let tracks = build_tracks(fixes, config);

    let writer = KmlWriter::new(&options.name, &options.description)
        .with_line_width(config.line_width);
    let kml = writer.render(&tracks);
    std::fs::write(&options.output, kml)?;
    println!("KML track saved to {}", options.output.display());

    Ok(RunSummary::from_tracks(&tracks))
}

/// Segment fixes into tracks, one builder per stream
pub fn build_tracks(fixes: Vec<Fix>, config: &ConvertConfig) -> Vec<Track> {
    let mut primary = TrackBuilder::new(Stream::Primary, config.gap_seconds)
        .with_dedup(config.dedup_seconds, config.dedup_coord_delta);
    let mut raw = TrackBuilder::new(Stream::Raw, config.gap_seconds)
        .with_dedup(config.dedup_seconds, config.dedup_coord_delta);

    for fix in fixes {
        match fix.stream {
            Stream::Primary => primary.push(fix),
            Stream::Raw => raw.push(fix),
        }
    }

    let mut tracks = primary.finish();
    tracks.extend(raw.finish());
    tracks
}

fn collect_fixes(options: &ConvertOptions) -> Result<Vec<Fix>> {
    match options.format {
        InputFormat::Auto => {
            if let Some(format) = ingest::detect_format(&options.input) {
                println!(
                    "Detected input format: {:?}",
                    format
                );
                return collect_with_format(options, format);
            }

            println!("Warning: Could not auto-detect format. Trying KML first, then NMEA...");
            for format in ingest::fallback_order() {
                match collect_with_format(options, format) {
                    Ok(fixes) if !fixes.is_empty() => return Ok(fixes),
                    _ => continue,
                }
            }
            Ok(Vec::new())
        }
        format => collect_with_format(options, format),
    }
}

fn collect_with_format(options: &ConvertOptions, format: InputFormat) -> Result<Vec<Fix>> {
    match format {
        InputFormat::Kml => kml_file::read_fixes(&options.input),
        InputFormat::Nmea => nmea_file::read_fixes(&options.input),
        InputFormat::AndroidLogs => {
            read_android_fixes(&options.input, options.date_filter, options.include_raw, options.strict)
        }
        InputFormat::Auto => unreachable!("auto is resolved before dispatch"),
    }
}

/// Scrape fixes out of a folder of Android log files.
///
/// Files are processed newest-first. The base date for short log timestamps
/// starts from the date filter (or today) and follows RMC dates as they are
/// decoded. Lines belonging to the raw stream are ignored entirely unless
/// `include_raw` is set.
fn read_android_fixes(
    folder: &Path,
    date_filter: Option<NaiveDate>,
    include_raw: bool,
    strict: bool,
) -> Result<Vec<Fix>> {
    let files = android::log_files(folder)?;
    if files.is_empty() {
        println!("No log files found in {}", folder.display());
        return Ok(Vec::new());
    }

    println!("Processing {} log files from {}", files.len(), folder.display());

    let scanner = android::AndroidLogScanner::new();
    let mut decoder = NmeaDecoder::new();
    let mut base_date = date_filter.unwrap_or_else(|| Local::now().date_naive());
    let mut fixes: Vec<Fix> = Vec::new();

    for path in files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        println!("Processing {}...", file_name);

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                if strict {
                    return Err(e.into());
                }
                eprintln!("Warning: Error processing {}: {}", file_name, e);
                continue;
            }
        };

        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => continue, // binary noise between log records
            };

            let scanned = match scanner.scan_line(&line, base_date) {
                Some(s) => s,
                None => continue,
            };

            if scanned.stream == Stream::Raw && !include_raw {
                continue;
            }

            for sentence in &scanned.sentences {
                decoder.apply(sentence);
            }

            // RMC dates steer the base date for short timestamp formats
            if let Some(date) = decoder.date() {
                base_date = date;
            }

            let timestamp = match scanned.timestamp {
                Some(ts) => ts,
                None => {
                    eprintln!("Warning: no usable timestamp on NMEA log line, dropping");
                    continue;
                }
            };

            if let Some(fix) = decoder.fix(timestamp, scanned.stream) {
                fixes.push(fix);
                decoder.reset_priorities();
            }
        }
    }

    println!("Extracted {} GPS coordinates from Android logs", fixes.len());
    Ok(fixes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::nmea::sentence_checksum;

    fn with_checksum(body: &str) -> String {
        format!("${}*{:02X}", body, sentence_checksum(body))
    }

    fn log_line(time: &str, sentence: &str) -> String {
        format!("01-13 {time}  1234  5678 I GnssLocationProvider: {sentence}")
    }

    fn write_log(dir: &Path, name: &str, lines: &[String]) {
        std::fs::write(dir.join(name), lines.join("\n")).unwrap();
    }

    fn gga(time: &str, lat: &str) -> String {
        with_checksum(&format!(
            "GPGGA,{time},{lat},N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"
        ))
    }

    #[test]
    fn test_android_fixes_with_gap() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "logcat.01",
            &[
                log_line("10:00:00.000", &gga("100000", "4807.038")),
                log_line("10:05:00.000", &gga("100500", "4807.100")),
                log_line("10:20:00.000", &gga("102000", "4807.200")),
            ],
        );

        let fixes = read_android_fixes(dir.path(), None, false, false).unwrap();
        assert_eq!(fixes.len(), 3);

        let tracks = build_tracks(fixes, &ConvertConfig::default());
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].point_count(), 2);
        assert_eq!(tracks[1].point_count(), 1);
    }

    #[test]
    fn test_raw_lines_excluded_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let raw_line = format!(
            "01-13 10:00:00.000 I GPS: {} {}",
            android::RAW_TAG,
            gga("100000", "4807.038")
        );
        write_log(
            dir.path(),
            "logcat.01",
            &[raw_line, log_line("10:00:05.000", &gga("100005", "4808.000"))],
        );

        let fixes = read_android_fixes(dir.path(), None, false, false).unwrap();
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].stream, Stream::Primary);

        let fixes = read_android_fixes(dir.path(), None, true, false).unwrap();
        assert_eq!(fixes.len(), 2);
        assert!(fixes.iter().any(|f| f.stream == Stream::Raw));
    }

    #[test]
    fn test_date_filter_by_calendar_day() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "logcat.01",
            &[
                "2024-01-13 10:00:00.000 I GPS: ".to_string() + &gga("100000", "4807.038"),
                "2024-01-14 10:00:00.000 I GPS: ".to_string() + &gga("100000", "4807.100"),
            ],
        );

        let fixes = read_android_fixes(dir.path(), None, false, false).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
        let kept: Vec<Fix> = fixes
            .into_iter()
            .filter(|f| f.timestamp.date() == date)
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].timestamp.date(), date);
    }

    #[test]
    fn test_malformed_sentence_recovered() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "logcat.01",
            &[
                log_line("10:00:00.000", "$GPGGA,100000,4807.038,N"),
                log_line("10:00:05.000", &gga("100005", "4807.100")),
            ],
        );

        let fixes = read_android_fixes(dir.path(), None, false, false).unwrap();
        assert_eq!(fixes.len(), 1);
        assert!((fixes[0].latitude - 48.1183).abs() < 0.001);
    }

    #[test]
    fn test_files_processed_in_reverse_order() {
        let dir = tempfile::tempdir().unwrap();
        write_log(
            dir.path(),
            "logcat.01",
            &[log_line("11:00:00.000", &gga("110000", "4808.000"))],
        );
        write_log(
            dir.path(),
            "logcat.02",
            &[log_line("10:00:00.000", &gga("100000", "4807.000"))],
        );

        let fixes = read_android_fixes(dir.path(), None, false, false).unwrap();
        assert_eq!(fixes.len(), 2);
        // logcat.02 comes first
        assert_eq!(fixes[0].timestamp.time(), chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }
}
