// src/ingest/mod.rs
//! Input readers and format detection

pub mod android;
pub mod kml_file;
pub mod nmea_file;

use clap::ValueEnum;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Input format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Probe the input and pick a format automatically
    Auto,
    /// Existing KML document (gx:Track data)
    Kml,
    /// Plain NMEA capture, one sentence per line
    Nmea,
    /// Folder of Android log files with embedded NMEA sentences
    AndroidLogs,
}

/// Detect the input format by probing the path.
///
/// Probes run in a fixed order, each returning a definite answer:
/// directories are Android log folders; files with XML markers in the first
/// lines are KML; lines starting with `$GP`/`$GN` are plain NMEA; NMEA
/// embedded mid-line means Android log content.
pub fn detect_format(path: &Path) -> Option<InputFormat> {
    if path.is_dir() {
        return Some(InputFormat::AndroidLogs);
    }

    let file = File::open(path).ok()?;
    let reader = BufReader::new(file);
    let head: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .map(|l| l.trim().to_string())
        .collect();

    let joined = head.join(" ").to_lowercase();
    if joined.contains("<?xml") || joined.contains("<kml") || joined.contains("xmlns") {
        return Some(InputFormat::Kml);
    }

    if head
        .iter()
        .any(|l| l.starts_with("$GP") || l.starts_with("$GN"))
    {
        return Some(InputFormat::Nmea);
    }

    if head.iter().any(|l| l.contains("$GP") || l.contains("$GN")) {
        return Some(InputFormat::AndroidLogs);
    }

    None
}

/// Fallback order for inconclusive auto-detection
pub fn fallback_order() -> [InputFormat; 3] {
    [InputFormat::Kml, InputFormat::Nmea, InputFormat::AndroidLogs]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_directory_as_android_logs() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_format(dir.path()), Some(InputFormat::AndroidLogs));
    }

    #[test]
    fn test_detect_kml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>").unwrap();
        writeln!(file, "<kml xmlns=\"http://www.opengis.net/kml/2.2\">").unwrap();
        assert_eq!(detect_format(file.path()), Some(InputFormat::Kml));
    }

    #[test]
    fn test_detect_nmea() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47").unwrap();
        assert_eq!(detect_format(file.path()), Some(InputFormat::Nmea));
    }

    #[test]
    fn test_detect_android_log_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "01-13 10:00:00.000  1234  5678 I GnssLocationProvider: $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47").unwrap();
        assert_eq!(detect_format(file.path()), Some(InputFormat::AndroidLogs));
    }

    #[test]
    fn test_detect_unknown() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nothing to see here").unwrap();
        assert_eq!(detect_format(file.path()), None);
    }
}
