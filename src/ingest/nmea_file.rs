// src/ingest/nmea_file.rs
//! Plain NMEA capture files, one sentence per line

use crate::error::Result;
use crate::gps::data::{Fix, Stream};
use crate::gps::nmea::NmeaDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Decode a plain NMEA file into fixes.
///
/// Timestamps come from the sentences themselves (RMC date plus RMC/GGA
/// time); a fix is emitted whenever the decoded timestamp advances and a
/// position is known.
pub fn read_fixes(path: &Path) -> Result<Vec<Fix>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut decoder = NmeaDecoder::new();
    let mut fixes: Vec<Fix> = Vec::new();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue, // non-UTF8 noise in mixed captures
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        decoder.apply(line);

        let timestamp = match decoder.sentence_timestamp() {
            Some(ts) => ts,
            None => continue,
        };

        if fixes.last().map(|f| f.timestamp) == Some(timestamp) {
            continue;
        }

        if let Some(fix) = decoder.fix(timestamp, Stream::Primary) {
            fixes.push(fix);
            decoder.reset_priorities();
        }
    }

    println!("Parsed {} fixes from NMEA file", fixes.len());
    Ok(fixes)
}
