// src/gps/nmea.rs
//! NMEA sentence parsing
//!
//! Decodes GGA, RMC and VTG sentences into partial fix fragments. Fragments
//! accumulate in the decoder until the pipeline emits a fix; speed and course
//! keep the highest-priority source seen since the last emit (VTG km/h over
//! VTG knots over RMC knots).

use super::data::{Fix, Stream};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const KNOTS_TO_KMH: f64 = 1.852;

// Source priorities for merged speed/course values
const RANK_NONE: u8 = 0;
const RANK_RMC: u8 = 1;
const RANK_VTG_KNOTS: u8 = 2;
const RANK_VTG_KMH: u8 = 3;

/// Stateful NMEA decoder accumulating fix fragments
#[derive(Debug, Default)]
pub struct NmeaDecoder {
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
    speed: Option<f64>,
    speed_rank: u8,
    course: Option<f64>,
    course_rank: u8,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
}

impl NmeaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sentence into the decoder. Malformed sentences (bad
    /// checksum, wrong field count, unparsable numbers) are ignored.
    pub fn apply(&mut self, line: &str) {
        let line = line.trim();
        if !verify_checksum(line) {
            return;
        }

        // Checksum trailer is not part of any field
        let body = line.split('*').next().unwrap_or(line);
        let parts: Vec<&str> = body.split(',').collect();

        if line.starts_with("$GPGGA") || line.starts_with("$GNGGA") {
            self.parse_gga(&parts);
        } else if line.starts_with("$GPRMC") || line.starts_with("$GNRMC") {
            self.parse_rmc(&parts);
        } else if line.starts_with("$GPVTG") || line.starts_with("$GNVTG") {
            self.parse_vtg(&parts);
        }
    }

    /// GGA - Global Positioning System Fix Data
    fn parse_gga(&mut self, parts: &[&str]) {
        if parts.len() < 10 {
            return;
        }

        if let Some(time) = parse_hms(parts[1]) {
            self.time = Some(time);
        }

        // Positions are only trusted with an actual fix (quality > 0)
        let quality = parts[6].parse::<u8>().unwrap_or(0);
        if quality == 0 {
            return;
        }

        if let (Some(lat), Some(lon)) = (
            degrees_minutes_to_decimal(parts[2], parts[3]),
            degrees_minutes_to_decimal(parts[4], parts[5]),
        ) {
            self.latitude = Some(lat);
            self.longitude = Some(lon);
        }

        if !parts[9].is_empty() {
            if let Ok(alt) = parts[9].parse::<f64>() {
                self.altitude = Some(alt);
            }
        }
    }

    /// RMC - Recommended Minimum Course
    fn parse_rmc(&mut self, parts: &[&str]) {
        if parts.len() < 10 {
            return;
        }

        if let Some(time) = parse_hms(parts[1]) {
            self.time = Some(time);
        }

        if let Some(date) = parse_ddmmyy(parts[9]) {
            self.date = Some(date);
        }

        // Only 'A' (active) fixes carry usable motion data
        if parts[2] != "A" {
            return;
        }

        if self.speed_rank <= RANK_RMC {
            if let Ok(knots) = parts[7].parse::<f64>() {
                self.speed = Some(knots * KNOTS_TO_KMH);
                self.speed_rank = RANK_RMC;
            }
        }

        if self.course_rank <= RANK_RMC {
            if let Ok(course) = parts[8].parse::<f64>() {
                self.course = Some(course);
                self.course_rank = RANK_RMC;
            }
        }

        // RMC carries a fallback position (fields 3-6)
        if self.latitude.is_none() || self.longitude.is_none() {
            if let (Some(lat), Some(lon)) = (
                degrees_minutes_to_decimal(parts[3], parts[4]),
                degrees_minutes_to_decimal(parts[5], parts[6]),
            ) {
                self.latitude = Some(lat);
                self.longitude = Some(lon);
            }
        }
    }

    /// VTG - Track Made Good and Ground Speed
    ///
    /// Format: $GPVTG,course,T,course,M,speed,N,speed,K,mode
    fn parse_vtg(&mut self, parts: &[&str]) {
        if parts.len() < 10 {
            return;
        }

        // Mode indicator: only autonomous and differential fixes are usable
        let mode = parts[9];
        if mode != "A" && mode != "D" {
            return;
        }

        if self.course_rank <= RANK_VTG_KNOTS {
            if let Ok(course) = parts[1].parse::<f64>() {
                self.course = Some(course);
                self.course_rank = RANK_VTG_KNOTS;
            }
        }

        // Prefer the km/h field; fall back to knots
        if let Ok(kmh) = parts[7].parse::<f64>() {
            self.speed = Some(kmh);
            self.speed_rank = RANK_VTG_KMH;
        } else if self.speed_rank <= RANK_VTG_KNOTS {
            if let Ok(knots) = parts[5].parse::<f64>() {
                self.speed = Some(knots * KNOTS_TO_KMH);
                self.speed_rank = RANK_VTG_KNOTS;
            }
        }
    }

    /// Whether a position has been decoded
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Date last reported by RMC, if any
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Timestamp assembled from RMC date and RMC/GGA time, for inputs that
    /// carry no external log timestamp
    pub fn sentence_timestamp(&self) -> Option<NaiveDateTime> {
        Some(self.date?.and_time(self.time?))
    }

    /// Produce a fix at the given timestamp, if a position is known
    pub fn fix(&self, timestamp: NaiveDateTime, stream: Stream) -> Option<Fix> {
        let mut fix = Fix::new(timestamp, self.latitude?, self.longitude?, stream);
        fix.altitude = self.altitude;
        fix.speed = self.speed;
        fix.course = self.course;
        Some(fix)
    }

    /// Restart the speed/course priority resolution for the next fix
    pub fn reset_priorities(&mut self) {
        self.speed_rank = RANK_NONE;
        self.course_rank = RANK_NONE;
    }
}

/// XOR checksum over the sentence body (between `$` and `*`)
pub fn sentence_checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Verify the `*HH` trailer when present. Sentences without a trailer pass.
pub fn verify_checksum(line: &str) -> bool {
    let payload = match line.strip_prefix('$') {
        Some(p) => p,
        None => return false,
    };

    match payload.split_once('*') {
        Some((body, trailer)) => {
            // get() rejects multibyte junk in the trailer instead of panicking
            let hex = match trailer.get(..2) {
                Some(h) => h,
                None => return false,
            };
            match u8::from_str_radix(hex, 16) {
                Ok(expected) => sentence_checksum(body) == expected,
                Err(_) => false,
            }
        }
        None => true,
    }
}

/// Convert an NMEA DDMM.MMMM coordinate plus hemisphere into decimal degrees
pub fn degrees_minutes_to_decimal(value: &str, hemisphere: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }

    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw % 100.0;
    let mut decimal = degrees + minutes / 60.0;

    match hemisphere {
        "N" | "E" => {}
        "S" | "W" => decimal = -decimal,
        _ => return None,
    }

    Some(decimal)
}

/// Parse an NMEA HHMMSS.ss time field
///
/// Slices use `get` rather than indexing: log scraping can hand the decoder
/// arbitrary text, including multibyte characters at slice boundaries.
fn parse_hms(field: &str) -> Option<NaiveTime> {
    if field.len() < 6 {
        return None;
    }

    let hours = field.get(0..2)?.parse::<u32>().ok()?;
    let minutes = field.get(2..4)?.parse::<u32>().ok()?;
    let seconds = field.get(4..)?.parse::<f64>().ok()?;
    let millis = (seconds.fract() * 1000.0).round() as u32;

    NaiveTime::from_hms_milli_opt(hours, minutes, seconds.trunc() as u32, millis)
}

/// Parse an NMEA DDMMYY date field (years are 2000-based)
fn parse_ddmmyy(field: &str) -> Option<NaiveDate> {
    if field.len() != 6 {
        return None;
    }

    let day = field.get(0..2)?.parse::<u32>().ok()?;
    let month = field.get(2..4)?.parse::<u32>().ok()?;
    let year = 2000 + field.get(4..6)?.parse::<i32>().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn with_checksum(body: &str) -> String {
        format!("${}*{:02X}", body, sentence_checksum(body))
    }

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 35, 19)
            .unwrap()
    }

    #[test]
    fn test_gga_parsing() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47");

        let fix = decoder.fix(ts(), Stream::Primary).unwrap();
        // 48 deg 7.038 min / 11 deg 31.000 min
        assert!((fix.latitude - 48.1173).abs() < 0.0001);
        assert!((fix.longitude - 11.5167).abs() < 0.0001);
        assert_eq!(fix.altitude, Some(545.4));
    }

    #[test]
    fn test_gga_southern_western_hemispheres() {
        let lat = degrees_minutes_to_decimal("4807.038", "S").unwrap();
        let lon = degrees_minutes_to_decimal("01131.000", "W").unwrap();
        assert!(lat < 0.0);
        assert!(lon < 0.0);
        assert!((lat + 48.1173).abs() < 0.0001);
        assert!((lon + 11.5167).abs() < 0.0001);
    }

    #[test]
    fn test_gga_without_fix_is_ignored() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply(&with_checksum("GPGGA,123519,4807.038,N,01131.000,E,0,00,,,M,,M,,"));
        assert!(!decoder.has_position());
    }

    #[test]
    fn test_rmc_speed_and_date() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply(&with_checksum(
            "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,130124,003.1,W",
        ));

        let fix = decoder.fix(ts(), Stream::Primary).unwrap();
        // 22.4 knots to km/h
        assert!((fix.speed.unwrap() - 41.4848).abs() < 0.001);
        assert_eq!(fix.course, Some(84.4));
        assert_eq!(decoder.date(), NaiveDate::from_ymd_opt(2024, 1, 13));
    }

    #[test]
    fn test_rmc_void_status_ignored() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply(&with_checksum(
            "GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W",
        ));
        let fix = decoder.fix(ts(), Stream::Primary);
        assert!(fix.is_none());
    }

    #[test]
    fn test_vtg_prefers_kmh_over_knots() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply(&with_checksum("GPVTG,054.7,T,034.4,M,005.5,N,010.2,K,A"));

        decoder.latitude = Some(48.0);
        decoder.longitude = Some(11.0);
        let fix = decoder.fix(ts(), Stream::Primary).unwrap();
        assert_eq!(fix.speed, Some(10.2));
        assert_eq!(fix.course, Some(54.7));
    }

    #[test]
    fn test_vtg_rejected_without_valid_mode() {
        let mut decoder = NmeaDecoder::new();
        // 'N' = data not valid
        decoder.apply(&with_checksum("GPVTG,054.7,T,034.4,M,005.5,N,010.2,K,N"));
        decoder.latitude = Some(48.0);
        decoder.longitude = Some(11.0);
        let fix = decoder.fix(ts(), Stream::Primary).unwrap();
        assert!(fix.speed.is_none());
    }

    #[test]
    fn test_speed_priority_vtg_over_rmc() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A");
        decoder.apply(&with_checksum("GPVTG,054.7,T,034.4,M,005.5,N,010.2,K,A"));

        let fix = decoder.fix(ts(), Stream::Primary).unwrap();
        assert_eq!(fix.speed, Some(10.2));
        assert_eq!(fix.course, Some(54.7));

        // RMC arriving after VTG must not downgrade the source
        decoder.apply("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A");
        let fix = decoder.fix(ts(), Stream::Primary).unwrap();
        assert_eq!(fix.speed, Some(10.2));

        // After a reset the RMC speed wins again
        decoder.reset_priorities();
        decoder.apply("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A");
        let fix = decoder.fix(ts(), Stream::Primary).unwrap();
        assert!((fix.speed.unwrap() - 41.4848).abs() < 0.001);
    }

    #[test]
    fn test_vtg_knots_fallback() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply(&with_checksum("GPVTG,054.7,T,034.4,M,005.5,N,,K,A"));
        decoder.latitude = Some(48.0);
        decoder.longitude = Some(11.0);
        let fix = decoder.fix(ts(), Stream::Primary).unwrap();
        assert!((fix.speed.unwrap() - 5.5 * 1.852).abs() < 0.001);
    }

    #[test]
    fn test_bad_checksum_discarded() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00");
        assert!(!decoder.has_position());
    }

    #[test]
    fn test_multibyte_junk_fields_discarded() {
        let mut decoder = NmeaDecoder::new();
        // 'é' straddles the HHMMSS slice boundary in the time field
        decoder.apply("$GPGGA,1é3456,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        // 'é' straddles the two-digit slice of the checksum trailer
        decoder.apply("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*Xé");
        // six bytes but five chars, 'é' straddles the MM slice of the date
        decoder.apply(&with_checksum(
            "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,13é12,003.1,W",
        ));

        // the junk fields are dropped, the rest still decodes
        assert!(decoder.sentence_timestamp().is_none());
        assert!(decoder.has_position());
    }

    #[test]
    fn test_truncated_sentence_discarded() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply(&with_checksum("GPGGA,123519,4807.038,N"));
        assert!(!decoder.has_position());

        // Subsequent valid sentences still decode
        decoder.apply("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47");
        assert!(decoder.has_position());
    }

    #[test]
    fn test_sentence_timestamp() {
        let mut decoder = NmeaDecoder::new();
        decoder.apply(&with_checksum(
            "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,130124,003.1,W",
        ));
        let ts = decoder.sentence_timestamp().unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2024, 1, 13)
                .unwrap()
                .and_hms_opt(12, 35, 19)
                .unwrap()
        );
    }
}
