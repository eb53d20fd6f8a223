// src/track.rs
//! Track accumulation and time-gap segmentation

use crate::gps::data::{Fix, Stream};
use chrono::Duration;

/// A finalized, non-empty, time-ordered run of fixes from one stream
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub stream: Stream,
    pub fixes: Vec<Fix>,
}

impl Track {
    pub fn start(&self) -> &Fix {
        &self.fixes[0]
    }

    pub fn end(&self) -> &Fix {
        &self.fixes[self.fixes.len() - 1]
    }

    pub fn duration(&self) -> Duration {
        self.end().timestamp - self.start().timestamp
    }

    pub fn point_count(&self) -> usize {
        self.fixes.len()
    }

    pub fn latitude_range(&self) -> (f64, f64) {
        Self::min_max(self.fixes.iter().map(|f| f.latitude))
    }

    pub fn longitude_range(&self) -> (f64, f64) {
        Self::min_max(self.fixes.iter().map(|f| f.longitude))
    }

    pub fn altitude_range(&self) -> Option<(f64, f64)> {
        let alts: Vec<f64> = self.fixes.iter().filter_map(|f| f.altitude).collect();
        if alts.is_empty() {
            None
        } else {
            Some(Self::min_max(alts.into_iter()))
        }
    }

    pub fn speed_range(&self) -> Option<(f64, f64)> {
        let speeds: Vec<f64> = self.fixes.iter().filter_map(|f| f.speed).collect();
        if speeds.is_empty() {
            None
        } else {
            Some(Self::min_max(speeds.into_iter()))
        }
    }

    fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
        values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    }

    pub fn format_duration(&self) -> String {
        let total_seconds = self.duration().num_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

/// Per-stream track accumulator.
///
/// Two states: no active track, or building one. A fix whose gap to the
/// previous fix reaches `gap` finalizes the active track and seeds a new
/// one; end of input finalizes whatever is active. Each stream runs its own
/// builder with its own sequential numbering.
pub struct TrackBuilder {
    stream: Stream,
    gap: Duration,
    dedup_window: Duration,
    dedup_coord_delta: f64,
    current: Vec<Fix>,
    finished: Vec<Track>,
    counter: usize,
}

impl TrackBuilder {
    pub fn new(stream: Stream, gap_seconds: u64) -> Self {
        Self {
            stream,
            gap: Duration::seconds(gap_seconds as i64),
            dedup_window: Duration::seconds(1),
            dedup_coord_delta: 0.0001,
            current: Vec::new(),
            finished: Vec::new(),
            counter: 0,
        }
    }

    pub fn with_dedup(mut self, window_seconds: f64, coord_delta: f64) -> Self {
        self.dedup_window = Duration::milliseconds((window_seconds * 1000.0) as i64);
        self.dedup_coord_delta = coord_delta;
        self
    }

    /// Feed the next fix, splitting tracks on time gaps and suppressing
    /// near-duplicate points
    pub fn push(&mut self, fix: Fix) {
        debug_assert_eq!(fix.stream, self.stream);

        if let Some(last) = self.current.last() {
            let elapsed = fix.timestamp - last.timestamp;

            if elapsed >= self.gap {
                println!(
                    "Time gap of {:.1} seconds detected in {} stream, starting new track",
                    elapsed.num_milliseconds() as f64 / 1000.0,
                    self.stream.label().to_lowercase()
                );
                self.finalize_current();
            } else if elapsed.abs() <= self.dedup_window
                && (fix.latitude - last.latitude).abs() <= self.dedup_coord_delta
                && (fix.longitude - last.longitude).abs() <= self.dedup_coord_delta
            {
                // Same point resampled within the duplicate window
                return;
            }
        }

        self.current.push(fix);
    }

    /// Finalize any active track and return all tracks in order
    pub fn finish(mut self) -> Vec<Track> {
        self.finalize_current();
        self.finished
    }

    fn finalize_current(&mut self) {
        if self.current.is_empty() {
            return;
        }

        self.counter += 1;
        let name = format!("Track {} {:02}", self.stream.label(), self.counter);
        let fixes = std::mem::take(&mut self.current);

        println!("{} completed with {} points", name, fixes.len());

        self.finished.push(Track {
            name,
            stream: self.stream,
            fixes,
        });
    }
}
