// src/gps/data.rs
//! Decoded GPS fix records

use chrono::NaiveDateTime;

/// Which coordinate stream a fix belongs to.
///
/// Log lines tagged `s:1*78` carry the receiver's raw (uncorrected)
/// coordinates and are kept apart from the corrected stream; tracks are
/// built and numbered independently per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Primary,
    Raw,
}

impl Stream {
    /// Label used in track and folder names
    pub fn label(&self) -> &'static str {
        match self {
            Stream::Primary => "Corrected",
            Stream::Raw => "Raw",
        }
    }
}

/// One decoded position sample. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    /// Ground speed in km/h
    pub speed: Option<f64>,
    /// True course in degrees
    pub course: Option<f64>,
    pub stream: Stream,
}

impl Fix {
    pub fn new(timestamp: NaiveDateTime, latitude: f64, longitude: f64, stream: Stream) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            altitude: None,
            speed: None,
            course: None,
            stream,
        }
    }

    /// Altitude for KML output, 0 when the receiver never reported one
    pub fn altitude_or_zero(&self) -> f64 {
        self.altitude.unwrap_or(0.0)
    }
}
