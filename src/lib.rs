// src/lib.rs
//! nmea2kml library
//!
//! Converts Android log folders, plain NMEA captures, and existing KML
//! documents into a multi-track KML file, splitting tracks on time gaps.

pub mod config;
pub mod converter;
pub mod error;
pub mod gps;
pub mod ingest;
pub mod kml;
pub mod track;

// Re-export main types for convenience
pub use config::ConvertConfig;
pub use converter::{convert, ConvertOptions, RunSummary};
pub use error::{ConvertError, Result};
pub use gps::data::{Fix, Stream};
pub use ingest::InputFormat;
pub use track::{Track, TrackBuilder};
