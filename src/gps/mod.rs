// src/gps/mod.rs
//! GPS fix data and NMEA parsing

pub mod data;
pub mod nmea;

pub use data::{Fix, Stream};
pub use nmea::NmeaDecoder;
