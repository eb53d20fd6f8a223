// src/ingest/kml_file.rs
//! Reading fixes back out of existing KML documents
//!
//! Only gx:Track data carries per-point timestamps, so that is what feeds
//! the segmentation pipeline. Plain LineString coordinates have no time
//! axis and are ignored.

use crate::error::Result;
use crate::gps::data::{Fix, Stream};
use chrono::{DateTime, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

pub fn read_fixes(path: &Path) -> Result<Vec<Fix>> {
    let s = std::fs::read_to_string(path)?;
    let fixes = parse_kml_str(&s)?;
    println!("Parsed {} fixes from KML file", fixes.len());
    Ok(fixes)
}

fn parse_kml_str(s: &str) -> Result<Vec<Fix>> {
    let mut reader = Reader::from_str(s);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut whens: Vec<NaiveDateTime> = Vec::new();
    let mut coords: Vec<(f64, f64, Option<f64>)> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name_vec = e.name().as_ref().to_vec();
                let name = name_vec.as_slice();
                if name.ends_with(b"when") {
                    if let Ok(Event::Text(t)) = reader.read_event_into(&mut buf) {
                        let txt = t.unescape().unwrap_or_default().to_string();
                        if let Some(ts) = parse_when(&txt) {
                            whens.push(ts);
                        }
                    }
                } else if name.ends_with(b"coord") {
                    if let Ok(Event::Text(t)) = reader.read_event_into(&mut buf) {
                        let txt = t.unescape().unwrap_or_default().to_string();
                        if let Some(c) = parse_coord(&txt) {
                            coords.push(c);
                        }
                    }
                }
            }
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    let mut fixes = Vec::new();
    for (ts, (lon, lat, alt)) in whens.into_iter().zip(coords) {
        let mut fix = Fix::new(ts, lat, lon, Stream::Primary);
        fix.altitude = alt;
        fixes.push(fix);
    }
    Ok(fixes)
}

/// gx:Track `<when>`: RFC 3339 or plain `YYYY-MM-DD HH:MM:SS`
fn parse_when(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").ok()
}

/// gx:Track `<gx:coord>`: whitespace-separated `lon lat [alt]`
fn parse_coord(text: &str) -> Option<(f64, f64, Option<f64>)> {
    let mut parts = text.split_whitespace();
    let lon = parts.next()?.parse::<f64>().ok()?;
    let lat = parts.next()?.parse::<f64>().ok()?;
    let alt = parts.next().and_then(|a| a.parse::<f64>().ok());
    Some((lon, lat, alt))
}
