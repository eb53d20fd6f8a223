// src/kml.rs
//! KML document assembly

use crate::track::Track;
use chrono::Local;

const TRACK_COLORS: [&str; 6] = [
    "ff0000ff", "ff00ff00", "ffff0000", "ff00ffff", "ffff00ff", "ffffff00",
];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct KmlWriter {
    name: String,
    description: String,
    line_width: u32,
}

impl KmlWriter {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            line_width: 3,
        }
    }

    pub fn with_line_width(mut self, width: u32) -> Self {
        self.line_width = width;
        self
    }

    /// Render all tracks into one KML document, grouped by stream into folders
    pub fn render(&self, tracks: &[Track]) -> String {
        let total_points: usize = tracks.iter().map(|t| t.point_count()).sum();

        let mut kml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <kml xmlns=\"http://www.opengis.net/kml/2.2\">\n\
             \x20\x20<Document>\n",
        );

        kml.push_str(&format!(
            "    <name>{}</name>\n",
            Self::escape_xml(&self.name)
        ));
        kml.push_str(&format!(
            "    <description>{}\nGenerated on {}\nTracks: {}, Total points: {}</description>\n",
            Self::escape_xml(&self.description),
            Local::now().format(TIME_FORMAT),
            tracks.len(),
            total_points
        ));

        for (i, color) in TRACK_COLORS.iter().enumerate() {
            kml.push_str(&format!(
                "    <Style id=\"trackStyle{}\">\n      <LineStyle>\n        <color>{}</color>\n        <width>{}</width>\n      </LineStyle>\n    </Style>\n",
                i + 1,
                color,
                self.line_width
            ));
        }

        // One folder per stream, streams in a stable order
        let mut streams: Vec<_> = Vec::new();
        for track in tracks {
            if !streams.contains(&track.stream) {
                streams.push(track.stream);
            }
        }

        for stream in streams {
            let stream_tracks: Vec<&Track> =
                tracks.iter().filter(|t| t.stream == stream).collect();

            kml.push_str("    <Folder>\n");
            kml.push_str(&format!(
                "      <name>{} Tracks ({} tracks)</name>\n",
                stream.label(),
                stream_tracks.len()
            ));

            for (idx, track) in stream_tracks.iter().enumerate() {
                self.push_track(&mut kml, track, idx);
            }

            kml.push_str("    </Folder>\n");
        }

        kml.push_str("  </Document>\n</kml>\n");
        kml
    }

    fn push_track(&self, kml: &mut String, track: &Track, index: usize) {
        let start = track.start();
        let end = track.end();
        let style = (index % TRACK_COLORS.len()) + 1;

        kml.push_str("      <Placemark>\n");
        kml.push_str(&format!(
            "        <name>{}</name>\n",
            Self::escape_xml(&track.name)
        ));
        kml.push_str(&format!(
            "        <description>{}</description>\n",
            Self::escape_xml(&self.track_description(track))
        ));
        kml.push_str(&format!("        <styleUrl>#trackStyle{}</styleUrl>\n", style));
        kml.push_str("        <LineString>\n");
        kml.push_str("          <tessellate>1</tessellate>\n");
        kml.push_str("          <altitudeMode>absolute</altitudeMode>\n");
        kml.push_str("          <coordinates>\n");
        for fix in &track.fixes {
            kml.push_str(&format!(
                "{},{},{}\n",
                fix.longitude,
                fix.latitude,
                fix.altitude_or_zero()
            ));
        }
        kml.push_str("          </coordinates>\n");
        kml.push_str("        </LineString>\n");
        kml.push_str("      </Placemark>\n");

        // Start and end markers
        for (marker, fix) in [("Start", start), ("End", end)] {
            kml.push_str("      <Placemark>\n");
            kml.push_str(&format!(
                "        <name>{} {}</name>\n",
                Self::escape_xml(&track.name),
                marker
            ));
            kml.push_str(&format!(
                "        <description>{} {}: {}</description>\n",
                Self::escape_xml(&track.name),
                marker.to_lowercase(),
                fix.timestamp.format(TIME_FORMAT)
            ));
            kml.push_str("        <Point>\n");
            kml.push_str(&format!(
                "          <coordinates>{},{},{}</coordinates>\n",
                fix.longitude,
                fix.latitude,
                fix.altitude_or_zero()
            ));
            kml.push_str("        </Point>\n");
            kml.push_str("      </Placemark>\n");
        }
    }

    fn track_description(&self, track: &Track) -> String {
        let (lat_min, lat_max) = track.latitude_range();
        let (lon_min, lon_max) = track.longitude_range();

        let mut desc = format!(
            "{}: {} to {}\nDuration: {}\nPoints: {}\nLatitude range: {:.6} to {:.6}\nLongitude range: {:.6} to {:.6}",
            track.name,
            track.start().timestamp.format(TIME_FORMAT),
            track.end().timestamp.format(TIME_FORMAT),
            track.format_duration(),
            track.point_count(),
            lat_min,
            lat_max,
            lon_min,
            lon_max
        );

        if let Some((alt_min, alt_max)) = track.altitude_range() {
            desc.push_str(&format!(
                "\nAltitude range: {:.1}m to {:.1}m",
                alt_min, alt_max
            ));
        }
        if let Some((spd_min, spd_max)) = track.speed_range() {
            desc.push_str(&format!(
                "\nSpeed range: {:.1} to {:.1} km/h",
                spd_min, spd_max
            ));
        }

        desc
    }

    fn escape_xml(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }
}
