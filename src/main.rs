// src/main.rs
//! nmea2kml - convert GPS logs to multi-track KML

use chrono::{Local, NaiveDate};
use clap::Parser;
use nmea2kml::{convert, ConvertConfig, ConvertOptions, InputFormat};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nmea2kml",
    version,
    about = "Convert Android log files containing NMEA GPS messages to KML track format",
    after_help = "Examples:\n  \
        nmea2kml logd/ -o gps_track.kml\n  \
        nmea2kml logd/ --date today -o today_track.kml\n  \
        nmea2kml logd/ --date 2026-01-13 --name \"Daily Commute\" -o commute.kml\n  \
        nmea2kml logd/ --raw -o tracks_with_raw.kml\n  \
        nmea2kml gps_data.txt --format nmea -o track.kml"
)]
struct Args {
    /// Input: KML file, NMEA file, or folder of Android log files
    input: PathBuf,

    /// Output KML file path
    #[arg(short, long)]
    output: PathBuf,

    /// Input format
    #[arg(long, value_enum, default_value = "auto")]
    format: InputFormat,

    /// Filter data by date: "today" or YYYY-MM-DD
    #[arg(long, value_parser = parse_date_argument)]
    date: Option<NaiveDate>,

    /// Name for the GPS track document
    #[arg(long, default_value = "GPS Track")]
    name: String,

    /// Description for the GPS track document
    #[arg(long, default_value = "Track converted from Android logs")]
    description: String,

    /// Include raw coordinates (s:1*78) tracks in the output
    #[arg(long)]
    raw: bool,

    /// Track split threshold in minutes
    #[arg(long)]
    gap_minutes: Option<u64>,

    /// Treat recoverable per-file read errors as fatal
    #[arg(long)]
    strict: bool,
}

fn parse_date_argument(s: &str) -> Result<NaiveDate, String> {
    if s.eq_ignore_ascii_case("today") {
        return Ok(Local::now().date_naive());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        format!("Invalid date format: '{}'. Use 'today' or 'YYYY-MM-DD' format.", s)
    })
}

fn main() {
    let args = Args::parse();

    let mut config = ConvertConfig::load().unwrap_or_default();
    if let Some(minutes) = args.gap_minutes {
        config.set_gap_minutes(minutes);
        // Overrides persist as the new default for later runs
        if let Err(e) = config.save() {
            eprintln!("Warning: could not save config: {}", e);
        }
    }

    let date_str = args
        .date
        .map(|d| format!(" for date {}", d))
        .unwrap_or_default();
    let raw_str = if args.raw {
        " (including raw coordinates)"
    } else {
        ""
    };
    println!(
        "Extracting GPS coordinates from {}{}{}",
        args.input.display(),
        date_str,
        raw_str
    );

    let options = ConvertOptions {
        input: args.input,
        output: args.output,
        format: args.format,
        date_filter: args.date,
        name: args.name,
        description: args.description,
        include_raw: args.raw,
        strict: args.strict,
    };

    match convert(&options, &config) {
        Ok(summary) => {
            summary.print();
            println!("You can open this file in Google Earth or other mapping applications.");
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
