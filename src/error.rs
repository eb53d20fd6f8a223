// src/error.rs
//! Error types for the converter

use std::fmt;

pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Debug)]
pub enum ConvertError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Xml(quick_xml::Error),
    Parse(String),
    NoFixes,
    Other(String),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Io(e) => write!(f, "IO error: {}", e),
            ConvertError::Json(e) => write!(f, "JSON error: {}", e),
            ConvertError::Xml(e) => write!(f, "XML error: {}", e),
            ConvertError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConvertError::NoFixes => write!(f, "No GPS fixes found in input"),
            ConvertError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Io(e) => Some(e),
            ConvertError::Json(e) => Some(e),
            ConvertError::Xml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(error: std::io::Error) -> Self {
        ConvertError::Io(error)
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(error: serde_json::Error) -> Self {
        ConvertError::Json(error)
    }
}

impl From<quick_xml::Error> for ConvertError {
    fn from(error: quick_xml::Error) -> Self {
        ConvertError::Xml(error)
    }
}

impl From<anyhow::Error> for ConvertError {
    fn from(error: anyhow::Error) -> Self {
        ConvertError::Other(error.to_string())
    }
}
