//! Module for errors.
use std::{error::Error, fmt::Display};

/// Error from the radar data pipeline.
#[derive(Debug)]
pub enum RadarDataErr {
    // Inherited errors from std
    /// Error forwarded from std
    IO(::std::io::Error),

    // Other forwarded errors
    /// Database error
    Database(::rusqlite::Error),
    /// Error forwarded from the HTTP client
    Http(::reqwest::Error),
    /// Error forwarded from serde_json
    Json(::serde_json::Error),
    /// Error forwarded from the strum crate
    StrumError(strum::ParseError),
    /// General error with any cause information erased and replaced by a string
    GeneralError(String),

    // My own errors from this crate
    /// A required configuration value is missing.
    MissingConfig(&'static str),
    /// The authentication endpoint did not hand out a token.
    TokenFetch(String),
    /// A download kept failing with provider errors.
    DownloadFailed {
        /// Data kind that was requested.
        kind: String,
        /// Zone that was requested.
        zone: String,
        /// Resolution (maille) in meters.
        resolution: u32,
        /// Endpoint that was requested.
        url: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// The content-disposition header does not end with a date.
    InvalidContentDisposition(String),
    /// A date argument could not be parsed.
    InvalidTimestamp(String),
    /// There is no timestamp in the ledger for this key.
    NoLastTimestamp(String),
    /// The database structure is wrong.
    InvalidSchema,
}

impl Display for RadarDataErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        use crate::errors::RadarDataErr::*;

        match self {
            IO(err) => write!(f, "std lib io error: {}", err),

            Database(err) => write!(f, "database error: {}", err),
            Http(err) => write!(f, "http client error: {}", err),
            Json(err) => write!(f, "json error: {}", err),
            StrumError(err) => write!(f, "error forwarded from strum crate: {}", err),
            GeneralError(msg) => write!(f, "general error forwarded: {}", msg),

            MissingConfig(var) => write!(f, "Missing {} in environment variables", var),
            TokenFetch(msg) => write!(f, "unable to fetch an API token: {}", msg),
            DownloadFailed {
                kind,
                zone,
                resolution,
                url,
                attempts,
            } => write!(
                f,
                "Failed to download {} of {} (maille {}) [{}] after {} attempts.",
                kind, zone, resolution, url, attempts
            ),
            InvalidContentDisposition(value) => {
                write!(f, "no date in content-disposition header: {}", value)
            }
            InvalidTimestamp(value) => write!(f, "invalid date or timestamp: {}", value),
            NoLastTimestamp(key) => write!(f, "no last timestamp recorded for {}", key),
            InvalidSchema => write!(f, "invalid ledger format"),
        }
    }
}

impl Error for RadarDataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use crate::errors::RadarDataErr::*;

        match self {
            IO(err) => Some(err),
            Database(err) => Some(err),
            Http(err) => Some(err),
            Json(err) => Some(err),
            StrumError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<::std::io::Error> for RadarDataErr {
    fn from(err: ::std::io::Error) -> RadarDataErr {
        RadarDataErr::IO(err)
    }
}

impl From<::rusqlite::Error> for RadarDataErr {
    fn from(err: ::rusqlite::Error) -> RadarDataErr {
        RadarDataErr::Database(err)
    }
}

impl From<::reqwest::Error> for RadarDataErr {
    fn from(err: ::reqwest::Error) -> RadarDataErr {
        RadarDataErr::Http(err)
    }
}

impl From<::serde_json::Error> for RadarDataErr {
    fn from(err: ::serde_json::Error) -> RadarDataErr {
        RadarDataErr::Json(err)
    }
}

impl From<strum::ParseError> for RadarDataErr {
    fn from(err: strum::ParseError) -> RadarDataErr {
        RadarDataErr::StrumError(err)
    }
}

impl From<Box<dyn Error>> for RadarDataErr {
    fn from(err: Box<dyn Error>) -> RadarDataErr {
        RadarDataErr::GeneralError(err.to_string())
    }
}
