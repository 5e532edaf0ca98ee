//! Observation time carried by the download response.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::info;

use crate::errors::RadarDataErr;

/// Header naming the downloaded file.
pub const CONTENT_DISPOSITION: &str = "content-disposition";

const DATE_FORMAT: &str = "%Y%m%d%H%M%S";
const DATE_WIDTH: usize = 14;

/// Parse the observation time from a header like
/// `attachment; filename="T_IPRN20_C_LFPW_20000615123045.h5"`.
///
/// The date is the `YYYYMMDDhhmmss` block right before the extension, in UTC.
pub fn timestamp_from_content_disposition(value: &str) -> Result<DateTime<Utc>, RadarDataErr> {
    let date_part = extract_date_part(value)
        .ok_or_else(|| RadarDataErr::InvalidContentDisposition(value.to_owned()))?;

    let naive = NaiveDateTime::parse_from_str(date_part, DATE_FORMAT)
        .map_err(|_| RadarDataErr::InvalidContentDisposition(value.to_owned()))?;
    let timestamp = Utc.from_utc_datetime(&naive);

    info!(
        "Date from content-disposition header is : {} ({} UTC [{}])",
        date_part,
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        timestamp.timestamp()
    );

    Ok(timestamp)
}

fn extract_date_part(value: &str) -> Option<&str> {
    let file_name = value.trim_end().trim_end_matches('"');
    let stem = &file_name[..file_name.rfind('.')?];

    let start = stem.len().checked_sub(DATE_WIDTH)?;
    let date_part = stem.get(start..)?;

    if date_part.bytes().all(|b| b.is_ascii_digit()) {
        Some(date_part)
    } else {
        None
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
