//! Last accepted timestamp of every tile stream.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::RadarDataErr;

mod sqlite;

pub use self::sqlite::SqliteLedger;

/// Storage for the high-water-mark of each tile key.
pub trait Ledger {
    /// Every key with its last timestamp.
    fn last_tiles_timestamps(&self) -> Result<HashMap<String, DateTime<Utc>>, RadarDataErr>;

    /// The last timestamp accepted for `key`, if any.
    fn last_tile_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, RadarDataErr>;

    /// Record `timestamp` as the last one accepted for `key`.
    fn update_last_tile_timestamp(
        &mut self,
        key: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), RadarDataErr>;
}

/// Ledger kept in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// The stored timestamps.
    pub timestamps: HashMap<String, DateTime<Utc>>,
}

impl InMemoryLedger {
    /// Create a ledger already holding `timestamps`.
    pub fn new(timestamps: HashMap<String, DateTime<Utc>>) -> Self {
        InMemoryLedger { timestamps }
    }
}

impl Ledger for InMemoryLedger {
    fn last_tiles_timestamps(&self) -> Result<HashMap<String, DateTime<Utc>>, RadarDataErr> {
        Ok(self.timestamps.clone())
    }

    fn last_tile_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, RadarDataErr> {
        Ok(self.timestamps.get(key).copied())
    }

    fn update_last_tile_timestamp(
        &mut self,
        key: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), RadarDataErr> {
        self.timestamps.insert(key.to_owned(), timestamp);
        Ok(())
    }
}

/// A date field, written as a zero padded string but also read back from a number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum DateField {
    Number(u32),
    Text(String),
}

impl DateField {
    fn value(&self) -> Result<u32, RadarDataErr> {
        match self {
            DateField::Number(val) => Ok(*val),
            DateField::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| RadarDataErr::InvalidTimestamp(text.clone())),
        }
    }
}

/// JSON form of a timestamp in the ledger table, minute precision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TileDate {
    year: DateField,
    month: DateField,
    day: DateField,
    hour: DateField,
    minute: DateField,
}

impl From<DateTime<Utc>> for TileDate {
    fn from(timestamp: DateTime<Utc>) -> Self {
        TileDate {
            year: DateField::Text(format!("{:04}", timestamp.year())),
            month: DateField::Text(format!("{:02}", timestamp.month())),
            day: DateField::Text(format!("{:02}", timestamp.day())),
            hour: DateField::Text(format!("{:02}", timestamp.hour())),
            minute: DateField::Text(format!("{:02}", timestamp.minute())),
        }
    }
}

impl TileDate {
    pub(crate) fn to_timestamp(&self) -> Result<DateTime<Utc>, RadarDataErr> {
        let year = self.year.value()?;
        let (month, day) = (self.month.value()?, self.day.value()?);
        let (hour, minute) = (self.hour.value()?, self.minute.value()?);

        Utc.with_ymd_and_hms(year as i32, month, day, hour, minute, 0)
            .single()
            .ok_or_else(|| {
                RadarDataErr::InvalidTimestamp(format!(
                    "{}-{}-{} {}:{}",
                    year, month, day, hour, minute
                ))
            })
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_in_memory_ledger() {
        let timestamp = Utc.with_ymd_and_hms(2000, 6, 15, 12, 30, 45).unwrap();
        let mut ledger = InMemoryLedger::default();

        assert!(ledger.last_tile_timestamp("key").unwrap().is_none());

        ledger.update_last_tile_timestamp("key", timestamp).unwrap();

        assert_eq!(ledger.last_tile_timestamp("key").unwrap(), Some(timestamp));
        assert_eq!(ledger.last_tiles_timestamps().unwrap().len(), 1);
    }

    #[test]
    fn test_tile_date_json() {
        let timestamp = Utc.with_ymd_and_hms(2000, 6, 15, 12, 30, 45).unwrap();
        let json = serde_json::to_string(&TileDate::from(timestamp)).unwrap();

        assert_eq!(
            json,
            r#"{"year":"2000","month":"06","day":"15","hour":"12","minute":"30"}"#
        );

        let date: TileDate = serde_json::from_str(&json).unwrap();
        assert_eq!(
            date.to_timestamp().unwrap(),
            Utc.with_ymd_and_hms(2000, 6, 15, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_tile_date_from_numbers() {
        let date: TileDate = serde_json::from_str(
            r#"{"year":2021,"month":3,"day":"07","hour":0,"minute":55}"#,
        )
        .unwrap();

        assert_eq!(
            date.to_timestamp().unwrap(),
            Utc.with_ymd_and_hms(2021, 3, 7, 0, 55, 0).unwrap()
        );

        let bad: TileDate = serde_json::from_str(
            r#"{"year":2021,"month":13,"day":1,"hour":0,"minute":0}"#,
        )
        .unwrap();
        assert!(bad.to_timestamp().is_err());
    }
}
