use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::{collections::HashMap, path::Path};
use tracing::info;

use super::{Ledger, TileDate};

use crate::errors::RadarDataErr;

/// Ledger stored in an sqlite database, one JSON row per key.
#[derive(Debug)]
pub struct SqliteLedger {
    db_conn: rusqlite::Connection, // An sqlite connection.
}

impl SqliteLedger {
    /// Initialize a new ledger, or open an existing one and make sure the table is there.
    pub fn create(db_file: &dyn AsRef<Path>) -> Result<Self, RadarDataErr> {
        if let Some(parent) = db_file.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_conn = rusqlite::Connection::open_with_flags(
            db_file,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE | rusqlite::OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        db_conn.execute_batch(include_str!("sqlite/create_ledger.sql"))?;

        Ok(SqliteLedger { db_conn })
    }

    /// Open an existing ledger.
    pub fn connect(db_file: &dyn AsRef<Path>) -> Result<Self, RadarDataErr> {
        let db_conn = rusqlite::Connection::open_with_flags(
            db_file,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE,
        )?;

        Self::validate_db_structure(&db_conn)?;

        Ok(SqliteLedger { db_conn })
    }

    /// Validate the database structure is correct.
    fn validate_db_structure(db_conn: &rusqlite::Connection) -> Result<(), RadarDataErr> {
        let num_tables: i64 = db_conn.query_row(
            "SELECT COUNT(name) FROM sqlite_master WHERE type='table' AND name='tiles_timestamps'",
            [],
            |row| row.get(0),
        )?;

        if num_tables != 1 {
            return Err(RadarDataErr::InvalidSchema);
        }

        Ok(())
    }

    fn parse_data(data: &str) -> Result<DateTime<Utc>, RadarDataErr> {
        let date: TileDate = serde_json::from_str(data)?;
        date.to_timestamp()
    }
}

impl Ledger for SqliteLedger {
    fn last_tiles_timestamps(&self) -> Result<HashMap<String, DateTime<Utc>>, RadarDataErr> {
        let mut stmt = self
            .db_conn
            .prepare("SELECT name, data FROM tiles_timestamps")?;

        let rows: Result<Vec<(String, String)>, RadarDataErr> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .map(|res| res.map_err(RadarDataErr::Database))
            .collect();

        rows?
            .into_iter()
            .map(|(name, data)| Self::parse_data(&data).map(|timestamp| (name, timestamp)))
            .collect()
    }

    fn last_tile_timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>, RadarDataErr> {
        let data: Option<String> = self
            .db_conn
            .query_row(
                "SELECT data FROM tiles_timestamps WHERE name = ?1 LIMIT 1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|data| Self::parse_data(&data)).transpose()
    }

    fn update_last_tile_timestamp(
        &mut self,
        key: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), RadarDataErr> {
        let data = serde_json::to_string(&TileDate::from(timestamp))?;

        info!("Updating {} to {}", key, timestamp.timestamp());

        self.db_conn.execute(
            "
                INSERT INTO tiles_timestamps (name, data)
                VALUES (?1, ?2)
                ON CONFLICT(name) DO UPDATE SET data = excluded.data
            ",
            [key, data.as_str()],
        )?;

        Ok(())
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
