//! The periodic flows: fetch the latest mosaics, publish them, convert them.

use chrono::{DateTime, Timelike, Utc};
use std::fmt;
use tracing::{error, info, warn};

use crate::{
    accumulation,
    api::{ApiFileDownloader, DownloadOutcome},
    config::Config,
    conversion::Converter,
    download::{download_file, RetryPolicy},
    errors::RadarDataErr,
    io::{CommandRunner, FileAppender, FileOps},
    ledger::Ledger,
    metadata::{timestamp_from_content_disposition, CONTENT_DISPOSITION},
    tiles::file_key,
    zones::{DataKind, Zone},
};

/// Resolution of the rainfall mosaics fetched by the cron flows.
pub const LAME_D_EAU_RESOLUTION: u32 = 500;

/// What happened to one product during a download cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestStatus {
    /// Published at this timestamp.
    Done(DateTime<Utc>),
    /// Not newer than what was already published.
    Skipped(DateTime<Utc>),
    /// The response carried no usable metadata.
    Error,
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IngestStatus::Done(_) => write!(f, "DONE"),
            IngestStatus::Skipped(_) => write!(f, "SKIPPED"),
            IngestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Downloads mosaics and publishes them in the tile tree.
pub struct Ingester<'a> {
    config: &'a Config,
    policy: RetryPolicy,
    downloader: &'a mut dyn ApiFileDownloader,
    appender: &'a mut dyn FileAppender,
    files: &'a mut dyn FileOps,
    ledger: &'a mut dyn Ledger,
}

impl<'a> Ingester<'a> {
    /// Create an ingester with the default retry policy.
    pub fn new(
        config: &'a Config,
        downloader: &'a mut dyn ApiFileDownloader,
        appender: &'a mut dyn FileAppender,
        files: &'a mut dyn FileOps,
        ledger: &'a mut dyn Ledger,
    ) -> Self {
        Ingester {
            config,
            policy: RetryPolicy::default(),
            downloader,
            appender,
            files,
            ledger,
        }
    }

    /// Use another retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Download the latest `kind` mosaic of `zone` and publish it if it is new.
    ///
    /// A tile that is not newer than the ledger is skipped unless `replace` is set. Replacing never
    /// moves the ledger, a regular run advances it once the tile is in place.
    pub fn download_data_type_for_zone(
        &mut self,
        zone: Zone,
        kind: DataKind,
        resolution: u32,
        replace: bool,
    ) -> Result<IngestStatus, RadarDataErr> {
        let tmp_path = self.config.download_path(kind, zone);
        let outcome = download_file(
            &tmp_path,
            zone,
            kind,
            resolution,
            &mut *self.downloader,
            self.policy,
        )?;

        let content_disposition = match outcome.header(CONTENT_DISPOSITION) {
            Some(value) => value,
            None => {
                self.log_content_disposition_error(zone, kind, resolution, &outcome)?;
                info!("{} of {} : {}", kind, zone, IngestStatus::Error);
                return Ok(IngestStatus::Error);
            }
        };

        let timestamp = match timestamp_from_content_disposition(content_disposition) {
            Ok(timestamp) => truncate_to_minute(timestamp),
            Err(err) => {
                error!("{}", err);
                self.log_content_disposition_error(zone, kind, resolution, &outcome)?;
                info!("{} of {} : {}", kind, zone, IngestStatus::Error);
                return Ok(IngestStatus::Error);
            }
        };
        let key = file_key(kind, zone);

        if let Some(previous) = self.ledger.last_tile_timestamp(&key)? {
            if previous >= timestamp {
                if !replace {
                    info!(
                        "Skipping {} of {} (maille {}) at {} because it is not newer than {} and replace mode is not active.",
                        kind, zone, resolution, timestamp, previous
                    );
                    let status = IngestStatus::Skipped(timestamp);
                    info!("{} of {} at {} : {}", kind, zone, timestamp, status);
                    return Ok(status);
                }
                warn!(
                    "Replacing existing {} of {} (maille {}) at {}. Last timestamp was {}.",
                    kind, zone, resolution, timestamp, previous
                );
            }
        }

        let final_path = self.config.tiles.file_path(timestamp, kind, zone);
        self.files.move_file(&tmp_path, &final_path)?;

        if !replace {
            self.ledger.update_last_tile_timestamp(&key, timestamp)?;
        }

        let status = IngestStatus::Done(timestamp);
        info!("{} of {} at {} : {}", kind, zone, timestamp, status);
        Ok(status)
    }

    /// Download `kind` for every default zone.
    ///
    /// A failing zone is logged and the next one proceeds.
    pub fn download_data_type(
        &mut self,
        kind: DataKind,
        resolution: u32,
        replace: bool,
    ) -> Vec<(Zone, Result<IngestStatus, RadarDataErr>)> {
        Zone::default_set()
            .into_iter()
            .map(|zone| {
                let result = self.download_data_type_for_zone(zone, kind, resolution, replace);
                if let Err(ref err) = result {
                    error!(
                        "An error occurred while downloading {} of {} (maille {}) :\n{}",
                        kind, zone, resolution, err
                    );
                }
                (zone, result)
            })
            .collect()
    }

    /// The download half of the cron: rainfall at 500 meters for every default zone.
    pub fn execute_download(
        &mut self,
        replace: bool,
    ) -> Vec<(Zone, Result<IngestStatus, RadarDataErr>)> {
        self.download_data_type(DataKind::LameDEau, LAME_D_EAU_RESOLUTION, replace)
    }

    fn log_content_disposition_error(
        &mut self,
        zone: Zone,
        kind: DataKind,
        resolution: u32,
        outcome: &DownloadOutcome,
    ) -> Result<(), RadarDataErr> {
        let log = format!(
            "Zone = {}, Type = {}, Maille = {}, Response = {}",
            zone, kind, resolution, outcome
        );
        error!("{}", log);
        self.appender.append_file(&self.config.error_journal(), &log)
    }
}

/// Tiles are named and recorded to the minute.
fn truncate_to_minute(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .with_second(0)
        .and_then(|timestamp| timestamp.with_nanosecond(0))
        .unwrap_or(timestamp)
}

/// The timestamp the cron converts: the last mainland rainfall mosaic.
pub fn last_timestamp(ledger: &dyn Ledger) -> Result<DateTime<Utc>, RadarDataErr> {
    let key = file_key(DataKind::LameDEau, Zone::Metropole);
    ledger
        .last_tile_timestamp(&key)?
        .ok_or(RadarDataErr::NoLastTimestamp(key))
}

/// Download every zone, then convert every zone at the last mainland timestamp.
///
/// Returns the converted timestamp.
pub fn execute_download_and_conversion(
    config: &Config,
    replace: bool,
    downloader: &mut dyn ApiFileDownloader,
    appender: &mut dyn FileAppender,
    runner: &mut dyn CommandRunner,
    files: &mut dyn FileOps,
    ledger: &mut dyn Ledger,
) -> Result<DateTime<Utc>, RadarDataErr> {
    Ingester::new(config, downloader, appender, files, ledger).execute_download(replace);

    let timestamp = last_timestamp(ledger)?;
    Converter::new(config, runner, files, ledger).convert_all_zones(timestamp, replace)?;

    Ok(timestamp)
}

/// The full cron: download, convert, then refresh the accumulations of every zone.
pub fn execute_download_conversion_and_generate_accumulations(
    config: &Config,
    replace: bool,
    downloader: &mut dyn ApiFileDownloader,
    appender: &mut dyn FileAppender,
    runner: &mut dyn CommandRunner,
    files: &mut dyn FileOps,
    ledger: &mut dyn Ledger,
) -> Result<(), RadarDataErr> {
    let timestamp = execute_download_and_conversion(
        config, replace, downloader, appender, runner, files, ledger,
    )?;

    accumulation::compute_for_all_zones(config, runner, timestamp)?;

    Ok(())
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
