//! Turning raw mosaics into colorized, reprojected rasters.
//!
//! Both stages work the same way: copy the input to scratch storage, run the external tool there
//! and move its output to the published location. A failing step is logged and the run goes on.

use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    errors::RadarDataErr,
    io::{run_logged, CommandRunner, FileOps, Invocation},
    ledger::Ledger,
    tiles::{radaric_key, scratch_path},
    zones::Zone,
};

mod jobs;

pub use self::jobs::{ColorReliefJob, WarpJob};

/// Runs the conversion stages and records what was colorized.
pub struct Converter<'a> {
    config: &'a Config,
    runner: &'a mut dyn CommandRunner,
    files: &'a mut dyn FileOps,
    ledger: &'a mut dyn Ledger,
}

impl<'a> Converter<'a> {
    /// Create a converter.
    pub fn new(
        config: &'a Config,
        runner: &'a mut dyn CommandRunner,
        files: &'a mut dyn FileOps,
        ledger: &'a mut dyn Ledger,
    ) -> Self {
        Converter {
            config,
            runner,
            files,
            ledger,
        }
    }

    /// Reproject `h5_path` into `tif_path`.
    pub fn h5_to_tif(
        &mut self,
        h5_path: &Path,
        tif_path: &Path,
        replace: bool,
    ) -> Result<(), RadarDataErr> {
        if self.files.is_file(tif_path) {
            if !replace {
                info!(
                    "Skipping :\n  - h5 {}\n  - because tif {}\n      already exists and replace mode is not active (--replace or --replace=true).",
                    h5_path.display(),
                    tif_path.display()
                );
                return Ok(());
            }
            warn!("Replacing existing tif {}", tif_path.display());
        }

        info!(
            "Converting :\n  - h5 {}\n  - to tif {}",
            h5_path.display(),
            tif_path.display()
        );

        let job = WarpJob {
            source: scratch_path(&self.config.scratch_dir, h5_path),
            destination: scratch_path(&self.config.scratch_dir, tif_path),
        };

        self.run_stage(
            h5_path,
            &job.source,
            &job.to_invocation(),
            &job.destination,
            tif_path,
        );
        Ok(())
    }

    /// Colorize `tif_path` into `colored_path`.
    pub fn color_tif(
        &mut self,
        tif_path: &Path,
        colored_path: &Path,
        replace: bool,
    ) -> Result<(), RadarDataErr> {
        if self.files.is_file(colored_path) {
            if !replace {
                info!(
                    "Skipping :\n  - tif {}\n  - because colored tif {}\n      already exists and replace mode is not active (--replace or --replace=true).",
                    tif_path.display(),
                    colored_path.display()
                );
                return Ok(());
            }
            warn!("Replacing existing colored tif {}", colored_path.display());
        }

        info!(
            "Converting :\n  - tif {}\n  - to colored tif {}",
            tif_path.display(),
            colored_path.display()
        );

        let job = ColorReliefJob {
            source: scratch_path(&self.config.scratch_dir, tif_path),
            palette: self.config.palette.clone(),
            destination: scratch_path(&self.config.scratch_dir, colored_path),
        };

        self.run_stage(
            tif_path,
            &job.source,
            &job.to_invocation(),
            &job.destination,
            colored_path,
        );
        Ok(())
    }

    fn run_stage(
        &mut self,
        input: &Path,
        scratch_input: &Path,
        invocation: &Invocation,
        scratch_output: &Path,
        output: &Path,
    ) {
        if let Err(err) = self.files.copy(input, scratch_input) {
            warn!(
                "Could not copy {} to {} : {}",
                input.display(),
                scratch_input.display(),
                err
            );
        }

        if let Err(err) = run_logged(&mut *self.runner, invocation) {
            error!("Could not run {} : {}", invocation.program, err);
        }

        if let Err(err) = self.files.move_file(scratch_output, output) {
            error!(
                "Could not move {} to {} : {}",
                scratch_output.display(),
                output.display(),
                err
            );
        }
    }

    /// Produce the colorized raster of `zone` at `timestamp` from its raw mosaic.
    ///
    /// Nothing happens when the raw mosaic is missing. The ledger only moves on regular runs.
    pub fn convert_to_colored_tif(
        &mut self,
        zone: Zone,
        timestamp: DateTime<Utc>,
        replace: bool,
    ) -> Result<(), RadarDataErr> {
        let tiles = &self.config.tiles;
        let h5_path = tiles.h5_path(zone, timestamp);
        if !self.files.is_file(&h5_path) {
            info!(
                "Skipping {} at {} :\n    '{}' does not exist !",
                zone,
                timestamp.format("%Y-%m-%d %H:%M:%S"),
                h5_path.display()
            );
            return Ok(());
        }

        let tif_path = tiles.tif_path(zone, timestamp);
        let colored_path = tiles.colored_tif_path(zone, timestamp);

        self.h5_to_tif(&h5_path, &tif_path, replace)?;
        self.color_tif(&tif_path, &colored_path, replace)?;

        if !replace {
            self.ledger
                .update_last_tile_timestamp(&radaric_key(zone), timestamp)?;
        }

        Ok(())
    }

    /// Convert each of `zones` at `timestamp`.
    pub fn convert_zones(
        &mut self,
        zones: &[Zone],
        timestamp: DateTime<Utc>,
        replace: bool,
    ) -> Result<(), RadarDataErr> {
        for &zone in zones {
            self.convert_to_colored_tif(zone, timestamp, replace)?;
        }

        Ok(())
    }

    /// Convert every default zone at `timestamp`.
    pub fn convert_all_zones(
        &mut self,
        timestamp: DateTime<Utc>,
        replace: bool,
    ) -> Result<(), RadarDataErr> {
        self.convert_zones(&Zone::default_set(), timestamp, replace)
    }

    /// The configuration in use.
    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Hand out the command runner, for work chained after a conversion.
    pub fn runner(&mut self) -> &mut dyn CommandRunner {
        &mut *self.runner
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
