//! Naming and placement of tiles on disk.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::path::{Path, PathBuf};

use crate::zones::{DataKind, Zone};

/// Key of the raw mosaic stream of a data kind over a zone.
pub fn file_key(kind: DataKind, zone: Zone) -> String {
    format!("mosaiques_MF_{}_{}", kind, zone)
}

/// Key of the colorized rainfall stream of a zone.
pub fn radaric_key(zone: Zone) -> String {
    format!("radaric_MF_{}", zone)
}

/// Where published tiles live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileLayout {
    root: PathBuf,
}

impl TileLayout {
    /// Create a layout rooted at `root`.
    pub fn new(root: &dyn AsRef<Path>) -> Self {
        TileLayout {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Retrieve a path to the root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the tile for `key` at `timestamp`.
    ///
    /// `{root}/{yyyy}/{mm}/{dd}/{key}_{HH}_v{MM}.{ext}`, all fields in UTC. Seconds are not part of
    /// the name, tiles come every 5 minutes.
    pub fn tile_path(&self, key: &str, timestamp: DateTime<Utc>, ext: &str) -> PathBuf {
        let file_name = format!(
            "{}_{:02}_v{:02}.{}",
            key,
            timestamp.hour(),
            timestamp.minute(),
            ext
        );

        self.root
            .join(format!("{:04}", timestamp.year()))
            .join(format!("{:02}", timestamp.month()))
            .join(format!("{:02}", timestamp.day()))
            .join(file_name)
    }

    /// Final path of a downloaded raw mosaic.
    pub fn file_path(&self, timestamp: DateTime<Utc>, kind: DataKind, zone: Zone) -> PathBuf {
        self.tile_path(&file_key(kind, zone), timestamp, "h5")
    }

    /// Raw rainfall mosaic, input of the conversion.
    pub fn h5_path(&self, zone: Zone, timestamp: DateTime<Utc>) -> PathBuf {
        self.file_path(timestamp, DataKind::LameDEau, zone)
    }

    /// Reprojected rainfall raster.
    pub fn tif_path(&self, zone: Zone, timestamp: DateTime<Utc>) -> PathBuf {
        self.tile_path(&file_key(DataKind::LameDEau, zone), timestamp, "tif")
    }

    /// Colorized rainfall raster.
    pub fn colored_tif_path(&self, zone: Zone, timestamp: DateTime<Utc>) -> PathBuf {
        self.tile_path(&radaric_key(zone), timestamp, "tif")
    }
}

/// Location of the scratch copy of `file_path` inside `scratch_dir`.
///
/// Only the file name is kept, so two files sharing a name share a scratch slot.
pub fn scratch_path(scratch_dir: &Path, file_path: &Path) -> PathBuf {
    match file_path.file_name() {
        Some(name) => scratch_dir.join(name),
        None => scratch_dir.join(file_path),
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
