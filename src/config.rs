//! Settings read from the environment.

use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{
    errors::RadarDataErr,
    tiles::{file_key, TileLayout},
    zones::{DataKind, Zone},
};

const DEFAULT_TILES_PATH: &str = "/var/www/tiles";
const DEFAULT_SCRATCH_PATH: &str = "/dev/shm";
const DEFAULT_DOWNLOAD_PATH: &str = "/tmp";
const DEFAULT_LOG_PATH: &str = "/var/log/infoclimat";
const DEFAULT_PALETTE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/palettes/LAME_D_EAU_vers_RGBi.pal"
);
const DEFAULT_ACCUMULATIONS_PROJECT: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/generate-radaric-mf-values-accumulations"
);

/// Where things are and how to authenticate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Credential exchanged for API tokens, only needed to download.
    pub application_id: String,
    /// SQLite file holding the last tiles timestamps.
    pub ledger_db: PathBuf,
    /// Published tiles.
    pub tiles: TileLayout,
    /// Fast storage where external tools work.
    pub scratch_dir: PathBuf,
    /// Where downloads land before being published.
    pub download_dir: PathBuf,
    /// Error journal and accumulation logs.
    pub log_dir: PathBuf,
    /// Color palette of the rainfall rasters.
    pub palette: PathBuf,
    /// Project computing the rainfall accumulations.
    pub accumulations_project: PathBuf,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, RadarDataErr> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the configuration from any name to value lookup.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RadarDataErr>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(RadarDataErr::MissingConfig(name));
        let path_or = |name: &str, default: &str| {
            get(name)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        Ok(Config {
            application_id: get("APPLICATION_ID").unwrap_or_default(),
            ledger_db: PathBuf::from(required("RADAR_LEDGER_DB")?),
            tiles: TileLayout::new(&path_or("RADAR_TILES_PATH", DEFAULT_TILES_PATH)),
            scratch_dir: path_or("RADAR_SCRATCH_PATH", DEFAULT_SCRATCH_PATH),
            download_dir: path_or("RADAR_DOWNLOAD_PATH", DEFAULT_DOWNLOAD_PATH),
            log_dir: path_or("RADAR_LOG_PATH", DEFAULT_LOG_PATH),
            palette: path_or("RADAR_PALETTE", DEFAULT_PALETTE),
            accumulations_project: path_or(
                "RADAR_ACCUMULATIONS_PROJECT",
                DEFAULT_ACCUMULATIONS_PROJECT,
            ),
        })
    }

    /// Configuration with every directory under `root`, for tests and local runs.
    pub fn rooted_at(root: &Path) -> Self {
        Config {
            application_id: String::new(),
            ledger_db: root.join("ledger.sqlite"),
            tiles: TileLayout::new(&root.join("tiles")),
            scratch_dir: root.join("shm"),
            download_dir: root.join("tmp"),
            log_dir: root.join("log"),
            palette: root.join("palettes").join("LAME_D_EAU_vers_RGBi.pal"),
            accumulations_project: root.join("generate-radaric-mf-values-accumulations"),
        }
    }

    /// The credential, an error when it was not configured.
    pub fn require_application_id(&self) -> Result<&str, RadarDataErr> {
        if self.application_id.trim().is_empty() {
            return Err(RadarDataErr::MissingConfig("APPLICATION_ID"));
        }

        Ok(&self.application_id)
    }

    /// Staging file of the latest download of a product.
    pub fn download_path(&self, kind: DataKind, zone: Zone) -> PathBuf {
        self.download_dir
            .join(format!("{}_last.h5", file_key(kind, zone)))
    }

    /// Journal of responses without a usable content-disposition header.
    pub fn error_journal(&self) -> PathBuf {
        self.log_dir.join("radar.log")
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
