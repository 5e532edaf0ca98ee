//! Zones and data kinds published by the radar API.

use chrono::Duration;
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Geographic coverage areas of the radar mosaics.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, IntoStaticStr, EnumIter, Hash)]
pub enum Zone {
    /// French West Indies
    #[strum(serialize = "ANTILLES")]
    Antilles,
    /// La Reunion
    #[strum(serialize = "REUNION")]
    Reunion,
    /// Mainland France and Corsica
    #[strum(serialize = "METROPOLE")]
    Metropole,
    /// New Caledonia, not part of the default set.
    #[strum(serialize = "NOUVELLE-CALEDONIE")]
    NouvelleCaledonie,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_static_str())
    }
}

impl Zone {
    /// The name used by the API and in file keys.
    pub fn as_static_str(self) -> &'static str {
        self.into()
    }

    /// Zones processed when none are requested explicitly.
    pub fn default_set() -> Vec<Zone> {
        Zone::iter()
            .filter(|zone| *zone != Zone::NouvelleCaledonie)
            .collect()
    }

    /// Comma separated list of the default zones, for messages.
    pub fn default_set_names() -> String {
        Zone::default_set()
            .iter()
            .map(|zone| zone.as_static_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Kinds of observation products.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString, IntoStaticStr, EnumIter, Hash)]
pub enum DataKind {
    /// Rainfall depth over the last 5 minutes.
    #[strum(serialize = "LAME_D_EAU")]
    LameDEau,
    /// Radar reflectivity.
    #[strum(serialize = "REFLECTIVITE")]
    Reflectivite,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_static_str())
    }
}

impl DataKind {
    /// The name used by the API and in file keys.
    pub fn as_static_str(self) -> &'static str {
        self.into()
    }

    /// Time between two consecutive tiles.
    pub fn time_between_tiles(self) -> Duration {
        match self {
            DataKind::LameDEau => Duration::minutes(5),
            DataKind::Reflectivite => Duration::minutes(5),
        }
    }
}

/// Grid resolutions (maille) offered by the API, in meters.
pub const RESOLUTIONS: [u32; 2] = [500, 1000];

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
