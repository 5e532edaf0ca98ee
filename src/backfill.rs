//! Converting tiles over a time range, for catching up or redoing past conversions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::{
    accumulation,
    conversion::Converter,
    errors::RadarDataErr,
    ingest::last_timestamp,
    ledger::Ledger,
    zones::{DataKind, Zone},
};

/// Command line values before any defaulting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawArguments {
    /// Start and end at the last mainland rainfall tile.
    pub last: bool,
    /// Start and end at this time.
    pub datetime: Option<String>,
    /// Start and end at this Unix timestamp.
    pub timestamp: Option<String>,
    /// Start of the range.
    pub start: Option<String>,
    /// End of the range.
    pub end: Option<String>,
    /// Requested zones, `None` when the option was never given.
    pub zones: Option<Vec<String>>,
    /// `None` when absent, `Some(None)` when given without a value.
    pub replace: Option<Option<String>>,
}

/// A resolved conversion request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionArguments {
    /// First tile time, included.
    pub start: DateTime<Utc>,
    /// Last tile time, included.
    pub end: DateTime<Utc>,
    /// Zones to convert, in order.
    pub zones: Vec<Zone>,
    /// Redo existing outputs and leave the ledger alone.
    pub replace: bool,
}

impl ConversionArguments {
    /// Every tile time from `start` to `end`, both included.
    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> {
        let step = DataKind::LameDEau.time_between_tiles();
        let end = self.end;

        std::iter::successors(Some(self.start), move |&current| Some(current + step))
            .take_while(move |&current| current <= end)
    }
}

/// Parse a range bound: a Unix timestamp, or a UTC date and time.
///
/// Empty values mean no value. Besides `YYYY-MM-DD hh:mm:ss`, the minutes only and date only forms
/// are accepted, as well as RFC 3339.
pub fn parse_range_argument(value: Option<&str>) -> Result<Option<DateTime<Utc>>, RadarDataErr> {
    let value = match value.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(None),
    };

    if let Ok(seconds) = value.parse::<i64>() {
        return Utc
            .timestamp_opt(seconds, 0)
            .single()
            .map(Some)
            .ok_or_else(|| RadarDataErr::InvalidTimestamp(value.to_owned()));
    }

    for format in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Some(Utc.from_utc_datetime(&naive)));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(Utc.from_utc_datetime(&naive)));
        }
    }

    DateTime::parse_from_rfc3339(value)
        .map(|datetime| Some(datetime.with_timezone(&Utc)))
        .map_err(|_| RadarDataErr::InvalidTimestamp(value.to_owned()))
}

/// Start of the range: the ledger with `--last`, else the first of `--datetime`, `--timestamp`
/// and `--start`.
pub fn resolve_start(
    raw: &RawArguments,
    ledger: &dyn Ledger,
) -> Result<Option<DateTime<Utc>>, RadarDataErr> {
    if raw.last {
        return last_timestamp(ledger).map(Some);
    }

    let value = raw
        .datetime
        .as_ref()
        .or_else(|| raw.timestamp.as_ref())
        .or_else(|| raw.start.as_ref());

    parse_range_argument(value.map(String::as_str))
}

/// End of the range, the start when not given.
pub fn resolve_end(
    end: Option<&str>,
    start: DateTime<Utc>,
) -> Result<DateTime<Utc>, RadarDataErr> {
    match parse_range_argument(end)? {
        Some(end) => Ok(end),
        None => {
            info!("No --end argument given. Defaulting to --start.");
            Ok(start)
        }
    }
}

/// Validate the requested zones, the default set when none were requested.
///
/// Unknown names are logged and dropped.
pub fn resolve_zones(zones: Option<&[String]>) -> Vec<Zone> {
    let names = match zones {
        Some(names) if !names.is_empty() => names,
        _ => {
            info!(
                "No --zone argument given. Defaulting to all zones ({}).",
                Zone::default_set_names()
            );
            return Zone::default_set();
        }
    };

    let valid_choices = Zone::iter()
        .map(Zone::as_static_str)
        .collect::<Vec<_>>()
        .join(", ");

    names
        .iter()
        .filter_map(|name| match Zone::from_str(name) {
            Ok(zone) => Some(zone),
            Err(_) => {
                warn!("Invalid zone: {}. Valid zones are {}.", name, valid_choices);
                None
            }
        })
        .collect()
}

/// `--replace` alone turns replacing on, `--replace=VALUE` only when the value is `true`.
pub fn parse_replace(replace: Option<Option<&str>>) -> bool {
    match replace {
        None => false,
        Some(None) => true,
        Some(Some(value)) => value == "true",
    }
}

/// Apply the defaulting rules, `None` when no start could be determined.
pub fn conversion_arguments_from(
    raw: &RawArguments,
    ledger: &dyn Ledger,
) -> Result<Option<ConversionArguments>, RadarDataErr> {
    let start = match resolve_start(raw, ledger)? {
        Some(start) => start,
        None => return Ok(None),
    };

    let end = resolve_end(raw.end.as_ref().map(String::as_str), start)?;
    let zones = resolve_zones(raw.zones.as_ref().map(Vec::as_slice));
    let replace = parse_replace(
        raw.replace
            .as_ref()
            .map(|value| value.as_ref().map(String::as_str)),
    );

    Ok(Some(ConversionArguments {
        start,
        end,
        zones,
        replace,
    }))
}

/// Convert every requested zone over the whole range, one zone after the other.
pub fn convert_in_range(
    arguments: &ConversionArguments,
    converter: &mut Converter,
) -> Result<(), RadarDataErr> {
    for &zone in &arguments.zones {
        for timestamp in arguments.timestamps() {
            converter.convert_to_colored_tif(zone, timestamp, arguments.replace)?;
        }
    }

    Ok(())
}

/// Convert one tile, then refresh the accumulations of its zone.
pub fn convert_and_accumulate(
    converter: &mut Converter,
    zone: Zone,
    timestamp: DateTime<Utc>,
    replace: bool,
) -> Result<(), RadarDataErr> {
    converter.convert_to_colored_tif(zone, timestamp, replace)?;

    let config = converter.config();
    accumulation::compute_for_zone(config, converter.runner(), zone, timestamp)?;

    Ok(())
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;
    use crate::{
        config::Config,
        io::{FakeCommandRunner, InMemoryFiles},
        ledger::InMemoryLedger,
        tiles::file_key,
    };
    use std::{collections::HashMap, path::Path};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 6, 15, hour, minute, 0).unwrap()
    }

    fn names(zones: &[&str]) -> Vec<String> {
        zones.iter().map(|zone| (*zone).to_owned()).collect()
    }

    #[test]
    fn test_timestamps() {
        let arguments = ConversionArguments {
            start: at(12, 0),
            end: at(12, 12),
            zones: vec![],
            replace: false,
        };

        let timestamps: Vec<_> = arguments.timestamps().collect();
        assert_eq!(timestamps, vec![at(12, 0), at(12, 5), at(12, 10)]);

        let arguments = ConversionArguments {
            start: at(12, 0),
            end: at(12, 0),
            zones: vec![],
            replace: false,
        };
        assert_eq!(arguments.timestamps().count(), 1);

        let arguments = ConversionArguments {
            start: at(12, 0),
            end: at(11, 0),
            zones: vec![],
            replace: false,
        };
        assert_eq!(arguments.timestamps().count(), 0);
    }

    #[test]
    fn test_parse_range_argument() {
        assert_eq!(parse_range_argument(None).unwrap(), None);
        assert_eq!(parse_range_argument(Some("")).unwrap(), None);
        assert_eq!(
            parse_range_argument(Some("961072200")).unwrap(),
            Some(at(12, 30))
        );
        assert_eq!(
            parse_range_argument(Some("2000-06-15 12:30:00")).unwrap(),
            Some(at(12, 30))
        );
        assert_eq!(
            parse_range_argument(Some("2000-06-15 12:30")).unwrap(),
            Some(at(12, 30))
        );
        assert_eq!(
            parse_range_argument(Some("2000-06-15")).unwrap(),
            Some(at(0, 0))
        );
        assert_eq!(
            parse_range_argument(Some("2000-06-15T14:30:00+02:00")).unwrap(),
            Some(at(12, 30))
        );
        assert!(matches!(
            parse_range_argument(Some("yesterday")),
            Err(RadarDataErr::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_resolve_start() {
        let mut timestamps = HashMap::new();
        timestamps.insert(file_key(DataKind::LameDEau, Zone::Metropole), at(12, 30));
        let ledger = InMemoryLedger::new(timestamps);

        let raw = RawArguments {
            last: true,
            start: Some("961070400".to_owned()),
            ..RawArguments::default()
        };
        assert_eq!(resolve_start(&raw, &ledger).unwrap(), Some(at(12, 30)));

        let raw = RawArguments {
            timestamp: Some("961070400".to_owned()),
            start: Some("2000-06-15 11:00:00".to_owned()),
            ..RawArguments::default()
        };
        assert_eq!(resolve_start(&raw, &ledger).unwrap(), Some(at(12, 0)));

        let raw = RawArguments {
            datetime: Some("2000-06-15 10:00:00".to_owned()),
            timestamp: Some("961070400".to_owned()),
            ..RawArguments::default()
        };
        assert_eq!(resolve_start(&raw, &ledger).unwrap(), Some(at(10, 0)));

        assert_eq!(
            resolve_start(&RawArguments::default(), &ledger).unwrap(),
            None
        );
    }

    #[test]
    fn test_resolve_end() {
        assert_eq!(resolve_end(None, at(12, 0)).unwrap(), at(12, 0));
        assert_eq!(
            resolve_end(Some("2000-06-15 13:00:00"), at(12, 0)).unwrap(),
            at(13, 0)
        );
    }

    #[test]
    fn test_resolve_zones() {
        assert_eq!(resolve_zones(None), Zone::default_set());
        assert_eq!(
            resolve_zones(Some(
                names(&["REUNION", "NOWHERE", "NOUVELLE-CALEDONIE"]).as_slice()
            )),
            vec![Zone::Reunion, Zone::NouvelleCaledonie]
        );
        assert_eq!(resolve_zones(Some(names(&["NOWHERE"]).as_slice())), vec![]);
    }

    #[test]
    fn test_parse_replace() {
        assert!(!parse_replace(None));
        assert!(parse_replace(Some(None)));
        assert!(parse_replace(Some(Some("true"))));
        assert!(!parse_replace(Some(Some("false"))));
        assert!(!parse_replace(Some(Some("yes"))));
    }

    #[test]
    fn test_conversion_arguments_from() {
        let ledger = InMemoryLedger::default();

        assert_eq!(
            conversion_arguments_from(&RawArguments::default(), &ledger).unwrap(),
            None
        );

        let raw = RawArguments {
            datetime: Some("2000-06-15 12:00:00".to_owned()),
            zones: Some(names(&["METROPOLE"])),
            replace: Some(None),
            ..RawArguments::default()
        };
        assert_eq!(
            conversion_arguments_from(&raw, &ledger).unwrap(),
            Some(ConversionArguments {
                start: at(12, 0),
                end: at(12, 0),
                zones: vec![Zone::Metropole],
                replace: true,
            })
        );

        let raw = RawArguments {
            last: true,
            ..RawArguments::default()
        };
        assert!(matches!(
            conversion_arguments_from(&raw, &ledger),
            Err(RadarDataErr::NoLastTimestamp(_))
        ));
    }

    #[test]
    fn test_convert_in_range() {
        let config = Config::rooted_at(Path::new("/test"));
        let layout = config.tiles.clone();
        let mut runner = FakeCommandRunner::default();
        let mut files = InMemoryFiles::with_files(&[
            layout.h5_path(Zone::Antilles, at(12, 0)),
            layout.h5_path(Zone::Reunion, at(12, 0)),
        ]);
        let mut ledger = InMemoryLedger::default();

        let arguments = ConversionArguments {
            start: at(12, 0),
            end: at(12, 0),
            zones: vec![Zone::Antilles, Zone::Reunion],
            replace: false,
        };

        let mut converter = Converter::new(&config, &mut runner, &mut files, &mut ledger);
        convert_in_range(&arguments, &mut converter).unwrap();

        let warps: Vec<_> = runner
            .invocations
            .iter()
            .filter(|invocation| invocation.program == "gdalwarp")
            .collect();
        assert_eq!(warps.len(), 2);
        assert!(warps[0].args.iter().any(|arg| arg.contains("ANTILLES")));
        assert!(warps[1].args.iter().any(|arg| arg.contains("REUNION")));

        assert_eq!(
            ledger.last_tile_timestamp("radaric_MF_ANTILLES").unwrap(),
            Some(at(12, 0))
        );
        assert_eq!(
            ledger.last_tile_timestamp("radaric_MF_REUNION").unwrap(),
            Some(at(12, 0))
        );
    }

    #[test]
    fn test_convert_and_accumulate() {
        let config = Config::rooted_at(Path::new("/test"));
        let mut runner = FakeCommandRunner::default();
        let mut files =
            InMemoryFiles::with_files(&[config.tiles.h5_path(Zone::Metropole, at(12, 30))]);
        let mut ledger = InMemoryLedger::default();

        let mut converter = Converter::new(&config, &mut runner, &mut files, &mut ledger);
        convert_and_accumulate(&mut converter, Zone::Metropole, at(12, 30), false).unwrap();

        let programs: Vec<&str> = runner
            .invocations
            .iter()
            .map(|invocation| invocation.program.as_str())
            .collect();
        assert_eq!(programs, vec!["gdalwarp", "gdaldem", "poetry"]);
        assert_eq!(
            runner.invocations[2].args[runner.invocations[2].args.len() - 2..],
            ["--zone".to_owned(), "METROPOLE".to_owned()]
        );
    }
}
