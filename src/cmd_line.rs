//! Command line of the range conversion tool.

use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};

use crate::backfill::RawArguments;

/// Printed when no start of range could be determined.
pub const MISSING_START_MESSAGE: &str = "\
Missing (--start|--timestamp|--datetime|--last) argument :
    - --start=timestamp
    - --start='YYYY-MM-DD hh:mm:ss'
    - --timestamp=timestamp (--end will be set to --timestamp)
    - --datetime='YYYY-MM-DD hh:mm:ss' (--end will be set to --datetime)
    - --last (--start and --end will be set to the last available tiles timestamps)";

/// Build and parse the conversion command line.
#[derive(Clone, Copy, Debug)]
pub struct ConversionCmdLine;

impl ConversionCmdLine {
    /// Create the clap command.
    pub fn new_app(app_name: &'static str, about: &'static str) -> Command {
        Command::new(app_name)
            .about(about)
            .version(env!("CARGO_PKG_VERSION"))
            .arg(
                Arg::new("last")
                    .long("last")
                    .action(ArgAction::SetTrue)
                    .help("Use the last available tiles timestamps as --start and --end."),
            )
            .arg(
                Arg::new("datetime")
                    .long("datetime")
                    .value_name("YYYY-MM-DD hh:mm:ss")
                    .help("Set --start and --end to the same given datetime."),
            )
            .arg(
                Arg::new("timestamp")
                    .long("timestamp")
                    .value_name("TIMESTAMP")
                    .help("Set --start and --end to the same given timestamp."),
            )
            .arg(
                Arg::new("start")
                    .long("start")
                    .value_name("DATETIME|TIMESTAMP")
                    .help("Set --start to the given datetime or timestamp."),
            )
            .group(
                ArgGroup::new("range-start")
                    .args(["last", "datetime", "timestamp", "start"])
                    .multiple(false),
            )
            .arg(
                Arg::new("end")
                    .long("end")
                    .value_name("DATETIME|TIMESTAMP")
                    .help("Set --end to the given datetime or timestamp."),
            )
            .arg(
                Arg::new("zone")
                    .long("zone")
                    .value_name("METROPOLE|ANTILLES|REUNION|NOUVELLE-CALEDONIE")
                    .action(ArgAction::Append)
                    .help("Set the zone to convert. Can be used multiple times."),
            )
            .arg(
                Arg::new("replace")
                    .long("replace")
                    .value_name("true")
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true")
                    .help("Replace existing files.")
                    .long_help(concat!(
                        "Replace existing files. If no value is given, it defaults to true.\n",
                        "Setting this to anything other than true will disable replacing."
                    )),
            )
            .after_help(concat!(
                "Datetimes are UTC, 'YYYY-MM-DD hh:mm:ss'. Timestamps are Unix timestamps.\n\n",
                "Without --zone, every zone except NOUVELLE-CALEDONIE is converted."
            ))
    }

    /// Extract the raw values out of the matches.
    pub fn raw_arguments(matches: &ArgMatches) -> RawArguments {
        let value_of = |name: &str| matches.get_one::<String>(name).cloned();

        let zones = matches
            .get_many::<String>("zone")
            .map(|zones| zones.cloned().collect());

        // A bare --replace already carries "true".
        let replace = value_of("replace").map(Some);

        RawArguments {
            last: matches.get_flag("last"),
            datetime: value_of("datetime"),
            timestamp: value_of("timestamp"),
            start: value_of("start"),
            end: value_of("end"),
            zones,
            replace,
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    fn parse(args: &[&str]) -> RawArguments {
        let matches = ConversionCmdLine::new_app("radar-convert", "test")
            .try_get_matches_from(std::iter::once("radar-convert").chain(args.iter().cloned()))
            .unwrap();
        ConversionCmdLine::raw_arguments(&matches)
    }

    #[test]
    fn test_no_arguments() {
        assert_eq!(parse(&[]), RawArguments::default());
    }

    #[test]
    fn test_all_arguments() {
        let raw = parse(&[
            "--start=2000-06-15 12:00:00",
            "--end",
            "961072200",
            "--zone=METROPOLE",
            "--zone",
            "REUNION",
            "--replace=false",
        ]);

        assert_eq!(
            raw,
            RawArguments {
                last: false,
                datetime: None,
                timestamp: None,
                start: Some("2000-06-15 12:00:00".to_owned()),
                end: Some("961072200".to_owned()),
                zones: Some(vec!["METROPOLE".to_owned(), "REUNION".to_owned()]),
                replace: Some(Some("false".to_owned())),
            }
        );
    }

    #[test]
    fn test_bare_replace() {
        let raw = parse(&["--last", "--replace"]);
        assert!(raw.last);
        assert_eq!(raw.replace, Some(Some("true".to_owned())));
    }

    #[test]
    fn test_start_options_are_exclusive() {
        let result = ConversionCmdLine::new_app("radar-convert", "test")
            .try_get_matches_from(vec!["radar-convert", "--last", "--timestamp", "961072200"]);
        assert!(result.is_err());
    }
}
