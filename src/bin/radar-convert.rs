//! Radar converter.
//!
//! Converts the raw mosaics of the tile tree into colorized rasters over a range of time.

use radar_data::{
    conversion_arguments_from, convert_in_range, init_logging, Config, ConversionCmdLine,
    Converter, LocalFiles, RadarDataErr, RealCommandRunner, SqliteLedger, MISSING_START_MESSAGE,
};
use std::error::Error;

fn main() {
    if let Err(ref e) = run() {
        println!("error: {}", e);

        let mut err: &dyn Error = e;
        while let Some(cause) = err.source() {
            println!("caused by: {}", cause);
            err = cause;
        }

        ::std::process::exit(1);
    }
}

fn run() -> Result<(), RadarDataErr> {
    init_logging()?;

    let mut app = ConversionCmdLine::new_app(
        "radar-convert",
        "Convert radar mosaics into colorized tiles.",
    );
    let matches = app.clone().get_matches();
    let raw = ConversionCmdLine::raw_arguments(&matches);

    let config = Config::from_env()?;
    let mut ledger = SqliteLedger::create(&config.ledger_db)?;

    let arguments = match conversion_arguments_from(&raw, &ledger)? {
        Some(arguments) => arguments,
        None => {
            println!("{}\n", MISSING_START_MESSAGE);
            app.print_help()?;
            return Ok(());
        }
    };

    let mut runner = RealCommandRunner;
    let mut files = LocalFiles;
    let mut converter = Converter::new(&config, &mut runner, &mut files, &mut ledger);

    convert_in_range(&arguments, &mut converter)
}
