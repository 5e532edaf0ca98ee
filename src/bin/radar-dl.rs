//! Radar downloader.
//!
//! Fetches the latest rainfall mosaics, publishes them, converts them and refreshes the
//! accumulations. Meant to run from cron every few minutes.

use clap::{Arg, ArgAction, Command};
use radar_data::{
    execute_download_and_conversion, execute_download_conversion_and_generate_accumulations,
    init_logging, ApiClient, ClientCredentials, Config, Ingester, LocalFiles, RadarDataErr,
    RealCommandRunner, RealFileAppender, ReqwestTransport, SqliteLedger,
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

    let matches = Command::new("radar-dl")
        .about("Download radar mosaics and publish them as colorized tiles.")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("replace")
                .long("replace")
                .action(ArgAction::SetTrue)
                .help("Publish again tiles that are not newer than the last ones."),
        )
        .arg(
            Arg::new("download-only")
                .long("download-only")
                .action(ArgAction::SetTrue)
                .conflicts_with("no-accumulations")
                .help("Stop after publishing the raw mosaics."),
        )
        .arg(
            Arg::new("no-accumulations")
                .long("no-accumulations")
                .action(ArgAction::SetTrue)
                .help("Do not refresh the accumulations after converting."),
        )
        .get_matches();

    let replace = matches.get_flag("replace");

    let config = Config::from_env()?;
    let transport = ReqwestTransport::new()?;
    let fetcher = ClientCredentials::new(transport.clone(), config.require_application_id()?);
    let mut client = ApiClient::new(transport, fetcher);

    let mut ledger = SqliteLedger::create(&config.ledger_db)?;
    let mut appender = RealFileAppender;
    let mut runner = RealCommandRunner;
    let mut files = LocalFiles;

    if matches.get_flag("download-only") {
        Ingester::new(&config, &mut client, &mut appender, &mut files, &mut ledger)
            .execute_download(replace);
        return Ok(());
    }

    if matches.get_flag("no-accumulations") {
        execute_download_and_conversion(
            &config,
            replace,
            &mut client,
            &mut appender,
            &mut runner,
            &mut files,
            &mut ledger,
        )?;
        return Ok(());
    }

    execute_download_conversion_and_generate_accumulations(
        &config,
        replace,
        &mut client,
        &mut appender,
        &mut runner,
        &mut files,
        &mut ledger,
    )
}
