#![deny(missing_docs)]
//! Package to download Meteo-France radar mosaics and publish them as colorized tiles.

//
// Public API
//
pub use crate::accumulation::{compute_for_all_zones, compute_for_zone, AccumulationJob};
pub use crate::api::{
    is_token_expired, ApiClient, ApiFileDownloader, ApiToken, ClientCredentials, DownloadOutcome,
    DownloadRequest, Headers, HttpTransport, InMemoryApiFileDownloader, InMemoryTransport,
    RecordedRequest, ReqwestTransport, StaticTokenFetcher, TokenFetcher, TransportError,
    TransportErrorKind, TOKEN_URL,
};
pub use crate::backfill::{
    conversion_arguments_from, convert_and_accumulate, convert_in_range, parse_range_argument,
    parse_replace, resolve_end, resolve_start, resolve_zones, ConversionArguments, RawArguments,
};
pub use crate::cmd_line::{ConversionCmdLine, MISSING_START_MESSAGE};
pub use crate::config::Config;
pub use crate::conversion::{ColorReliefJob, Converter, WarpJob};
pub use crate::download::{download_file, file_endpoint, is_provider_fault, RetryPolicy, API_URL};
pub use crate::errors::RadarDataErr;
pub use crate::ingest::{
    execute_download_and_conversion, execute_download_conversion_and_generate_accumulations,
    last_timestamp, IngestStatus, Ingester, LAME_D_EAU_RESOLUTION,
};
pub use crate::io::{
    create_folder_if_needed, CommandOutput, CommandRunner, FakeCommandRunner, FileAppender,
    FileOp, FileOps, InMemoryFileAppender, InMemoryFiles, Invocation, LocalFiles,
    RealCommandRunner, RealFileAppender,
};
pub use crate::ledger::{InMemoryLedger, Ledger, SqliteLedger};
pub use crate::logging::init_logging;
pub use crate::metadata::{timestamp_from_content_disposition, CONTENT_DISPOSITION};
pub use crate::tiles::{file_key, radaric_key, scratch_path, TileLayout};
pub use crate::zones::{DataKind, Zone, RESOLUTIONS};

//
// Implementation only
//
mod accumulation;
mod api;
mod backfill;
mod cmd_line;
mod config;
mod conversion;
mod download;
mod errors;
mod ingest;
mod io;
mod ledger;
mod logging;
mod metadata;
mod tiles;
mod zones;
