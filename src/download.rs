//! Downloading mosaics, retrying while the provider misbehaves.

use std::{path::Path, thread, time::Duration};
use tracing::{info, warn};

use crate::{
    api::{ApiFileDownloader, DownloadOutcome, TransportErrorKind},
    errors::RadarDataErr,
    zones::{DataKind, Zone},
};

/// Base of the mosaic endpoints.
pub const API_URL: &str = "https://public-api.meteofrance.fr/public/DPRadar/v1/mosaiques";

/// Endpoint serving the latest `kind` mosaic of `zone` at `resolution` meters.
pub fn file_endpoint(zone: Zone, kind: DataKind, resolution: u32) -> String {
    format!(
        "{}/{}/observations/{}/produit?maille={}",
        API_URL, zone, kind, resolution
    )
}

/// How hard to insist on a failing download.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of tries before giving up.
    pub max_attempts: u32,
    /// Pause between two tries.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

/// Is this one of the transient errors the provider produces regularly.
pub fn is_provider_fault(outcome: &DownloadOutcome) -> bool {
    let transport_fault = match outcome.transport_error {
        Some(ref err) => matches!(
            err.kind,
            TransportErrorKind::ReceiveFailure | TransportErrorKind::ConnectionReset
        ),
        None => false,
    };

    let status_fault = match outcome.status {
        Some(code) => code == 400 || code >= 500,
        None => false,
    };

    transport_fault || status_fault
}

/// Download the latest `kind` mosaic of `zone` into `path`.
///
/// Provider faults are retried after `policy.delay`; anything else is returned to the caller, even
/// an error status.
pub fn download_file(
    path: &Path,
    zone: Zone,
    kind: DataKind,
    resolution: u32,
    downloader: &mut dyn ApiFileDownloader,
    policy: RetryPolicy,
) -> Result<DownloadOutcome, RadarDataErr> {
    let url = file_endpoint(zone, kind, resolution);
    info!(
        "Downloading {} of {} (maille {}) [{}] to {}",
        kind,
        zone,
        resolution,
        url,
        path.display()
    );

    for _ in 0..policy.max_attempts {
        let outcome = downloader.download_api_file(path, &url)?;

        if !is_provider_fault(&outcome) {
            return Ok(outcome);
        }

        warn!("{}", outcome);
        thread::sleep(policy.delay);
    }

    Err(RadarDataErr::DownloadFailed {
        kind: kind.to_string(),
        zone: zone.to_string(),
        resolution,
        url,
        attempts: policy.max_attempts,
    })
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;
    use crate::api::InMemoryApiFileDownloader;

    const URL: &str = "https://public-api.meteofrance.fr/public/DPRadar/v1/mosaiques/METROPOLE/observations/LAME_D_EAU/produit?maille=500";

    fn no_delay() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(0),
        }
    }

    #[test]
    fn test_file_endpoint() {
        assert_eq!(
            file_endpoint(Zone::Metropole, DataKind::LameDEau, 500),
            URL
        );
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }

    #[test]
    fn test_is_provider_fault() {
        assert!(is_provider_fault(&DownloadOutcome::new(400, "", &[])));
        assert!(is_provider_fault(&DownloadOutcome::new(500, "", &[])));
        assert!(is_provider_fault(&DownloadOutcome::new(503, "", &[])));
        assert!(is_provider_fault(&DownloadOutcome::transport_failure(
            TransportErrorKind::ReceiveFailure,
            "error"
        )));
        assert!(is_provider_fault(&DownloadOutcome::transport_failure(
            TransportErrorKind::ConnectionReset,
            "error"
        )));

        assert!(!is_provider_fault(&DownloadOutcome::new(200, "", &[])));
        assert!(!is_provider_fault(&DownloadOutcome::new(401, "", &[])));
        assert!(!is_provider_fault(&DownloadOutcome::new(404, "", &[])));
        assert!(!is_provider_fault(&DownloadOutcome::transport_failure(
            TransportErrorKind::Connect,
            "error"
        )));
    }

    #[test]
    fn test_download_file() {
        let outcome = DownloadOutcome::new(
            200,
            "",
            &[(
                "content-disposition",
                "attachment; filename=\"T_IPRN20_C_LFPW_20000615123045.h5\"",
            )],
        );
        let mut downloader = InMemoryApiFileDownloader::default().respond(URL, outcome.clone());

        let response = download_file(
            Path::new("/my/path"),
            Zone::Metropole,
            DataKind::LameDEau,
            500,
            &mut downloader,
            no_delay(),
        )
        .expect("Download failed.");

        assert_eq!(response, outcome);
        assert_eq!(downloader.requests.len(), 1);
        assert_eq!(downloader.requests[0].url, URL);
        assert_eq!(downloader.requests[0].path, Path::new("/my/path"));
    }

    #[test]
    fn test_download_file_fails_after_max_attempts() {
        let mut fault = DownloadOutcome::new(200, "", &[]);
        fault.transport_error = Some(crate::api::TransportError {
            kind: TransportErrorKind::ReceiveFailure,
            message: "error".to_owned(),
        });
        let mut downloader = InMemoryApiFileDownloader::default().respond(URL, fault);

        let result = download_file(
            Path::new("/my/path"),
            Zone::Metropole,
            DataKind::LameDEau,
            500,
            &mut downloader,
            no_delay(),
        );

        match result {
            Err(err @ RadarDataErr::DownloadFailed { .. }) => assert_eq!(
                err.to_string(),
                format!(
                    "Failed to download LAME_D_EAU of METROPOLE (maille 500) [{}] after 5 attempts.",
                    URL
                )
            ),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(downloader.requests.len(), 5);
    }

    #[test]
    fn test_download_file_stops_when_the_fault_clears() {
        let mut downloader = InMemoryApiFileDownloader::default()
            .respond(URL, DownloadOutcome::new(502, "", &[]))
            .respond(URL, DownloadOutcome::new(400, "", &[]))
            .respond(URL, DownloadOutcome::new(404, "", &[]));

        let outcome = download_file(
            Path::new("/my/path"),
            Zone::Metropole,
            DataKind::LameDEau,
            500,
            &mut downloader,
            no_delay(),
        )
        .expect("Download failed.");

        assert_eq!(outcome.status, Some(404));
        assert_eq!(downloader.requests.len(), 3);
    }
}
