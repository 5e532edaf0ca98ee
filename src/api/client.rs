use std::path::{Path, PathBuf};
use tracing::warn;

use super::{ApiToken, DownloadOutcome, HttpTransport, ScriptedOutcomes, TokenFetcher};

use crate::errors::RadarDataErr;

/// Downloads an API file to disk with a valid token.
pub trait ApiFileDownloader {
    /// Download `url` into `path`.
    fn download_api_file(&mut self, path: &Path, url: &str)
        -> Result<DownloadOutcome, RadarDataErr>;
}

/// Does this outcome mean the token must be renewed.
///
/// While downloading, the body went to a file and any 401 counts. Otherwise only a 401 whose JSON
/// message is `Invalid Credentials` does.
pub fn is_token_expired(outcome: &DownloadOutcome, downloading: bool) -> bool {
    if outcome.status != Some(401) {
        return false;
    }
    if downloading {
        return true;
    }

    outcome
        .json()
        .as_ref()
        .and_then(|json| json.get("message"))
        .and_then(|message| message.as_str())
        .map(|message| message == "Invalid Credentials")
        .unwrap_or(false)
}

/// Authenticated access to the API: a transport plus the cached token.
#[derive(Debug)]
pub struct ApiClient<T: HttpTransport, F: TokenFetcher> {
    transport: T,
    token: ApiToken<F>,
}

impl<T: HttpTransport, F: TokenFetcher> ApiClient<T, F> {
    /// Create a client with no token yet.
    pub fn new(transport: T, fetcher: F) -> Self {
        ApiClient {
            transport,
            token: ApiToken::new(fetcher),
        }
    }

    /// GET an API resource and return the response.
    ///
    /// The token is renewed once if the API answers with invalid credentials.
    pub fn fetch_api(&mut self, url: &str) -> Result<DownloadOutcome, RadarDataErr> {
        let token = self.token.ensure_token()?;
        let outcome = self.transport.get(url, &token);
        if !is_token_expired(&outcome, false) {
            return Ok(outcome);
        }

        warn!("Token expired while fetching {}, renewing it", url);
        let token = self.token.update_token()?;
        Ok(self.transport.get(url, &token))
    }

    /// Access the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Access the token.
    pub fn token(&self) -> &ApiToken<F> {
        &self.token
    }
}

impl<T: HttpTransport, F: TokenFetcher> ApiFileDownloader for ApiClient<T, F> {
    fn download_api_file(
        &mut self,
        path: &Path,
        url: &str,
    ) -> Result<DownloadOutcome, RadarDataErr> {
        let token = self.token.ensure_token()?;
        let outcome = self.transport.download(path, url, &token)?;
        if !is_token_expired(&outcome, true) {
            return Ok(outcome);
        }

        warn!("Token expired while downloading {}, renewing it", url);
        let token = self.token.update_token()?;
        self.transport.download(path, url, &token)
    }
}

/// One download asked of the [`InMemoryApiFileDownloader`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Destination.
    pub path: PathBuf,
    /// Requested URL.
    pub url: String,
}

/// Answers downloads from a script, 404 for unknown URLs.
#[derive(Debug, Default)]
pub struct InMemoryApiFileDownloader {
    outcomes: ScriptedOutcomes,
    /// Every download asked, in order.
    pub requests: Vec<DownloadRequest>,
}

impl InMemoryApiFileDownloader {
    /// Queue `outcome` as the next answer for `url`.
    pub fn respond(mut self, url: &str, outcome: DownloadOutcome) -> Self {
        self.outcomes.push(url, outcome);
        self
    }
}

impl ApiFileDownloader for InMemoryApiFileDownloader {
    fn download_api_file(
        &mut self,
        path: &Path,
        url: &str,
    ) -> Result<DownloadOutcome, RadarDataErr> {
        self.requests.push(DownloadRequest {
            path: path.to_path_buf(),
            url: url.to_owned(),
        });
        Ok(self.outcomes.next(url))
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
