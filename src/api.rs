//! Access to the Meteo-France public API.

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::RadarDataErr, io::create_folder_if_needed};

mod client;
mod token;

pub use self::client::{
    is_token_expired, ApiClient, ApiFileDownloader, DownloadRequest, InMemoryApiFileDownloader,
};
pub use self::token::{ApiToken, ClientCredentials, StaticTokenFetcher, TokenFetcher, TOKEN_URL};

/// Response headers, names lower cased.
pub type Headers = BTreeMap<String, String>;

/// Low level failures of a request, before or while the body was received.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection broke while receiving data.
    ReceiveFailure,
    /// The peer reset the connection.
    ConnectionReset,
    /// The request timed out.
    Timeout,
    /// No connection could be made.
    Connect,
    /// Anything else.
    Other,
}

impl TransportErrorKind {
    /// The matching curl error code, as found in the logs of older tooling.
    pub fn code(self) -> i32 {
        match self {
            TransportErrorKind::ReceiveFailure => 56,
            TransportErrorKind::ConnectionReset => 104,
            TransportErrorKind::Timeout => 28,
            TransportErrorKind::Connect => 7,
            TransportErrorKind::Other => 1,
        }
    }
}

/// A transport failure and its message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    /// What went wrong.
    pub kind: TransportErrorKind,
    /// Message from the HTTP stack.
    pub message: String,
}

/// Everything known about one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// HTTP status, `None` when no response came back.
    pub status: Option<u16>,
    /// Body, empty when it was streamed to a file.
    pub body: String,
    /// Response headers.
    pub headers: Headers,
    /// Transport failure, if any.
    pub transport_error: Option<TransportError>,
}

impl DownloadOutcome {
    /// An outcome with a status, a body and some headers.
    pub fn new(status: u16, body: &str, headers: &[(&str, &str)]) -> Self {
        DownloadOutcome {
            status: Some(status),
            body: body.to_owned(),
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_lowercase(), (*value).to_owned()))
                .collect(),
            transport_error: None,
        }
    }

    /// An outcome where the transport failed.
    pub fn transport_failure(kind: TransportErrorKind, message: &str) -> Self {
        DownloadOutcome {
            transport_error: Some(TransportError {
                kind,
                message: message.to_owned(),
            }),
            ..DownloadOutcome::default()
        }
    }

    /// Value of a header, case insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// The body as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let headers = serde_json::to_string(&self.headers).map_err(|_| fmt::Error)?;
        let (error_code, error) = match self.transport_error {
            Some(ref err) => (err.kind.code(), err.message.as_str()),
            None => (0, ""),
        };

        write!(
            f,
            "DownloadOutcome(\n    code = {},\n    response = '{}',\n    headers = {},\n    error_code = {},\n    error = '{}'\n)",
            self.status.unwrap_or(0),
            self.body,
            headers,
            error_code,
            error
        )
    }
}

/// Raw HTTP exchanges.
pub trait HttpTransport {
    /// GET `url` with a bearer token, streaming the body into `path`.
    fn download(
        &mut self,
        path: &Path,
        url: &str,
        bearer: &str,
    ) -> Result<DownloadOutcome, RadarDataErr>;

    /// GET `url` with a bearer token, keeping the body.
    fn get(&mut self, url: &str, bearer: &str) -> DownloadOutcome;

    /// POST a form to `url` with the given `Authorization` header value.
    fn post_form(&mut self, url: &str, form: &[(&str, &str)], authorization: &str)
        -> DownloadOutcome;
}

/// Blocking HTTP with reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    const TIMEOUT: Duration = Duration::from_secs(120);

    /// Create a transport with the default timeout.
    pub fn new() -> Result<Self, RadarDataErr> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Self::TIMEOUT)
            .user_agent(concat!("radar-data/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ReqwestTransport { client })
    }

    fn outcome_from(response: reqwest::blocking::Response) -> DownloadOutcome {
        let status = response.status().as_u16();
        let headers = Self::headers_from(&response);

        match response.text() {
            Ok(body) => DownloadOutcome {
                status: Some(status),
                body,
                headers,
                transport_error: None,
            },
            Err(err) => DownloadOutcome {
                status: Some(status),
                body: String::new(),
                headers,
                transport_error: Some(Self::transport_error(&err, true)),
            },
        }
    }

    fn headers_from(response: &reqwest::blocking::Response) -> Headers {
        response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_lowercase(), value.trim().to_owned()))
            })
            .collect()
    }

    fn transport_error(err: &reqwest::Error, receiving: bool) -> TransportError {
        use std::error::Error;

        let mut kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if receiving || err.is_body() || err.is_decode() {
            TransportErrorKind::ReceiveFailure
        } else {
            TransportErrorKind::Other
        };

        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                if let std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe = io_err.kind()
                {
                    kind = TransportErrorKind::ConnectionReset;
                }
            }
            source = cause.source();
        }

        TransportError {
            kind,
            message: err.to_string(),
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn download(
        &mut self,
        path: &Path,
        url: &str,
        bearer: &str,
    ) -> Result<DownloadOutcome, RadarDataErr> {
        create_folder_if_needed(path)?;
        let mut file = File::create(path)?;

        let mut response = match self.client.get(url).bearer_auth(bearer).send() {
            Ok(response) => response,
            Err(err) => {
                return Ok(DownloadOutcome {
                    transport_error: Some(Self::transport_error(&err, false)),
                    ..DownloadOutcome::default()
                })
            }
        };

        let status = response.status().as_u16();
        let headers = Self::headers_from(&response);
        let transport_error = response
            .copy_to(&mut file)
            .err()
            .map(|err| Self::transport_error(&err, true));

        Ok(DownloadOutcome {
            status: Some(status),
            body: String::new(),
            headers,
            transport_error,
        })
    }

    fn get(&mut self, url: &str, bearer: &str) -> DownloadOutcome {
        match self.client.get(url).bearer_auth(bearer).send() {
            Ok(response) => Self::outcome_from(response),
            Err(err) => DownloadOutcome {
                transport_error: Some(Self::transport_error(&err, false)),
                ..DownloadOutcome::default()
            },
        }
    }

    fn post_form(
        &mut self,
        url: &str,
        form: &[(&str, &str)],
        authorization: &str,
    ) -> DownloadOutcome {
        match self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .form(form)
            .send()
        {
            Ok(response) => Self::outcome_from(response),
            Err(err) => DownloadOutcome {
                transport_error: Some(Self::transport_error(&err, false)),
                ..DownloadOutcome::default()
            },
        }
    }
}

/// Outcomes handed out per URL, one per request; the last one keeps being repeated.
#[derive(Clone, Debug, Default)]
pub(crate) struct ScriptedOutcomes {
    outcomes: BTreeMap<String, VecDeque<DownloadOutcome>>,
}

impl ScriptedOutcomes {
    pub(crate) fn push(&mut self, url: &str, outcome: DownloadOutcome) {
        self.outcomes
            .entry(url.to_owned())
            .or_default()
            .push_back(outcome);
    }

    pub(crate) fn next(&mut self, url: &str) -> DownloadOutcome {
        match self.outcomes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => DownloadOutcome::new(404, "", &[]),
        }
    }
}

/// One request seen by the [`InMemoryTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    /// `GET`, `DOWNLOAD` or `POST`.
    pub method: &'static str,
    /// Requested URL.
    pub url: String,
    /// Authorization header value.
    pub authorization: String,
    /// Destination of a download.
    pub path: Option<PathBuf>,
}

/// Transport answering from a script, for tests.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    outcomes: ScriptedOutcomes,
    /// Every request, in order.
    pub requests: Vec<RecordedRequest>,
}

impl InMemoryTransport {
    /// Queue `outcome` as the next answer for `url`.
    pub fn respond(mut self, url: &str, outcome: DownloadOutcome) -> Self {
        self.outcomes.push(url, outcome);
        self
    }
}

impl HttpTransport for InMemoryTransport {
    fn download(
        &mut self,
        path: &Path,
        url: &str,
        bearer: &str,
    ) -> Result<DownloadOutcome, RadarDataErr> {
        self.requests.push(RecordedRequest {
            method: "DOWNLOAD",
            url: url.to_owned(),
            authorization: format!("Bearer {}", bearer),
            path: Some(path.to_path_buf()),
        });
        Ok(self.outcomes.next(url))
    }

    fn get(&mut self, url: &str, bearer: &str) -> DownloadOutcome {
        self.requests.push(RecordedRequest {
            method: "GET",
            url: url.to_owned(),
            authorization: format!("Bearer {}", bearer),
            path: None,
        });
        self.outcomes.next(url)
    }

    fn post_form(
        &mut self,
        url: &str,
        _form: &[(&str, &str)],
        authorization: &str,
    ) -> DownloadOutcome {
        self.requests.push(RecordedRequest {
            method: "POST",
            url: url.to_owned(),
            authorization: authorization.to_owned(),
            path: None,
        });
        self.outcomes.next(url)
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
