use serde::Deserialize;
use tracing::info;

use super::HttpTransport;

use crate::errors::RadarDataErr;

/// Endpoint handing out API tokens.
pub const TOKEN_URL: &str = "https://portail-api.meteofrance.fr/token";

/// Something that can produce a fresh API token.
pub trait TokenFetcher {
    /// Get a new token.
    fn fetch_token(&mut self) -> Result<String, RadarDataErr>;
}

#[derive(Deserialize)]
struct TokenReply {
    access_token: String,
}

/// OAuth2 client credentials exchange with the application id.
#[derive(Debug)]
pub struct ClientCredentials<T: HttpTransport> {
    transport: T,
    token_url: String,
    application_id: String,
}

impl<T: HttpTransport> ClientCredentials<T> {
    /// Exchange `application_id` at the default token endpoint.
    pub fn new(transport: T, application_id: &str) -> Self {
        ClientCredentials {
            transport,
            token_url: TOKEN_URL.to_owned(),
            application_id: application_id.to_owned(),
        }
    }

    /// Use another token endpoint.
    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_owned();
        self
    }
}

impl<T: HttpTransport> TokenFetcher for ClientCredentials<T> {
    fn fetch_token(&mut self) -> Result<String, RadarDataErr> {
        if self.application_id.trim().is_empty() {
            return Err(RadarDataErr::MissingConfig("APPLICATION_ID"));
        }

        info!("Fetching a new API token");

        let outcome = self.transport.post_form(
            &self.token_url,
            &[("grant_type", "client_credentials")],
            &format!("Basic {}", self.application_id),
        );

        if let Some(err) = outcome.transport_error {
            return Err(RadarDataErr::TokenFetch(err.message));
        }

        serde_json::from_str::<TokenReply>(&outcome.body)
            .map(|reply| reply.access_token)
            .map_err(|_| RadarDataErr::TokenFetch(format!("unexpected reply {}", outcome)))
    }
}

/// Hands out the same token every time and counts how often it was asked.
#[derive(Debug, Default)]
pub struct StaticTokenFetcher {
    /// The token.
    pub token: String,
    /// Number of calls to `fetch_token`.
    pub fetches: usize,
}

impl StaticTokenFetcher {
    /// Fetcher handing out `token`.
    pub fn new(token: &str) -> Self {
        StaticTokenFetcher {
            token: token.to_owned(),
            fetches: 0,
        }
    }
}

impl TokenFetcher for StaticTokenFetcher {
    fn fetch_token(&mut self) -> Result<String, RadarDataErr> {
        self.fetches += 1;
        Ok(self.token.clone())
    }
}

/// The cached API token.
///
/// There is no expiry tracking, callers refresh it when the API says it expired.
#[derive(Debug)]
pub struct ApiToken<F: TokenFetcher> {
    fetcher: F,
    token: Option<String>,
}

impl<F: TokenFetcher> ApiToken<F> {
    /// An empty token slot filled by `fetcher`.
    pub fn new(fetcher: F) -> Self {
        ApiToken {
            fetcher,
            token: None,
        }
    }

    /// The cached token, fetching one if there is none yet.
    pub fn ensure_token(&mut self) -> Result<String, RadarDataErr> {
        if let Some(token) = self.token.clone().filter(|token| !token.is_empty()) {
            return Ok(token);
        }

        self.update_token()
    }

    /// Fetch a new token and replace the cached one.
    pub fn update_token(&mut self) -> Result<String, RadarDataErr> {
        let token = self.fetcher.fetch_token()?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Access the fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;
    use crate::api::{DownloadOutcome, InMemoryTransport, TransportErrorKind};

    #[test]
    fn test_ensure_token_fetches_once() {
        let mut token = ApiToken::new(StaticTokenFetcher::new("abc"));

        assert_eq!(token.ensure_token().unwrap(), "abc");
        assert_eq!(token.ensure_token().unwrap(), "abc");
        assert_eq!(token.fetcher().fetches, 1);

        assert_eq!(token.update_token().unwrap(), "abc");
        assert_eq!(token.fetcher().fetches, 2);
    }

    #[test]
    fn test_client_credentials() {
        let transport = InMemoryTransport::default().respond(
            TOKEN_URL,
            DownloadOutcome::new(200, r#"{"access_token":"xyz","token_type":"Bearer"}"#, &[]),
        );
        let mut credentials = ClientCredentials::new(transport, "app-id");

        assert_eq!(credentials.fetch_token().unwrap(), "xyz");

        let request = &credentials.transport.requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, TOKEN_URL);
        assert_eq!(request.authorization, "Basic app-id");
    }

    #[test]
    fn test_missing_application_id() {
        let mut credentials = ClientCredentials::new(InMemoryTransport::default(), "");

        match credentials.fetch_token() {
            Err(RadarDataErr::MissingConfig("APPLICATION_ID")) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(credentials.transport.requests.is_empty());
    }

    #[test]
    fn test_token_fetch_failures() {
        let transport = InMemoryTransport::default().respond(
            "http://token",
            DownloadOutcome::transport_failure(TransportErrorKind::Connect, "refused"),
        );
        let mut credentials =
            ClientCredentials::new(transport, "app-id").with_token_url("http://token");
        assert!(matches!(
            credentials.fetch_token(),
            Err(RadarDataErr::TokenFetch(_))
        ));

        let transport = InMemoryTransport::default().respond(
            "http://token",
            DownloadOutcome::new(401, r#"{"message":"nope"}"#, &[]),
        );
        let mut credentials =
            ClientCredentials::new(transport, "app-id").with_token_url("http://token");
        assert!(matches!(
            credentials.fetch_token(),
            Err(RadarDataErr::TokenFetch(_))
        ));
    }
}
