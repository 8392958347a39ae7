use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{error, info};

use crate::error::FetchError;

const MAX_BODY_SNIPPET_CHARS: usize = 256;

/// Trimmed, non-empty JWKS document exactly as served by a 200 response.
#[derive(Clone, PartialEq, Eq)]
pub struct RawKeySet(String);

impl RawKeySet {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for RawKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawKeySet")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

/// Performs the single HTTP GET against the JWKS endpoint. No retries and no
/// caching happen here.
#[derive(Clone)]
pub struct KeySetFetcher {
    client: Client,
    endpoint: String,
}

impl KeySetFetcher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn fetch(&self) -> Result<RawKeySet, FetchError> {
        info!(url = %self.endpoint, "fetching JWKS");
        let response = self.client.get(&self.endpoint).send().map_err(|err| {
            error!(url = %self.endpoint, error = %err, "JWKS request failed");
            FetchError::Transport(err)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body_snippet = response
                .text()
                .map(|body| snippet(&body))
                .unwrap_or_default();
            error!(url = %self.endpoint, %status, body = %body_snippet, "non-200 status from JWKS endpoint");
            return Err(FetchError::NonSuccessStatus {
                status,
                body_snippet,
            });
        }

        let body = response.text().map_err(|err| {
            error!(url = %self.endpoint, error = %err, "failed to read JWKS response body");
            FetchError::BodyRead(err)
        })?;

        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(RawKeySet(trimmed.to_string()))
    }
}

impl fmt::Debug for KeySetFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySetFetcher")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn snippet(body: &str) -> String {
    body.trim().chars().take(MAX_BODY_SNIPPET_CHARS).collect()
}

#[cfg(test)]
impl RawKeySet {
    pub(crate) fn for_tests(body: &str) -> Self {
        RawKeySet(body.trim().to_string())
    }
}
