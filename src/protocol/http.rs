// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for the lamp server.

use std::time::Duration;

use reqwest::Client;

use crate::error::ProtocolError;

use super::Endpoint;

// ============================================================================
// HttpConfig
// ============================================================================

/// Configuration for the HTTP transport.
///
/// The base URL is not part of this configuration: it comes from the
/// settings store and may change between calls.
///
/// # Examples
///
/// ```
/// use lampswitch_lib::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new().with_timeout(Duration::from_secs(5));
/// assert_eq!(config.timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    timeout: Duration,
}

impl HttpConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates an `HttpClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_client(self) -> Result<HttpClient, ProtocolError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(HttpClient { client })
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HttpClient
// ============================================================================

/// HTTP client issuing GET requests against the lamp server.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ProtocolError> {
        HttpConfig::new().into_client()
    }

    /// Issues `GET <base_url>/<endpoint>` and returns the body.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Http` on connection failure or timeout and
    /// `ProtocolError::HttpStatus` for any non-2xx status.
    pub async fn get(&self, base_url: &str, endpoint: Endpoint) -> Result<String, ProtocolError> {
        let url = endpoint.url(base_url);

        tracing::debug!(url = %url, "Sending HTTP request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await.map_err(ProtocolError::Http)?;

        tracing::debug!(url = %url, body = %body, "Received HTTP response");

        Ok(body)
    }
}

/// Normalizes a configured base URL.
///
/// Adds `http://` when no scheme is given and trims trailing slashes.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidAddress` for an empty URL.
pub fn normalize_base_url(url: &str) -> Result<String, ProtocolError> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ProtocolError::InvalidAddress(url.to_string()));
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("http://{trimmed}"))
    }
}
