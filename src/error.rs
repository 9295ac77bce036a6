// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the lampswitch library.
//!
//! Transport failures and malformed status bodies each have their own type,
//! but both collapse into [`ErrorKind`] before they reach the state machine,
//! which renders them the same way.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during HTTP communication with the device.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The device answered but the body could not be understood.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The external settings store could not be read.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl Error {
    /// Classifies this error for the state machine.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(_) => ErrorKind::Transport,
            Self::Parse(_) => ErrorKind::MalformedResponse,
            Self::Settings(_) => ErrorKind::Settings,
        }
    }
}

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection refused, timeout or non-2xx status.
    Transport,
    /// 2xx response whose body is unparsable or misses expected fields.
    MalformedResponse,
    /// Settings could not be loaded.
    Settings,
}

/// Errors related to HTTP communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device answered with a non-success status.
    #[error("HTTP {status} - {reason}")]
    HttpStatus {
        /// Numeric status code.
        status: u16,
        /// Canonical reason phrase.
        reason: String,
    },

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to parsing the status body.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors related to reading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the settings file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`Settings`](crate::settings::Settings).
    #[error("invalid settings in {path}: {source}")]
    Invalid {
        /// Path of the settings file.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
