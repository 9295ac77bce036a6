// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP protocol spoken by the lamp server.
//!
//! The server exposes three GET endpoints relative to a base URL:
//!
//! - `cgi-bin/on.py` and `cgi-bin/off.py` switch the lamp; any 2xx means
//!   the request was accepted and the body is ignored
//! - `status.php` returns the JSON body parsed by
//!   [`StatusResponse`](crate::response::StatusResponse)

mod http;

pub use http::{HttpClient, HttpConfig, normalize_base_url};

use crate::types::PowerState;

/// An endpoint of the lamp server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Switches the lamp on.
    On,
    /// Switches the lamp off.
    Off,
    /// Reports lamp and heating state.
    Status,
}

impl Endpoint {
    /// Returns the endpoint switching the lamp to `target`.
    #[must_use]
    pub const fn toggle(target: PowerState) -> Self {
        match target {
            PowerState::On => Self::On,
            PowerState::Off => Self::Off,
        }
    }

    /// Returns the path relative to the base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::On => "cgi-bin/on.py",
            Self::Off => "cgi-bin/off.py",
            Self::Status => "status.php",
        }
    }

    /// Builds the full URL for a normalized base URL.
    #[must_use]
    pub fn url(self, base_url: &str) -> String {
        format!("{base_url}/{}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_endpoints() {
        assert_eq!(Endpoint::toggle(PowerState::On).path(), "cgi-bin/on.py");
        assert_eq!(Endpoint::toggle(PowerState::Off).path(), "cgi-bin/off.py");
    }

    #[test]
    fn url_joins_base_and_path() {
        assert_eq!(
            Endpoint::Status.url("http://192.168.1.20"),
            "http://192.168.1.20/status.php"
        );
    }
}
