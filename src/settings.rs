// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settings consumed from an external store.
//!
//! The store holds a "use internal network" flag and two base URLs. It is
//! re-read on every manual refresh and before the first auto refresh of a
//! session, so implementations of [`SettingsSource`] must return the
//! current values on every call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SettingsError};

/// Network settings for the lamp server.
///
/// # Examples
///
/// ```
/// use lampswitch_lib::settings::Settings;
///
/// let settings = Settings::new("http://192.168.1.20", "https://home.example.org")
///     .with_internal_network(false);
/// assert_eq!(settings.base_url(), "https://home.example.org");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Use [`Settings::internal_url`] instead of [`Settings::external_url`].
    pub use_internal_network: bool,
    /// Base URL reachable from the home network.
    pub internal_url: String,
    /// Base URL reachable from outside.
    pub external_url: String,
}

impl Settings {
    /// Default base URL for both networks.
    pub const DEFAULT_URL: &'static str = "http://localhost";

    /// Creates settings using the internal network.
    #[must_use]
    pub fn new(internal_url: impl Into<String>, external_url: impl Into<String>) -> Self {
        Self {
            use_internal_network: true,
            internal_url: internal_url.into(),
            external_url: external_url.into(),
        }
    }

    /// Selects the network.
    #[must_use]
    pub fn with_internal_network(mut self, internal: bool) -> Self {
        self.use_internal_network = internal;
        self
    }

    /// Returns the base URL for the selected network.
    #[must_use]
    pub fn base_url(&self) -> &str {
        if self.use_internal_network {
            &self.internal_url
        } else {
            &self.external_url
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL, Self::DEFAULT_URL)
    }
}

/// Source of [`Settings`].
pub trait SettingsSource: Send + Sync {
    /// Reads the current settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Settings` if the store cannot be read.
    fn load(&self) -> Result<Settings>;
}

impl<S: SettingsSource + ?Sized> SettingsSource for Arc<S> {
    fn load(&self) -> Result<Settings> {
        (**self).load()
    }
}

/// In-memory settings that can be updated while a session runs.
///
/// Clones share the same values.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    inner: Arc<RwLock<Settings>>,
}

impl StaticSettings {
    /// Creates a source holding `settings`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replaces the stored settings.
    pub fn set(&self, settings: Settings) {
        *self.inner.write() = settings;
    }

    /// Switches between internal and external network.
    pub fn set_internal_network(&self, internal: bool) {
        self.inner.write().use_internal_network = internal;
    }
}

impl SettingsSource for StaticSettings {
    fn load(&self) -> Result<Settings> {
        Ok(self.inner.read().clone())
    }
}

/// Settings stored as a JSON file, read on every [`SettingsSource::load`].
///
/// A missing file yields [`Settings::default`]; missing keys take their
/// default values.
///
/// ```json
/// { "use_internal_network": true,
///   "internal_url": "http://192.168.1.20",
///   "external_url": "https://home.example.org" }
/// ```
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    /// Creates a source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsSource for FileSettings {
    fn load(&self) -> Result<Settings> {
        let path = self.path.display().to_string();
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path, "Settings file not found, using defaults");
                return Ok(Settings::default());
            }
            Err(source) => return Err(SettingsError::Io { path, source }.into()),
        };

        serde_json::from_str(&text).map_err(|source| SettingsError::Invalid { path, source }.into())
    }
}
