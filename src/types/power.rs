// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power-related types for the lamp.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Represents the power state of the lamp.
///
/// # Examples
///
/// ```
/// use lampswitch_lib::types::PowerState;
///
/// assert_eq!(PowerState::On.as_str(), "ON");
/// assert_eq!(PowerState::On.inverted(), PowerState::Off);
/// assert_eq!(PowerState::from_state_code(1), PowerState::On);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerState {
    /// Lamp is off.
    #[default]
    Off,
    /// Lamp is on.
    On,
}

impl PowerState {
    /// Returns the display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Maps the integer `state` field of the status body.
    ///
    /// Only `1` means on.
    #[must_use]
    pub const fn from_state_code(code: i64) -> Self {
        if code == 1 { Self::On } else { Self::Off }
    }

    /// Returns the opposite state.
    #[must_use]
    pub const fn inverted(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }

    /// Returns `true` if the lamp is on.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OFF" | "0" | "FALSE" => Ok(Self::Off),
            "ON" | "1" | "TRUE" => Ok(Self::On),
            _ => Err(ParseError::InvalidValue {
                field: "power".to_string(),
                message: s.to_string(),
            }),
        }
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Which power state a user toggle asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleTarget {
    /// Switch to the given state.
    Set(PowerState),
    /// Switch to the opposite of the last known state.
    Invert,
}

impl ToggleTarget {
    /// Resolves the target against the last known power state.
    #[must_use]
    pub const fn resolve(self, current: PowerState) -> PowerState {
        match self {
            Self::Set(state) => state,
            Self::Invert => current.inverted(),
        }
    }
}

impl From<PowerState> for ToggleTarget {
    fn from(state: PowerState) -> Self {
        Self::Set(state)
    }
}
