// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Displayed lamp state.

use crate::response::StatusReading;
use crate::types::PowerState;

/// What should be displayed for the lamp.
///
/// Created empty (`pending = false`, `data_available = false`) and mutated
/// only by the state machine. While a call is outstanding the last known
/// values are kept so a re-render after the reply does not flicker.
///
/// # Examples
///
/// ```
/// use lampswitch_lib::state::DeviceState;
/// use lampswitch_lib::types::PowerState;
///
/// let state = DeviceState::new();
/// assert!(!state.data_available());
/// assert!(!state.is_pending());
/// assert_eq!(state.power(), PowerState::Off);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceState {
    power: PowerState,
    inside_temp: Option<f64>,
    outside_temp: Option<f64>,
    data_available: bool,
    pending: bool,
}

impl DeviceState {
    /// Creates a new empty device state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the state shown after a successful status fetch.
    #[must_use]
    pub fn from_reading(reading: StatusReading) -> Self {
        Self {
            power: reading.power,
            inside_temp: reading.inside_temp,
            outside_temp: reading.outside_temp,
            data_available: true,
            pending: false,
        }
    }

    /// Last known or assumed power state.
    #[must_use]
    pub fn power(&self) -> PowerState {
        self.power
    }

    /// Last known inside temperature.
    #[must_use]
    pub fn inside_temp(&self) -> Option<f64> {
        self.inside_temp
    }

    /// Last known outside temperature.
    #[must_use]
    pub fn outside_temp(&self) -> Option<f64> {
        self.outside_temp
    }

    /// Whether the values reflect a real server response.
    #[must_use]
    pub fn data_available(&self) -> bool {
        self.data_available
    }

    /// Whether a network operation is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Marks a call as outstanding, keeping the last known values.
    #[must_use]
    pub(crate) fn into_pending(self) -> Self {
        Self {
            pending: true,
            ..self
        }
    }

    /// Marks the data as unavailable after a failed call.
    #[must_use]
    pub(crate) fn into_no_data(self) -> Self {
        Self {
            data_available: false,
            pending: false,
            ..self
        }
    }
}

/// The three render categories a presentation layer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Render {
    /// A call is outstanding, or nothing has been fetched yet.
    Loading,
    /// A real server response is available.
    Power {
        /// Lamp power.
        power: PowerState,
        /// Inside temperature, when reported.
        inside_temp: Option<f64>,
        /// Outside temperature, when reported.
        outside_temp: Option<f64>,
    },
    /// The last call failed.
    NoData,
}

impl Render {
    /// Computes the render category for a state and pending flag.
    ///
    /// The pending flag wins over everything else.
    #[must_use]
    pub fn of(state: &DeviceState, pending: bool) -> Self {
        if pending || state.pending {
            Self::Loading
        } else if state.data_available {
            Self::Power {
                power: state.power,
                inside_temp: state.inside_temp,
                outside_temp: state.outside_temp,
            }
        } else {
            Self::NoData
        }
    }
}
