// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status response parsing.

use serde::Deserialize;

use crate::error::ParseError;
use crate::types::PowerState;

/// Name of the lamp this library controls.
pub const LIVING_ROOM: &str = "living room";

/// Body of `GET <base>/status.php`.
///
/// # Examples
///
/// ```
/// use lampswitch_lib::response::StatusResponse;
/// use lampswitch_lib::types::PowerState;
///
/// let json = r#"{
///     "lamps": [{"id": "1", "name": "living room", "state": 1}],
///     "heating": [{"current_temp": 21.5, "ext_temp": 5.0}]
/// }"#;
/// let reading = StatusResponse::parse(json).unwrap().reading().unwrap();
/// assert_eq!(reading.power, PowerState::On);
/// assert_eq!(reading.inside_temp, Some(21.5));
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatusResponse {
    /// Lamps known to the server.
    #[serde(default)]
    pub lamps: Option<Vec<Lamp>>,

    /// Heating controllers; only the first entry is consulted.
    #[serde(default)]
    pub heating: Option<Vec<Heating>>,
}

/// One entry of the `lamps` list.
#[derive(Debug, Clone, Deserialize)]
pub struct Lamp {
    /// Server-side identifier.
    #[serde(default)]
    pub id: Option<String>,

    /// Human readable lamp name.
    #[serde(default)]
    pub name: Option<String>,

    /// `1` when the lamp is on.
    #[serde(default)]
    pub state: Option<StateCode>,
}

/// Lamp state code, sent as a number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StateCode {
    /// `1`
    Integer(i64),
    /// `1.0`
    Float(f64),
    /// `"1"`
    Text(String),
}

impl StateCode {
    /// Returns the integer code, truncating fractional values.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidValue` if a text code is not numeric.
    #[allow(clippy::cast_possible_truncation)]
    pub fn code(&self) -> Result<i64, ParseError> {
        match self {
            Self::Integer(code) => Ok(*code),
            Self::Float(code) => Ok(code.trunc() as i64),
            Self::Text(text) => {
                let text = text.trim();
                text.parse::<i64>()
                    .or_else(|_| text.parse::<f64>().map(|code| code.trunc() as i64))
                    .map_err(|_| ParseError::InvalidValue {
                        field: "state".to_string(),
                        message: format!("expected a numeric state code, got '{text}'"),
                    })
            }
        }
    }
}

/// One entry of the `heating` list.
#[derive(Debug, Clone, Deserialize)]
pub struct Heating {
    /// Inside temperature.
    #[serde(default)]
    pub current_temp: Option<f64>,

    /// Outside temperature.
    #[serde(default)]
    pub ext_temp: Option<f64>,
}

/// The values extracted from a status body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReading {
    /// Power state of the living room lamp. Absent lamp reads as off.
    pub power: PowerState,
    /// Inside temperature, if the server reports heating.
    pub inside_temp: Option<f64>,
    /// Outside temperature, if the server reports heating.
    pub outside_temp: Option<f64>,
}

impl StatusResponse {
    /// Parses a status body.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the body is not a JSON object of the
    /// expected shape.
    pub fn parse(body: &str) -> Result<Self, ParseError> {
        serde_json::from_str(body).map_err(Into::into)
    }

    /// Extracts the reading for the living room lamp.
    ///
    /// # Errors
    ///
    /// See [`StatusResponse::reading_for`].
    pub fn reading(&self) -> Result<StatusReading, ParseError> {
        self.reading_for(LIVING_ROOM)
    }

    /// Extracts the reading for the lamp called `lamp_name`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingField` if there is no `lamps` list or the
    /// matching lamp has no `state`, and `ParseError::InvalidValue` if that
    /// state is not numeric. Lamps without a name never match.
    pub fn reading_for(&self, lamp_name: &str) -> Result<StatusReading, ParseError> {
        let lamps = self
            .lamps
            .as_ref()
            .ok_or_else(|| ParseError::MissingField("lamps".to_string()))?;

        let power = match lamps
            .iter()
            .find(|lamp| lamp.name.as_deref() == Some(lamp_name))
        {
            Some(lamp) => {
                let code = lamp
                    .state
                    .as_ref()
                    .ok_or_else(|| ParseError::MissingField(format!("lamps[{lamp_name}].state")))?
                    .code()?;
                PowerState::from_state_code(code)
            }
            None => PowerState::Off,
        };

        let first_heating = self.heating.as_ref().and_then(|list| list.first());

        Ok(StatusReading {
            power,
            inside_temp: first_heating.and_then(|h| h.current_temp),
            outside_temp: first_heating.and_then(|h| h.ext_temp),
        })
    }
}
