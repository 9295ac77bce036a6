// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lamp state and the machine that reconciles it.
//!
//! [`DeviceState`] is what should be displayed, [`Trigger`] is everything
//! that can change it, and [`Machine`] decides which call to issue next.
//!
//! # Examples
//!
//! ```
//! use lampswitch_lib::state::{Delivery, DeviceResponse, Machine, Phase, Trigger};
//! use lampswitch_lib::response::StatusReading;
//! use lampswitch_lib::types::PowerState;
//!
//! let step = Machine::new().step(&Trigger::AutoRefreshTick);
//! let seq = step.effect.unwrap().seq();
//!
//! let reading = StatusReading { power: PowerState::On, inside_temp: None, outside_temp: None };
//! let done = step.machine.step(&Delivery::new(seq, DeviceResponse::Status(reading)).into());
//!
//! assert_eq!(done.machine.phase(), Phase::Displaying);
//! ```

mod device_state;
mod machine;
mod trigger;

pub use device_state::{DeviceState, Render};
pub use machine::{Effect, Machine, Phase, Step};
pub use trigger::{Delivery, DeviceResponse, Sequence, Trigger};
