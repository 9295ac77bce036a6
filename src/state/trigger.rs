// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events consumed by the state machine.

use std::fmt;

use crate::error::ErrorKind;
use crate::response::StatusReading;
use crate::types::ToggleTarget;

/// Monotonically increasing tag of an outgoing call.
///
/// A toggle and the status fetch it chains share one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Sequence(u64);

impl Sequence {
    /// Creates a sequence with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the following sequence.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A terminal or intermediate result reported by the device client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceResponse {
    /// A toggle endpoint accepted the request; a status fetch follows.
    Toggled,
    /// A status fetch succeeded.
    Status(StatusReading),
    /// The call failed. No partial state is carried.
    Error(ErrorKind),
}

/// A device response tagged with the sequence of the call that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    /// Sequence of the originating call.
    pub seq: Sequence,
    /// The response itself.
    pub response: DeviceResponse,
}

impl Delivery {
    /// Creates a delivery.
    #[must_use]
    pub const fn new(seq: Sequence, response: DeviceResponse) -> Self {
        Self { seq, response }
    }
}

/// Everything that can drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// The user asked to switch the lamp.
    UserToggleRequested(ToggleTarget),
    /// The user asked for a manual refresh.
    RefreshRequested,
    /// Periodic or lifecycle-driven refresh.
    AutoRefreshTick,
    /// The device client delivered a result.
    DeviceResponse(Delivery),
}

impl From<Delivery> for Trigger {
    fn from(delivery: Delivery) -> Self {
        Self::DeviceResponse(delivery)
    }
}
