// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconciliation state machine.
//!
//! [`Machine::step`] is a pure function from the current machine and a
//! [`Trigger`] to the next machine plus at most one [`Effect`] for the
//! driver to perform. Every trigger that changes what should be displayed
//! resolves to exactly one `Pending -> {Displaying, NoData}` cycle.
//!
//! | Current | Trigger | Effect | Next |
//! |---|---|---|---|
//! | no toggle in flight | `UserToggleRequested` | `Toggle` | `Pending` |
//! | toggle in flight | `UserToggleRequested` | none, target queued | `Pending` |
//! | any | `RefreshRequested` | `FetchStatus` (reload settings) | `Pending` |
//! | `Idle`, `NoData`, `Displaying` | `AutoRefreshTick` | `FetchStatus` | `Pending` |
//! | `Pending` | `AutoRefreshTick` | none | `Pending` |
//! | `Pending` | `Status` (latest seq) | none | `Displaying` |
//! | `Pending` | `Error` (latest seq) | none | `NoData` |
//! | `Pending` | `Toggled` | none | `Pending` |
//!
//! Deliveries received outside `Pending`, or tagged with a sequence other
//! than the latest issued, are ignored.
//!
//! At most one toggle request is on the wire at a time. Toggles requested
//! meanwhile collapse into a single queued target, which is sent once the
//! in-flight toggle answers with `Toggled` or `Error`. A queued target equal
//! to the one just applied is dropped.

use std::fmt;

use crate::types::PowerState;

use super::{Delivery, DeviceResponse, DeviceState, Render, Sequence, Trigger};

/// Phase of the reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Nothing fetched yet. Renders like [`Phase::Pending`].
    #[default]
    Idle,
    /// A call is outstanding.
    Pending,
    /// A status fetch succeeded.
    Displaying,
    /// The last call failed.
    NoData,
}

impl Phase {
    /// Whether the presentation layer shows the loading affordance.
    #[must_use]
    pub const fn shows_pending(self) -> bool {
        matches!(self, Self::Idle | Self::Pending)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Displaying => "displaying",
            Self::NoData => "no data",
        };
        f.write_str(name)
    }
}

/// A network call the driver must issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Switch the lamp; the client chains a status fetch on success.
    Toggle {
        /// Tag for the toggle and its chained status fetch.
        seq: Sequence,
        /// Requested power state.
        target: PowerState,
    },
    /// Fetch the current status.
    FetchStatus {
        /// Tag for the call.
        seq: Sequence,
        /// Re-read the external settings before issuing the call.
        reload_settings: bool,
    },
}

impl Effect {
    /// Returns the sequence the call is tagged with.
    #[must_use]
    pub const fn seq(&self) -> Sequence {
        match self {
            Self::Toggle { seq, .. } | Self::FetchStatus { seq, .. } => *seq,
        }
    }
}

/// Outcome of one [`Machine::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The machine after the trigger.
    pub machine: Machine,
    /// Call to issue, if any.
    pub effect: Option<Effect>,
    /// Whether the phase or the displayed state changed.
    pub changed: bool,
}

/// A toggle request that has not answered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlightToggle {
    seq: Sequence,
    target: PowerState,
}

/// The reconciliation state machine.
///
/// # Examples
///
/// ```
/// use lampswitch_lib::state::{Effect, Machine, Phase, Trigger};
///
/// let machine = Machine::new();
/// let step = machine.step(&Trigger::AutoRefreshTick);
///
/// assert_eq!(step.machine.phase(), Phase::Pending);
/// assert!(matches!(step.effect, Some(Effect::FetchStatus { reload_settings: true, .. })));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Machine {
    phase: Phase,
    state: DeviceState,
    last_issued: Sequence,
    outstanding: Option<Sequence>,
    settings_loaded: bool,
    toggle_in_flight: Option<InFlightToggle>,
    queued_target: Option<PowerState>,
}

impl Machine {
    /// Creates a machine in [`Phase::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current displayed state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Sequence of the call whose reply is awaited.
    #[must_use]
    pub fn outstanding(&self) -> Option<Sequence> {
        self.outstanding
    }

    /// Whether a toggle request has been sent and not answered yet.
    #[must_use]
    pub fn toggle_in_flight(&self) -> bool {
        self.toggle_in_flight.is_some()
    }

    /// Target waiting for the in-flight toggle to answer.
    #[must_use]
    pub fn queued_target(&self) -> Option<PowerState> {
        self.queued_target
    }

    /// Render category for the current phase and state.
    #[must_use]
    pub fn render(&self) -> Render {
        Render::of(&self.state, self.phase.shows_pending())
    }

    /// Computes the next machine for `trigger`.
    #[must_use]
    pub fn step(&self, trigger: &Trigger) -> Step {
        match trigger {
            Trigger::UserToggleRequested(target) => match self.toggle_in_flight {
                Some(in_flight) => {
                    let target = target.resolve(self.queued_target.unwrap_or(in_flight.target));
                    tracing::debug!(power = %target, in_flight = %in_flight.seq, "Queueing toggle");
                    let machine = Self {
                        phase: Phase::Pending,
                        state: self.state.into_pending(),
                        outstanding: Some(in_flight.seq),
                        queued_target: Some(target),
                        ..self.clone()
                    };
                    self.finish(machine, None)
                }
                None => self.start_toggle(self, target.resolve(self.state.power())),
            },
            Trigger::RefreshRequested => {
                let (machine, seq) = self.begin_cycle(true);
                self.finish(
                    machine,
                    Some(Effect::FetchStatus {
                        seq,
                        reload_settings: true,
                    }),
                )
            }
            Trigger::AutoRefreshTick => {
                if self.phase == Phase::Pending {
                    return self.unchanged();
                }
                let reload_settings = !self.settings_loaded;
                let (machine, seq) = self.begin_cycle(true);
                self.finish(
                    machine,
                    Some(Effect::FetchStatus {
                        seq,
                        reload_settings,
                    }),
                )
            }
            Trigger::DeviceResponse(delivery) => self.receive(delivery),
        }
    }

    fn receive(&self, delivery: &Delivery) -> Step {
        let mut machine = self.clone();

        if let Some(in_flight) = self.toggle_in_flight.filter(|t| t.seq == delivery.seq) {
            let applied = match delivery.response {
                DeviceResponse::Toggled | DeviceResponse::Status(_) => Some(in_flight.target),
                DeviceResponse::Error(_) => None,
            };
            machine.toggle_in_flight = None;
            if let Some(target) = machine.queued_target.take() {
                if applied == Some(target) {
                    tracing::debug!(power = %target, "Dropping queued toggle, already applied");
                } else {
                    return self.start_toggle(&machine, target);
                }
            }
        }

        self.apply(machine, delivery)
    }

    /// Applies `delivery` on top of `machine`, which may already differ
    /// from `self` in its toggle bookkeeping.
    fn apply(&self, machine: Self, delivery: &Delivery) -> Step {
        if machine.phase != Phase::Pending || machine.outstanding != Some(delivery.seq) {
            tracing::trace!(
                seq = %delivery.seq,
                phase = %machine.phase,
                "Ignoring stale device response"
            );
            return self.finish(machine, None);
        }
        match delivery.response {
            DeviceResponse::Toggled => self.finish(machine, None),
            DeviceResponse::Status(reading) => {
                let machine = Self {
                    phase: Phase::Displaying,
                    state: DeviceState::from_reading(reading),
                    outstanding: None,
                    ..machine
                };
                self.finish(machine, None)
            }
            DeviceResponse::Error(_) => {
                let machine = Self {
                    phase: Phase::NoData,
                    state: machine.state.into_no_data(),
                    outstanding: None,
                    ..machine
                };
                self.finish(machine, None)
            }
        }
    }

    /// Starts a toggle cycle from `from` and reports the step relative to `self`.
    fn start_toggle(&self, from: &Self, target: PowerState) -> Step {
        let (mut machine, seq) = from.begin_cycle(from.settings_loaded);
        machine.toggle_in_flight = Some(InFlightToggle { seq, target });
        self.finish(machine, Some(Effect::Toggle { seq, target }))
    }

    fn begin_cycle(&self, settings_loaded: bool) -> (Self, Sequence) {
        let seq = self.last_issued.next();
        let machine = Self {
            phase: Phase::Pending,
            state: self.state.into_pending(),
            last_issued: seq,
            outstanding: Some(seq),
            settings_loaded,
            ..self.clone()
        };
        (machine, seq)
    }

    fn finish(&self, machine: Self, effect: Option<Effect>) -> Step {
        let changed = machine.phase != self.phase || machine.state != self.state;
        Step {
            machine,
            effect,
            changed,
        }
    }

    fn unchanged(&self) -> Step {
        Step {
            machine: self.clone(),
            effect: None,
            changed: false,
        }
    }
}
