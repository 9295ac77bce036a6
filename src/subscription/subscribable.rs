// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that publish renders.

use crate::state::DeviceState;
use crate::subscription::SubscriptionId;

/// Trait for types that a presentation layer can subscribe to.
///
/// # Examples
///
/// ```no_run
/// use lampswitch_lib::{HttpConfig, Reconciler, Settings, StaticSettings};
/// use lampswitch_lib::subscription::Subscribable;
///
/// # fn example() -> lampswitch_lib::Result<()> {
/// let reconciler = Reconciler::new(StaticSettings::new(Settings::default()), HttpConfig::new())?;
///
/// let sub_id = reconciler.on_render(|state, pending| {
///     if pending {
///         println!("...");
///     } else {
///         println!("lamp is {}", state.power());
///     }
/// });
///
/// reconciler.unsubscribe(sub_id);
/// # Ok(())
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to renders.
    ///
    /// The callback is invoked once per state transition with the displayed
    /// state and whether the loading affordance should be shown.
    fn on_render<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState, bool) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
