// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render subscriptions for the presentation layer.
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`RenderRegistry`] - Registry that stores callbacks and dispatches renders
//! - [`Subscribable`] - Trait for types that publish renders

mod callback;
mod subscribable;

pub use callback::{RenderRegistry, SubscriptionId};
pub use subscribable::Subscribable;
