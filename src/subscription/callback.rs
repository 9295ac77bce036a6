// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for render subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`RenderRegistry`] - Registry for storing and dispatching render callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::DeviceState;

/// Unique identifier for a subscription.
///
/// IDs are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Render callback: the displayed state and whether the loading affordance
/// should be shown instead of it.
type RenderCallback = Arc<dyn Fn(&DeviceState, bool) + Send + Sync>;

/// Registry for render callbacks.
///
/// Uses `parking_lot::RwLock` so it can be shared between the owner loop
/// and the tasks that subscribe.
pub struct RenderRegistry {
    next_id: AtomicU64,
    callbacks: RwLock<HashMap<SubscriptionId, RenderCallback>>,
}

impl RenderRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a render callback.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState, bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.callbacks.write().clear();
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    /// Invokes every callback once.
    ///
    /// Callbacks are called synchronously in an arbitrary order.
    pub fn dispatch(&self, state: &DeviceState, pending: bool) {
        let callbacks = self.callbacks.read();
        for callback in callbacks.values() {
            callback(state, pending);
        }
    }
}

impl Default for RenderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRegistry")
            .field("callbacks", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn subscription_ids_are_unique() {
        let registry = RenderRegistry::new();
        let a = registry.subscribe(|_, _| {});
        let b = registry.subscribe(|_, _| {});
        assert_ne!(a, b);
        assert_eq!(a.to_string(), format!("Sub({})", a.value()));
    }

    #[test]
    fn dispatch_reaches_every_callback() {
        let registry = RenderRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            registry.subscribe(move |_, pending| {
                assert!(pending);
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        registry.dispatch(&DeviceState::new(), true);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let registry = RenderRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = registry.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.dispatch(&DeviceState::new(), false);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let registry = RenderRegistry::new();
        registry.subscribe(|_, _| {});
        registry.subscribe(|_, _| {});
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
    }
}
