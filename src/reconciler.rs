// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Owner loop tying the state machine to the device client.
//!
//! A [`Reconciler`] owns one [`Machine`], one [`DeviceClient`] and the
//! settings source. Triggers are applied one at a time on the owner, so
//! transitions never run concurrently; network calls run on their own
//! tasks and come back as deliveries.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::client::{DeliveryReceiver, DeviceClient};
use crate::error::{ProtocolError, Result};
use crate::protocol::HttpConfig;
use crate::settings::SettingsSource;
use crate::state::{DeviceState, Effect, Machine, Phase, Render, Trigger};
use crate::subscription::{RenderRegistry, Subscribable, SubscriptionId};
use crate::types::ToggleTarget;

/// Capacity of the trigger channel used by [`ReconcilerHandle`].
const TRIGGER_CHANNEL_CAPACITY: usize = 32;

/// State reconciler for one lamp session.
///
/// # Examples
///
/// ```no_run
/// use lampswitch_lib::{HttpConfig, Reconciler, Settings, StaticSettings, Trigger};
///
/// # async fn example() -> lampswitch_lib::Result<()> {
/// let settings = StaticSettings::new(Settings::new("http://192.168.1.20", "https://home.example.org"));
/// let mut reconciler = Reconciler::new(settings, HttpConfig::new())?;
///
/// reconciler.handle(Trigger::AutoRefreshTick);
/// let phase = reconciler.settle().await;
/// println!("{phase}: {:?}", reconciler.render());
///
/// reconciler.shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Reconciler<S> {
    machine: Machine,
    client: DeviceClient,
    deliveries: DeliveryReceiver,
    settings: S,
    renders: RenderRegistry,
}

impl<S: SettingsSource> Reconciler<S> {
    /// Creates a reconciler in [`Phase::Idle`].
    ///
    /// Settings are read once here to obtain the initial base URL.
    ///
    /// # Errors
    ///
    /// Returns error if the settings cannot be read, the base URL is empty,
    /// or the HTTP client cannot be created.
    pub fn new(settings: S, http: HttpConfig) -> Result<Self> {
        let initial = settings.load()?;
        let (client, deliveries) = DeviceClient::new(http.into_client()?, initial.base_url())?;

        tracing::debug!(base_url = %client.base_url(), "Reconciler created");

        Ok(Self {
            machine: Machine::new(),
            client,
            deliveries,
            settings,
            renders: RenderRegistry::new(),
        })
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    /// Current displayed state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        self.machine.state()
    }

    /// Current render category.
    #[must_use]
    pub fn render(&self) -> Render {
        self.machine.render()
    }

    /// Base URL used for the next call.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Applies one trigger and returns the resulting phase.
    ///
    /// Issues the call the machine asks for and notifies render
    /// subscribers if the phase or state changed.
    ///
    /// # Panics
    ///
    /// Panics if a call must be issued outside a Tokio runtime.
    pub fn handle(&mut self, trigger: Trigger) -> Phase {
        let step = self.machine.step(&trigger);
        self.machine = step.machine;

        if let Some(effect) = step.effect {
            self.perform(effect);
        }

        if step.changed {
            tracing::debug!(phase = %self.machine.phase(), "State changed");
            self.renders
                .dispatch(self.machine.state(), self.machine.phase().shows_pending());
        }

        self.machine.phase()
    }

    /// Waits for the next delivery and applies it.
    ///
    /// Returns `None` once the delivery channel is closed.
    pub async fn next_delivery(&mut self) -> Option<Phase> {
        let delivery = self.deliveries.recv().await?;
        Some(self.handle(delivery.into()))
    }

    /// Applies deliveries until the machine leaves [`Phase::Pending`].
    pub async fn settle(&mut self) -> Phase {
        while self.machine.phase() == Phase::Pending {
            if self.next_delivery().await.is_none() {
                break;
            }
        }
        self.machine.phase()
    }

    /// Runs the owner loop until `triggers` is closed.
    ///
    /// With `auto_refresh` set, an [`Trigger::AutoRefreshTick`] is applied
    /// immediately and then once per period.
    pub async fn run(mut self, mut triggers: mpsc::Receiver<Trigger>, auto_refresh: Option<Duration>) {
        let mut ticker = auto_refresh.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                trigger = triggers.recv() => match trigger {
                    Some(trigger) => {
                        self.handle(trigger);
                    }
                    None => break,
                },
                Some(delivery) = self.deliveries.recv() => {
                    self.handle(delivery.into());
                }
                () = next_tick(&mut ticker) => {
                    self.handle(Trigger::AutoRefreshTick);
                }
            }
        }

        self.shutdown();
    }

    /// Tears the session down.
    ///
    /// Cancels every call in flight and discards anything already queued;
    /// no render is dispatched afterwards.
    pub fn shutdown(&mut self) {
        self.client.cancel_all();
        self.deliveries.close();
        self.renders.clear();
        tracing::debug!("Reconciler shut down");
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::Toggle { seq, target } => self.client.toggle(seq, target),
            Effect::FetchStatus {
                seq,
                reload_settings,
            } => {
                if reload_settings {
                    self.reload_settings();
                }
                self.client.status(seq);
            }
        }
    }

    fn reload_settings(&mut self) {
        match self.settings.load() {
            Ok(settings) => {
                if let Err(e) = self.client.reconfigure(settings.base_url()) {
                    tracing::warn!(error = %e, "Ignoring invalid base URL from settings");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to reload settings, keeping previous base URL");
            }
        }
    }
}

impl<S: SettingsSource + 'static> Reconciler<S> {
    /// Moves the reconciler onto its own task.
    ///
    /// Render subscriptions must be registered before spawning.
    #[must_use]
    pub fn spawn(self, auto_refresh: Option<Duration>) -> ReconcilerHandle {
        let (triggers, rx) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(rx, auto_refresh));
        ReconcilerHandle { triggers, task }
    }
}

impl<S> Subscribable for Reconciler<S> {
    fn on_render<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState, bool) + Send + Sync + 'static,
    {
        self.renders.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.renders.unsubscribe(id)
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Handle to a reconciler running on its own task.
#[derive(Debug)]
pub struct ReconcilerHandle {
    triggers: mpsc::Sender<Trigger>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Sends a trigger to the owner loop.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ChannelClosed` if the loop has stopped.
    pub async fn send(&self, trigger: Trigger) -> Result<()> {
        self.triggers
            .send(trigger)
            .await
            .map_err(|e| ProtocolError::ChannelClosed(e.to_string()).into())
    }

    /// Requests a toggle.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ChannelClosed` if the loop has stopped.
    pub async fn toggle(&self, target: ToggleTarget) -> Result<()> {
        self.send(Trigger::UserToggleRequested(target)).await
    }

    /// Requests a manual refresh.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ChannelClosed` if the loop has stopped.
    pub async fn refresh(&self) -> Result<()> {
        self.send(Trigger::RefreshRequested).await
    }

    /// Injects an auto-refresh tick.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ChannelClosed` if the loop has stopped.
    pub async fn tick(&self) -> Result<()> {
        self.send(Trigger::AutoRefreshTick).await
    }

    /// Stops the loop and waits for it to tear down.
    pub async fn shutdown(self) {
        drop(self.triggers);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Reconciler task ended abnormally");
        }
    }
}
