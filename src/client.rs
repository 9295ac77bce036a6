// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device client issuing toggle and status calls.
//!
//! Every call runs on its own task and reports through a delivery channel
//! owned by the caller, so nothing here blocks. A call delivers exactly one
//! terminal [`DeviceResponse`]: `Status` or `Error`. A successful toggle
//! additionally delivers `Toggled` before the status fetch it chains.
//!
//! # Examples
//!
//! ```no_run
//! use lampswitch_lib::client::DeviceClient;
//! use lampswitch_lib::protocol::HttpClient;
//! use lampswitch_lib::state::Sequence;
//! use lampswitch_lib::types::PowerState;
//!
//! # async fn example() -> lampswitch_lib::Result<()> {
//! let (mut client, mut deliveries) = DeviceClient::new(HttpClient::new()?, "192.168.1.20")?;
//!
//! client.toggle(Sequence::new(1), PowerState::On);
//! while let Some(delivery) = deliveries.recv().await {
//!     println!("{delivery:?}");
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::Result;
use crate::protocol::{Endpoint, HttpClient, normalize_base_url};
use crate::response::{StatusReading, StatusResponse};
use crate::state::{Delivery, DeviceResponse, Sequence};
use crate::types::PowerState;

/// Capacity of the delivery channel.
const DELIVERY_CHANNEL_CAPACITY: usize = 16;

/// A delivery stamped with the cancellation epoch its call was issued in.
type Stamped = (u64, Delivery);

/// Receiving end of a client's deliveries.
///
/// Deliveries from calls issued before the latest
/// [`DeviceClient::cancel_all`] are discarded here, even if they were
/// already queued when the cancel happened.
#[derive(Debug)]
pub struct DeliveryReceiver {
    rx: mpsc::Receiver<Stamped>,
    epoch: Arc<AtomicU64>,
}

impl DeliveryReceiver {
    /// Receives the next delivery of a call that was not cancelled.
    ///
    /// Returns `None` once the channel is closed and drained. Cancel safe.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            let (epoch, delivery) = self.rx.recv().await?;
            if epoch == self.epoch.load(Ordering::Acquire) {
                return Some(delivery);
            }
            tracing::trace!(seq = %delivery.seq, "Discarding delivery of cancelled call");
        }
    }

    /// Closes the channel. Calls still running can no longer deliver.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Client for the lamp server.
///
/// Owned by exactly one reconciler. Calls issued before
/// [`DeviceClient::reconfigure`] keep the URL they were issued with.
#[derive(Debug)]
pub struct DeviceClient {
    http: HttpClient,
    base_url: String,
    tx: mpsc::Sender<Stamped>,
    tasks: JoinSet<()>,
    epoch: Arc<AtomicU64>,
}

impl DeviceClient {
    /// Creates a client and the channel its results arrive on.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if `base_url` is empty.
    pub fn new(http: HttpClient, base_url: &str) -> Result<(Self, DeliveryReceiver)> {
        let base_url = normalize_base_url(base_url)?;
        let (tx, rx) = mpsc::channel(DELIVERY_CHANNEL_CAPACITY);
        let epoch = Arc::new(AtomicU64::new(0));

        let client = Self {
            http,
            base_url,
            tx,
            tasks: JoinSet::new(),
            epoch: Arc::clone(&epoch),
        };
        Ok((client, DeliveryReceiver { rx, epoch }))
    }

    /// Returns the base URL used for new calls.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the number of calls that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Changes the base URL for subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if `base_url` is empty; the
    /// previous URL stays in effect.
    pub fn reconfigure(&mut self, base_url: &str) -> Result<()> {
        let base_url = normalize_base_url(base_url)?;
        if base_url != self.base_url {
            tracing::info!(from = %self.base_url, to = %base_url, "Base URL changed");
            self.base_url = base_url;
        }
        Ok(())
    }

    /// Switches the lamp to `target`, then fetches the status.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn toggle(&mut self, seq: Sequence, target: PowerState) {
        let call = self.call(seq);
        tracing::debug!(seq = %seq, power = %target, "Issuing toggle");
        self.spawn(async move {
            match call.http.get(&call.base_url, Endpoint::toggle(target)).await {
                Ok(_) => {
                    if call.deliver(DeviceResponse::Toggled).await {
                        call.fetch_and_deliver_status().await;
                    }
                }
                Err(e) => {
                    tracing::warn!(seq = %call.seq, error = %e, "Toggle request failed");
                    call.deliver(DeviceResponse::Error(crate::Error::from(e).kind()))
                        .await;
                }
            }
        });
    }

    /// Fetches the current status.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn status(&mut self, seq: Sequence) {
        let call = self.call(seq);
        tracing::debug!(seq = %seq, "Issuing status fetch");
        self.spawn(async move {
            call.fetch_and_deliver_status().await;
        });
    }

    /// Cancels every call in flight.
    ///
    /// No delivery from a call issued before this point is received
    /// afterwards, including ones already queued in the channel.
    pub fn cancel_all(&mut self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if !self.tasks.is_empty() {
            tracing::debug!(count = self.tasks.len(), "Cancelling in-flight calls");
        }
        self.tasks.abort_all();
    }

    fn call(&self, seq: Sequence) -> Call {
        Call {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            seq,
            tx: self.tx.clone(),
            epoch: Arc::clone(&self.epoch),
            issued_epoch: self.epoch.load(Ordering::Acquire),
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        while self.tasks.try_join_next().is_some() {}
        self.tasks.spawn(task);
    }
}

impl Drop for DeviceClient {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Everything a spawned call needs, captured at issue time.
struct Call {
    http: HttpClient,
    base_url: String,
    seq: Sequence,
    tx: mpsc::Sender<Stamped>,
    epoch: Arc<AtomicU64>,
    issued_epoch: u64,
}

impl Call {
    /// Sends a response unless the call was already cancelled. Returns
    /// `false` if nothing was sent.
    ///
    /// The receiver checks the epoch again, so a cancel racing this send
    /// still suppresses the delivery.
    async fn deliver(&self, response: DeviceResponse) -> bool {
        if self.epoch.load(Ordering::Acquire) != self.issued_epoch {
            tracing::trace!(seq = %self.seq, "Dropping response of cancelled call");
            return false;
        }
        self.tx
            .send((self.issued_epoch, Delivery::new(self.seq, response)))
            .await
            .is_ok()
    }

    async fn fetch_and_deliver_status(&self) {
        let response = match fetch_status(&self.http, &self.base_url).await {
            Ok(reading) => DeviceResponse::Status(reading),
            Err(e) => {
                tracing::warn!(seq = %self.seq, error = %e, "Status fetch failed");
                DeviceResponse::Error(e.kind())
            }
        };
        self.deliver(response).await;
    }
}

/// Fetches and parses `status.php`.
///
/// # Errors
///
/// Returns `Error::Protocol` on transport failure and `Error::Parse` if the
/// body is malformed.
pub async fn fetch_status(http: &HttpClient, base_url: &str) -> Result<StatusReading> {
    let body = http.get(base_url, Endpoint::Status).await?;
    let reading = StatusResponse::parse(&body)?.reading()?;
    Ok(reading)
}
