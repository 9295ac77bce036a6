// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lampswitch Lib - toggle a remote lamp over HTTP and keep its displayed
//! state coherent.
//!
//! The lamp server exposes `cgi-bin/on.py`, `cgi-bin/off.py` and
//! `status.php` under a configurable base URL. This library turns a stream
//! of triggers (user toggles, manual refreshes, auto-refresh ticks and the
//! replies to its own calls) into one displayed state: loading, on/off with
//! the two temperature readings, or no data.
//!
//! # Components
//!
//! - [`client::DeviceClient`]: issues the HTTP calls on background tasks and
//!   delivers one terminal result per call
//! - [`state::Machine`]: pure transition function deciding which call to
//!   issue next and what to display
//! - [`Reconciler`]: owner loop applying triggers one at a time and
//!   publishing renders
//!
//! # Quick Start
//!
//! ```no_run
//! use lampswitch_lib::{HttpConfig, Reconciler, Settings, StaticSettings, ToggleTarget, Trigger};
//! use lampswitch_lib::types::PowerState;
//! use lampswitch_lib::subscription::Subscribable;
//!
//! #[tokio::main]
//! async fn main() -> lampswitch_lib::Result<()> {
//!     let settings = StaticSettings::new(Settings::new("http://192.168.1.20", "https://home.example.org"));
//!     let mut reconciler = Reconciler::new(settings, HttpConfig::new())?;
//!
//!     reconciler.on_render(|state, pending| {
//!         if !pending {
//!             println!("lamp: {} (data: {})", state.power(), state.data_available());
//!         }
//!     });
//!
//!     reconciler.handle(Trigger::UserToggleRequested(ToggleTarget::Set(PowerState::On)));
//!     reconciler.settle().await;
//!
//!     reconciler.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Auto Refresh
//!
//! ```no_run
//! use std::time::Duration;
//! use lampswitch_lib::{FileSettings, HttpConfig, Reconciler, ToggleTarget};
//!
//! #[tokio::main]
//! async fn main() -> lampswitch_lib::Result<()> {
//!     let reconciler = Reconciler::new(FileSettings::new("lampswitch.json"), HttpConfig::new())?;
//!     let handle = reconciler.spawn(Some(Duration::from_secs(30)));
//!
//!     handle.toggle(ToggleTarget::Invert).await?;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
mod reconciler;
pub mod response;
pub mod settings;
pub mod state;
pub mod subscription;
pub mod types;

pub use client::DeviceClient;
pub use error::{Error, ErrorKind, ParseError, ProtocolError, Result, SettingsError};
pub use protocol::{HttpClient, HttpConfig};
pub use reconciler::{Reconciler, ReconcilerHandle};
pub use response::{StatusReading, StatusResponse};
pub use settings::{FileSettings, Settings, SettingsSource, StaticSettings};
pub use state::{DeviceResponse, DeviceState, Machine, Phase, Render, Trigger};
pub use subscription::{RenderRegistry, Subscribable, SubscriptionId};
pub use types::{PowerState, ToggleTarget};
