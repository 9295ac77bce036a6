// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command line front end for the lamp.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lampswitch_lib::{
    DeviceState, FileSettings, HttpConfig, Phase, PowerState, Reconciler, Render, Settings,
    SettingsSource, StaticSettings, Subscribable, ToggleTarget, Trigger,
};
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Print the current lamp state.
    Status,
    /// Switch the lamp on.
    On,
    /// Switch the lamp off.
    Off,
    /// Switch the lamp to the opposite of its current state.
    Toggle,
    /// Keep refreshing and print every change.
    Watch {
        /// Seconds between refreshes.
        #[arg(long, default_value = "30")]
        interval: u64,
    },
}

#[derive(Parser, Debug)]
#[command(version, about = "Switch the living room lamp")]
struct Params {
    /// JSON settings file, re-read on every refresh.
    #[arg(long, conflicts_with_all = ["internal_url", "external_url"])]
    settings: Option<PathBuf>,
    /// Base URL on the home network.
    #[arg(long)]
    internal_url: Option<String>,
    /// Base URL from outside.
    #[arg(long)]
    external_url: Option<String>,
    /// Use the external URL.
    #[arg(long)]
    external: bool,
    /// Request timeout in seconds.
    #[arg(long, default_value = "10")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

impl Params {
    fn settings_source(&self) -> Arc<dyn SettingsSource> {
        if let Some(path) = &self.settings {
            return Arc::new(FileSettings::new(path));
        }

        let defaults = Settings::default();
        let settings = Settings::new(
            self.internal_url.clone().unwrap_or(defaults.internal_url),
            self.external_url.clone().unwrap_or(defaults.external_url),
        )
        .with_internal_network(!self.external);
        Arc::new(StaticSettings::new(settings))
    }
}

fn describe(state: &DeviceState, pending: bool) -> String {
    match Render::of(state, pending) {
        Render::Loading => "…".to_string(),
        Render::NoData => "no data".to_string(),
        Render::Power {
            power,
            inside_temp,
            outside_temp,
        } => {
            let mut line = power.to_string();
            if let Some(inside) = inside_temp {
                line.push_str(&format!("  inside {inside:.1}°C"));
            }
            if let Some(outside) = outside_temp {
                line.push_str(&format!("  outside {outside:.1}°C"));
            }
            line
        }
    }
}

async fn one_shot(
    mut reconciler: Reconciler<Arc<dyn SettingsSource>>,
    trigger: Trigger,
) -> ExitCode {
    reconciler.handle(trigger);
    let phase = reconciler.settle().await;
    println!("{}", describe(reconciler.state(), phase.shows_pending()));
    reconciler.shutdown();

    if phase == Phase::Displaying {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn watch(reconciler: Reconciler<Arc<dyn SettingsSource>>, interval: Duration) -> ExitCode {
    reconciler.on_render(|state, pending| {
        if !pending {
            println!("{}", describe(state, pending));
        }
    });

    let handle = reconciler.spawn(Some(interval));
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }
    handle.shutdown().await;
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let params = Params::parse();
    let http = HttpConfig::new().with_timeout(Duration::from_secs(params.timeout));

    let reconciler = match Reconciler::new(params.settings_source(), http) {
        Ok(reconciler) => reconciler,
        Err(e) => {
            eprintln!("lampswitch: {e}");
            return ExitCode::FAILURE;
        }
    };

    match params.command {
        Command::Status => one_shot(reconciler, Trigger::RefreshRequested).await,
        Command::On => {
            let target = ToggleTarget::Set(PowerState::On);
            one_shot(reconciler, Trigger::UserToggleRequested(target)).await
        }
        Command::Off => {
            let target = ToggleTarget::Set(PowerState::Off);
            one_shot(reconciler, Trigger::UserToggleRequested(target)).await
        }
        Command::Toggle => toggle(reconciler).await,
        Command::Watch { interval } => watch(reconciler, Duration::from_secs(interval)).await,
    }
}

/// Inverting needs the current state, so fetch it first.
async fn toggle(mut reconciler: Reconciler<Arc<dyn SettingsSource>>) -> ExitCode {
    reconciler.handle(Trigger::AutoRefreshTick);
    if reconciler.settle().await != Phase::Displaying {
        println!("{}", describe(reconciler.state(), false));
        reconciler.shutdown();
        return ExitCode::FAILURE;
    }
    one_shot(reconciler, Trigger::UserToggleRequested(ToggleTarget::Invert)).await
}
