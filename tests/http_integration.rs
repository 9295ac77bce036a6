// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the HTTP client and reconciler using wiremock.

use std::sync::Arc;
use std::time::Duration;

use lampswitch_lib::client::DeviceClient;
use lampswitch_lib::state::{Delivery, Sequence};
use lampswitch_lib::{
    DeviceResponse, ErrorKind, HttpClient, HttpConfig, Phase, PowerState, Reconciler, Render,
    Settings, StaticSettings, Subscribable, ToggleTarget, Trigger,
};
use parking_lot::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

fn status_body(state: u8, inside: f64, outside: f64) -> serde_json::Value {
    serde_json::json!({
        "lamps": [
            {"id": "1", "name": "kitchen", "state": 0},
            {"id": "2", "name": "living room", "state": state}
        ],
        "heating": [{"current_temp": inside, "ext_temp": outside}]
    })
}

async fn mount_status(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/status.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn reconciler_for(server: &MockServer) -> Reconciler<StaticSettings> {
    let settings = StaticSettings::new(Settings::new(server.uri(), server.uri()));
    Reconciler::new(settings, HttpConfig::new().with_timeout(WAIT)).unwrap()
}

async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

async fn settle(reconciler: &mut Reconciler<StaticSettings>) -> Phase {
    tokio::time::timeout(WAIT, reconciler.settle())
        .await
        .expect("reconciler did not settle")
}

// ============================================================================
// DeviceClient Tests
// ============================================================================

mod device_client {
    use super::*;

    async fn next(rx: &mut lampswitch_lib::client::DeliveryReceiver) -> Delivery {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("no delivery")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn status_delivers_reading() {
        let server = MockServer::start().await;
        mount_status(&server, status_body(1, 21.5, 5.0)).await;

        let (mut client, mut rx) = DeviceClient::new(HttpClient::new().unwrap(), &server.uri()).unwrap();
        client.status(Sequence::new(1));

        let delivery = next(&mut rx).await;
        assert_eq!(delivery.seq, Sequence::new(1));
        let DeviceResponse::Status(reading) = delivery.response else {
            panic!("expected status, got {:?}", delivery.response);
        };
        assert_eq!(reading.power, PowerState::On);
        assert_eq!(reading.inside_temp, Some(21.5));
        assert_eq!(reading.outside_temp, Some(5.0));
    }

    #[tokio::test]
    async fn toggle_chains_status_with_same_sequence() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cgi-bin/off.py"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Lamp off"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body(0, 20.0, 3.0)))
            .expect(1)
            .mount(&server)
            .await;

        let (mut client, mut rx) = DeviceClient::new(HttpClient::new().unwrap(), &server.uri()).unwrap();
        client.toggle(Sequence::new(4), PowerState::Off);

        let acked = next(&mut rx).await;
        assert_eq!(acked, Delivery::new(Sequence::new(4), DeviceResponse::Toggled));

        let status = next(&mut rx).await;
        assert_eq!(status.seq, Sequence::new(4));
        assert!(matches!(
            status.response,
            DeviceResponse::Status(reading) if reading.power == PowerState::Off
        ));
    }

    #[tokio::test]
    async fn failed_toggle_does_not_chain_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cgi-bin/on.py"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body(1, 0.0, 0.0)))
            .expect(0)
            .mount(&server)
            .await;

        let (mut client, mut rx) = DeviceClient::new(HttpClient::new().unwrap(), &server.uri()).unwrap();
        client.toggle(Sequence::new(1), PowerState::On);

        let delivery = next(&mut rx).await;
        assert_eq!(delivery.response, DeviceResponse::Error(ErrorKind::Transport));
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>It works!</html>"))
            .mount(&server)
            .await;

        let (mut client, mut rx) = DeviceClient::new(HttpClient::new().unwrap(), &server.uri()).unwrap();
        client.status(Sequence::new(1));

        let delivery = next(&mut rx).await;
        assert_eq!(
            delivery.response,
            DeviceResponse::Error(ErrorKind::MalformedResponse)
        );
    }

    #[tokio::test]
    async fn in_flight_call_keeps_its_url_after_reconfigure() {
        let old = MockServer::start().await;
        let new = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(status_body(1, 0.0, 0.0))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&old)
            .await;
        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body(0, 0.0, 0.0)))
            .expect(1)
            .mount(&new)
            .await;

        let (mut client, mut rx) = DeviceClient::new(HttpClient::new().unwrap(), &old.uri()).unwrap();
        client.status(Sequence::new(1));
        client.reconfigure(&new.uri()).unwrap();
        client.status(Sequence::new(2));

        let first = next(&mut rx).await;
        let second = next(&mut rx).await;
        assert_eq!(first.seq, Sequence::new(2));
        assert_eq!(second.seq, Sequence::new(1));
    }

    #[tokio::test]
    async fn cancel_all_silences_slow_calls() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(status_body(1, 0.0, 0.0))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let (mut client, mut rx) = DeviceClient::new(HttpClient::new().unwrap(), &server.uri()).unwrap();
        client.status(Sequence::new(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.cancel_all();

        let outcome = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(outcome.is_err(), "cancelled call must not deliver");
    }
}

// ============================================================================
// Reconciler Tests
// ============================================================================

mod reconciler {
    use super::*;

    #[tokio::test]
    async fn tick_from_idle_displays_status() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            serde_json::json!({
                "lamps": [{"name": "living room", "state": 1}],
                "heating": [{"current_temp": 21.5, "ext_temp": 5.0}]
            }),
        )
        .await;

        let mut reconciler = reconciler_for(&server);
        assert_eq!(reconciler.handle(Trigger::AutoRefreshTick), Phase::Pending);
        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);

        let state = reconciler.state();
        assert_eq!(state.power(), PowerState::On);
        assert_eq!(state.inside_temp(), Some(21.5));
        assert_eq!(state.outside_temp(), Some(5.0));
        assert!(state.data_available());
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn toggle_on_from_displaying_off() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body(0, 20.0, 4.0)))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let mut reconciler = reconciler_for(&server);
        reconciler.handle(Trigger::AutoRefreshTick);
        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);
        assert_eq!(reconciler.state().power(), PowerState::Off);

        Mock::given(method("GET"))
            .and(path("/cgi-bin/on.py"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        mount_status(&server, status_body(1, 20.0, 4.0)).await;

        let target = ToggleTarget::Set(PowerState::On);
        assert_eq!(
            reconciler.handle(Trigger::UserToggleRequested(target)),
            Phase::Pending
        );
        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);
        assert_eq!(reconciler.state().power(), PowerState::On);
    }

    #[tokio::test]
    async fn error_then_refresh_recovers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_status(&server, status_body(1, 19.0, 2.0)).await;

        let mut reconciler = reconciler_for(&server);
        reconciler.handle(Trigger::AutoRefreshTick);
        assert_eq!(settle(&mut reconciler).await, Phase::NoData);
        assert_eq!(reconciler.render(), Render::NoData);
        assert!(!reconciler.state().data_available());

        reconciler.handle(Trigger::RefreshRequested);
        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);
        assert_eq!(reconciler.state().power(), PowerState::On);
    }

    #[tokio::test]
    async fn absent_lamp_displays_off() {
        let server = MockServer::start().await;
        mount_status(
            &server,
            serde_json::json!({"lamps": [{"name": "bedroom", "state": 1}]}),
        )
        .await;

        let mut reconciler = reconciler_for(&server);
        reconciler.handle(Trigger::AutoRefreshTick);
        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);
        assert_eq!(reconciler.state().power(), PowerState::Off);
        assert!(reconciler.state().data_available());
        assert_eq!(reconciler.state().inside_temp(), None);
    }

    #[tokio::test]
    async fn repeated_ticks_with_same_reply_are_idempotent() {
        let server = MockServer::start().await;
        mount_status(&server, status_body(1, 18.0, -1.0)).await;

        let mut reconciler = reconciler_for(&server);
        reconciler.handle(Trigger::AutoRefreshTick);
        settle(&mut reconciler).await;
        let first = *reconciler.state();

        reconciler.handle(Trigger::AutoRefreshTick);
        settle(&mut reconciler).await;
        assert_eq!(*reconciler.state(), first);
        assert_eq!(reconciler.phase(), Phase::Displaying);
    }

    #[tokio::test]
    async fn superseded_slow_reply_is_discarded() {
        let slow = MockServer::start().await;
        let fast = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(status_body(1, 0.0, 0.0))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&slow)
            .await;
        mount_status(&fast, status_body(0, 0.0, 0.0)).await;

        let settings = StaticSettings::new(Settings::new(slow.uri(), fast.uri()));
        let mut reconciler = Reconciler::new(settings.clone(), HttpConfig::new()).unwrap();

        reconciler.handle(Trigger::AutoRefreshTick);
        settings.set_internal_network(false);
        reconciler.handle(Trigger::RefreshRequested);

        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);
        assert_eq!(reconciler.state().power(), PowerState::Off);

        // The slow reply to the first call still arrives and must be dropped.
        let late = tokio::time::timeout(WAIT, reconciler.next_delivery())
            .await
            .expect("late reply did not arrive");
        assert_eq!(late, Some(Phase::Displaying));
        assert_eq!(reconciler.state().power(), PowerState::Off);
    }

    #[tokio::test]
    async fn renders_once_per_transition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/on.py"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        mount_status(&server, status_body(1, 22.0, 7.0)).await;

        let mut reconciler = reconciler_for(&server);
        let renders = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&renders);
        reconciler.on_render(move |state, pending| sink.lock().push(Render::of(state, pending)));

        reconciler.handle(Trigger::UserToggleRequested(ToggleTarget::Set(PowerState::On)));
        settle(&mut reconciler).await;

        let renders = renders.lock().clone();
        assert_eq!(
            renders,
            vec![
                Render::Loading,
                Render::Power {
                    power: PowerState::On,
                    inside_temp: Some(22.0),
                    outside_temp: Some(7.0),
                },
            ]
        );
    }

    #[tokio::test]
    async fn spawned_loop_auto_refreshes() {
        let server = MockServer::start().await;
        mount_status(&server, status_body(1, 21.0, 6.0)).await;

        let reconciler = reconciler_for(&server);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        reconciler.on_render(move |state, pending| {
            let _ = tx.send(Render::of(state, pending));
        });

        let handle = reconciler.spawn(Some(Duration::from_secs(60)));

        let mut shown = None;
        while let Ok(Some(render)) = tokio::time::timeout(WAIT, rx.recv()).await {
            if let Render::Power { power, .. } = render {
                shown = Some(power);
                break;
            }
        }
        assert_eq!(shown, Some(PowerState::On));

        handle.refresh().await.unwrap();
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn toggle_requested_during_toggle_waits_for_it() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cgi-bin/on.py"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/off.py"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        mount_status(&server, status_body(0, 20.0, 4.0)).await;

        let mut reconciler = reconciler_for(&server);
        reconciler.handle(Trigger::UserToggleRequested(ToggleTarget::Set(PowerState::On)));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(
            reconciler.handle(Trigger::UserToggleRequested(ToggleTarget::Set(PowerState::Off))),
            Phase::Pending
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(request_paths(&server).await, vec!["/cgi-bin/on.py"]);

        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);
        assert_eq!(reconciler.state().power(), PowerState::Off);

        let paths = request_paths(&server).await;
        let off = paths.iter().position(|p| p == "/cgi-bin/off.py").unwrap();
        assert_eq!(paths[0], "/cgi-bin/on.py");
        assert!(off > 0);
        assert_eq!(paths.last().map(String::as_str), Some("/status.php"));
    }

    #[tokio::test]
    async fn first_tick_uses_settings_changed_after_creation() {
        let old = MockServer::start().await;
        let new = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body(0, 0.0, 0.0)))
            .expect(0)
            .mount(&old)
            .await;
        Mock::given(method("GET"))
            .and(path("/status.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_body(1, 0.0, 0.0)))
            .expect(2)
            .mount(&new)
            .await;

        let settings = StaticSettings::new(Settings::new(old.uri(), new.uri()));
        let mut reconciler = Reconciler::new(settings.clone(), HttpConfig::new()).unwrap();
        assert_eq!(reconciler.base_url(), old.uri());

        settings.set_internal_network(false);
        reconciler.handle(Trigger::AutoRefreshTick);
        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);
        assert_eq!(reconciler.state().power(), PowerState::On);

        // Later ticks keep the URL read on the first one.
        settings.set_internal_network(true);
        reconciler.handle(Trigger::AutoRefreshTick);
        assert_eq!(settle(&mut reconciler).await, Phase::Displaying);
        assert_eq!(reconciler.base_url(), new.uri());
    }
}
