//! Connection manager and orchestrator behavior with a scripted transport.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        mpsc::Sender,
    },
    time::{Duration, Instant},
};

use serde_json::{Value, json};

use netstudio::config::DashboardConfig;
use netstudio::stream::{
    ConnectionManager, ConnectionState, ReconnectPolicy, StreamConfig, StreamOrchestrator,
    TransportError, TransportEvent, TransportFactory, TransportHandle, TransportKind,
    TransportTarget,
};

#[derive(Default)]
struct FakeInner {
    /// Scripted outcome per connect call; true constructs a transport.
    script: VecDeque<bool>,
    /// Every target a connect was attempted for, in order.
    connects: Vec<TransportTarget>,
    /// Event senders of successfully constructed transports, in order.
    senders: Vec<Sender<TransportEvent>>,
}

/// Transport factory whose outcomes are scripted and whose live transports
/// are driven by pushing events through the captured senders.
#[derive(Clone, Default)]
struct FakeFactory {
    inner: Arc<Mutex<FakeInner>>,
}

impl FakeFactory {
    fn script(&self, outcomes: &[bool]) {
        self.inner.lock().unwrap().script.extend(outcomes.iter().copied());
    }

    fn connect_count(&self) -> usize {
        self.inner.lock().unwrap().connects.len()
    }

    fn connected_kinds(&self) -> Vec<TransportKind> {
        self.inner
            .lock()
            .unwrap()
            .connects
            .iter()
            .map(|target| target.kind)
            .collect()
    }

    fn send(&self, transport_index: usize, event: TransportEvent) {
        let sender = self.inner.lock().unwrap().senders[transport_index].clone();
        sender.send(event).unwrap();
    }
}

struct FakeHandle;

impl TransportHandle for FakeHandle {
    fn kind(&self) -> TransportKind {
        TransportKind::Push
    }

    fn close(&mut self) {}
}

impl TransportFactory for FakeFactory {
    fn connect(
        &self,
        target: &TransportTarget,
        events: Sender<TransportEvent>,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connects.push(target.clone());
        let ok = inner.script.pop_front().unwrap_or(true);
        if ok {
            // Real transports report open as soon as construction succeeds.
            let _ = events.send(TransportEvent::Opened);
            inner.senders.push(events);
            Ok(Box::new(FakeHandle))
        } else {
            Err(TransportError::Push("scripted failure".to_string()))
        }
    }
}

fn target(kind: TransportKind, url: &str) -> TransportTarget {
    TransportTarget {
        kind,
        url: url.to_string(),
    }
}

fn manager(targets: Vec<TransportTarget>, auto_reconnect: bool) -> ConnectionManager {
    ConnectionManager::new(
        "metrics",
        StreamConfig {
            targets,
            auto_reconnect,
        },
        ReconnectPolicy::with_jitter(|_| 0),
    )
}

fn drop_payload(_: &Value) {}

#[test]
fn fallback_socket_opens_when_push_construction_fails() {
    let factory = FakeFactory::default();
    factory.script(&[false, true]);
    let mut manager = manager(
        vec![
            target(TransportKind::Push, "http://host/train/stream"),
            target(TransportKind::Socket, "ws://host/train/ws"),
        ],
        true,
    );

    let now = Instant::now();
    manager.open(&factory, now);
    assert_eq!(manager.state(), ConnectionState::Connecting);
    assert_eq!(
        factory.connected_kinds(),
        vec![TransportKind::Push, TransportKind::Socket]
    );
    assert_eq!(manager.active_transport(), Some(TransportKind::Socket));

    manager.poll(&factory, now, &mut drop_payload);
    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(manager.attempt(), 0);
    assert!(manager.status().contains("WS connected"));
}

#[test]
fn consecutive_failures_schedule_strictly_increasing_base_delays() {
    let factory = FakeFactory::default();
    factory.script(&[false, false, false]);
    let mut manager = manager(
        vec![target(TransportKind::Push, "http://host/train/stream")],
        true,
    );

    let t0 = Instant::now();
    manager.open(&factory, t0);
    assert_eq!(manager.state(), ConnectionState::Errored);
    let first = manager.reconnect_deadline().unwrap();
    assert_eq!(first - t0, Duration::from_millis(1000));

    manager.poll(&factory, first, &mut drop_payload);
    let second = manager.reconnect_deadline().unwrap();
    assert_eq!(second - first, Duration::from_millis(2000));

    manager.poll(&factory, second, &mut drop_payload);
    let third = manager.reconnect_deadline().unwrap();
    assert_eq!(third - second, Duration::from_millis(4000));

    assert_eq!(factory.connect_count(), 3);
    assert_eq!(manager.attempt(), 3);
}

#[test]
fn stop_cancels_a_pending_reconnect() {
    let factory = FakeFactory::default();
    factory.script(&[false]);
    let mut manager = manager(
        vec![target(TransportKind::Push, "http://host/train/stream")],
        true,
    );

    let t0 = Instant::now();
    manager.open(&factory, t0);
    assert!(manager.reconnect_deadline().is_some());

    manager.stop();
    assert_eq!(manager.state(), ConnectionState::Idle);
    assert_eq!(manager.attempt(), 0);
    assert!(manager.reconnect_deadline().is_none());

    // Fast-forward well past the old deadline: nothing may reconnect.
    manager.poll(&factory, t0 + Duration::from_secs(60), &mut drop_payload);
    assert_eq!(factory.connect_count(), 1);
    assert_eq!(manager.state(), ConnectionState::Idle);

    // stop is idempotent from any state.
    manager.stop();
    assert_eq!(manager.state(), ConnectionState::Idle);
}

#[test]
fn disabling_auto_reconnect_cancels_timer_without_retroactive_resume() {
    let factory = FakeFactory::default();
    factory.script(&[false]);
    let mut manager = manager(
        vec![target(TransportKind::Push, "http://host/train/stream")],
        true,
    );

    let t0 = Instant::now();
    manager.open(&factory, t0);
    assert!(manager.reconnect_deadline().is_some());

    manager.set_auto_reconnect(false);
    assert!(manager.reconnect_deadline().is_none());

    // Re-enabling does not resurrect the cancelled timer.
    manager.set_auto_reconnect(true);
    assert!(manager.reconnect_deadline().is_none());
    manager.poll(&factory, t0 + Duration::from_secs(60), &mut drop_payload);
    assert_eq!(factory.connect_count(), 1);
}

#[test]
fn messages_decode_while_open_and_bad_payloads_drop_silently() {
    let factory = FakeFactory::default();
    let mut manager = manager(
        vec![target(TransportKind::Push, "http://host/train/stream")],
        true,
    );

    let now = Instant::now();
    manager.open(&factory, now);
    factory.send(0, TransportEvent::Message(r#"{"step":1,"loss":0.5}"#.to_string()));
    factory.send(0, TransportEvent::Message("not json".to_string()));
    factory.send(0, TransportEvent::Message(r#"{"step":2,"loss":0.4}"#.to_string()));

    let mut decoded = Vec::new();
    manager.poll(&factory, now, &mut |value| decoded.push(value.clone()));

    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0]["step"], json!(1));
    assert_eq!(manager.state(), ConnectionState::Open);
}

#[test]
fn unsolicited_close_takes_the_reconnect_path() {
    let factory = FakeFactory::default();
    let mut manager = manager(
        vec![target(TransportKind::Push, "http://host/train/stream")],
        true,
    );

    let now = Instant::now();
    manager.open(&factory, now);
    manager.poll(&factory, now, &mut drop_payload);
    assert_eq!(manager.state(), ConnectionState::Open);

    factory.send(0, TransportEvent::Closed);
    manager.poll(&factory, now, &mut drop_payload);
    assert_eq!(manager.state(), ConnectionState::Errored);
    assert_eq!(
        manager.reconnect_deadline(),
        Some(now + Duration::from_millis(1000))
    );
    assert!(manager.status().contains("reconnect in 1000ms (attempt 1)"));
}

#[test]
fn reopen_after_recovery_resets_the_attempt_counter() {
    let factory = FakeFactory::default();
    factory.script(&[false, true]);
    let mut manager = manager(
        vec![target(TransportKind::Push, "http://host/train/stream")],
        true,
    );

    let t0 = Instant::now();
    manager.open(&factory, t0);
    assert_eq!(manager.attempt(), 1);

    let deadline = manager.reconnect_deadline().unwrap();
    manager.poll(&factory, deadline, &mut drop_payload);
    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(manager.attempt(), 0);
}

#[test]
fn orchestrator_routes_each_channel_to_its_own_store() {
    let factory = FakeFactory::default();
    let config = DashboardConfig::default();
    let mut orchestrator = StreamOrchestrator::new(&config, "http://127.0.0.1:8080");

    let now = Instant::now();
    orchestrator.open_channels(&factory, now);
    orchestrator.poll(&factory, now);
    assert_eq!(
        orchestrator.metrics_channel().state(),
        ConnectionState::Open
    );
    assert_eq!(
        orchestrator.activations_channel().state(),
        ConnectionState::Open
    );
    assert_eq!(orchestrator.layers_channel().state(), ConnectionState::Open);

    // Channel order follows open_channels: metrics, activations, layers.
    factory.send(
        0,
        TransportEvent::Message(r#"{"step":1,"loss":0.9,"acc":0.1}"#.to_string()),
    );
    let snapshot = json!({ "values": vec![0.5; 64], "activity": 0.8 });
    factory.send(1, TransportEvent::Message(snapshot.to_string()));
    factory.send(2, TransportEvent::Message(r#"{"activity":0.3}"#.to_string()));
    orchestrator.poll(&factory, now);

    assert_eq!(orchestrator.buffer().len(), 1);
    assert_eq!(orchestrator.buffer().last().map(|p| p.step), Some(1));
    assert!(orchestrator.activation_cells().iter().all(|&v| v == 0.5));
    assert!((orchestrator.layer_activity() - 0.3).abs() < 1e-6);

    // An activation payload never reaches the metric buffer and vice versa.
    factory.send(0, TransportEvent::Message(snapshot.to_string()));
    orchestrator.poll(&factory, now);
    assert_eq!(orchestrator.buffer().len(), 1);
}

#[test]
fn one_failing_channel_does_not_block_the_others() {
    let factory = FakeFactory::default();
    // Metrics tries push then socket, both refused; snapshot channels open.
    factory.script(&[false, false, true, true]);
    let config = DashboardConfig::default();
    let mut orchestrator = StreamOrchestrator::new(&config, "http://127.0.0.1:8080");

    let now = Instant::now();
    orchestrator.open_channels(&factory, now);
    orchestrator.poll(&factory, now);

    assert_eq!(
        orchestrator.metrics_channel().state(),
        ConnectionState::Errored
    );
    assert_eq!(
        orchestrator.activations_channel().state(),
        ConnectionState::Open
    );
    assert_eq!(orchestrator.layers_channel().state(), ConnectionState::Open);
}

#[test]
fn stop_session_stops_every_channel_but_keeps_the_buffer() {
    let factory = FakeFactory::default();
    let config = DashboardConfig::default();
    let mut orchestrator = StreamOrchestrator::new(&config, "http://127.0.0.1:8080");

    let now = Instant::now();
    orchestrator.open_channels(&factory, now);
    factory.send(
        0,
        TransportEvent::Message(r#"{"step":1,"loss":0.9}"#.to_string()),
    );
    orchestrator.poll(&factory, now);
    assert_eq!(orchestrator.buffer().len(), 1);

    orchestrator.stop_session();
    assert_eq!(orchestrator.metrics_channel().state(), ConnectionState::Idle);
    assert_eq!(orchestrator.buffer().len(), 1);
    assert!(orchestrator.status_lines()[0].contains("stopped"));
}
