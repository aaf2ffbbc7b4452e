//! End-to-end session scenarios against a simulated receiver.

mod helpers;

use std::time::Duration;

use helpers::*;
use onkyo_engine::state::{ActiveListeningMode, ActiveSelector, Power, VolumePercent};
use onkyo_engine::{DeviceKind, EngineError, SessionState, ZoneId};

#[test]
fn discovery_to_ready() {
    let mut engine = new_engine();
    assert_eq!(engine.host().heartbeat, Some(Duration::from_secs(2)));

    let ticks = drive_until(&mut engine, SessionState::Ready, 10);
    assert_eq!(ticks, 4);

    let receiver = engine.receiver().unwrap();
    assert_eq!(receiver.model, "TX-NR509");
    assert_eq!(receiver.control_addr().to_string(), RECEIVER_ADDR);
    assert_eq!(engine.network().connects.len(), 1);
    assert_eq!(engine.host().heartbeat, Some(Duration::from_secs(20)));

    // One query per zone per capability, plus the main zone's tuner preset
    let sent = engine.network().sent.clone();
    let messages: Vec<_> = sent.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "!1PWRQSTN", "!1MVLQSTN", "!1SLIQSTN", "!1PRSQSTN",
            "!1ZPWQSTN", "!1ZVLQSTN", "!1SLZQSTN",
        ]
    );
    let delays: Vec<_> = sent.iter().map(|(_, d)| d.as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn devices_are_created_for_enabled_zones() {
    let engine = ready_engine();
    let host = engine.host();

    assert_eq!(host.created, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(host.device(1).spec.name, "TX-NR509 Main Power");
    assert_eq!(host.device(4).spec.name, "TX-NR509 Main Mode");
    assert_eq!(host.device(5).spec.name, "TX-NR509 Tuner");
    assert_eq!(host.device(8).spec.name, "TX-NR509 Zone2 Volume");
    assert_eq!(host.device(3).spec.kind, DeviceKind::Dimmer);
    assert_eq!(host.device(7).spec.kind, DeviceKind::Selector);

    let sources = host.device(2).options.clone().unwrap();
    assert_eq!(sources.names(), ["BD/DVD", "CBL/SAT", "NET", "FM"]);
    let presets = host.device(5).options.clone().unwrap();
    assert_eq!(presets.names(), ["1 Radio 1"]);
}

#[test]
fn existing_devices_are_left_alone() {
    let mut engine = ready_engine();
    engine.on_disconnected();
    assert_eq!(engine.host().heartbeat, Some(Duration::from_secs(2)));

    drive_until(&mut engine, SessionState::Ready, 10);
    assert_eq!(engine.host().created.len(), 8);
}

#[test]
fn disconnect_mid_handshake_restarts_discovery() {
    let mut engine = new_engine();
    drive_until(&mut engine, SessionState::Connected, 10);
    engine.on_tick();
    assert_eq!(engine.state(), SessionState::ConfigRequested);

    engine.on_disconnected();
    assert_eq!(engine.state(), SessionState::Idle);
    assert!(engine.receiver().is_none());
    assert!(engine.model().is_none());

    let binds_before = engine.network().binds;
    drive_until(&mut engine, SessionState::Ready, 10);
    assert_eq!(engine.network().binds, binds_before + 1);
    assert_eq!(engine.network().connects.len(), 2);
}

#[test]
fn discovery_retries_until_receiver_answers() {
    let mut engine = new_engine();
    engine.network_mut().set_receiver_online(false);

    for _ in 0..3 {
        engine.on_tick();
    }
    assert_eq!(engine.state(), SessionState::DiscoveryRequestSent);
    assert_eq!(engine.network().broadcasts(), 3);
    assert_eq!(engine.network().binds, 1);

    engine.network_mut().set_receiver_online(true);
    engine.on_tick();
    assert_eq!(engine.state(), SessionState::DiscoveryRequestSent);
    engine.on_tick();
    assert_eq!(engine.state(), SessionState::Connecting);
}

#[test]
fn malformed_descriptor_keeps_waiting() {
    let mut engine = new_engine();
    drive_until(&mut engine, SessionState::Connected, 10);
    engine.on_tick();

    engine.on_message(&receiver_frame("!1NRIN/A"));
    assert_eq!(engine.state(), SessionState::ConfigRequested);
    engine.on_message(&receiver_frame("!1NRI<response><device/></response>"));
    assert_eq!(engine.state(), SessionState::ConfigRequested);
    assert!(engine.model().is_none());

    engine.on_message(&descriptor_frame());
    assert_eq!(engine.state(), SessionState::ConfigReceived);
}

#[test]
fn frames_split_across_reads() {
    let mut engine = ready_engine();
    let mut bytes = receiver_frame("!1PWR01");
    bytes.extend(receiver_frame("!1MVL28"));
    bytes.extend(b"ISC");

    let (first, rest) = bytes.split_at(7);
    engine.on_message(first);
    assert_eq!(engine.host().state_of(1), (0, String::new()));

    engine.on_message(rest);
    assert_eq!(engine.host().state_of(1), (1, "On".to_string()));
    assert_eq!(engine.host().state_of(3), (2, "50".to_string()));
    assert_eq!(engine.zone_state().get::<Power>(&ZoneId::Main), Some(Power(true)));
}

#[test]
fn inbound_updates_reach_host_once() {
    let mut engine = ready_engine();

    engine.on_message(&receiver_frame("!1ZVL28"));
    engine.on_message(&receiver_frame("!1ZVL28"));
    engine.on_message(&receiver_frame("!1ZVLN/A"));
    let writes: Vec<_> = engine
        .host()
        .state_writes
        .iter()
        .filter(|(unit, _, _)| *unit == 8)
        .cloned()
        .collect();
    assert_eq!(writes, vec![(8, 2, "50".to_string())]);
    assert_eq!(
        engine.zone_state().get::<VolumePercent>(&ZoneId::Zone2),
        Some(VolumePercent(50))
    );

    engine.on_message(&receiver_frame("!1ZMT01"));
    assert_eq!(engine.host().state_of(8), (0, "Off".to_string()));
    engine.on_message(&receiver_frame("!1ZMT00"));
    assert_eq!(engine.host().state_of(8), (1, "On".to_string()));
}

#[test]
fn source_update_selects_level() {
    let mut engine = ready_engine();
    engine.on_message(&receiver_frame("!1SLI2b"));

    assert_eq!(engine.host().state_of(2), (1, "30".to_string()));
    assert_eq!(
        engine.zone_state().get::<ActiveSelector>(&ZoneId::Main),
        Some(ActiveSelector("NET".to_string()))
    );

    engine.on_message(&receiver_frame("!1SLI99"));
    assert_eq!(engine.host().state_of(2), (1, "30".to_string()));
}

#[test]
fn unknown_listening_mode_is_learned() {
    let mut engine = ready_engine();
    engine.on_message(&receiver_frame("!1LMD1F"));

    let model = engine.model().unwrap();
    let learned = model.listening_mode_by_code("1F").unwrap();
    assert!(learned.label.contains("1F"));

    let options = engine.host().device(4).options.clone().unwrap();
    assert_eq!(options.names().last().map(String::as_str), Some("[1F] New"));
    assert_eq!(engine.host().state_of(4), (1, "40".to_string()));
    assert_eq!(
        engine.zone_state().get::<ActiveListeningMode>(&ZoneId::Main),
        Some(ActiveListeningMode("[1F] New".to_string()))
    );

    // Seen again: no second entry
    engine.on_message(&receiver_frame("!1LMD1F"));
    assert_eq!(engine.model().unwrap().listening_modes().len(), 4);
    assert_eq!(engine.host().device(4).options.clone().unwrap().names().len(), 4);
}

#[test]
fn learned_listening_mode_can_be_selected() {
    let mut engine = ready_engine();
    engine.on_message(&receiver_frame("!1LMD1F"));

    engine.on_command(4, "Set Level", 40).unwrap();
    assert_eq!(engine.network_mut().take_sent(), vec!["!1LMD1F"]);
}

#[test]
fn host_commands_become_messages() {
    let mut engine = ready_engine();

    engine.on_command(1, "On", 0).unwrap();
    engine.on_command(3, "Set Level", 50).unwrap();
    engine.on_command(3, "Off", 0).unwrap();
    engine.on_command(7, "Set Level", 30).unwrap();
    engine.on_command(5, "Set Level", 10).unwrap();
    engine.on_command(2, "Set Level", 0).unwrap();

    assert_eq!(
        engine.network_mut().take_sent(),
        vec!["!1PWR01", "!1MVL28", "!1AMT01", "!1SLZ2B", "!1PRS01"]
    );
}

#[test]
fn rejected_commands() {
    let mut engine = new_engine();
    assert!(matches!(engine.on_command(1, "On", 0), Err(EngineError::NotReady)));

    drive_until(&mut engine, SessionState::Ready, 10);
    assert!(matches!(engine.on_command(42, "On", 0), Err(EngineError::UnknownUnit(42))));
    assert!(matches!(
        engine.on_command(9, "On", 0),
        Err(EngineError::ZoneUnavailable(ZoneId::Zone3))
    ));
    assert!(matches!(
        engine.on_command(1, "Toggle", 0),
        Err(EngineError::UnsupportedCommand { unit: 1, .. })
    ));

    engine.network_mut().fail_send = true;
    assert!(matches!(engine.on_command(1, "On", 0), Err(EngineError::Network(_))));
}

#[test]
fn stop_closes_everything() {
    let mut engine = ready_engine();
    engine.on_stop();

    assert_eq!(engine.state(), SessionState::Idle);
    assert_eq!(engine.network().disconnects, 1);
    assert!(engine.model().is_none());
    assert!(engine.zone_state().is_empty());
}
