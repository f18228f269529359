use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::central::characteristic::{Characteristic, Property};
use crate::central::peripheral::ConnectionState;
use crate::central::service::Service;
use crate::central::session::PeripheralSession;
use crate::error::ErrorKind;
use crate::sim::{self, Call, SimAdapter, SimControl};
use crate::uuid::Uuid;

struct Fixture {
    manager: CentralManager,
    channel: CommandChannel,
    control: SimControl,
    router: CallbackRouter,
    a: Peripheral,
    b: Peripheral,
}

fn uuid(s: &str) -> Uuid {
    s.parse().unwrap()
}

fn fixture_with(idle_wait: Duration) -> Fixture {
    let a = sim::device(1, "A", -40, &[uuid("180A")]);
    let b = sim::device(2, "B", -70, &[uuid("180F"), uuid("180A")]);
    let profile = vec![
        Service::new(uuid("180A"), vec![
            Characteristic::new(uuid("2A29"), "Manufacturer Name", Property::Read)
                .with_value(&b"ACME"[..]),
            Characteristic::new(uuid("2A56"), "Digital", Property::Write | Property::Notify),
        ]),
    ];
    let control = SimControl::new();
    let mut router = None;
    let in_range = vec![a.clone(), b.clone()];
    let (manager, channel) = CentralManager::builder()
        .idle_wait(idle_wait)
        .build(|r| {
            router = Some(r.clone());
            SimAdapter::new(r, control.clone(), in_range)
                .with_profile(a.id(), profile)
        });
    Fixture {
        manager,
        channel,
        control,
        router: router.unwrap(),
        a,
        b,
    }
}

fn fixture() -> Fixture {
    fixture_with(Duration::from_secs(0))
}

impl Fixture {
    fn send(&self, lines: &[&str]) {
        for line in lines {
            self.channel.send(*line).unwrap();
        }
    }

    fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.manager.step();
        }
    }

    fn drain(&self) -> String {
        let mut r = String::new();
        while let Some(v) = self.channel.try_recv() {
            r += &v;
        }
        r
    }

    /// Scans and connects A.
    fn connect_a(&mut self) {
        self.send(&["scan", "connect 0"]);
        self.steps(3);
        assert_eq!(&self.manager.connected()[..], &[self.a.clone()][..]);
        self.control.clear_calls();
    }
}

#[test]
fn becomes_ready() {
    let mut f = fixture();
    assert!(!f.manager.is_ready());
    f.steps(1);
    assert!(f.manager.is_ready());
    assert_eq!(f.manager.run_state(), RunState::Running);
}

#[test]
fn list_reflects_latest_snapshot() {
    let mut f = fixture();
    f.router.on_discovered_list_changed(vec![f.a.clone(), f.b.clone()]);
    f.router.on_discovered_list_changed(vec![f.b.clone()]);
    f.send(&["list"]);
    f.steps(1);

    assert_eq!(f.drain(), " 0 : B\n\
        \x20    RSSI         : -70\n\
        \x20    TxPowerLevel : 0\n\
        \x20    Service UUIDs: {180A, 180F}\n");
    assert_eq!(f.manager.discovered().len(), 1);
}

#[test]
fn empty_list_is_silent() {
    let mut f = fixture();
    f.send(&["list", "con"]);
    f.steps(2);
    assert_eq!(f.channel.try_recv(), None);
}

#[test]
fn pump_is_bounded() {
    let (mut manager, _channel) = CentralManager::builder()
        .pump_budget(2)
        .idle_wait(Duration::from_secs(0))
        .build(|r| {
            for i in 0..3 {
                r.on_discovered_list_changed(vec![sim::device(i, "X", 0, &[]); i as usize + 1]);
            }
            SimAdapter::new(r, SimControl::new(), Vec::new())
        });
    manager.step();
    assert_eq!(manager.discovered().len(), 2);
    assert!(!manager.is_ready());
    manager.step();
    assert_eq!(manager.discovered().len(), 3);
    assert!(manager.is_ready());
}

#[test]
fn scan_connect_con() {
    let mut f = fixture();
    f.send(&["scan"]);
    f.steps(2);
    assert_eq!(&f.manager.discovered()[..], &[f.a.clone(), f.b.clone()][..]);

    f.send(&["connect 1"]);
    f.steps(2);
    assert_eq!(f.control.calls(), vec![Call::StartScan, Call::Connect(f.b.id())]);
    assert_eq!(&f.manager.connected()[..], &[f.b.clone()][..]);
    assert_eq!(f.b.connection_state(), ConnectionState::Connected);

    f.send(&["con"]);
    f.steps(1);
    let out = f.drain();
    assert!(out.starts_with(" 0 : B\n"), "{}", out);
    assert!(!out.contains(" 1 : "), "{}", out);
}

#[test]
fn connect_defaults_to_first() {
    let mut f = fixture();
    f.send(&["scan", "connect 1 2", "connect nope"]);
    f.steps(3);
    // A is no longer listed as available by the time the second line runs.
    assert_eq!(f.control.calls(),
        vec![Call::StartScan, Call::Connect(f.a.id()), Call::Connect(f.b.id())]);
}

#[test]
fn index_forms() {
    let data: &[(&str, Option<usize>)] = &[
        ("connect", Some(0)),
        ("connect two", Some(0)),
        ("connect 1 2", Some(0)),
        ("connect +1", Some(1)),
        ("connect   1 ", Some(1)),
        ("connect 2", None),
        ("connect -1", None),
        ("connect 99999999999999999999", None),
        ("connect -99999999999999999999", None),
    ];
    for &(line, exp) in data {
        let mut f = fixture();
        f.router.on_discovered_list_changed(vec![f.a.clone(), f.b.clone()]);
        f.send(&[line]);
        f.steps(1);
        let exp = match exp {
            Some(i) => vec![Call::Connect([&f.a, &f.b][i].id())],
            None => vec![],
        };
        assert_eq!(f.control.calls(), exp, "{:?}", line);
    }
}

#[test]
fn out_of_range_index_is_ignored() {
    let mut f = fixture();
    f.router.on_discovered_list_changed(vec![f.a.clone(), f.b.clone()]);
    f.send(&["connect 2", "connect -1", "connect 99999999999999999999",
        "connect 18446744073709551616", "disconnect 0", "disconnect", "execute 0", "execute"]);
    f.steps(8);

    assert_eq!(f.control.calls(), vec![]);
    assert_eq!(f.manager.discovered().len(), 2);
    assert!(f.manager.connected().is_empty());
    assert_eq!(f.channel.try_recv(), None);
    assert_eq!(f.manager.run_state(), RunState::Running);
}

#[test]
fn connect_all_single_pass() {
    let mut f = fixture();
    f.send(&["connectAll"]);
    f.steps(1);
    assert_eq!(f.control.calls(), vec![]);

    f.send(&["scan", "connectAll"]);
    f.steps(3);
    assert_eq!(f.control.calls(),
        vec![Call::StartScan, Call::ConnectAll(vec![f.a.id(), f.b.id()])]);
    assert_eq!(f.manager.connected().len(), 2);
    assert!(f.manager.discovered().is_empty());

    f.send(&["disconnectAll"]);
    f.steps(2);
    assert!(f.manager.connected().is_empty());
    assert_eq!(f.manager.discovered().len(), 2);
}

#[test]
fn stop_is_idempotent() {
    let mut f = fixture();
    f.send(&["stop", "scan"]);
    f.steps(3);
    let before = f.manager.discovered();
    f.send(&["stop", "stop"]);
    f.steps(2);

    assert_eq!(f.manager.discovered(), before);
    assert_eq!(f.control.calls(), vec![Call::StopScan, Call::StartScan, Call::StopScan, Call::StopScan]);
    assert_eq!(f.manager.run_state(), RunState::Running);
}

#[test]
fn exit_disconnects_connected_once() {
    let mut f = fixture();
    f.connect_a();
    f.send(&["exit", "scan"]);
    f.steps(1);

    assert_eq!(f.manager.run_state(), RunState::Halting);
    assert!(!f.manager.step());
    assert_eq!(f.manager.run_state(), RunState::Stopped);
    assert_eq!(f.control.calls(), vec![Call::DisconnectAll]);

    f.manager.shutdown().unwrap();
    f.manager.shutdown().unwrap();
    assert_eq!(f.control.calls(), vec![Call::DisconnectAll, Call::Shutdown]);
}

#[test]
fn exit_without_connected() {
    let mut f = fixture();
    f.send(&["exit"]);
    f.steps(1);
    assert!(!f.manager.step());
    assert_eq!(f.control.calls(), vec![]);

    // The halt sticks.
    f.send(&["scan"]);
    f.manager.start();
    assert_eq!(f.manager.run_state(), RunState::Stopped);
    assert_eq!(f.control.calls(), vec![]);
}

#[test]
fn shutdown_disconnects() {
    let mut f = fixture();
    f.connect_a();
    f.manager.shutdown().unwrap();
    assert_eq!(f.control.calls(), vec![Call::DisconnectAll, Call::Shutdown]);
}

#[test]
fn end_of_input_exits() {
    let mut f = fixture();
    f.connect_a();
    let Fixture { mut manager, channel, control, .. } = f;
    drop(channel);
    manager.step();
    assert!(!manager.step());
    assert_eq!(control.calls(), vec![Call::DisconnectAll]);
}

#[test]
fn handler_failure_halts() {
    let mut f = fixture();
    f.control.set_offline(true);
    f.send(&["scan", "list"]);
    f.steps(1);
    assert_eq!(f.manager.run_state(), RunState::Halting);
    assert!(!f.manager.step());
}

#[test]
fn unknown_and_help() {
    let mut f = fixture();
    f.send(&["fly away", "", "help"]);
    f.steps(3);
    let out = f.drain();
    assert!(out.starts_with("*** Unknown syntax: fly away\n"), "{}", out);
    assert!(out.contains("  connectAll    Connect all available peripherals\n"), "{}", out);
}

#[test]
fn session_debug() {
    let mut f = fixture();
    f.connect_a();
    f.send(&["execute", "debug maybe", "state", "debug True", "state", "debug", "exit"]);
    f.steps(1);

    let out = f.drain();
    let a = format!("Peripheral(A, {})", f.a.id());
    let exp = format!("Only accept True/False\n{a} is not in debug mode.\n\
        {a}\n  State : Connected\n  RSSI  : -40 (last notified: -40)\n  Debug : false\n\
        {a} is in debug mode.\n\
        {a}\n  State : Connected\n  RSSI  : -40 (last notified: -40)\n  Debug : true\n\
        {a} is in debug mode.\n", a = a);
    assert_eq!(out, exp);
    assert!(f.a.is_debug());
    assert_eq!(f.manager.run_state(), RunState::Running);
}

#[test]
fn session_profile() {
    let mut f = fixture();
    f.connect_a();
    f.send(&["execute", "list", "read 0x180A", "read 180A 2A29", "read zz", "read FFFF",
        "read 180A 2A00", "write 180A 2A56 0x0102", "write 180A", "help", "exit"]);
    f.steps(1);

    let mut out = Vec::new();
    while let Some(v) = f.channel.try_recv() {
        out.push(v);
    }
    assert_eq!(out[0], "Service(180A, 2 characteristics)\n");
    assert_eq!(out[1], "Service(180A, 2 characteristics)\n\
        \x20 Characteristic(2A29, Read)\n\
        \x20   Description:  Manufacturer Name\n\
        \x20   Value      :  41434D45\n\
        \x20 Characteristic(2A56, Write | Notify)\n\
        \x20   Description:  Digital\n\
        \x20   Value      :  <empty>\n");
    assert_eq!(out[2], "Characteristic(2A29, Read) 41434D45\n");
    assert!(out[3].starts_with("Read Profile\nUsage: read"), "{}", out[3]);
    assert_eq!(out[4], "Unknown service FFFF\n");
    assert_eq!(out[5], "Unknown characteristic 2A00\n");
    assert!(out[6].starts_with("Write Characteristic\n"), "{}", out[6]);
    assert!(out[7].contains("  debug         Show or set peripheral debugging"), "{}", out[7]);
    assert_eq!(out.len(), 8);

    let (a, svc) = (f.a.id(), uuid("180A"));
    assert_eq!(f.control.calls(), vec![
        Call::Read { peripheral: a, service: svc, characteristic: uuid("2A29") },
        Call::Read { peripheral: a, service: svc, characteristic: uuid("2A29") },
        Call::Write { peripheral: a, service: svc, characteristic: uuid("2A56"), value: vec![1, 2] },
    ]);
    assert_eq!(f.a.service(svc).unwrap().characteristic(uuid("2A56")).unwrap().value(), &[1, 2]);
}

#[test]
fn session_unknown_attribute_is_answered() {
    let mut f = fixture();
    f.connect_a();
    f.send(&["execute", "read 180F", "read 180A 2A30", "state", "exit"]);
    f.steps(1);

    let out = f.drain();
    assert!(out.starts_with("Unknown service 180F\nUnknown characteristic 2A30\n"), "{}", out);
    assert!(out.contains("State : Connected"), "{}", out);
    assert_eq!(f.control.calls(), vec![]);
    assert_eq!(f.manager.run_state(), RunState::Running);
}

#[test]
fn line_queued_behind_disconnect_goes_to_controller() {
    let mut f = fixture();
    f.connect_a();
    // Completes during the session's first pump.
    f.manager.bridge_mut().disconnect(&f.a).unwrap();
    f.send(&["help"]);

    let left = PeripheralSession::new(f.a.clone()).run(&mut f.manager).unwrap();
    assert_eq!(left, None);
    assert_eq!(f.drain(), "Peripheral disconnected, exit ...\n");

    f.steps(1);
    let out = f.drain();
    assert!(out.contains("  connectAll    "), "{}", out);
    assert!(f.manager.connected().is_empty());
}

#[test]
fn session_failure_halts() {
    let mut f = fixture();
    f.connect_a();
    f.control.set_offline(true);
    f.send(&["execute", "read 180A", "exit"]);
    f.steps(1);
    assert_eq!(f.manager.run_state(), RunState::Halting);
}

fn recv_until(channel: &CommandChannel, pred: impl Fn(&str) -> bool) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(v) = channel.recv_timeout(Duration::from_millis(50)) {
            if pred(&v) {
                return v;
            }
        }
    }
    panic!("timed out waiting for response");
}

/// Scans and connects the first peripheral of a controller running on another thread.
fn connect_first(channel: &CommandChannel) {
    channel.send("scan").unwrap();
    channel.send("connect 0").unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        assert!(Instant::now() < deadline, "timed out waiting for connection");
        channel.send("con").unwrap();
        if channel.recv_timeout(Duration::from_millis(50)).is_some() {
            break;
        }
    }
    while channel.try_recv().is_some() {}
}

#[test]
fn session_ends_on_disconnect() {
    let f = fixture_with(Duration::from_millis(1));
    let Fixture { mut manager, channel, control, router, a, .. } = f;
    let controller = thread::spawn(move || {
        manager.start();
        manager
    });

    connect_first(&channel);
    channel.send("execute").unwrap();
    channel.send("state").unwrap();
    recv_until(&channel, |v| v.contains("State : Connected"));

    router.on_rssi_changed(&a, -55);
    channel.send("state").unwrap();
    let out = recv_until(&channel, |v| v.contains("State :"));
    assert!(out.contains("RSSI  : -55 (last notified: -55)"), "{}", out);

    router.on_connection_state_changed(&a, ConnectionState::Disconnected);
    assert_eq!(recv_until(&channel, |_| true), "Peripheral disconnected, exit ...\n");

    // Back in the controller loop.
    channel.send("state").unwrap();
    assert_eq!(recv_until(&channel, |_| true), "*** Unknown syntax: state\n");

    channel.send("exit").unwrap();
    let manager = controller.join().unwrap();
    assert_eq!(manager.run_state(), RunState::Stopped);
    assert_eq!(control.calls().iter().filter(|&c| c == &Call::DisconnectAll).count(), 1);
}

#[test]
fn line_racing_disconnect_goes_to_controller() {
    let Fixture { mut manager, channel, router, a, .. } = fixture_with(Duration::from_millis(20));
    let controller = thread::spawn(move || {
        manager.start();
        manager
    });

    connect_first(&channel);
    channel.send("execute").unwrap();
    channel.send("state").unwrap();
    recv_until(&channel, |v| v.contains("State : Connected"));

    // Whichever side of the session's wait the notification lands on, the line that follows
    // it is executed by the controller.
    let sender = channel.sender();
    router.on_connection_state_changed(&a, ConnectionState::Disconnected);
    sender.send("help".into()).unwrap();
    assert_eq!(recv_until(&channel, |_| true), "Peripheral disconnected, exit ...\n");
    let out = recv_until(&channel, |_| true);
    assert!(out.contains("  connectAll    "), "{}", out);

    channel.send("exit").unwrap();
    controller.join().unwrap();
}

#[test]
fn halt_from_another_thread() {
    let Fixture { mut manager, channel, .. } = fixture_with(Duration::from_millis(1));
    let halt = manager.halt_handle();
    assert_eq!(manager.run_state(), RunState::Stopped);
    let controller = thread::spawn(move || {
        manager.start();
        manager
    });
    channel.send("scan").unwrap();
    halt.halt();
    let manager = controller.join().unwrap();
    assert_eq!(manager.run_state(), RunState::Stopped);
    assert!(halt.is_halted());
}

#[test]
fn send_after_stop_fails() {
    let Fixture { manager, channel, .. } = fixture();
    drop(manager);
    assert_eq!(channel.send("scan").unwrap_err().kind(), ErrorKind::ChannelClosed);
}
