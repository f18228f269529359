//! In-process adapter that simulates a radio with a fixed set of peripherals in range.
//!
//! Requests are queued and completed on the next [`Adapter::run_once`], reporting through the
//! router the same way a native adapter reports from its callback thread. Every request is
//! recorded in the [`SimControl`] log.

use log::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::central::bridge::Adapter;
use crate::central::peripheral::{AdvertisementData, ConnectionState, Peripheral};
use crate::central::router::CallbackRouter;
use crate::central::service::Service;
use crate::error::{Error, ErrorKind, Result};
use crate::uuid::Uuid;

/// A request as received by the simulated adapter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    StartScan,
    StopScan,
    Connect(Uuid),
    ConnectAll(Vec<Uuid>),
    Disconnect(Uuid),
    DisconnectAll,
    Read {
        peripheral: Uuid,
        service: Uuid,
        characteristic: Uuid,
    },
    Write {
        peripheral: Uuid,
        service: Uuid,
        characteristic: Uuid,
        value: Vec<u8>,
    },
    Shutdown,
}

#[derive(Default)]
struct ControlState {
    calls: Vec<Call>,
    offline: bool,
}

/// Shared view into a [`SimAdapter`]: its request log and failure switch.
#[derive(Clone, Default)]
pub struct SimControl(Arc<Mutex<ControlState>>);

impl SimControl {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// While offline every request is refused with `ErrorKind::AdapterUnavailable`.
    pub fn set_offline(&self, v: bool) {
        self.lock().offline = v;
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.lock();
        if state.offline {
            return Err(Error::new(ErrorKind::AdapterUnavailable, "adapter is offline"));
        }
        state.calls.push(call);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<ControlState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Op {
    Scan,
    Connect(Peripheral),
    Disconnect(Peripheral),
    DisconnectAll,
    Read(Peripheral, Uuid, Uuid),
    Write(Peripheral, Uuid, Uuid, Vec<u8>),
}

pub struct SimAdapter {
    router: CallbackRouter,
    control: SimControl,
    in_range: Vec<Peripheral>,
    profiles: HashMap<Uuid, Vec<Service>>,
    scanning: bool,
    discovered: Vec<Peripheral>,
    connected: Vec<Peripheral>,
    pending: VecDeque<Op>,
    announced: bool,
}

impl SimAdapter {
    pub fn new(router: CallbackRouter, control: SimControl, in_range: Vec<Peripheral>) -> Self {
        Self {
            router,
            control,
            in_range,
            profiles: HashMap::new(),
            scanning: false,
            discovered: Vec::new(),
            connected: Vec::new(),
            pending: VecDeque::new(),
            announced: false,
        }
    }

    /// Sets the GATT profile peripheral `id` exposes once connected.
    pub fn with_profile(mut self, id: Uuid, services: Vec<Service>) -> Self {
        self.profiles.insert(id, services);
        self
    }

    fn complete(&mut self, op: Op) {
        match op {
            Op::Scan => {
                self.scanning = true;
                let connected = &self.connected;
                self.discovered = self.in_range.iter()
                    .filter(|p| !connected.contains(p))
                    .cloned()
                    .collect();
                self.router.on_discovered_list_changed(self.discovered.clone());
            }
            Op::Connect(p) => {
                if self.connected.contains(&p) {
                    return;
                }
                self.router.on_connection_state_changed(&p, ConnectionState::Connecting);
                self.discovered.retain(|v| v != &p);
                self.connected.push(p.clone());
                self.router.on_connection_state_changed(&p, ConnectionState::Connected);
                if let Some(services) = self.profiles.get(&p.id()) {
                    self.router.on_profile_changed(&p, services.clone());
                }
                self.publish();
            }
            Op::Disconnect(p) => {
                if self.drop_connection(&p) {
                    self.publish();
                }
            }
            Op::DisconnectAll => {
                for p in self.connected.clone() {
                    self.drop_connection(&p);
                }
                self.publish();
            }
            Op::Read(p, service, characteristic) => {
                let value = self.profiles.get(&p.id())
                    .and_then(|v| v.iter().find(|s| s.id() == service))
                    .and_then(|s| s.characteristic(characteristic))
                    .map(|c| c.value().to_vec());
                match value {
                    Some(value) => self.router.on_characteristic_value(&p, service, characteristic, value),
                    None => warn!("{}: no characteristic {}/{}", p, service, characteristic),
                }
            }
            Op::Write(p, service, characteristic, value) => {
                let stored = self.profiles.get_mut(&p.id())
                    .and_then(|v| v.iter_mut().find(|s| s.id() == service))
                    .and_then(|s| {
                        let updated = s.with_value(characteristic, value.clone())?;
                        *s = updated;
                        Some(())
                    });
                if stored.is_some() {
                    self.router.on_characteristic_value(&p, service, characteristic, value);
                }
            }
        }
    }

    fn drop_connection(&mut self, p: &Peripheral) -> bool {
        let len = self.connected.len();
        self.connected.retain(|v| v != p);
        if self.connected.len() == len {
            return false;
        }
        self.router.on_connection_state_changed(p, ConnectionState::Disconnected);
        if self.scanning && self.in_range.contains(p) {
            self.discovered.push(p.clone());
        }
        true
    }

    fn publish(&self) {
        self.router.on_discovered_list_changed(self.discovered.clone());
        self.router.on_connected_list_changed(self.connected.clone());
    }
}

impl Adapter for SimAdapter {
    fn start_scan(&mut self) -> Result<()> {
        self.control.record(Call::StartScan)?;
        self.pending.push_back(Op::Scan);
        Ok(())
    }

    fn stop_scan(&mut self) -> Result<()> {
        self.control.record(Call::StopScan)?;
        self.scanning = false;
        Ok(())
    }

    fn connect(&mut self, peripheral: &Peripheral) -> Result<()> {
        self.control.record(Call::Connect(peripheral.id()))?;
        self.pending.push_back(Op::Connect(peripheral.clone()));
        Ok(())
    }

    fn disconnect(&mut self, peripheral: &Peripheral) -> Result<()> {
        self.control.record(Call::Disconnect(peripheral.id()))?;
        self.pending.push_back(Op::Disconnect(peripheral.clone()));
        Ok(())
    }

    fn connect_all(&mut self, peripherals: &[Peripheral]) -> Result<()> {
        self.control.record(Call::ConnectAll(peripherals.iter().map(|p| p.id()).collect()))?;
        self.pending.extend(peripherals.iter().cloned().map(Op::Connect));
        Ok(())
    }

    fn disconnect_all(&mut self) -> Result<()> {
        self.control.record(Call::DisconnectAll)?;
        self.pending.push_back(Op::DisconnectAll);
        Ok(())
    }

    fn read_characteristic(&mut self, peripheral: &Peripheral, service: Uuid, characteristic: Uuid)
        -> Result<()>
    {
        self.control.record(Call::Read {
            peripheral: peripheral.id(),
            service,
            characteristic,
        })?;
        self.pending.push_back(Op::Read(peripheral.clone(), service, characteristic));
        Ok(())
    }

    fn write_characteristic(&mut self, peripheral: &Peripheral, service: Uuid, characteristic: Uuid,
        value: &[u8]) -> Result<()>
    {
        self.control.record(Call::Write {
            peripheral: peripheral.id(),
            service,
            characteristic,
            value: value.to_vec(),
        })?;
        self.pending.push_back(Op::Write(peripheral.clone(), service, characteristic, value.to_vec()));
        Ok(())
    }

    fn run_once(&mut self) {
        if !self.announced {
            self.announced = true;
            self.router.on_ready();
        }
        let n = self.pending.len();
        for _ in 0..n {
            if let Some(op) = self.pending.pop_front() {
                self.complete(op);
            }
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        self.control.record(Call::Shutdown)?;
        self.pending.clear();
        Ok(())
    }
}

/// A simulated peripheral with a 16-bit style identifier.
pub fn device(id: u16, name: &str, rssi: i32, services: &[Uuid]) -> Peripheral {
    let mut bytes = Uuid::base().bytes();
    bytes[..4].copy_from_slice(&[0xde, 0xad, (id >> 8) as u8, id as u8]);
    Peripheral::new(Uuid::from_bytes(bytes), name,
        AdvertisementData::new()
            .with_tx_power_level(0)
            .with_service_uuids(services),
        rssi)
}
