use log::*;
use static_assertions::*;

use crate::sync::{self, Receiver, Sender};
use crate::uuid::Uuid;

use super::peripheral::{ConnectionState, Peripheral};
use super::service::Service;

/// Adapter state change, published by [`CallbackRouter`] and applied by the controller's pump.
#[derive(Debug)]
#[non_exhaustive]
pub enum AdapterEvent {
    Ready,

    /// Full replacement of the discovered peripherals list.
    DiscoveredListChanged {
        peripherals: Vec<Peripheral>,
    },

    /// Full replacement of the connected peripherals list.
    ConnectedListChanged {
        peripherals: Vec<Peripheral>,
    },
}

assert_impl_all!(AdapterEvent: Send);

/// Notification redirected to a peripheral's subscriber (see [`Peripheral::subscribe`]).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum PeripheralEvent {
    RssiChanged(i32),
    ConnectionStateChanged(ConnectionState),
}

/// The set of handlers an adapter reports to.
///
/// Handlers may be called from any thread. None of them blocks: list changes are queued for
/// the controller as whole lists, per-peripheral values are stored atomically in the
/// peripheral and forwarded to its subscriber, if any.
#[derive(Clone)]
pub struct CallbackRouter {
    sender: Sender<AdapterEvent>,
}

assert_impl_all!(CallbackRouter: Send);

impl CallbackRouter {
    pub(in crate) fn new() -> (Self, Receiver<AdapterEvent>) {
        let (sender, receiver) = sync::channel();
        (Self { sender }, receiver)
    }

    pub fn on_ready(&self) {
        self.send(AdapterEvent::Ready);
    }

    pub fn on_discovered_list_changed(&self, peripherals: Vec<Peripheral>) {
        self.send(AdapterEvent::DiscoveredListChanged { peripherals });
    }

    pub fn on_connected_list_changed(&self, peripherals: Vec<Peripheral>) {
        self.send(AdapterEvent::ConnectedListChanged { peripherals });
    }

    pub fn on_rssi_changed(&self, peripheral: &Peripheral, rssi: i32) {
        trace!("{}: rssi {}", peripheral, rssi);
        peripheral.set_rssi(rssi);
    }

    pub fn on_connection_state_changed(&self, peripheral: &Peripheral, state: ConnectionState) {
        debug!("{}: {}", peripheral, state);
        peripheral.set_connection_state(state);
    }

    pub fn on_profile_changed(&self, peripheral: &Peripheral, services: Vec<Service>) {
        debug!("{}: {} services discovered", peripheral, services.len());
        peripheral.set_profile(services);
    }

    pub fn on_characteristic_value(&self, peripheral: &Peripheral, service: Uuid,
        characteristic: Uuid, value: Vec<u8>)
    {
        if !peripheral.set_value(service, characteristic, value) {
            warn!("{}: value for unknown characteristic {}/{}", peripheral,
                service.to_short_string(), characteristic.to_short_string());
        }
    }

    fn send(&self, event: AdapterEvent) {
        if self.sender.send(event).is_err() {
            trace!("controller is gone, dropping adapter event");
        }
    }
}
