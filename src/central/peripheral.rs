use log::*;
use static_assertions::assert_impl_all;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::sync::{self, Receiver, Sender};
use crate::uuid::Uuid;

use super::router::PeripheralEvent;
use super::service::Service;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        })
    }
}

/// Data a peripheral advertised when it was discovered.
#[derive(Clone, Debug, Default)]
pub struct AdvertisementData {
    service_uuids: BTreeSet<Uuid>,
    tx_power_level: Option<i32>,
}

assert_impl_all!(AdvertisementData: Send, Sync);

impl AdvertisementData {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_service_uuids(mut self, uuids: &[Uuid]) -> Self {
        self.service_uuids.extend(uuids.iter().copied());
        self
    }

    pub fn with_tx_power_level(mut self, v: i32) -> Self {
        self.tx_power_level = Some(v);
        self
    }

    /// Advertised service UUIDs.
    pub fn service_uuids(&self) -> &BTreeSet<Uuid> {
        &self.service_uuids
    }

    /// The transmit power of a peripheral.
    /// You can calculate the path loss by comparing the RSSI value with the transmitting power level.
    pub fn tx_power_level(&self) -> Option<i32> {
        self.tx_power_level
    }
}

struct Inner {
    id: Uuid,
    name: String,
    advertisement_data: AdvertisementData,
    rssi: AtomicI32,
    state: AtomicU8,
    debug: AtomicBool,
    profile: Mutex<Option<Arc<Vec<Service>>>>,
    subscriber: Mutex<Option<Sender<PeripheralEvent>>>,
}

/// Handle to a remote peripheral.
///
/// Handles are created by the adapter and are cheap to clone; all clones refer to the same
/// peripheral. Live values (RSSI, connection state, profile) are published by the adapter's
/// callback thread and may be read from any thread.
#[derive(Clone)]
pub struct Peripheral(Arc<Inner>);

assert_impl_all!(Peripheral: Send, Sync);

impl Peripheral {
    pub fn new(id: Uuid, name: impl Into<String>, advertisement_data: AdvertisementData, rssi: i32)
        -> Self
    {
        Self(Arc::new(Inner {
            id,
            name: name.into(),
            advertisement_data,
            rssi: AtomicI32::new(rssi),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            debug: AtomicBool::new(false),
            profile: Mutex::new(None),
            subscriber: Mutex::new(None),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn advertisement_data(&self) -> &AdvertisementData {
        &self.0.advertisement_data
    }

    pub fn rssi(&self) -> i32 {
        self.0.rssi.load(Ordering::Acquire)
    }

    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.state.load(Ordering::Acquire))
    }

    pub fn is_debug(&self) -> bool {
        self.0.debug.load(Ordering::Acquire)
    }

    pub fn set_debug(&self, v: bool) {
        self.0.debug.store(v, Ordering::Release);
    }

    /// The latest discovered GATT profile, if discovery has completed.
    pub fn profile(&self) -> Option<Arc<Vec<Service>>> {
        lock(&self.0.profile).clone()
    }

    pub fn service(&self, id: Uuid) -> Option<Service> {
        self.profile()?.iter().find(|s| s.id() == id).cloned()
    }

    /// Starts redirecting RSSI and connection state notifications of this peripheral to the
    /// returned subscription, replacing any previous subscriber. Notifications stop when the
    /// subscription is dropped.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = sync::channel();
        *lock(&self.0.subscriber) = Some(sender);
        trace!("subscribed to {}", self);
        Subscription {
            peripheral: self.clone(),
            receiver,
        }
    }

    pub(in crate) fn set_rssi(&self, v: i32) {
        self.0.rssi.store(v, Ordering::Release);
        self.notify(PeripheralEvent::RssiChanged(v));
    }

    pub(in crate) fn set_connection_state(&self, v: ConnectionState) {
        self.0.state.store(v as u8, Ordering::Release);
        self.notify(PeripheralEvent::ConnectionStateChanged(v));
    }

    pub(in crate) fn set_profile(&self, services: Vec<Service>) {
        *lock(&self.0.profile) = Some(Arc::new(services));
    }

    /// Replaces the profile with a copy where one characteristic value is updated.
    /// Returns `false` if the profile doesn't contain the characteristic.
    pub(in crate) fn set_value(&self, service: Uuid, characteristic: Uuid, value: Vec<u8>) -> bool {
        let mut profile = lock(&self.0.profile);
        let services = match profile.as_ref() {
            Some(v) => v,
            None => return false,
        };
        let idx = match services.iter().position(|s| s.id() == service) {
            Some(v) => v,
            None => return false,
        };
        let updated = match services[idx].with_value(characteristic, value) {
            Some(v) => v,
            None => return false,
        };
        let mut services = Vec::clone(services);
        services[idx] = updated;
        *profile = Some(Arc::new(services));
        true
    }

    fn notify(&self, event: PeripheralEvent) {
        let mut subscriber = lock(&self.0.subscriber);
        let gone = match subscriber.as_ref() {
            Some(sender) => sender.send(event).is_err(),
            None => false,
        };
        if gone {
            *subscriber = None;
        }
    }

    fn unsubscribe(&self) {
        *lock(&self.0.subscriber) = None;
        trace!("unsubscribed from {}", self);
    }
}

impl PartialEq for Peripheral {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Peripheral {}

impl Hash for Peripheral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state)
    }
}

impl fmt::Debug for Peripheral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Peripheral")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("rssi", &self.rssi())
            .field("state", &self.connection_state())
            .finish()
    }
}

impl fmt::Display for Peripheral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Peripheral({}, {})", self.0.name, self.0.id)
    }
}

/// Receiving end of a peripheral's notifications. See [`Peripheral::subscribe`].
pub struct Subscription {
    peripheral: Peripheral,
    receiver: Receiver<PeripheralEvent>,
}

impl Subscription {
    /// Returns the next pending notification without blocking.
    pub fn try_next(&self) -> Option<PeripheralEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.peripheral.unsubscribe();
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
