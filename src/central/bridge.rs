use log::*;

use crate::error::Result;
use crate::uuid::Uuid;

use super::peripheral::Peripheral;

/// Imperative interface of the native adapter.
///
/// Every request is asynchronous: `Ok` means the request was accepted, its outcome is reported
/// later through the [`CallbackRouter`](super::router::CallbackRouter) the adapter was built
/// with. `Err` means the native layer couldn't take the request at all.
pub trait Adapter: Send {
    fn start_scan(&mut self) -> Result<()>;

    fn stop_scan(&mut self) -> Result<()>;

    fn connect(&mut self, peripheral: &Peripheral) -> Result<()>;

    fn disconnect(&mut self, peripheral: &Peripheral) -> Result<()>;

    fn connect_all(&mut self, peripherals: &[Peripheral]) -> Result<()> {
        for p in peripherals {
            self.connect(p)?;
        }
        Ok(())
    }

    fn disconnect_all(&mut self) -> Result<()>;

    /// Requests a fresh value of the characteristic.
    fn read_characteristic(&mut self, peripheral: &Peripheral, service: Uuid, characteristic: Uuid)
        -> Result<()>;

    fn write_characteristic(&mut self, peripheral: &Peripheral, service: Uuid, characteristic: Uuid,
        value: &[u8]) -> Result<()>;

    /// Gives the native layer a bounded opportunity to deliver queued callbacks.
    /// Must return promptly whether or not anything was delivered.
    fn run_once(&mut self) {}

    /// Releases native resources. Called once, from `CentralManager::shutdown`.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Forwards controller requests to the adapter. No validation, no retries: the caller is
/// expected to pass peripherals taken from the latest snapshot.
pub struct Bridge {
    adapter: Box<dyn Adapter>,
}

impl Bridge {
    pub(in crate) fn new(adapter: Box<dyn Adapter>) -> Self {
        Self { adapter }
    }

    pub fn start_scan(&mut self) -> Result<()> {
        debug!("start scan");
        self.adapter.start_scan()
    }

    pub fn stop_scan(&mut self) -> Result<()> {
        debug!("stop scan");
        self.adapter.stop_scan()
    }

    pub fn connect(&mut self, peripheral: &Peripheral) -> Result<()> {
        debug!("connect {}", peripheral);
        self.adapter.connect(peripheral)
    }

    pub fn disconnect(&mut self, peripheral: &Peripheral) -> Result<()> {
        debug!("disconnect {}", peripheral);
        self.adapter.disconnect(peripheral)
    }

    pub fn connect_all(&mut self, peripherals: &[Peripheral]) -> Result<()> {
        debug!("connect {} peripherals", peripherals.len());
        self.adapter.connect_all(peripherals)
    }

    pub fn disconnect_all(&mut self) -> Result<()> {
        debug!("disconnect all");
        self.adapter.disconnect_all()
    }

    pub fn read_characteristic(&mut self, peripheral: &Peripheral, service: Uuid,
        characteristic: Uuid) -> Result<()>
    {
        trace!("read {}/{} of {}", service.to_short_string(), characteristic.to_short_string(),
            peripheral);
        self.adapter.read_characteristic(peripheral, service, characteristic)
    }

    pub fn write_characteristic(&mut self, peripheral: &Peripheral, service: Uuid,
        characteristic: Uuid, value: &[u8]) -> Result<()>
    {
        debug!("write {} B to {}/{} of {}", value.len(), service.to_short_string(),
            characteristic.to_short_string(), peripheral);
        self.adapter.write_characteristic(peripheral, service, characteristic, value)
    }

    pub(in crate) fn run_once(&mut self) {
        self.adapter.run_once();
    }

    pub(in crate) fn shutdown(&mut self) -> Result<()> {
        debug!("shutdown");
        self.adapter.shutdown()
    }
}
