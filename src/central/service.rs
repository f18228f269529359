use static_assertions::assert_impl_all;
use std::fmt;

use crate::central::characteristic::Characteristic;
use crate::uuid::Uuid;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Service {
    id: Uuid,
    characteristics: Vec<Characteristic>,
}

assert_impl_all!(Service: Send, Sync);

impl Service {
    pub fn new(id: Uuid, characteristics: Vec<Characteristic>) -> Self {
        Self {
            id,
            characteristics,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Characteristics in the order the adapter discovered them.
    pub fn characteristics(&self) -> &[Characteristic] {
        &self.characteristics
    }

    pub fn characteristic(&self, id: Uuid) -> Option<&Characteristic> {
        self.characteristics.iter().find(|c| c.id() == id)
    }

    /// Returns a copy of this service with the value of characteristic `id` replaced.
    /// Returns `None` if there's no such characteristic.
    pub(in crate) fn with_value(&self, id: Uuid, value: Vec<u8>) -> Option<Self> {
        let idx = self.characteristics.iter().position(|c| c.id() == id)?;
        let mut r = self.clone();
        let c = r.characteristics[idx].clone().with_value(value);
        r.characteristics[idx] = c;
        Some(r)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Service({}, {} characteristics)",
            self.id.to_short_string(), self.characteristics.len())
    }
}
