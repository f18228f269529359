use enumflags2::BitFlags;
use static_assertions::assert_impl_all;
use std::fmt;

use crate::util::FlagList;
use crate::uuid::Uuid;

#[derive(BitFlags, Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[repr(u32)]
pub enum Property {
    Broadcast                       = 0x01,
    Read                            = 0x02,
    WriteWithoutResponse            = 0x04,
    Write                           = 0x08,
    Notify                          = 0x10,
    Indicate                        = 0x20,
    AuthenticatedSignedWrites       = 0x40,
    ExtendedProperties              = 0x80,
    NotifyEncryptionRequired        = 0x100,
    IndicateEncryptionRequired      = 0x200
}

#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Properties(BitFlags<Property>);

impl Properties {
    pub fn from_bits_truncate(bits: u32) -> Self {
        Self(BitFlags::from_bits_truncate(bits))
    }
}

impl From<BitFlags<Property>> for Properties {
    fn from(v: BitFlags<Property>) -> Self {
        Self(v)
    }
}

impl From<Property> for Properties {
    fn from(v: Property) -> Self {
        Self(v.into())
    }
}

macro_rules! properties {
    ($($(#[$attr:meta])* $f:ident => $e:ident,)*) => {
        impl Properties {
            $(
                $(#[$attr])*
                pub fn $f(&self) -> bool {
                    self.0.contains(Property::$e)
                }
            )*
        }
    };
}

properties!(
    #[doc="A peripheral can read the characteristic’s value."]
    is_read => Read,

    #[doc="A peripheral can write the characteristic’s value, without a response to indicate that the write succeeded."]
    is_write_without_response => WriteWithoutResponse,

    #[doc="A peripheral can write the characteristic’s value, with a response to indicate that the write succeeded."]
    is_write => Write,

    #[doc="The peripheral permits notifications of the characteristic’s value, without a response from the central to indicate receipt of the notification."]
    is_notify => Notify,

    #[doc="The peripheral permits notifications of the characteristic’s value, with a response from the central to indicate receipt of the notification."]
    is_indicate => Indicate,
);

assert_impl_all!(Properties: Send, Sync);

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Properties")
            .field(&FlagList(self.0))
            .finish()
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&FlagList(self.0), f)
    }
}

/// A single data point of a GATT service, with the last value known for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Characteristic {
    id: Uuid,
    description: String,
    properties: Properties,
    value: Vec<u8>,
}

assert_impl_all!(Characteristic: Send, Sync);

impl Characteristic {
    pub fn new(id: Uuid, description: impl Into<String>, properties: impl Into<Properties>) -> Self {
        Self {
            id,
            description: description.into(),
            properties: properties.into(),
            value: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = value.into();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Whether the peripheral can push value updates for this characteristic.
    pub fn is_notifiable(&self) -> bool {
        self.properties.is_notify() || self.properties.is_indicate()
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Characteristic({}, {})", self.id.to_short_string(), self.properties)
    }
}
