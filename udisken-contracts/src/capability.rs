// SPDX-License-Identifier: GPL-3.0-only

//! Capability kinds and the object events that carry them.

use enumflags2::{BitFlags, bitflags};

use crate::Identity;

/// Well-known bus name of the UDisks2 service.
pub const UDISKS_SERVICE: &str = "org.freedesktop.UDisks2";

/// One optional UDisks2 interface an object may implement.
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Block = 0b0000_0001,
    Filesystem = 0b0000_0010,
    Loop = 0b0000_0100,
    Partition = 0b0000_1000,
    Drive = 0b0001_0000,
}

/// The set of capabilities an object reported at one point in time.
pub type CapabilitySet = BitFlags<Capability>;

impl Capability {
    pub const fn interface_name(self) -> &'static str {
        match self {
            Self::Block => "org.freedesktop.UDisks2.Block",
            Self::Filesystem => "org.freedesktop.UDisks2.Filesystem",
            Self::Loop => "org.freedesktop.UDisks2.Loop",
            Self::Partition => "org.freedesktop.UDisks2.Partition",
            Self::Drive => "org.freedesktop.UDisks2.Drive",
        }
    }

    pub fn from_interface_name(name: &str) -> Option<Self> {
        CapabilitySet::all()
            .iter()
            .find(|capability| capability.interface_name() == name)
    }
}

/// Collect the known capabilities out of a list of interface names.
///
/// Interfaces the automounter has no use for (`PartitionTable`, `Encrypted`,
/// `Swapspace`, the D-Bus standard ones...) are dropped.
pub fn capabilities_from_interfaces<I, S>(interfaces: I) -> CapabilitySet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    interfaces
        .into_iter()
        .filter_map(|name| Capability::from_interface_name(name.as_ref()))
        .collect()
}

/// `org.freedesktop.DBus.ObjectManager` signal, reduced to what the registry needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectEvent {
    InterfacesAdded {
        identity: Identity,
        capabilities: CapabilitySet,
    },
    InterfacesRemoved {
        identity: Identity,
        capabilities: CapabilitySet,
    },
}

impl ObjectEvent {
    pub fn identity(&self) -> &Identity {
        match self {
            Self::InterfacesAdded { identity, .. } | Self::InterfacesRemoved { identity, .. } => {
                identity
            }
        }
    }
}
