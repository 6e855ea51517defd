// SPDX-License-Identifier: GPL-3.0-only

//! UDisks2 implementations of the udisken capability contracts.

mod dbus;

pub mod capabilities;
pub mod manager;
pub mod notify;

pub use capabilities::{
    UdisksBinder, UdisksBlock, UdisksDrive, UdisksFilesystem, UdisksLoop, UdisksPartition,
};
pub use manager::{ObjectEventStream, UdisksClient};
pub use notify::{DesktopNotifier, DisabledNotifier};

// Explicit exports from dbus module (DBus byte string decoding)
pub use dbus::bytestring::{decode_mount_points, decode_path_bytes};
