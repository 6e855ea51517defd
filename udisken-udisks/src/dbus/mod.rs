// SPDX-License-Identifier: GPL-3.0-only

pub mod bytestring;

use udisken_contracts::{CapabilityError, Identity, MountError};
use zbus::zvariant::ObjectPath;

/// Name UDisks2 uses when `Filesystem.Mount` finds the filesystem already mounted.
pub(crate) const ALREADY_MOUNTED_ERROR: &str = "org.freedesktop.UDisks2.Error.AlreadyMounted";

pub(crate) fn dbus_error(err: impl std::fmt::Display) -> CapabilityError {
    CapabilityError::DBus(err.to_string())
}

pub(crate) fn object_path(identity: &Identity) -> Result<ObjectPath<'static>, CapabilityError> {
    ObjectPath::try_from(identity.as_str().to_owned())
        .map_err(|e| CapabilityError::InvalidPath(format!("{identity}: {e}")))
}

/// Classify a failed `Filesystem.Mount` call.
///
/// udisks2 maps the well-known error names to unit variants; a raw
/// `MethodError` carrying the same name is accepted too.
pub(crate) fn mount_error(err: udisks2::Error) -> MountError {
    match &err {
        udisks2::Error::AlreadyMounted => {
            MountError::AlreadyMounted(format!("{ALREADY_MOUNTED_ERROR}: {err}"))
        }
        udisks2::Error::Zbus(zbus::Error::MethodError(name, _, _))
            if name.as_str() == ALREADY_MOUNTED_ERROR =>
        {
            MountError::AlreadyMounted(err.to_string())
        }
        _ => MountError::Failed(err.to_string()),
    }
}
