// SPDX-License-Identifier: GPL-3.0-only

//! UDisks2 exports paths (`Device`, `PreferredDevice`, `MountPoints`,
//! `Loop.BackingFile`) as NUL-terminated `ay` values.

/// Decode one path property. `None` when UDisks sent no path at all.
pub fn decode_path_bytes(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let path = String::from_utf8_lossy(&bytes[..end]);

    if path.trim().is_empty() {
        None
    } else {
        Some(path.into_owned())
    }
}

/// Decode `Filesystem.MountPoints`, skipping empty entries.
pub fn decode_mount_points(mount_points: &[Vec<u8>]) -> Vec<String> {
    mount_points
        .iter()
        .filter_map(|mp| decode_path_bytes(mp))
        .collect()
}
