// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Guest device names for disks.

use designer_types::DiskBus;

/// Hands out guest device names per disk bus: "hda", "hdb", ... on IDE,
/// "vda", ... on virtio and "sda", ... on SATA.
///
/// Every bus has its own counter, and a counter only ever moves forward, so
/// no name is handed out twice by the same allocator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskTargets {
    ide: u32,
    virtio: u32,
    sata: u32,
}

impl DiskTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused name on `bus`, or `None` if the bus has no
    /// naming scheme.
    ///
    /// Names past the 26th on a bus continue through the characters after
    /// 'z'; callers attaching that many disks should name them explicitly.
    pub fn next_target(&mut self, bus: DiskBus) -> Option<String> {
        let (prefix, counter) = match bus {
            DiskBus::Ide => ("hd", &mut self.ide),
            DiskBus::Virtio => ("vd", &mut self.virtio),
            DiskBus::Sata => ("sd", &mut self.sata),
            _ => return None,
        };
        let suffix = char::from_u32(u32::from(b'a') + *counter)?;
        *counter += 1;
        Some(format!("{prefix}{suffix}"))
    }
}
