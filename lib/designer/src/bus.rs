// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Disk bus negotiation.

use std::collections::BTreeSet;

use designer_types::osinfo::{Os, Platform, PROP_BUS_TYPE, PROP_CLASS};
use designer_types::DiskBus;
use slog::{debug, Logger};

use crate::deployment::DeploymentCache;
use crate::DesignError;

const BLOCK_CLASS: &str = "block";

/// Collects the bus types of every block device `os` supports, including
/// devices inherited from the OSes it derives from.
pub fn supported_disk_buses(os: &Os) -> BTreeSet<String> {
    os.devices_by_property(PROP_CLASS, BLOCK_CLASS, true)
        .into_iter()
        .filter_map(|dev| dev.property(PROP_BUS_TYPE))
        .filter(|bus| !bus.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Maps a knowledge base bus type onto the disk bus the guest sees.
///
/// PCI block devices are virtio disks.
pub fn disk_bus_for(bus_type: &str) -> Result<DiskBus, DesignError> {
    match bus_type {
        "ide" => Ok(DiskBus::Ide),
        "virtio" | "pci" => Ok(DiskBus::Virtio),
        "sata" => Ok(DiskBus::Sata),
        other => Err(DesignError::UnsupportedBus(other.to_owned())),
    }
}

/// Chooses the bus for a new disk.
///
/// The deployment's preferred block device decides when there is one.
/// Otherwise any bus the OS supports will do; the lexicographically smallest
/// one is taken so repeated designs agree.
///
/// Returns the bus along with the knowledge base bus type it came from.
pub fn select_disk_bus(
    log: &Logger,
    deployments: &mut DeploymentCache,
    os: &Os,
    platform: &Platform,
) -> Result<(DiskBus, String), DesignError> {
    let mut lookup_err = None;
    let preferred =
        match deployments.preferred_device_link(log, os, platform, BLOCK_CLASS)
        {
            Ok(link) => link.and_then(|l| l.target.bus_type.clone()),
            Err(e) => {
                debug!(log, "no deployment preference for disk bus";
                    "error" => %e);
                lookup_err = Some(e);
                None
            }
        };

    let bus_type = match preferred {
        Some(bus_type) => bus_type,
        None => match supported_disk_buses(os).into_iter().next() {
            Some(bus_type) => bus_type,
            None => {
                return Err(DesignError::NoDiskBus {
                    cause: lookup_err.map(Box::new),
                })
            }
        },
    };

    let bus = disk_bus_for(&bus_type)?;
    debug!(log, "selected disk bus"; "bus" => %bus, "bus_type" => &bus_type);
    Ok((bus, bus_type))
}
