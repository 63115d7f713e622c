// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The domain configuration document produced by the designer.

use serde::{Deserialize, Serialize};

use crate::{DiskBus, DiskType, GuestOsType, VirtType};

/// A domain (guest VM or container) configuration.
///
/// The designer only ever writes to this document; callers read it back once
/// designing is done, typically to serialize it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub virt_type: Option<VirtType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<DomainOs>,

    #[serde(default, rename = "device", skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DomainDevice>,
}

impl DomainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_virt_type(&mut self, virt_type: VirtType) {
        self.virt_type = Some(virt_type);
    }

    /// Replaces the OS block wholesale.
    pub fn set_os(&mut self, os: DomainOs) {
        self.os = Some(os);
    }

    pub fn add_device(&mut self, device: DomainDevice) {
        self.devices.push(device);
    }

    /// Iterates over the disks attached to this domain, in attach order.
    pub fn disks(&self) -> impl Iterator<Item = &DomainDisk> {
        self.devices.iter().map(|dev| match dev {
            DomainDevice::Disk(disk) => disk,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DomainOs {
    pub os_type: GuestOsType,
    pub arch: String,
}

impl DomainOs {
    pub fn new(os_type: GuestOsType, arch: impl Into<String>) -> Self {
        Self { os_type, arch: arch.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DomainDevice {
    Disk(DomainDisk),
}

impl From<DomainDisk> for DomainDevice {
    fn from(disk: DomainDisk) -> Self {
        DomainDevice::Disk(disk)
    }
}

/// A disk attached to the domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DomainDisk {
    #[serde(rename = "type")]
    pub disk_type: DiskType,

    /// Host path of the backing file or device.
    pub source: String,

    /// Emulation backend that opens the source.
    pub driver_name: String,

    /// Image format of the source, e.g. "qcow2" or "raw".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_bus: Option<DiskBus>,

    /// Device name the guest sees, e.g. "vda".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_dev: Option<String>,
}

impl DomainDisk {
    pub fn new(
        disk_type: DiskType,
        source: impl Into<String>,
        driver_name: impl Into<String>,
    ) -> Self {
        Self {
            disk_type,
            source: source.into(),
            driver_name: driver_name.into(),
            driver_format: None,
            target_bus: None,
            target_dev: None,
        }
    }

    pub fn set_driver_format(&mut self, format: impl Into<String>) {
        self.driver_format = Some(format.into());
    }

    pub fn set_target_bus(&mut self, bus: DiskBus) {
        self.target_bus = Some(bus);
    }

    pub fn set_target_dev(&mut self, dev: impl Into<String>) {
        self.target_dev = Some(dev.into());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_os_replaces_previous_block() {
        let mut config = DomainConfig::new();
        config.set_os(DomainOs::new(GuestOsType::Hvm, "x86_64"));
        config.set_virt_type(VirtType::Kvm);
        config.set_os(DomainOs::new(GuestOsType::Xen, "i686"));
        config.set_virt_type(VirtType::Xen);

        assert_eq!(config.os, Some(DomainOs::new(GuestOsType::Xen, "i686")));
        assert_eq!(config.virt_type, Some(VirtType::Xen));
    }

    #[test]
    fn disks_serialize_with_kind_tag() {
        let mut disk = DomainDisk::new(DiskType::File, "/vm/a.img", "qemu");
        disk.set_driver_format("qcow2");
        disk.set_target_bus(DiskBus::Virtio);
        disk.set_target_dev("vda");

        let mut config = DomainConfig::new();
        config.add_device(disk.clone().into());
        assert_eq!(config.disks().collect::<Vec<_>>(), vec![&disk]);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "device": [{
                    "kind": "disk",
                    "type": "file",
                    "source": "/vm/a.img",
                    "driver-name": "qemu",
                    "driver-format": "qcow2",
                    "target-bus": "virtio",
                    "target-dev": "vda",
                }]
            })
        );
    }
}
