// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operating system and platform knowledge base records.
//!
//! The knowledge base describes which virtual devices an operating system
//! supports (an [`Os`]), which virtualization platforms exist (a
//! [`Platform`]), and, for an OS running on a given platform, which devices
//! are preferred (a [`Deployment`]). [`Database`] is a simple in-memory
//! collection of these records.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Device property holding the device class, e.g. "block" or "net".
pub const PROP_CLASS: &str = "class";

/// Device property holding the bus the device sits on, e.g. "virtio".
pub const PROP_BUS_TYPE: &str = "bus-type";

/// A virtual device known to the knowledge base.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Device {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    pub class: String,

    #[serde(default)]
    pub bus_type: Option<String>,

    #[serde(default)]
    pub vendor: Option<String>,
}

impl Device {
    pub fn new(id: &str, class: &str, bus_type: Option<&str>) -> Self {
        Self {
            id: id.to_owned(),
            name: None,
            class: class.to_owned(),
            bus_type: bus_type.map(str::to_owned),
            vendor: None,
        }
    }

    /// Looks up a property by its knowledge base name.
    pub fn property(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            "name" => self.name.as_deref(),
            PROP_CLASS => Some(&self.class),
            PROP_BUS_TYPE => self.bus_type.as_deref(),
            "vendor" => self.vendor.as_deref(),
            _ => None,
        }
    }
}

/// A conjunction of `property == value` constraints over devices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    constraints: Vec<(String, String)>,
}

impl DeviceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_constraint(mut self, key: &str, value: &str) -> Self {
        self.constraints.push((key.to_owned(), value.to_owned()));
        self
    }

    /// An empty filter matches every device.
    pub fn matches(&self, device: &Device) -> bool {
        self.constraints
            .iter()
            .all(|(key, value)| device.property(key) == Some(value.as_str()))
    }
}

/// An operating system and the devices it supports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Os {
    pub id: String,
    pub short_id: Option<String>,
    pub name: Option<String>,
    pub devices: Vec<Device>,

    /// The OS this one was derived from; its devices are inherited.
    pub derives_from: Option<Arc<Os>>,
}

impl Os {
    pub fn new(id: &str, devices: Vec<Device>) -> Self {
        Self {
            id: id.to_owned(),
            short_id: None,
            name: None,
            devices,
            derives_from: None,
        }
    }

    /// Returns the devices whose `key` property equals `value`.
    ///
    /// With `inherited` set, devices of the OSes this one derives from are
    /// included after this OS's own devices. A device id is reported once,
    /// by the most derived OS declaring it.
    pub fn devices_by_property(
        &self,
        key: &str,
        value: &str,
        inherited: bool,
    ) -> Vec<&Device> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        let mut os = Some(self);
        while let Some(cur) = os {
            for dev in &cur.devices {
                if dev.property(key) == Some(value) && seen.insert(&dev.id) {
                    out.push(dev);
                }
            }
            if !inherited {
                break;
            }
            os = cur.derives_from.as_deref();
        }
        out
    }

    fn matches_id(&self, id: &str) -> bool {
        self.id == id || self.short_id.as_deref() == Some(id)
    }
}

/// A virtualization platform, e.g. a particular hypervisor release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Platform {
    pub id: String,

    #[serde(default)]
    pub short_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl Platform {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_owned(), short_id: None, name: None }
    }

    fn matches_id(&self, id: &str) -> bool {
        self.id == id || self.short_id.as_deref() == Some(id)
    }
}

/// A reference from a deployment to a device it prefers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceLink {
    pub target: Device,

    /// Guest driver to use with the device, if the knowledge base names one.
    pub driver: Option<String>,
}

impl DeviceLink {
    pub fn new(target: Device) -> Self {
        Self { target, driver: None }
    }
}

/// The pairing of an OS with a platform, carrying device preferences for
/// that combination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub id: String,
    pub os_id: String,
    pub platform_id: String,

    /// Preferred devices, most preferred first.
    pub links: Vec<DeviceLink>,
}

impl Deployment {
    /// Returns the most preferred link whose device satisfies `filter`.
    pub fn preferred_device_link(
        &self,
        filter: &DeviceFilter,
    ) -> Option<&DeviceLink> {
        self.links.iter().find(|link| filter.matches(&link.target))
    }
}

/// An in-memory knowledge base.
#[derive(Clone, Debug, Default)]
pub struct Database {
    oses: BTreeMap<String, Arc<Os>>,
    platforms: BTreeMap<String, Arc<Platform>>,
    deployments: Vec<Deployment>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_os(&mut self, os: Arc<Os>) {
        self.oses.insert(os.id.clone(), os);
    }

    pub fn add_platform(&mut self, platform: Arc<Platform>) {
        self.platforms.insert(platform.id.clone(), platform);
    }

    pub fn add_deployment(&mut self, deployment: Deployment) {
        self.deployments.push(deployment);
    }

    /// Finds an OS by full id or short id.
    pub fn os(&self, id: &str) -> Option<Arc<Os>> {
        self.oses.values().find(|os| os.matches_id(id)).cloned()
    }

    /// Finds a platform by full id or short id.
    pub fn platform(&self, id: &str) -> Option<Arc<Platform>> {
        self.platforms.values().find(|p| p.matches_id(id)).cloned()
    }

    pub fn deployments(&self) -> &[Deployment] {
        &self.deployments
    }

    /// Finds the deployment of `os` on `platform`.
    ///
    /// A deployment recorded for an OS that `os` derives from also applies;
    /// the one recorded for the most derived OS wins.
    pub fn find_deployment(
        &self,
        os: &Os,
        platform: &Platform,
    ) -> Option<&Deployment> {
        let mut cur = Some(os);
        while let Some(os) = cur {
            let found = self
                .deployments
                .iter()
                .find(|d| d.os_id == os.id && d.platform_id == platform.id);
            if found.is_some() {
                return found;
            }
            cur = os.derives_from.as_deref();
        }
        None
    }
}
