// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Functions for converting a [`DatabaseFile`] into a knowledge base.
//!
//! The file form refers to devices, OSes and platforms by id; conversion
//! resolves those references and links each OS to the OS it derives from.

use std::collections::BTreeMap;
use std::sync::Arc;

use designer_types::osinfo::{
    Database, Deployment, Device, DeviceLink, Os, Platform,
};
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("device {0:?} is defined more than once")]
    DuplicateDevice(String),

    #[error("OS {0:?} is defined more than once")]
    DuplicateOs(String),

    #[error("OS {os:?} refers to unknown device {device:?}")]
    UnknownOsDevice { os: String, device: String },

    #[error("OS {os:?} derives from unknown OS {parent:?}")]
    UnknownParentOs { os: String, parent: String },

    #[error("OS {0:?} is part of a derivation cycle")]
    DerivationCycle(String),

    #[error("deployment {deployment:?} refers to unknown OS {os:?}")]
    UnknownDeploymentOs { deployment: String, os: String },

    #[error("deployment {deployment:?} refers to unknown platform {platform:?}")]
    UnknownDeploymentPlatform { deployment: String, platform: String },

    #[error("deployment {deployment:?} links to unknown device {device:?}")]
    UnknownLinkDevice { deployment: String, device: String },
}

/// The on-disk form of the knowledge base.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct DatabaseFile {
    #[serde(default, rename = "device")]
    pub devices: Vec<Device>,

    #[serde(default, rename = "platform")]
    pub platforms: Vec<Platform>,

    #[serde(default, rename = "os")]
    pub oses: Vec<OsEntry>,

    #[serde(default, rename = "deployment")]
    pub deployments: Vec<DeploymentEntry>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct OsEntry {
    pub id: String,

    #[serde(default)]
    pub short_id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub derives_from: Option<String>,

    /// Ids of supported devices.
    #[serde(default)]
    pub devices: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct DeploymentEntry {
    pub id: String,
    pub os: String,
    pub platform: String,

    /// Preferred devices, most preferred first.
    #[serde(default, rename = "link")]
    pub links: Vec<LinkEntry>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct LinkEntry {
    pub device: String,

    #[serde(default)]
    pub driver: Option<String>,
}

impl TryFrom<&DatabaseFile> for Database {
    type Error = DatabaseError;

    fn try_from(file: &DatabaseFile) -> Result<Self, Self::Error> {
        let mut devices = BTreeMap::new();
        for dev in file.devices.iter() {
            if devices.insert(dev.id.as_str(), dev).is_some() {
                return Err(DatabaseError::DuplicateDevice(dev.id.clone()));
            }
        }

        let mut entries = BTreeMap::new();
        for os in file.oses.iter() {
            if entries.insert(os.id.as_str(), os).is_some() {
                return Err(DatabaseError::DuplicateOs(os.id.clone()));
            }
        }

        let mut resolver = OsResolver {
            devices: &devices,
            entries: &entries,
            done: BTreeMap::new(),
            in_progress: Vec::new(),
        };
        let mut db = Database::new();
        for os in file.oses.iter() {
            db.add_os(resolver.resolve(os)?);
        }

        let mut platforms = BTreeMap::new();
        for platform in file.platforms.iter() {
            platforms.insert(platform.id.as_str(), platform);
            db.add_platform(Arc::new(platform.clone()));
        }

        for dep in file.deployments.iter() {
            if !entries.contains_key(dep.os.as_str()) {
                return Err(DatabaseError::UnknownDeploymentOs {
                    deployment: dep.id.clone(),
                    os: dep.os.clone(),
                });
            }
            if !platforms.contains_key(dep.platform.as_str()) {
                return Err(DatabaseError::UnknownDeploymentPlatform {
                    deployment: dep.id.clone(),
                    platform: dep.platform.clone(),
                });
            }

            let links = dep
                .links
                .iter()
                .map(|link| {
                    let target = devices
                        .get(link.device.as_str())
                        .ok_or_else(|| DatabaseError::UnknownLinkDevice {
                            deployment: dep.id.clone(),
                            device: link.device.clone(),
                        })?;
                    Ok(DeviceLink {
                        target: (*target).clone(),
                        driver: link.driver.clone(),
                    })
                })
                .collect::<Result<Vec<_>, DatabaseError>>()?;

            db.add_deployment(Deployment {
                id: dep.id.clone(),
                os_id: dep.os.clone(),
                platform_id: dep.platform.clone(),
                links,
            });
        }

        Ok(db)
    }
}

/// Builds OS records parent-first, memoizing each one so that every OS
/// deriving from the same parent shares its `Arc`.
struct OsResolver<'a> {
    devices: &'a BTreeMap<&'a str, &'a Device>,
    entries: &'a BTreeMap<&'a str, &'a OsEntry>,
    done: BTreeMap<String, Arc<Os>>,
    in_progress: Vec<String>,
}

impl<'a> OsResolver<'a> {
    fn resolve(
        &mut self,
        entry: &'a OsEntry,
    ) -> Result<Arc<Os>, DatabaseError> {
        let id = entry.id.as_str();
        if let Some(os) = self.done.get(id) {
            return Ok(os.clone());
        }
        if self.in_progress.iter().any(|p| p == id) {
            return Err(DatabaseError::DerivationCycle(id.to_owned()));
        }
        self.in_progress.push(id.to_owned());

        let derives_from = match entry.derives_from.as_deref() {
            Some(parent) => {
                let parent_entry =
                    self.entries.get(parent).copied().ok_or_else(|| {
                        DatabaseError::UnknownParentOs {
                            os: id.to_owned(),
                            parent: parent.to_owned(),
                        }
                    })?;
                Some(self.resolve(parent_entry)?)
            }
            None => None,
        };

        let devices = entry
            .devices
            .iter()
            .map(|dev| {
                let found = self.devices.get(dev.as_str()).ok_or_else(|| {
                    DatabaseError::UnknownOsDevice {
                        os: id.to_owned(),
                        device: dev.clone(),
                    }
                })?;
                Ok((*found).clone())
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let os = Arc::new(Os {
            id: entry.id.clone(),
            short_id: entry.short_id.clone(),
            name: entry.name.clone(),
            devices,
            derives_from,
        });
        self.in_progress.pop();
        self.done.insert(id.to_owned(), os.clone());
        Ok(os)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use designer_types::osinfo::{DeviceFilter, PROP_CLASS};

    const DB: &str = r#"
[[device]]
id = "http://pcisig.com/pci/1af4/1001"
name = "virtio-block"
class = "block"
bus-type = "pci"

[[device]]
id = "http://qemu.org/ide-hd"
class = "block"
bus-type = "ide"

[[platform]]
id = "http://qemu.org/qemu-kvm-1.2"
short-id = "qemu-kvm-1.2"

[[os]]
id = "http://fedoraproject.org/fedora/17"
short-id = "fedora17"
derives-from = "http://fedoraproject.org/fedora/16"
devices = ["http://pcisig.com/pci/1af4/1001"]

[[os]]
id = "http://fedoraproject.org/fedora/16"
short-id = "fedora16"
devices = ["http://qemu.org/ide-hd"]

[[deployment]]
id = "http://example.org/deployment/f16-kvm"
os = "http://fedoraproject.org/fedora/16"
platform = "http://qemu.org/qemu-kvm-1.2"

[[deployment.link]]
device = "http://pcisig.com/pci/1af4/1001"
driver = "virtio-blk"
"#;

    fn load(raw: &str) -> Result<Database, DatabaseError> {
        let file: DatabaseFile = toml::from_str(raw).unwrap();
        Database::try_from(&file)
    }

    #[test]
    fn parse_database_resolves_references() {
        let db = load(DB).unwrap();

        let f17 = db.os("fedora17").unwrap();
        let f16 = db.os("fedora16").unwrap();
        assert!(Arc::ptr_eq(f17.derives_from.as_ref().unwrap(), &f16));

        let kvm = db.platform("qemu-kvm-1.2").unwrap();
        let dep = db.find_deployment(&f17, &kvm).unwrap();
        let link = dep
            .preferred_device_link(
                &DeviceFilter::new().add_constraint(PROP_CLASS, "block"),
            )
            .unwrap();
        assert_eq!(link.target.bus_type.as_deref(), Some("pci"));
        assert_eq!(link.driver.as_deref(), Some("virtio-blk"));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let raw = r#"
[[os]]
id = "child"
derives-from = "ghost"
"#;
        assert!(matches!(
            load(raw),
            Err(DatabaseError::UnknownParentOs { parent, .. }) if parent == "ghost"
        ));
    }

    #[test]
    fn derivation_cycle_is_rejected() {
        let raw = r#"
[[os]]
id = "a"
derives-from = "b"

[[os]]
id = "b"
derives-from = "a"
"#;
        assert!(matches!(load(raw), Err(DatabaseError::DerivationCycle(_))));
    }

    #[test]
    fn unknown_link_device_is_rejected() {
        let raw = r#"
[[platform]]
id = "p"

[[os]]
id = "o"

[[deployment]]
id = "d"
os = "o"
platform = "p"

[[deployment.link]]
device = "nope"
"#;
        assert!(matches!(
            load(raw),
            Err(DatabaseError::UnknownLinkDevice { device, .. }) if device == "nope"
        ));
    }

    #[test]
    fn duplicate_os_is_rejected() {
        let raw = r#"
[[os]]
id = "o"

[[os]]
id = "o"
"#;
        assert!(matches!(load(raw), Err(DatabaseError::DuplicateOs(_))));
    }
}
