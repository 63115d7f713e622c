// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host virtualization capabilities, as reported by a hypervisor driver.

use serde::{Deserialize, Serialize};

use crate::{GuestOsType, VirtType};

/// The capabilities document for one host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub host: Option<CapabilitiesHost>,

    /// Guests the host can run, in the order the driver reported them.
    #[serde(default, rename = "guest")]
    pub guests: Vec<CapabilitiesGuest>,
}

impl Capabilities {
    /// The host CPU architecture, if the document carries one.
    pub fn host_arch(&self) -> Option<&str> {
        self.host.as_ref()?.cpu.as_ref()?.arch.as_deref()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesHost {
    #[serde(default)]
    pub cpu: Option<CapabilitiesCpu>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesCpu {
    #[serde(default)]
    pub arch: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CapabilitiesGuest {
    pub os_type: GuestOsType,
    pub arch: GuestArch,
}

impl CapabilitiesGuest {
    /// Builds a guest for `arch` offering the listed domain types, in order.
    pub fn new<I>(os_type: GuestOsType, arch: &str, domains: I) -> Self
    where
        I: IntoIterator<Item = VirtType>,
    {
        Self {
            os_type,
            arch: GuestArch {
                name: arch.to_owned(),
                wordsize: None,
                emulator: None,
                machines: Vec::new(),
                domains: domains
                    .into_iter()
                    .map(|virt_type| GuestDomain { virt_type, emulator: None })
                    .collect(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestArch {
    pub name: String,

    #[serde(default)]
    pub wordsize: Option<u32>,

    /// Default emulator binary for this architecture.
    #[serde(default)]
    pub emulator: Option<String>,

    /// Machine types the emulator accepts.
    #[serde(default)]
    pub machines: Vec<String>,

    /// Hypervisor variants able to run this guest. Order is significant.
    #[serde(default, rename = "domain")]
    pub domains: Vec<GuestDomain>,
}

/// One hypervisor able to run a guest architecture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDomain {
    #[serde(rename = "type")]
    pub virt_type: VirtType,

    /// Overrides the architecture's default emulator, if set.
    #[serde(default)]
    pub emulator: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn host_arch_walks_optional_elements() {
        let mut caps = Capabilities::default();
        assert_eq!(caps.host_arch(), None);

        caps.host = Some(CapabilitiesHost { cpu: None });
        assert_eq!(caps.host_arch(), None);

        caps.host = Some(CapabilitiesHost {
            cpu: Some(CapabilitiesCpu { arch: Some("x86_64".to_owned()) }),
        });
        assert_eq!(caps.host_arch(), Some("x86_64"));
    }

    #[test]
    fn guest_deserializes_from_json() {
        let raw = r#"{
            "os-type": "hvm",
            "arch": {
                "name": "aarch64",
                "machines": ["virt"],
                "domain": [{ "type": "qemu" }, { "type": "kvm" }]
            }
        }"#;
        let guest: CapabilitiesGuest = serde_json::from_str(raw).unwrap();
        assert_eq!(
            guest,
            CapabilitiesGuest {
                arch: GuestArch {
                    machines: vec!["virt".to_owned()],
                    ..CapabilitiesGuest::new(
                        GuestOsType::Hvm,
                        "aarch64",
                        [VirtType::Qemu, VirtType::Kvm],
                    )
                    .arch
                },
                ..CapabilitiesGuest::new(GuestOsType::Hvm, "aarch64", [])
            }
        );
    }
}
