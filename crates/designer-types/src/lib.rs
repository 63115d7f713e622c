// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fundamental types shared by the designer crates.
//!
//! This crate defines the documents the designer reads (host capabilities and
//! the OS/platform knowledge base) and the document it writes (the domain
//! configuration), along with the small enums used by all of them, so that the
//! library, the TOML loaders, and the CLI can share them without any layering
//! oddities.

use serde::{Deserialize, Serialize};

pub mod caps;
pub mod domain;
pub mod osinfo;

/// The kind of guest a hypervisor offers for a given architecture.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GuestOsType {
    /// Fully virtualized machine.
    Hvm,
    /// Paravirtualized Linux guest.
    Linux,
    /// Xen paravirtualized guest.
    Xen,
    /// User-mode Linux.
    Uml,
    /// Container running a host executable.
    Exe,
}

/// Hypervisor (domain) type offered for a guest architecture.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VirtType {
    Qemu,
    Kqemu,
    Kvm,
    Xen,
    Lxc,
    Uml,
    Openvz,
    Vserver,
    Ldom,
    Test,
    Vmware,
    Hyperv,
    Vbox,
    Phyp,
    Bhyve,
}

/// Bus a disk is attached to inside the guest.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiskBus {
    Ide,
    Fdc,
    Scsi,
    Virtio,
    Xen,
    Usb,
    Uml,
    Sata,
}

/// Where a disk's contents come from on the host.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiskType {
    /// A regular image file.
    File,
    /// A host block device.
    Block,
    Dir,
    Network,
}
