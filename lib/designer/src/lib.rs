// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Designs domain configurations for a host.
//!
//! A [`DomainDesigner`] is built from the guest OS and virtualization
//! platform a caller wants to run, the host's capabilities, and a knowledge
//! base describing which devices that OS prefers on that platform. It then
//! picks a guest type and hypervisor the host supports and attaches disks on
//! a bus the guest can drive, under device names that do not collide.

pub extern crate designer_types;

pub mod arch;
pub mod bus;
pub mod caps;
pub mod deployment;
pub mod domain;
pub mod error;
pub mod osinfo;
pub mod target;

pub use domain::DomainDesigner;
pub use error::DesignError;
pub use osinfo::OsDatabase;
