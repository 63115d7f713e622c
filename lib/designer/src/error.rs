// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use designer_types::{DiskBus, GuestOsType};
use thiserror::Error;

/// Errors returned by [`crate::DomainDesigner`] operations.
///
/// An operation that fails leaves the domain configuration untouched.
#[derive(Debug, Error)]
pub enum DesignError {
    #[error(
        "unable to find machine type for architecture {arch}{}",
        os_type_suffix(.os_type)
    )]
    NoMachineForArch { arch: String, os_type: Option<GuestOsType> },

    #[error("unable to find container type for architecture {arch}")]
    NoContainerForArch { arch: String },

    #[error("unable to find any domain for guest arch {arch}")]
    NoVariant { arch: String },

    #[error("unable to find deployment of OS {os} on platform {platform}")]
    DeploymentNotFound { os: String, platform: String },

    #[error("unable to find any disk bus type")]
    NoDiskBus {
        #[source]
        cause: Option<Box<DesignError>>,
    },

    #[error("unsupported disk bus type '{0}'")]
    UnsupportedBus(String),

    #[error("unable to generate target name for bus '{0}'")]
    NoTargetName(DiskBus),
}

fn os_type_suffix(os_type: &Option<GuestOsType>) -> String {
    match os_type {
        Some(os_type) => format!(" and OS type {os_type}"),
        None => String::new(),
    }
}
