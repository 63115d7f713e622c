// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TOML loaders for the documents the designer consumes: design requests,
//! host capabilities, and the OS/platform knowledge base.

use std::path::Path;

use designer_types::caps::Capabilities;
use designer_types::osinfo::Database;
use designer_types::{DiskType, GuestOsType};
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

pub mod database;

pub use database::{DatabaseError, DatabaseFile};

/// A design request: which guest to design for and which disks to attach.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Config {
    pub design: Design,

    #[serde(default, rename = "disk")]
    pub disks: Vec<DiskRequest>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Design {
    /// OS id or short id, as known to the knowledge base.
    pub os: String,

    /// Platform id or short id, as known to the knowledge base.
    pub platform: String,

    #[serde(default)]
    pub kind: DesignKind,

    /// Guest architecture. The host's native architecture when absent.
    #[serde(default)]
    pub arch: Option<String>,

    /// Restricts a machine design to one guest OS type.
    #[serde(default)]
    pub os_type: Option<GuestOsType>,
}

#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DesignKind {
    #[default]
    Machine,
    Container,
}

/// A disk to attach to the designed domain.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct DiskRequest {
    #[serde(rename = "type")]
    pub disk_type: DiskType,

    pub path: String,

    /// Image format. Ignored for block devices, which are always raw.
    #[serde(default)]
    pub format: Option<String>,

    /// Guest device name. Generated from the disk bus when absent.
    #[serde(default)]
    pub target: Option<String>,
}

/// Errors which may be returned when parsing designer configuration.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot parse toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid knowledge base: {0}")]
    Database(#[from] DatabaseError),

    #[error("os-type {0} cannot be used with a container design")]
    OsTypeForContainer(GuestOsType),

    #[error("disk type {0} is not supported, expected file or block")]
    UnsupportedDiskType(DiskType),
}

/// Parses a TOML file into a design request.
pub fn parse<P: AsRef<Path>>(path: P) -> Result<Config, ParseError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

pub fn parse_str(contents: &str) -> Result<Config, ParseError> {
    let cfg = toml::from_str::<Config>(contents)?;
    if cfg.design.kind == DesignKind::Container {
        if let Some(os_type) = cfg.design.os_type {
            return Err(ParseError::OsTypeForContainer(os_type));
        }
    }
    for disk in cfg.disks.iter() {
        if !matches!(disk.disk_type, DiskType::File | DiskType::Block) {
            return Err(ParseError::UnsupportedDiskType(disk.disk_type));
        }
    }
    Ok(cfg)
}

/// Parses a TOML file into a host capabilities document.
pub fn parse_capabilities<P: AsRef<Path>>(
    path: P,
) -> Result<Capabilities, ParseError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let caps = toml::from_str::<Capabilities>(&contents)?;
    Ok(caps)
}

/// Parses a TOML file into an OS/platform knowledge base.
pub fn parse_database<P: AsRef<Path>>(
    path: P,
) -> Result<Database, ParseError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let file = toml::from_str::<DatabaseFile>(&contents)?;
    Ok(Database::try_from(&file)?)
}
