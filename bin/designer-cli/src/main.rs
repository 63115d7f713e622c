// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use designer::caps::{find_guest, MACHINE_MODES};
use designer::{arch, DesignError, DomainDesigner};
use designer_config_toml::{Config, DesignKind};
use designer_types::caps::Capabilities;
use designer_types::domain::DomainConfig;
use designer_types::osinfo::Database;
use designer_types::{DiskType, GuestOsType};
use slog::{info, o, Drain, Level, Logger};

#[derive(Debug, Parser)]
#[clap(about, version)]
/// Designs domain configurations for the guests this host can run
struct Opt {
    /// Host capabilities document (TOML)
    #[clap(short, long, action)]
    capabilities: PathBuf,

    /// OS and platform knowledge base (TOML)
    #[clap(long, action)]
    database: PathBuf,

    /// Enable debugging
    #[clap(short, long, action)]
    debug: bool,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Design a domain from a request file and print its configuration
    Design {
        /// Design request (TOML)
        #[clap(action)]
        request: PathBuf,

        /// Output format
        #[clap(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Report whether this host can run the given guest
    Supports {
        /// OS id or short id
        #[clap(long, action)]
        os: String,

        /// Platform id or short id
        #[clap(long, action)]
        platform: String,

        /// Guest architecture (defaults to the host's)
        #[clap(long, action)]
        arch: Option<String>,

        /// Guest OS type, for machines
        #[clap(long, conflicts_with = "container")]
        os_type: Option<GuestOsType>,

        /// Ask about a container rather than a machine
        #[clap(long, action)]
        container: bool,
    },
}

#[derive(Clone, Copy, Debug, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
enum OutputFormat {
    Json,
    Toml,
}

fn create_logger(opt: &Opt) -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let level = if opt.debug { Level::Debug } else { Level::Info };
    let drain = slog::LevelFilter(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

fn new_designer(
    log: &Logger,
    db: &Arc<Database>,
    caps: &Arc<Capabilities>,
    os: &str,
    platform: &str,
) -> anyhow::Result<DomainDesigner> {
    let os = db.os(os).ok_or_else(|| anyhow!("unknown OS {os:?}"))?;
    let platform = db
        .platform(platform)
        .ok_or_else(|| anyhow!("unknown platform {platform:?}"))?;
    let log = log.new(o!(
        "os" => os.id.clone(),
        "platform" => platform.id.clone(),
    ));

    Ok(DomainDesigner::new(log, db.clone(), os, platform, caps.clone()))
}

fn design(
    log: &Logger,
    db: &Arc<Database>,
    caps: &Arc<Capabilities>,
    request: &Config,
) -> anyhow::Result<DomainConfig> {
    let req = &request.design;
    let mut designer = new_designer(log, db, caps, &req.os, &req.platform)?;

    let arch = req.arch.as_deref().map(arch::normalize);
    match (req.kind, arch) {
        (DesignKind::Container, None) => designer.setup_container()?,
        (DesignKind::Container, Some(arch)) => {
            designer.setup_container_full(&arch)?
        }
        (DesignKind::Machine, None) if req.os_type.is_none() => {
            designer.setup_machine()?
        }
        (DesignKind::Machine, arch) => {
            let arch = arch.unwrap_or_else(|| arch::host_arch(caps));
            let os_type = match req.os_type {
                Some(os_type) => os_type,
                None => find_guest(caps, &arch, MACHINE_MODES)
                    .map(|guest| guest.os_type)
                    .ok_or_else(|| DesignError::NoMachineForArch {
                        arch: arch.clone(),
                        os_type: None,
                    })?,
            };
            designer.setup_machine_full(&arch, os_type)?
        }
    }

    for disk in request.disks.iter() {
        let format = match disk.disk_type {
            DiskType::Block => Some("raw"),
            _ => disk.format.as_deref(),
        };
        designer
            .add_disk_full(
                disk.disk_type,
                &disk.path,
                format,
                disk.target.as_deref(),
            )
            .with_context(|| format!("failed to attach disk {}", disk.path))?;
    }

    Ok(designer.into_config())
}

#[allow(clippy::too_many_arguments)]
fn supports(
    log: &Logger,
    db: &Arc<Database>,
    caps: &Arc<Capabilities>,
    os: &str,
    platform: &str,
    arch: Option<String>,
    os_type: Option<GuestOsType>,
    container: bool,
) -> anyhow::Result<bool> {
    let designer = new_designer(log, db, caps, os, platform)?;
    let arch = arch.as_deref().map(arch::normalize);

    let supported = match (container, arch, os_type) {
        (true, None, _) => designer.supports_container(),
        (true, Some(arch), _) => designer.supports_container_full(&arch),
        (false, None, None) => designer.supports_machine(),
        (false, arch, Some(os_type)) => {
            let arch = arch.unwrap_or_else(|| arch::host_arch(caps));
            designer.supports_machine_full(&arch, os_type)
        }
        (false, Some(arch), None) => MACHINE_MODES
            .iter()
            .any(|os_type| designer.supports_machine_full(&arch, *os_type)),
    };
    Ok(supported)
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    let log = create_logger(&opt);

    let caps = designer_config_toml::parse_capabilities(&opt.capabilities)
        .with_context(|| {
            format!("failed to load capabilities {}", opt.capabilities.display())
        })?;
    let db = designer_config_toml::parse_database(&opt.database)
        .with_context(|| {
            format!("failed to load knowledge base {}", opt.database.display())
        })?;
    let caps = Arc::new(caps);
    let db = Arc::new(db);

    match opt.cmd {
        Command::Design { request, format } => {
            let req = designer_config_toml::parse(&request).with_context(
                || format!("failed to parse request {}", request.display()),
            )?;
            let config = design(&log, &db, &caps, &req)?;
            info!(log, "design complete";
                "disks" => config.disks().count());

            let out = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&config)?,
                OutputFormat::Toml => toml::to_string(&config)?,
            };
            println!("{out}");
        }
        Command::Supports { os, platform, arch, os_type, container } => {
            let supported = supports(
                &log, &db, &caps, &os, &platform, arch, os_type, container,
            )?;
            println!("{}", if supported { "supported" } else { "unsupported" });
        }
    }

    Ok(())
}
