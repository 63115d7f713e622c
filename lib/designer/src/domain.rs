// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The designer itself.

use std::sync::Arc;

use designer_types::caps::Capabilities;
use designer_types::domain::{DomainConfig, DomainDisk, DomainOs};
use designer_types::osinfo::{Os, Platform};
use designer_types::{DiskType, GuestOsType};
use slog::{debug, info, Logger};

use crate::caps::{self, CONTAINER_MODES, MACHINE_MODES};
use crate::deployment::DeploymentCache;
use crate::target::DiskTargets;
use crate::{arch, bus, DesignError, OsDatabase};

/// Emulation backend every designed disk is opened with.
const DISK_DRIVER: &str = "qemu";

/// Builds up a [`DomainConfig`] for running one OS on one platform on this
/// host.
///
/// The OS, platform and capabilities are fixed for the designer's lifetime.
/// Operations that fail leave the configuration as it was.
pub struct DomainDesigner {
    log: Logger,
    config: DomainConfig,
    os: Arc<Os>,
    platform: Arc<Platform>,
    caps: Arc<Capabilities>,
    deployments: DeploymentCache,
    targets: DiskTargets,
}

impl DomainDesigner {
    pub fn new(
        log: Logger,
        db: Arc<dyn OsDatabase>,
        os: Arc<Os>,
        platform: Arc<Platform>,
        caps: Arc<Capabilities>,
    ) -> Self {
        Self {
            log,
            config: DomainConfig::new(),
            os,
            platform,
            caps,
            deployments: DeploymentCache::new(db),
            targets: DiskTargets::new(),
        }
    }

    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    /// Consumes the designer, yielding the configuration it built.
    pub fn into_config(self) -> DomainConfig {
        self.config
    }

    pub fn os(&self) -> &Arc<Os> {
        &self.os
    }

    pub fn platform(&self) -> &Arc<Platform> {
        &self.platform
    }

    pub fn capabilities(&self) -> &Arc<Capabilities> {
        &self.caps
    }

    /// Whether the host can run a machine of its native architecture.
    pub fn supports_machine(&self) -> bool {
        let arch = arch::host_arch(&self.caps);
        caps::find_guest(&self.caps, &arch, MACHINE_MODES).is_some()
    }

    pub fn supports_machine_full(
        &self,
        arch: &str,
        os_type: GuestOsType,
    ) -> bool {
        caps::find_guest(&self.caps, arch, &[os_type]).is_some()
    }

    /// Whether the host can run a container of its native architecture.
    pub fn supports_container(&self) -> bool {
        let arch = arch::host_arch(&self.caps);
        caps::find_guest(&self.caps, &arch, CONTAINER_MODES).is_some()
    }

    pub fn supports_container_full(&self, arch: &str) -> bool {
        caps::find_guest(&self.caps, arch, CONTAINER_MODES).is_some()
    }

    /// Sets the domain up as a machine of the host's native architecture,
    /// using any machine guest type the host offers.
    pub fn setup_machine(&mut self) -> Result<(), DesignError> {
        let arch = arch::host_arch(&self.caps);
        self.setup_guest(&arch, MACHINE_MODES, || {
            DesignError::NoMachineForArch { arch: arch.clone(), os_type: None }
        })
    }

    /// Sets the domain up as a machine of architecture `arch` running as
    /// guest type `os_type`.
    pub fn setup_machine_full(
        &mut self,
        arch: &str,
        os_type: GuestOsType,
    ) -> Result<(), DesignError> {
        self.setup_guest(arch, &[os_type], || DesignError::NoMachineForArch {
            arch: arch.to_owned(),
            os_type: Some(os_type),
        })
    }

    /// Sets the domain up as a container of the host's native architecture.
    pub fn setup_container(&mut self) -> Result<(), DesignError> {
        let arch = arch::host_arch(&self.caps);
        self.setup_guest(&arch, CONTAINER_MODES, || {
            DesignError::NoContainerForArch { arch: arch.clone() }
        })
    }

    pub fn setup_container_full(
        &mut self,
        arch: &str,
    ) -> Result<(), DesignError> {
        self.setup_guest(arch, CONTAINER_MODES, || {
            DesignError::NoContainerForArch { arch: arch.to_owned() }
        })
    }

    fn setup_guest(
        &mut self,
        arch: &str,
        modes: &[GuestOsType],
        not_found: impl FnOnce() -> DesignError,
    ) -> Result<(), DesignError> {
        let guest =
            caps::find_guest(&self.caps, arch, modes).ok_or_else(not_found)?;
        let domain = caps::best_domain(guest)?;

        info!(self.log, "selected guest";
            "os_type" => %guest.os_type,
            "arch" => arch,
            "virt_type" => %domain.virt_type);
        self.config.set_os(DomainOs::new(guest.os_type, arch));
        self.config.set_virt_type(domain.virt_type);
        Ok(())
    }

    /// Attaches an image file as a disk. The image format is left for the
    /// hypervisor to probe when `format` is `None`.
    pub fn add_disk_file(
        &mut self,
        path: &str,
        format: Option<&str>,
    ) -> Result<DomainDisk, DesignError> {
        self.add_disk_full(DiskType::File, path, format, None)
    }

    /// Attaches a host block device as a raw disk.
    pub fn add_disk_device(
        &mut self,
        path: &str,
    ) -> Result<DomainDisk, DesignError> {
        self.add_disk_full(DiskType::Block, path, Some("raw"), None)
    }

    /// Attaches a disk on the bus the OS prefers on this platform.
    ///
    /// The guest device name is `target` if given, and otherwise the next
    /// unused name on the chosen bus. Returns the disk as attached.
    pub fn add_disk_full(
        &mut self,
        disk_type: DiskType,
        path: &str,
        format: Option<&str>,
        target: Option<&str>,
    ) -> Result<DomainDisk, DesignError> {
        let (bus, bus_type) = bus::select_disk_bus(
            &self.log,
            &mut self.deployments,
            &self.os,
            &self.platform,
        )?;

        let mut disk = DomainDisk::new(disk_type, path, DISK_DRIVER);
        if let Some(format) = format {
            disk.set_driver_format(format);
        }
        disk.set_target_bus(bus);

        let target = match target {
            Some(target) => target.to_owned(),
            None => self
                .targets
                .next_target(bus)
                .ok_or(DesignError::NoTargetName(bus))?,
        };
        disk.set_target_dev(target);

        debug!(self.log, "attaching disk";
            "source" => path,
            "bus" => %bus,
            "bus_type" => bus_type,
            "target" => disk.target_dev.as_deref());
        self.config.add_device(disk.clone().into());
        Ok(disk)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::osinfo::MockOsDatabase;
    use crate::testutil;
    use designer_types::caps::CapabilitiesGuest;
    use designer_types::osinfo::{Deployment, Device, DeviceLink};
    use designer_types::{DiskBus, VirtType};

    fn no_deployments() -> Arc<dyn OsDatabase> {
        let mut db = MockOsDatabase::new();
        db.expect_find_deployment().returning(|_, _| None);
        Arc::new(db)
    }

    fn designer(
        caps: Capabilities,
        os: Arc<Os>,
        db: Arc<dyn OsDatabase>,
    ) -> DomainDesigner {
        DomainDesigner::new(
            testutil::test_logger(),
            db,
            os,
            testutil::platform(),
            Arc::new(caps),
        )
    }

    fn kvm_host() -> Capabilities {
        testutil::caps(
            "x86_64",
            vec![
                CapabilitiesGuest::new(
                    GuestOsType::Hvm,
                    "x86_64",
                    [VirtType::Qemu, VirtType::Kvm],
                ),
                CapabilitiesGuest::new(
                    GuestOsType::Hvm,
                    "i686",
                    [VirtType::Qemu],
                ),
                CapabilitiesGuest::new(
                    GuestOsType::Exe,
                    "x86_64",
                    [VirtType::Lxc],
                ),
                CapabilitiesGuest::new(GuestOsType::Xen, "aarch64", []),
            ],
        )
    }

    #[test]
    fn setup_machine_uses_host_arch() {
        let mut d = designer(
            kvm_host(),
            testutil::os_with_block_buses(&["virtio"]),
            no_deployments(),
        );
        assert!(d.supports_machine());
        d.setup_machine().unwrap();

        let config = d.config();
        assert_eq!(
            config.os,
            Some(DomainOs::new(GuestOsType::Hvm, "x86_64"))
        );
        assert_eq!(config.virt_type, Some(VirtType::Kvm));
    }

    #[test]
    fn host_arch_is_normalized() {
        let caps = testutil::caps(
            "i386",
            vec![CapabilitiesGuest::new(
                GuestOsType::Hvm,
                "i686",
                [VirtType::Qemu],
            )],
        );
        let mut d = designer(
            caps,
            testutil::os_with_block_buses(&[]),
            no_deployments(),
        );
        d.setup_machine().unwrap();
        assert_eq!(d.config().os.as_ref().unwrap().arch, "i686");
        assert_eq!(d.config().virt_type, Some(VirtType::Qemu));
    }

    #[test]
    fn second_setup_overwrites_first() {
        let mut d = designer(
            kvm_host(),
            testutil::os_with_block_buses(&[]),
            no_deployments(),
        );
        d.setup_machine_full("x86_64", GuestOsType::Hvm).unwrap();
        d.setup_machine_full("i686", GuestOsType::Hvm).unwrap();

        assert_eq!(
            d.config().os,
            Some(DomainOs::new(GuestOsType::Hvm, "i686"))
        );
        assert_eq!(d.config().virt_type, Some(VirtType::Qemu));
    }

    #[test]
    fn failed_setup_leaves_config_alone() {
        let mut d = designer(
            kvm_host(),
            testutil::os_with_block_buses(&[]),
            no_deployments(),
        );
        d.setup_machine().unwrap();
        let before = d.config().clone();

        let err = d.setup_machine_full("x86_64", GuestOsType::Xen).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to find machine type for architecture x86_64 and OS type xen"
        );

        // The guest exists but offers no hypervisor.
        assert!(d.supports_machine_full("aarch64", GuestOsType::Xen));
        assert!(matches!(
            d.setup_machine_full("aarch64", GuestOsType::Xen),
            Err(DesignError::NoVariant { .. })
        ));

        assert_eq!(d.config(), &before);
    }

    #[test]
    fn container_setup() {
        let mut d = designer(
            kvm_host(),
            testutil::os_with_block_buses(&[]),
            no_deployments(),
        );
        assert!(d.supports_container());
        assert!(!d.supports_container_full("i686"));
        d.setup_container().unwrap();
        assert_eq!(
            d.config().os,
            Some(DomainOs::new(GuestOsType::Exe, "x86_64"))
        );
        assert_eq!(d.config().virt_type, Some(VirtType::Lxc));

        match d.setup_container_full("i686") {
            Err(DesignError::NoContainerForArch { arch }) => {
                assert_eq!(arch, "i686")
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn machine_requires_machine_guest() {
        let caps = testutil::caps(
            "x86_64",
            vec![CapabilitiesGuest::new(
                GuestOsType::Exe,
                "x86_64",
                [VirtType::Lxc],
            )],
        );
        let mut d = designer(
            caps,
            testutil::os_with_block_buses(&[]),
            no_deployments(),
        );
        assert!(!d.supports_machine());
        match d.setup_machine() {
            Err(DesignError::NoMachineForArch { arch, os_type }) => {
                assert_eq!(arch, "x86_64");
                assert_eq!(os_type, None);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(d.config(), &DomainConfig::new());
    }

    #[test]
    fn disks_get_sequential_targets() {
        let mut d = designer(
            kvm_host(),
            testutil::os_with_block_buses(&["virtio"]),
            no_deployments(),
        );

        let disk = d.add_disk_file("/vm/a.qcow2", Some("qcow2")).unwrap();
        assert_eq!(disk.driver_name, "qemu");
        assert_eq!(disk.driver_format.as_deref(), Some("qcow2"));
        assert_eq!(disk.target_bus, Some(DiskBus::Virtio));
        assert_eq!(disk.target_dev.as_deref(), Some("vda"));

        let disk = d.add_disk_file("/vm/b.img", None).unwrap();
        assert_eq!(disk.driver_format, None);
        assert_eq!(disk.target_dev.as_deref(), Some("vdb"));

        let disk = d.add_disk_device("/dev/sdb").unwrap();
        assert_eq!(disk.disk_type, DiskType::Block);
        assert_eq!(disk.driver_format.as_deref(), Some("raw"));
        assert_eq!(disk.target_dev.as_deref(), Some("vdc"));

        let targets: Vec<_> = d
            .config()
            .disks()
            .map(|disk| disk.target_dev.as_deref().unwrap())
            .collect();
        assert_eq!(targets, ["vda", "vdb", "vdc"]);
    }

    #[test]
    fn explicit_target_does_not_consume_a_name() {
        let mut d = designer(
            kvm_host(),
            testutil::os_with_block_buses(&["ide"]),
            no_deployments(),
        );

        let disk = d
            .add_disk_full(DiskType::File, "/vm/a.img", None, Some("hdz"))
            .unwrap();
        assert_eq!(disk.target_dev.as_deref(), Some("hdz"));
        let disk = d.add_disk_file("/vm/b.img", None).unwrap();
        assert_eq!(disk.target_bus, Some(DiskBus::Ide));
        assert_eq!(disk.target_dev.as_deref(), Some("hda"));
    }

    #[test]
    fn deployment_is_resolved_once_across_disks() {
        let mut db = MockOsDatabase::new();
        db.expect_find_deployment().times(1).returning(|os, platform| {
            Some(Deployment {
                id: "dep".to_owned(),
                os_id: os.id.clone(),
                platform_id: platform.id.clone(),
                links: vec![DeviceLink::new(Device::new(
                    "ahci",
                    "block",
                    Some("sata"),
                ))],
            })
        });
        let mut d = designer(
            kvm_host(),
            testutil::os_with_block_buses(&["ide", "virtio"]),
            Arc::new(db),
        );

        for expected in ["sda", "sdb", "sdc"] {
            let disk = d.add_disk_file("/vm/x.img", None).unwrap();
            assert_eq!(disk.target_bus, Some(DiskBus::Sata));
            assert_eq!(disk.target_dev.as_deref(), Some(expected));
        }
    }

    #[test]
    fn failed_attach_leaves_config_alone() {
        let mut d = designer(
            kvm_host(),
            testutil::os_with_block_buses(&[]),
            no_deployments(),
        );
        assert!(matches!(
            d.add_disk_file("/vm/a.img", None),
            Err(DesignError::NoDiskBus { cause: Some(_) })
        ));
        assert_eq!(d.config().devices.len(), 0);
    }
}
