// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Queries over a host capabilities document.

use designer_types::caps::{Capabilities, CapabilitiesGuest, GuestDomain};
use designer_types::{GuestOsType, VirtType};

use crate::DesignError;

/// Guest types that run a full or paravirtualized machine.
pub const MACHINE_MODES: &[GuestOsType] = &[
    GuestOsType::Hvm,
    GuestOsType::Linux,
    GuestOsType::Xen,
    GuestOsType::Uml,
];

/// Guest types that run a container.
pub const CONTAINER_MODES: &[GuestOsType] = &[GuestOsType::Exe];

/// Returns the first guest, in document order, for `arch` whose OS type is
/// one of `modes`.
///
/// `arch` is compared verbatim; callers normalize it beforehand if needed.
pub fn find_guest<'a>(
    caps: &'a Capabilities,
    arch: &str,
    modes: &[GuestOsType],
) -> Option<&'a CapabilitiesGuest> {
    caps.guests.iter().find(|guest| {
        guest.arch.name == arch && modes.contains(&guest.os_type)
    })
}

/// Picks the hypervisor to run `guest` with.
///
/// For now "best" means KVM when available, and otherwise whatever the host
/// listed first.
pub fn best_domain(
    guest: &CapabilitiesGuest,
) -> Result<&GuestDomain, DesignError> {
    let domains = &guest.arch.domains;
    domains
        .iter()
        .find(|dom| dom.virt_type == VirtType::Kvm)
        .or_else(|| domains.first())
        .ok_or_else(|| DesignError::NoVariant { arch: guest.arch.name.clone() })
}
