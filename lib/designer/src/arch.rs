// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CPU architecture names.

use designer_types::caps::Capabilities;

/// Squashes the names different tools use for one architecture into the name
/// hypervisor capabilities report.
pub fn normalize(arch: &str) -> String {
    match arch {
        "i386" | "i486" | "i586" | "i686" => "i686".to_owned(),
        other => other.to_owned(),
    }
}

/// Returns the host's native architecture.
///
/// The capabilities document is authoritative when it names a host CPU
/// architecture. Otherwise the running kernel is asked.
pub fn host_arch(caps: &Capabilities) -> String {
    match caps.host_arch() {
        Some(arch) if !arch.is_empty() => normalize(arch),
        _ => normalize(&machine_arch()),
    }
}

/// The machine hardware name reported by `uname(2)`, or the architecture
/// this program was built for if that fails.
#[cfg(unix)]
fn machine_arch() -> String {
    let mut uts = std::mem::MaybeUninit::<libc::utsname>::zeroed();

    // SAFETY: `uname` only writes into the buffer it is handed.
    if unsafe { libc::uname(uts.as_mut_ptr()) } != 0 {
        return std::env::consts::ARCH.to_owned();
    }
    // SAFETY: `uname` succeeded, so the struct is initialized and `machine`
    // holds a NUL-terminated string.
    let uts = unsafe { uts.assume_init() };
    let machine = unsafe { std::ffi::CStr::from_ptr(uts.machine.as_ptr()) };
    match machine.to_str() {
        Ok(m) if !m.is_empty() => m.to_owned(),
        _ => std::env::consts::ARCH.to_owned(),
    }
}

#[cfg(not(unix))]
fn machine_arch() -> String {
    std::env::consts::ARCH.to_owned()
}
