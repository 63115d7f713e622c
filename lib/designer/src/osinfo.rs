// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use designer_types::osinfo::{Database, Deployment, Os, Platform};

/// The OS/platform knowledge base, as seen by the designer.
///
/// Lookups may block (e.g. on a database load); the designer calls
/// [`OsDatabase::find_deployment`] at most once per successful resolution.
#[cfg_attr(test, mockall::automock)]
pub trait OsDatabase {
    /// Finds the deployment correlating `os` with `platform`, if any.
    fn find_deployment(&self, os: &Os, platform: &Platform)
        -> Option<Deployment>;
}

impl OsDatabase for Database {
    fn find_deployment(
        &self,
        os: &Os,
        platform: &Platform,
    ) -> Option<Deployment> {
        Database::find_deployment(self, os, platform).cloned()
    }
}
