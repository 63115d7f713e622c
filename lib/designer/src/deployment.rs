// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Memoized deployment lookup for one design.

use std::sync::Arc;

use designer_types::osinfo::{
    Deployment, DeviceFilter, DeviceLink, Os, Platform, PROP_CLASS,
};
use slog::{debug, Logger};

use crate::{DesignError, OsDatabase};

/// Resolves the deployment of the designed OS on the designed platform the
/// first time it is needed, then reuses it.
///
/// A failed lookup is not remembered, so a later call asks the knowledge base
/// again.
pub struct DeploymentCache {
    db: Arc<dyn OsDatabase>,
    resolved: Option<Deployment>,
}

impl DeploymentCache {
    pub fn new(db: Arc<dyn OsDatabase>) -> Self {
        Self { db, resolved: None }
    }

    /// The deployment, if it has been resolved already.
    pub fn resolved(&self) -> Option<&Deployment> {
        self.resolved.as_ref()
    }

    pub fn deployment(
        &mut self,
        log: &Logger,
        os: &Os,
        platform: &Platform,
    ) -> Result<&Deployment, DesignError> {
        let deployment = match self.resolved.take() {
            Some(deployment) => deployment,
            None => {
                let found =
                    self.db.find_deployment(os, platform).ok_or_else(|| {
                        DesignError::DeploymentNotFound {
                            os: os.id.clone(),
                            platform: platform.id.clone(),
                        }
                    })?;
                debug!(log, "resolved deployment";
                    "deployment" => &found.id,
                    "os" => &os.id,
                    "platform" => &platform.id);
                found
            }
        };
        Ok(self.resolved.insert(deployment))
    }

    /// Returns the deployment's most preferred device of class `class`.
    pub fn preferred_device_link(
        &mut self,
        log: &Logger,
        os: &Os,
        platform: &Platform,
        class: &str,
    ) -> Result<Option<&DeviceLink>, DesignError> {
        let filter = DeviceFilter::new().add_constraint(PROP_CLASS, class);
        let deployment = self.deployment(log, os, platform)?;
        Ok(deployment.preferred_device_link(&filter))
    }
}
