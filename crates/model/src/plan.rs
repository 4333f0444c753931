// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MissingDependencyError;
use crate::id::ResourceId;
use crate::resource::Resource;

/// The ordered, leveled assembly of resources needed to install a target
/// (spec §3, §4.4).
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub target: ResourceId,
    /// `to_install[k]` holds every resource whose longest required-dependency
    /// path has length `k`; each level may be installed in parallel.
    pub to_install: Vec<Vec<Resource>>,
    pub already_installed: HashSet<ResourceId>,
    pub missing: HashSet<MissingDependencyError>,
    pub recommended: Vec<Resource>,
    /// Dependencies-first flattening of `to_install`.
    pub order: Vec<ResourceId>,
}

impl InstallPlan {
    /// A plan is incomplete when any `required` reference could not be
    /// resolved; the installer refuses to execute it without an override.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// One line of the append-only install audit log (`.install-history`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallRecord {
    pub id: ResourceId,
    pub timestamp: DateTime<Utc>,
    pub install_path: String,
    pub source_url: String,
}
