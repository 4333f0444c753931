// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use model::{CyclicDependencyError, DependencyDepthError};

/// Failure modes raised while building or scheduling an [`model::InstallPlan`].
/// Missing required references are not an error here — they are accumulated
/// into `InstallPlan::missing` instead (spec §4.4).
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Cycle(#[from] CyclicDependencyError),
    #[error(transparent)]
    DepthExceeded(#[from] DependencyDepthError),
}
