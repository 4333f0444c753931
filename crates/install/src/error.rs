// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use model::{NetworkError, PathSecurityError, UserCancelled};

/// Failure modes raised by the installer (spec §4.5, §7).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    PathSecurity(#[from] PathSecurityError),
    #[error(transparent)]
    Cancelled(#[from] UserCancelled),
    #[error("i/o error at {path}: {message}")]
    Io { path: String, message: String },
    #[error("plan for {target} is incomplete: {missing} missing required reference(s)")]
    IncompletePlan { target: String, missing: usize },
}

/// Whether a fetch failure should be retried (spec §4.5 retry policy).
#[derive(Debug)]
pub enum FetchError {
    Terminal(Error),
    Retryable(Error),
}

impl From<FetchError> for Error {
    fn from(value: FetchError) -> Self {
        match value {
            FetchError::Terminal(e) | FetchError::Retryable(e) => e,
        }
    }
}
