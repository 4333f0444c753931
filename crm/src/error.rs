// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Maps every failure the CLI can surface onto the exit codes enumerated in
//! spec §6, the way the teacher's per-subcommand `Error` enums wrap their
//! collaborators' errors with `#[from]` (`boulder::cli::Error`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] catalog::Error),
    #[error(transparent)]
    Resolve(#[from] resolve::ResolveError),
    #[error(transparent)]
    InvalidId(#[from] model::ValidationError),
    #[error("resource {0} not found in catalog")]
    NotFound(String),
    #[error("{message}")]
    Failed { message: String, code: u8 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit code table (spec §6): 1 generic, 2 validation, 3 not found, 4
    /// cycle/depth, 5 network, 6 path-security.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::NotFound(_) => 3,
            Error::InvalidId(_) => 2,
            Error::Catalog(catalog::Error::NotFound(_)) => 3,
            Error::Catalog(catalog::Error::Validation(_) | catalog::Error::Decode(_)) => 2,
            Error::Catalog(catalog::Error::Io { .. } | catalog::Error::Cancelled) => 1,
            Error::Resolve(_) => 4,
            Error::Failed { code, .. } => *code,
            Error::Io(_) => 1,
        }
    }
}
