// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use model::{DecodeError, NotFoundError, ValidationError};

/// Failure modes raised by the catalog loader (spec §4.1, §7). `Clone` so
/// the coalesced in-flight load (a `futures_util::future::Shared`) can hand
/// the same outcome to every waiter.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("i/o error reading {path}: {message}")]
    Io { path: String, message: String },
    #[error("cancelled")]
    Cancelled,
}
