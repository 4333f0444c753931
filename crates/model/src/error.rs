// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Closed error kinds shared across crates (spec §7). Each crate's own
//! `Error` enum wraps the kinds it can raise with `#[from]`; these types
//! carry no crate-specific context so they can cross boundaries cleanly.

use std::fmt;

use thiserror::Error;

use crate::id::ResourceId;
use crate::kind::Kind;

/// A field failed schema validation while loading a descriptor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("field {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

/// A descriptor file or resource id could not be found.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("not found: {0}")]
pub struct NotFoundError(pub String);

/// A descriptor's bytes were not valid UTF-8.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{path}: not valid UTF-8")]
pub struct DecodeError {
    pub path: String,
}

/// A reference to this resource exists in its own `required` closure (I4).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct CyclicDependencyError {
    pub path: Vec<ResourceId>,
}

impl fmt::Display for CyclicDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.path.iter().map(ResourceId::as_str).collect::<Vec<_>>().join(" -> ");
        write!(f, "cyclic dependency: {rendered}")
    }
}

/// The required-dependency chain exceeded the configured maximum depth.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct DependencyDepthError {
    pub max_depth: usize,
    pub chain: Vec<ResourceId>,
}

impl fmt::Display for DependencyDepthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependency chain exceeds max depth {}: {} entries", self.max_depth, self.chain.len())
    }
}

/// A `required` or `recommended` reference named a resource the loader could
/// not find.
#[derive(Debug, Clone, Error, PartialEq, Eq, Hash)]
#[error("missing dependency {id} ({kind})")]
pub struct MissingDependencyError {
    pub id: ResourceId,
    pub kind: Kind,
}

/// An `install_path` resolved outside the install root, or through a
/// symlinked component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{path} is not a safe install path: {reason}")]
pub struct PathSecurityError {
    pub path: String,
    pub reason: String,
}

/// A transport-level fetch failure, possibly retryable.
#[derive(Debug, Error)]
#[error("network error fetching {url}: {message}")]
pub struct NetworkError {
    pub url: String,
    pub message: String,
    pub retry_after: Option<std::time::Duration>,
}

/// The on-disk descriptor cache could not be read or written.
#[derive(Debug, Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// The user cancelled an in-flight operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cancelled")]
pub struct UserCancelled;
