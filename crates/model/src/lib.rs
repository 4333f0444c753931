// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Shared data types for the catalog manager: the typed records every other
//! crate in this workspace builds on, plus the closed error kinds they raise.

pub mod category;
pub mod error;
pub mod id;
pub mod index;
pub mod kind;
pub mod plan;
pub mod resource;
pub mod search;

pub use category::Category;
pub use error::{
    CacheError, CyclicDependencyError, DecodeError, DependencyDepthError, MissingDependencyError, NetworkError, NotFoundError,
    PathSecurityError, UserCancelled, ValidationError,
};
pub use id::ResourceId;
pub use index::{CatalogIndex, RawCatalogIndex};
pub use kind::Kind;
pub use plan::{InstallPlan, InstallRecord};
pub use resource::{Dependency, MetadataValue, RawDependencies, RawDependency, RawResource, RawSource, Resource, Source};
pub use search::{MatchKind, SearchHit};
