// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Resolving a bare CLI-supplied id string to a catalog [`model::Resource`].
//! Ids are unique per kind but not across kinds (spec §3 I1), so every kind
//! is probed in turn.

use model::{Kind, Resource, ResourceId};

use crate::error::Error;

pub async fn find_resource(catalog: &catalog::Catalog, raw_id: &str) -> Result<Resource, Error> {
    let id = ResourceId::parse(raw_id)?;

    for kind in Kind::ALL {
        match catalog.get_resource(&id, kind).await {
            Ok(resource) => return Ok(resource),
            Err(catalog::Error::NotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::NotFound(raw_id.to_string()))
}
