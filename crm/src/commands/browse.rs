// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use crate::error::Error;

/// Launch the interactive browser (spec §4.6) over the full catalog.
pub async fn handle(catalog: &catalog::Catalog, install_root: PathBuf) -> Result<(), Error> {
    let resources = catalog.iter_resources(None).await;
    browser::run_browser(resources, install_root).await.map_err(Error::from)
}
