// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use clap::Args;
use search::{Index, Mode, DEFAULT_FUZZY_THRESHOLD};
use tui::Styled;

use crate::error::Error;

const RESULT_LIMIT: usize = 50;

#[derive(Debug, Args)]
pub struct Command {
    pub query: String,
}

/// One-shot smart search (spec §6), printing ranked results to stdout.
pub async fn handle(catalog: &catalog::Catalog, args: Command, color: bool) -> Result<(), Error> {
    let resources = catalog.iter_resources(None).await;
    let mut index = Index::new();
    index.rebuild(resources);

    let hits = index.search(&args.query, Mode::Smart, RESULT_LIMIT, DEFAULT_FUZZY_THRESHOLD);

    if hits.is_empty() {
        println!("no matches for {:?}", args.query);
        return Ok(());
    }

    for hit in hits {
        let id = hit.resource.id.to_string();
        let id = if color { id.bold().to_string() } else { id };
        println!("{:>3}  {:<10} {}  {}", hit.score, hit.resource.kind, id, hit.resource.summary);
    }

    Ok(())
}
