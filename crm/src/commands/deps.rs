// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::HashMap;

use clap::Args;
use model::{Kind, Resource, ResourceId};
use resolve::Resolver;

use crate::error::Error;
use crate::lookup::find_resource;

#[derive(Debug, Args)]
pub struct Command {
    pub id: String,
    #[arg(long)]
    pub reverse: bool,
    #[arg(long)]
    pub tree: bool,
}

/// Print dependency or reverse-dependency information (spec §6 `deps`).
pub async fn handle(catalog: &catalog::Catalog, args: Command) -> Result<(), Error> {
    let resources = catalog.iter_resources(None).await;
    let by_key: HashMap<(Kind, ResourceId), Resource> = resources.iter().map(|r| ((r.kind, r.id.clone()), r.clone())).collect();
    let target = find_resource(catalog, &args.id).await?;
    let resolver = Resolver::new(&by_key);

    if args.reverse {
        let dependents = resolver.reverse_dependents(&target.id, target.kind, resources);
        if dependents.is_empty() {
            println!("nothing depends on {}", target.id);
        }
        for resource in dependents {
            println!("{} ({})", resource.id, resource.kind);
        }
        return Ok(());
    }

    let plan = resolver.resolve(&target)?;

    if args.tree {
        for (depth, level) in plan.to_install.iter().enumerate() {
            for resource in level {
                println!("{}{}", "  ".repeat(depth), resource.id);
            }
        }
    } else {
        for id in &plan.order {
            println!("{id}");
        }
    }

    if !plan.missing.is_empty() {
        eprintln!("missing dependencies:");
        for missing in &plan.missing {
            eprintln!("  {missing}");
        }
    }

    Ok(())
}
