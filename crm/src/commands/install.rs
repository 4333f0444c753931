// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;
use install::{InstallOptions, InstallOutcome, InstallStatus, Installer};
use model::{Kind, Resource, ResourceId};
use resolve::Resolver;

use crate::error::Error;
use crate::lookup::find_resource;

#[derive(Debug, Args)]
pub struct Command {
    pub id: String,
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub skip_dependencies: bool,
    #[arg(long)]
    pub no_recommended: bool,
}

/// Headless install (spec §6 `install`).
pub async fn handle(catalog: &catalog::Catalog, install_root: PathBuf, args: Command) -> Result<(), Error> {
    let target = find_resource(catalog, &args.id).await?;
    let installer = Installer::new(install_root);
    let options = InstallOptions { force: args.force, skip_dependencies: args.skip_dependencies, dry_run: args.dry_run, parallel: true, verify_size: true };

    if args.skip_dependencies {
        let outcome = installer.install(&target, &options).await;
        return report(&[outcome]);
    }

    let resources = catalog.iter_resources(None).await;
    let by_key: HashMap<(Kind, ResourceId), Resource> = resources.iter().map(|r| ((r.kind, r.id.clone()), r.clone())).collect();
    let resolver = Resolver::new(&by_key);
    let plan = resolver.resolve(&target)?;

    for missing in &plan.missing {
        log::warn!("missing dependency: {missing}");
    }

    let mut outcomes = installer.install_plan(&plan, &options).await;

    if !args.no_recommended && !plan.recommended.is_empty() {
        let futures = plan.recommended.iter().map(|resource| installer.install(resource, &options));
        outcomes.extend(futures_util::future::join_all(futures).await);
    }

    report(&outcomes)
}

fn report(outcomes: &[InstallOutcome]) -> Result<(), Error> {
    let mut failure: Option<(String, u8)> = None;

    for outcome in outcomes {
        match &outcome.status {
            InstallStatus::Installed => println!("installed {}", outcome.id),
            InstallStatus::AlreadyInstalled => println!("{} already installed", outcome.id),
            InstallStatus::Skipped => println!("skipped {}", outcome.id),
            InstallStatus::Failed(e) => {
                eprintln!("failed to install {}: {e}", outcome.id);
                if failure.is_none() {
                    failure = Some((e.to_string(), exit_code_for(e)));
                }
            }
        }
    }

    match failure {
        Some((message, code)) => Err(Error::Failed { message, code }),
        None => Ok(()),
    }
}

fn exit_code_for(e: &install::Error) -> u8 {
    match e {
        install::Error::Network(_) => 5,
        install::Error::PathSecurity(_) => 6,
        _ => 1,
    }
}
