// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! CLI surface (spec §6), following the teacher's `boulder::cli` shape: a
//! derive `Parser` with a flattened `Global` and a `Subcommand` enum, one
//! module per subcommand.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand as ClapSubcommand};

use crate::commands::{browse, deps, install, search};
use crate::error::Error;

#[derive(Debug, Parser)]
#[command(name = "crm", about = "Browse, search, and install catalog resources")]
pub struct Command {
    #[command(flatten)]
    pub global: Global,
    #[command(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(Debug, Args)]
pub struct Global {
    #[arg(long, global = true, env = "CRM_CATALOG", help = "Path to the catalog root")]
    pub catalog: Option<PathBuf>,
    #[arg(long, global = true, env = "CRM_INSTALL_ROOT", help = "Path to the install root")]
    pub install_root: Option<PathBuf>,
    #[arg(long, global = true, help = "Disable ANSI styling")]
    pub no_color: bool,
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Global {
    pub fn color_enabled(&self) -> bool {
        !self.no_color && std::env::var_os("NO_COLOR").is_none()
    }
}

#[derive(Debug, ClapSubcommand)]
pub enum Subcommand {
    /// Launch the interactive browser
    Browse,
    /// One-shot smart search
    Search(search::Command),
    /// Headless install of a resource and its required dependencies
    Install(install::Command),
    /// Print dependency or reverse-dependency information
    Deps(deps::Command),
}

pub async fn process() -> Result<(), Error> {
    let command = Command::parse();
    crate::logging::init(&command.global);
    let color = command.global.color_enabled();

    let catalog_root = command.global.catalog.clone().unwrap_or_else(default_catalog_root);
    let install_root = command.global.install_root.clone().unwrap_or_else(default_install_root);
    let catalog = catalog::Catalog::new(catalog_root);

    match command.subcommand {
        Subcommand::Browse => browse::handle(&catalog, install_root).await,
        Subcommand::Search(args) => search::handle(&catalog, args, color).await,
        Subcommand::Install(args) => install::handle(&catalog, install_root, args).await,
        Subcommand::Deps(args) => deps::handle(&catalog, args).await,
    }
}

fn default_catalog_root() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".claude-catalog")
}

fn default_install_root() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".claude")
}
