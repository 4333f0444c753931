// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

mod cli;
mod commands;
mod error;
mod logging;
mod lookup;

use std::process::ExitCode;

/// Main entry point
#[tokio::main]
async fn main() -> ExitCode {
    match cli::process().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("crm: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
