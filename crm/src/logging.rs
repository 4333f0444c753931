// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Logging setup (spec §6 `CRM_LOG_LEVEL`). `--quiet`/`--verbose` take
//! precedence over the environment variable, matching the teacher's
//! `--verbose`-overrides-everything posture in `boulder::cli::Global`.

use log::LevelFilter;

use crate::cli::Global;

pub fn init(global: &Global) {
    let level = if global.quiet {
        LevelFilter::Error
    } else if global.verbose {
        LevelFilter::Debug
    } else {
        std::env::var("CRM_LOG_LEVEL").ok().and_then(|raw| raw.parse().ok()).unwrap_or(LevelFilter::Info)
    };

    env_logger::Builder::new().filter_level(level).format_timestamp(None).format_target(false).init();
}
