// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Abstract accessibility live-region (spec §4.6, §7). The browser never
//! assumes a concrete screen reader; it only ever emits short textual
//! announcements through this trait.

/// A consumer of short textual state-change announcements.
pub trait AnnounceSink {
    fn announce(&self, message: &str);
}

/// Default sink: routes every announcement through the `log` facade at
/// `info`, matching the rest of the workspace's ambient logging.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl AnnounceSink for LoggingSink {
    fn announce(&self, message: &str) {
        log::info!("{message}");
    }
}
