// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

/// A derived label for a resource, never authored (spec §3). See
/// the `categorize` crate for the extraction algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub primary: String,
    pub secondary: Option<String>,
    pub full: String,
    pub tags: Vec<String>,
}
