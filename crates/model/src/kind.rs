// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the five kinds of catalog resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Agent,
    Command,
    Hook,
    Template,
    Mcp,
}

impl Kind {
    pub const ALL: [Kind; 5] = [Kind::Agent, Kind::Command, Kind::Hook, Kind::Template, Kind::Mcp];

    /// The name of the catalog subdirectory holding this kind's descriptors,
    /// e.g. `agents/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            Kind::Agent => "agents",
            Kind::Command => "commands",
            Kind::Hook => "hooks",
            Kind::Template => "templates",
            Kind::Mcp => "mcps",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.dir_name() == name)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Agent => "agent",
            Kind::Command => "command",
            Kind::Hook => "hook",
            Kind::Template => "template",
            Kind::Mcp => "mcp",
        };
        f.write_str(s)
    }
}
