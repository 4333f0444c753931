// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The identifier of a [`crate::Resource`]: non-empty, lowercase,
/// alphanumeric plus `-`/`_`, unique within its [`crate::Kind`] (I1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(ValidationError::new("id", "must not be empty"));
        }

        if !raw.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
            return Err(ValidationError::new(
                "id",
                format!("{raw:?} must be lowercase alphanumeric plus '-'/'_'"),
            ));
        }

        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hyphen-delimited segments of this id, used by the categorizer.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('-')
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert!(ResourceId::parse("").is_err());
    }

    #[test]
    fn rejects_uppercase() {
        assert!(ResourceId::parse("Architect").is_err());
    }

    #[test]
    fn accepts_hyphen_and_underscore() {
        assert!(ResourceId::parse("code-archaeologist_v2").is_ok());
    }

    #[test]
    fn segments_split_on_hyphen() {
        let id = ResourceId::parse("arch-linux-tuner").unwrap();
        assert_eq!(id.segments().collect::<Vec<_>>(), vec!["arch", "linux", "tuner"]);
    }
}
