// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::kind::Kind;

/// The catalog root record: `<catalog>/index.yaml` (spec §3, §6).
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    pub total: usize,
    pub types: HashMap<Kind, usize>,
    pub last_updated: Option<DateTime<Utc>>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCatalogIndex {
    pub total: usize,
    #[serde(default)]
    pub types: HashMap<String, usize>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<String>,
}

impl CatalogIndex {
    pub fn from_raw(raw: RawCatalogIndex) -> Result<CatalogIndex, ValidationError> {
        let mut types = HashMap::with_capacity(raw.types.len());
        for (name, count) in raw.types {
            let kind = Kind::ALL
                .into_iter()
                .find(|k| k.to_string() == name)
                .ok_or_else(|| ValidationError::new("types", format!("{name:?} is not a known resource kind")))?;
            types.insert(kind, count);
        }

        Ok(CatalogIndex { total: raw.total, types, last_updated: raw.last_updated, version: raw.version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_type_key() {
        let raw = RawCatalogIndex { total: 1, types: HashMap::from([("gadget".to_string(), 1)]), last_updated: None, version: None };
        assert!(CatalogIndex::from_raw(raw).is_err());
    }

    #[test]
    fn accepts_known_kinds() {
        let raw = RawCatalogIndex { total: 2, types: HashMap::from([("agent".to_string(), 2)]), last_updated: None, version: None };
        let index = CatalogIndex::from_raw(raw).unwrap();
        assert_eq!(index.types.get(&Kind::Agent), Some(&2));
    }
}
