// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;
use crate::id::ResourceId;
use crate::kind::Kind;

const DEFAULT_VERSION: &str = "v1.0.0";
const DEFAULT_FILE_TYPE: &str = ".md";
const MAX_SUMMARY_LEN: usize = 100;

/// A single catalog entry: a text artifact plus structured metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: Kind,
    pub name: String,
    pub description: String,
    pub summary: String,
    pub version: String,
    pub author: Option<String>,
    pub file_type: String,
    pub source: Source,
    pub install_path: String,
    pub metadata: HashMap<String, MetadataValue>,
    pub required: Vec<Dependency>,
    pub recommended: Vec<Dependency>,
}

/// An opaque metadata value: a scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Scalar(String),
    List(Vec<String>),
}

/// Where a resource's body is fetched from.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub repo: String,
    pub path: String,
    pub url: Url,
}

/// A reference to another resource in a `required`/`recommended` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub id: ResourceId,
    pub kind: Kind,
    pub reason: Option<String>,
}

/// Raw, untrusted shape of a resource descriptor as read from YAML. All
/// fields are validated and converted into a [`Resource`] at the loader
/// boundary; nothing downstream of that conversion ever sees this type.
#[derive(Debug, Deserialize)]
pub struct RawResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub author: Option<String>,
    pub file_type: Option<String>,
    pub source: RawSource,
    pub install_path: String,
    #[serde(default)]
    pub metadata: HashMap<String, MetadataValue>,
    #[serde(default)]
    pub dependencies: Option<RawDependencies>,
    /// Any top-level key this struct doesn't name. Folded into `metadata`
    /// verbatim (spec §4.1 "unknown fields are preserved under `metadata`").
    #[serde(flatten)]
    pub extra: HashMap<String, MetadataValue>,
}

#[derive(Debug, Deserialize)]
pub struct RawSource {
    pub repo: String,
    pub path: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawDependencies {
    #[serde(default)]
    pub required: Vec<RawDependency>,
    #[serde(default)]
    pub recommended: Vec<RawDependency>,
}

#[derive(Debug, Deserialize)]
pub struct RawDependency {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: Option<String>,
}

/// The content host that every [`Source::url`] must resolve against (I2).
pub const ALLOWED_CONTENT_HOSTS: &[&str] = &["raw.githubusercontent.com"];

impl Resource {
    /// Validate and convert a [`RawResource`] (as deserialized straight from
    /// YAML) into a trusted [`Resource`]. `expected_kind` is the subdirectory
    /// the descriptor was read from; it must match the declared `type`.
    pub fn from_raw(raw: RawResource, expected_kind: Kind) -> Result<Resource, ValidationError> {
        let id = ResourceId::parse(raw.id)?;

        let kind = parse_kind(&raw.kind)?;
        if kind != expected_kind {
            return Err(ValidationError::new(
                "type",
                format!("descriptor in {:?} directory declares type {kind}", expected_kind.dir_name()),
            ));
        }

        let version = raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_string());
        validate_version(&version)?;

        let source = Source::from_raw(raw.source)?;

        let summary = match raw.summary {
            Some(s) if s.chars().count() > MAX_SUMMARY_LEN => {
                return Err(ValidationError::new("summary", format!("must be <= {MAX_SUMMARY_LEN} chars")));
            }
            Some(s) => s,
            None => derive_summary(&raw.description),
        };

        let file_type = raw.file_type.unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string());
        if !file_type.starts_with('.') {
            return Err(ValidationError::new("file_type", "must include the leading '.'"));
        }

        let deps = raw.dependencies.unwrap_or_default();
        let required = deps.required.into_iter().map(Dependency::from_raw).collect::<Result<Vec<_>, _>>()?;
        let recommended = deps.recommended.into_iter().map(Dependency::from_raw).collect::<Result<Vec<_>, _>>()?;

        if required.iter().any(|d| d.id == id && d.kind == kind) {
            return Err(ValidationError::new("dependencies.required", "a resource must not depend on itself"));
        }

        let mut metadata = raw.metadata;
        metadata.extend(raw.extra);

        Ok(Resource {
            id,
            kind,
            name: raw.name,
            description: raw.description,
            summary,
            version,
            author: raw.author,
            file_type,
            source,
            install_path: raw.install_path,
            metadata,
            required,
            recommended,
        })
    }
}

impl Source {
    fn from_raw(raw: RawSource) -> Result<Source, ValidationError> {
        let url = Url::parse(&raw.url).map_err(|e| ValidationError::new("source.url", e.to_string()))?;

        if url.scheme() != "https" {
            return Err(ValidationError::new("source.url", "must use https"));
        }

        let host = url.host_str().unwrap_or_default();
        if !ALLOWED_CONTENT_HOSTS.contains(&host) {
            return Err(ValidationError::new("source.url", format!("host {host:?} is not on the content allow-list")));
        }

        Ok(Source { repo: raw.repo, path: raw.path, url })
    }
}

impl Dependency {
    fn from_raw(raw: RawDependency) -> Result<Dependency, ValidationError> {
        Ok(Dependency { id: ResourceId::parse(raw.id)?, kind: parse_kind(&raw.kind)?, reason: raw.reason })
    }
}

fn parse_kind(raw: &str) -> Result<Kind, ValidationError> {
    Kind::ALL
        .into_iter()
        .find(|k| k.to_string() == raw)
        .ok_or_else(|| ValidationError::new("type", format!("{raw:?} is not a known resource kind")))
}

/// `version` must match `v<int>.<int>.<int>`.
fn validate_version(version: &str) -> Result<(), ValidationError> {
    let bad = || ValidationError::new("version", format!("{version:?} must match v<int>.<int>.<int>"));

    let rest = version.strip_prefix('v').ok_or_else(bad)?;
    let parts: Vec<&str> = rest.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return Err(bad());
    }
    Ok(())
}

fn derive_summary(description: &str) -> String {
    if description.chars().count() <= MAX_SUMMARY_LEN {
        description.to_string()
    } else {
        let truncated: String = description.chars().take(MAX_SUMMARY_LEN - 1).collect();
        format!("{truncated}\u{2026}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, kind: &str) -> RawResource {
        RawResource {
            id: id.to_string(),
            kind: kind.to_string(),
            name: "Architect".to_string(),
            description: "Designs systems.".to_string(),
            summary: None,
            version: None,
            author: None,
            file_type: None,
            source: RawSource {
                repo: "org/repo".to_string(),
                path: "agents/architect.md".to_string(),
                url: "https://raw.githubusercontent.com/org/repo/main/agents/architect.md".to_string(),
            },
            install_path: "agents/architect.md".to_string(),
            metadata: HashMap::new(),
            dependencies: None,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn defaults_version_and_file_type() {
        let resource = Resource::from_raw(raw("architect", "agent"), Kind::Agent).unwrap();
        assert_eq!(resource.version, "v1.0.0");
        assert_eq!(resource.file_type, ".md");
    }

    #[test]
    fn rejects_mismatched_kind() {
        assert!(Resource::from_raw(raw("architect", "agent"), Kind::Command).is_err());
    }

    #[test]
    fn rejects_non_https_source() {
        let mut r = raw("architect", "agent");
        r.source.url = "http://raw.githubusercontent.com/org/repo/main/a.md".to_string();
        assert!(Resource::from_raw(r, Kind::Agent).is_err());
    }

    #[test]
    fn rejects_disallowed_host() {
        let mut r = raw("architect", "agent");
        r.source.url = "https://evil.example.com/a.md".to_string();
        assert!(Resource::from_raw(r, Kind::Agent).is_err());
    }

    #[test]
    fn derives_summary_when_absent() {
        let resource = Resource::from_raw(raw("architect", "agent"), Kind::Agent).unwrap();
        assert_eq!(resource.summary, "Designs systems.");
    }

    #[test]
    fn rejects_self_dependency() {
        let mut r = raw("architect", "agent");
        r.dependencies = Some(RawDependencies {
            required: vec![RawDependency { id: "architect".to_string(), kind: "agent".to_string(), reason: None }],
            recommended: vec![],
        });
        assert!(Resource::from_raw(r, Kind::Agent).is_err());
    }

    #[test]
    fn rejects_bad_version() {
        let mut r = raw("architect", "agent");
        r.version = Some(">=1.0.0".to_string());
        assert!(Resource::from_raw(r, Kind::Agent).is_err());
    }

    #[test]
    fn folds_unknown_top_level_fields_into_metadata() {
        let mut r = raw("architect", "agent");
        r.extra.insert("maintainer".to_string(), MetadataValue::Scalar("core-team".to_string()));
        let resource = Resource::from_raw(r, Kind::Agent).unwrap();
        assert_eq!(resource.metadata.get("maintainer"), Some(&MetadataValue::Scalar("core-team".to_string())));
    }
}
