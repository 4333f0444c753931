// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Lazy, cached ingestion of a read-only YAML catalog (spec §4.1). Mirrors
//! the teacher's `Installation` path-builder idiom for the on-disk layout
//! and its `Remote`/`request` modules for coalesced, concurrency-safe
//! fetching — here applied to local descriptor files instead of HTTP.

mod error;

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use log::{debug, trace, warn};
use model::{CatalogIndex, Kind, RawCatalogIndex, RawResource, Resource, ResourceId, ValidationError};
use tokio::sync::Mutex;

pub use crate::error::Error;

/// Descriptors larger than this are rejected outright (spec §4.1).
const MAX_DESCRIPTOR_BYTES: u64 = 1024 * 1024;
/// Bound on the per-resource in-memory LRU (spec §3 "Lifecycle").
const RESOURCE_CACHE_CAP: usize = 50;
/// TTL for the cached catalog index (spec §3 "short TTL").
const INDEX_TTL: Duration = Duration::from_secs(30);

type Key = (Kind, ResourceId);

/// A lazy, cached view over a catalog directory. Cheap to construct; no I/O
/// happens until `get_index`/`get_resource`/`iter_resources` are called.
pub struct Catalog {
    root: PathBuf,
    disk_cache_root: Option<PathBuf>,
    index_cache: Mutex<Option<(Instant, CatalogIndex)>>,
    resource_cache: Mutex<Lru>,
    pending: Mutex<HashMap<Key, Shared<BoxFuture<'static, Result<Resource, Error>>>>>,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            disk_cache_root: None,
            index_cache: Mutex::new(None),
            resource_cache: Mutex::new(Lru::new(RESOURCE_CACHE_CAP)),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Mirror validated descriptors to `cache_root` as they are loaded, and
    /// consult it before falling back to the canonical catalog root.
    pub fn with_disk_cache(root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self { disk_cache_root: Some(cache_root.into()), ..Self::new(root) }
    }

    pub async fn get_index(&self) -> Result<CatalogIndex, Error> {
        {
            let guard = self.index_cache.lock().await;
            if let Some((cached_at, index)) = guard.as_ref() {
                if cached_at.elapsed() < INDEX_TTL {
                    trace!("catalog index cache hit");
                    return Ok(index.clone());
                }
            }
        }

        debug!("reading catalog index from {:?}", self.root);
        let index = load_index(&self.root).await?;
        *self.index_cache.lock().await = Some((Instant::now(), index.clone()));
        Ok(index)
    }

    /// Fetch `(id, kind)`, consulting the per-resource LRU first. Concurrent
    /// callers for the same key are coalesced onto one in-flight load via a
    /// `Shared` future, matching the teacher's single-shared-client pattern
    /// in `request::get` generalized to per-key coalescing.
    pub async fn get_resource(&self, id: &ResourceId, kind: Kind) -> Result<Resource, Error> {
        if let Some(resource) = self.resource_cache.lock().await.get(&(kind, id.clone())) {
            trace!("resource cache hit for {kind}/{id}");
            return Ok(resource);
        }

        let key = (kind, id.clone());
        let shared = {
            let mut pending = self.pending.lock().await;
            if let Some(existing) = pending.get(&key) {
                trace!("coalescing load for {kind}/{id}");
                existing.clone()
            } else {
                let fut: BoxFuture<'static, Result<Resource, Error>> =
                    Box::pin(load_resource_cached(self.root.clone(), self.disk_cache_root.clone(), id.clone(), kind));
                let shared = fut.shared();
                pending.insert(key.clone(), shared.clone());
                shared
            }
        };

        let result = shared.await;
        self.pending.lock().await.remove(&key);

        if let Ok(resource) = &result {
            self.resource_cache.lock().await.insert(key, resource.clone());
        }

        result
    }

    /// All resources of `kind` (or every kind, if `None`), skipping and
    /// logging invalid descriptors rather than failing the whole traversal
    /// (spec §4.1 "Partial-catalog load").
    pub async fn iter_resources(&self, kind: Option<Kind>) -> Vec<Resource> {
        let kinds: Vec<Kind> = kind.map(|k| vec![k]).unwrap_or_else(|| Kind::ALL.to_vec());
        let mut out = Vec::new();
        for kind in kinds {
            out.extend(self.iter_kind(kind).await);
        }
        out
    }

    async fn iter_kind(&self, kind: Kind) -> Vec<Resource> {
        let dir = self.root.join(kind.dir_name());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("skipping unreadable catalog directory {dir:?}: {e}");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("error listing {dir:?}: {e}");
                    break;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem == "index" {
                continue;
            }
            let Ok(id) = ResourceId::parse(stem) else {
                warn!("skipping descriptor with invalid filename {path:?}");
                continue;
            };

            match self.get_resource(&id, kind).await {
                Ok(resource) => out.push(resource),
                Err(e) => warn!("skipping invalid descriptor {path:?}: {e}"),
            }
        }
        out
    }

    /// Drop every in-memory cache tier. The on-disk mirror, if any, is left
    /// intact.
    pub async fn invalidate(&self) {
        *self.index_cache.lock().await = None;
        self.resource_cache.lock().await.clear();
        self.pending.lock().await.clear();
    }
}

struct Lru {
    map: HashMap<Key, Resource>,
    order: VecDeque<Key>,
    cap: usize,
}

impl Lru {
    fn new(cap: usize) -> Self {
        Self { map: HashMap::new(), order: VecDeque::new(), cap }
    }

    fn get(&mut self, key: &Key) -> Option<Resource> {
        let resource = self.map.get(key).cloned()?;
        self.touch(key);
        Some(resource)
    }

    fn touch(&mut self, key: &Key) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(existing) = self.order.remove(pos) {
                self.order.push_back(existing);
            }
        }
    }

    fn insert(&mut self, key: Key, resource: Resource) {
        if self.map.contains_key(&key) {
            self.touch(&key);
        } else {
            self.order.push_back(key.clone());
            if self.order.len() > self.cap {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
        }
        self.map.insert(key, resource);
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

fn io_err(path: &Path, e: std::io::Error) -> Error {
    Error::Io { path: path.display().to_string(), message: e.to_string() }
}

async fn read_capped(path: &Path, cap: u64) -> Result<String, Error> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(model::NotFoundError(path.display().to_string()))
        } else {
            io_err(path, e)
        }
    })?;

    if metadata.len() > cap {
        return Err(Error::Validation(ValidationError::new("file_size", format!("{path:?} exceeds {cap} byte cap"))));
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| io_err(path, e))?;
    String::from_utf8(bytes).map_err(|_| Error::Decode(model::DecodeError { path: path.display().to_string() }))
}

async fn load_index(root: &Path) -> Result<CatalogIndex, Error> {
    let path = root.join("index.yaml");
    let text = read_capped(&path, MAX_DESCRIPTOR_BYTES).await?;
    let raw: RawCatalogIndex =
        serde_yaml::from_str(&text).map_err(|e| Error::Validation(ValidationError::new("index.yaml", e.to_string())))?;
    Ok(CatalogIndex::from_raw(raw)?)
}

async fn load_resource(root: PathBuf, id: ResourceId, kind: Kind) -> Result<Resource, Error> {
    let path = root.join(kind.dir_name()).join(format!("{id}.yaml"));
    let text = read_capped(&path, MAX_DESCRIPTOR_BYTES).await?;
    let raw: RawResource =
        serde_yaml::from_str(&text).map_err(|e| Error::Validation(ValidationError::new("descriptor", e.to_string())))?;
    let resource = Resource::from_raw(raw, kind)?;

    if resource.id != id {
        return Err(Error::Validation(ValidationError::new(
            "id",
            format!("descriptor id {} does not match filename {id}", resource.id),
        )));
    }

    Ok(resource)
}

async fn load_resource_cached(root: PathBuf, disk_cache_root: Option<PathBuf>, id: ResourceId, kind: Kind) -> Result<Resource, Error> {
    if let Some(cache_root) = &disk_cache_root {
        let cache_path = cache_root.join(kind.dir_name()).join(format!("{id}.yaml"));
        if let Ok(text) = read_capped(&cache_path, MAX_DESCRIPTOR_BYTES).await {
            if let Ok(raw) = serde_yaml::from_str::<RawResource>(&text) {
                if let Ok(resource) = Resource::from_raw(raw, kind) {
                    if resource.id == id {
                        trace!("disk cache hit for {kind}/{id}");
                        return Ok(resource);
                    }
                }
            }
        }
    }

    let resource = load_resource(root.clone(), id.clone(), kind).await?;

    if let Some(cache_root) = &disk_cache_root {
        if let Err(e) = mirror_to_disk(&root, cache_root, kind, &id).await {
            debug!("failed to mirror {kind}/{id} to disk cache: {e}");
        }
    }

    Ok(resource)
}

async fn mirror_to_disk(root: &Path, cache_root: &Path, kind: Kind, id: &ResourceId) -> Result<(), Error> {
    let source = root.join(kind.dir_name()).join(format!("{id}.yaml"));
    let dest_dir = cache_root.join(kind.dir_name());
    tokio::fs::create_dir_all(&dest_dir).await.map_err(|e| io_err(&dest_dir, e))?;
    let dest = dest_dir.join(format!("{id}.yaml"));
    tokio::fs::copy(&source, &dest).await.map_err(|e| io_err(&dest, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_yaml(id: &str) -> String {
        format!(
            "id: {id}\ntype: agent\nname: {id}\ndescription: A test agent.\nsource:\n  repo: org/repo\n  path: agents/{id}.md\n  url: https://raw.githubusercontent.com/org/repo/main/agents/{id}.md\ninstall_path: agents/{id}.md\n"
        )
    }

    async fn write_catalog(dir: &Path, ids: &[&str]) {
        tokio::fs::create_dir_all(dir.join("agents")).await.unwrap();
        tokio::fs::write(dir.join("index.yaml"), format!("total: {}\ntypes:\n  agent: {}\n", ids.len(), ids.len())).await.unwrap();
        for id in ids {
            tokio::fs::write(dir.join("agents").join(format!("{id}.yaml")), descriptor_yaml(id)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn get_index_reads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), &["architect"]).await;

        let catalog = Catalog::new(dir.path());
        let index = catalog.get_index().await.unwrap();
        assert_eq!(index.total, 1);
        assert_eq!(index.types.get(&Kind::Agent), Some(&1));
    }

    #[tokio::test]
    async fn get_resource_validates_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), &["architect"]).await;

        let catalog = Catalog::new(dir.path());
        let id = ResourceId::parse("architect").unwrap();
        let resource = catalog.get_resource(&id, Kind::Agent).await.unwrap();
        assert_eq!(resource.id.as_str(), "architect");

        // second call should be served from the in-memory cache
        let resource_again = catalog.get_resource(&id, Kind::Agent).await.unwrap();
        assert_eq!(resource_again.id, resource.id);
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), &[]).await;

        let catalog = Catalog::new(dir.path());
        let id = ResourceId::parse("ghost").unwrap();
        let err = catalog.get_resource(&id, Kind::Agent).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn iter_resources_skips_invalid_descriptors_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), &["architect", "code-archaeologist"]).await;
        tokio::fs::write(dir.path().join("agents").join("broken.yaml"), "not: valid: yaml: [").await.unwrap();

        let catalog = Catalog::new(dir.path());
        let resources = catalog.iter_resources(Some(Kind::Agent)).await;
        let ids: Vec<&str> = resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"architect"));
        assert!(ids.contains(&"code-archaeologist"));
    }

    #[tokio::test]
    async fn concurrent_requests_for_same_resource_are_coalesced() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), &["architect"]).await;

        let catalog = std::sync::Arc::new(Catalog::new(dir.path()));
        let id = ResourceId::parse("architect").unwrap();

        let a = {
            let catalog = catalog.clone();
            let id = id.clone();
            tokio::spawn(async move { catalog.get_resource(&id, Kind::Agent).await })
        };
        let b = {
            let catalog = catalog.clone();
            let id = id.clone();
            tokio::spawn(async move { catalog.get_resource(&id, Kind::Agent).await })
        };

        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap().unwrap().id, b.unwrap().unwrap().id);
    }

    #[tokio::test]
    async fn disk_cache_mirrors_and_is_consulted() {
        let catalog_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        write_catalog(catalog_dir.path(), &["architect"]).await;

        let catalog = Catalog::with_disk_cache(catalog_dir.path(), cache_dir.path());
        let id = ResourceId::parse("architect").unwrap();
        catalog.get_resource(&id, Kind::Agent).await.unwrap();

        assert!(cache_dir.path().join("agents").join("architect.yaml").exists());
    }

    #[tokio::test]
    async fn invalidate_clears_in_memory_caches() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), &["architect"]).await;

        let catalog = Catalog::new(dir.path());
        let id = ResourceId::parse("architect").unwrap();
        catalog.get_resource(&id, Kind::Agent).await.unwrap();
        catalog.get_index().await.unwrap();

        catalog.invalidate().await;

        assert!(catalog.index_cache.lock().await.is_none());
        assert!(catalog.resource_cache.lock().await.map.is_empty());
    }
}
