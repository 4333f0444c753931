// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Concurrent, sandboxed installation of catalog resources (spec §4.5).
//! Level-ordered fetch/write of an [`InstallPlan`], atomic writes, and an
//! append-only audit log, grounded on the teacher's `moss::request` shared
//! client and `moss::client::install` async-fs usage.

mod environment;
mod error;
mod fetch;
mod path;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, trace, warn};
use model::{InstallPlan, InstallRecord, Resource};
use tokio::sync::{Mutex, Semaphore};

pub use crate::error::{Error, FetchError};
pub use crate::fetch::{Fetcher, HttpFetcher};

const AUDIT_LOG_NAME: &str = ".install-history";

/// Per-call installer options (spec §4.5 contract table).
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub force: bool,
    pub skip_dependencies: bool,
    pub dry_run: bool,
    pub parallel: bool,
    pub verify_size: bool,
}

/// The outcome of installing a single resource.
#[derive(Debug)]
pub enum InstallStatus {
    Installed,
    AlreadyInstalled,
    Skipped,
    Failed(Error),
}

#[derive(Debug)]
pub struct InstallOutcome {
    pub id: model::ResourceId,
    pub status: InstallStatus,
}

pub struct Installer {
    install_root: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    semaphore: Arc<Semaphore>,
    audit_lock: Mutex<()>,
}

impl Installer {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self::with_fetcher(install_root, Arc::new(HttpFetcher))
    }

    pub fn with_fetcher(install_root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            install_root: install_root.into(),
            fetcher,
            semaphore: Arc::new(Semaphore::new(environment::MAX_NETWORK_CONCURRENCY)),
            audit_lock: Mutex::new(()),
        }
    }

    /// The sandboxed absolute path a resource would be written to (I3).
    pub fn install_path(&self, resource: &Resource) -> Result<PathBuf, Error> {
        path::sandbox_join(&self.install_root, &resource.install_path)
    }

    /// Filesystem presence is the source of truth (spec §9 open question:
    /// "filesystem presence reflects truth").
    pub fn is_installed(&self, resource: &Resource) -> bool {
        self.install_path(resource).map(|p| p.exists()).unwrap_or(false)
    }

    /// Install a single resource with no dependency handling. Used directly
    /// when `skip_dependencies` is set, and as the unit of work within
    /// [`Installer::install_plan`].
    pub async fn install(&self, resource: &Resource, options: &InstallOptions) -> InstallOutcome {
        let id = resource.id.clone();

        if !options.force && self.is_installed(resource) {
            trace!("{id} already installed, skipping");
            return InstallOutcome { id, status: InstallStatus::AlreadyInstalled };
        }

        match self.install_one(resource, options).await {
            Ok(()) => InstallOutcome { id, status: InstallStatus::Installed },
            Err(e) => InstallOutcome { id, status: InstallStatus::Failed(e) },
        }
    }

    /// Install every resource named by `plan`, one level at a time. A level
    /// is fully downloaded and committed before the next level starts;
    /// within a level, fetches may run concurrently when `options.parallel`
    /// is set (bounded by the global network semaphore either way).
    pub async fn install_plan(&self, plan: &InstallPlan, options: &InstallOptions) -> Vec<InstallOutcome> {
        if !plan.is_complete() {
            warn!("installing incomplete plan for {} ({} missing)", plan.target, plan.missing.len());
        }

        let mut outcomes = Vec::new();

        for level in &plan.to_install {
            debug!("installing level of {} resource(s)", level.len());

            if options.parallel {
                let futures = level.iter().map(|resource| self.install(resource, options));
                outcomes.extend(futures_util::future::join_all(futures).await);
            } else {
                for resource in level {
                    outcomes.push(self.install(resource, options).await);
                }
            }
        }

        outcomes
    }

    async fn install_one(&self, resource: &Resource, options: &InstallOptions) -> Result<(), Error> {
        let target = self.install_path(resource)?;
        let parent = target.parent().unwrap_or(&self.install_root);

        if options.dry_run {
            trace!("dry run: would install {} at {target:?}", resource.id);
            return Ok(());
        }

        tokio::fs::create_dir_all(parent).await.map_err(|e| io_err(parent, e))?;
        path::assert_within_root(&self.install_root, &target)?;

        let _permit = self.semaphore.acquire().await.expect("semaphore not closed");
        let bytes = fetch::fetch_with_retry(self.fetcher.as_ref(), &resource.source.url).await?;

        if options.verify_size && bytes.is_empty() {
            return Err(Error::Network(model::NetworkError {
                url: resource.source.url.to_string(),
                message: "downloaded body is empty".to_string(),
                retry_after: None,
            }));
        }
        drop(_permit);

        atomic_write(&target, &bytes).await?;
        self.append_audit_record(resource).await?;

        Ok(())
    }

    async fn append_audit_record(&self, resource: &Resource) -> Result<(), Error> {
        let record = InstallRecord {
            id: resource.id.clone(),
            timestamp: Utc::now(),
            install_path: resource.install_path.clone(),
            source_url: resource.source.url.to_string(),
        };
        let line = serde_json::to_string(&record).expect("InstallRecord serializes") + "\n";

        let _guard = self.audit_lock.lock().await;
        let log_path = self.install_root.join(AUDIT_LOG_NAME);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
            .map_err(|e| io_err(&log_path, e))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, line.as_bytes()).await.map_err(|e| io_err(&log_path, e))?;
        Ok(())
    }
}

/// Write `bytes` to `<target>.tmp` then rename over `target`, so readers
/// never observe a partial file. The temp file is unlinked on any failure.
async fn atomic_write(target: &std::path::Path, bytes: &[u8]) -> Result<(), Error> {
    let tmp = target.with_extension(format!(
        "{}.tmp",
        target.extension().and_then(|e| e.to_str()).unwrap_or_default()
    ));

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(&tmp, e));
    }

    if let Err(e) = tokio::fs::rename(&tmp, target).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io_err(target, e));
    }

    Ok(())
}

fn io_err(path: &std::path::Path, e: std::io::Error) -> Error {
    Error::Io { path: path.display().to_string(), message: e.to_string() }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use bytes::Bytes;
    use futures_util::future::BoxFuture;
    use model::{Dependency, Kind, ResourceId, Source};
    use url::Url;

    use super::*;

    fn resource(id: &str, install_path: &str) -> Resource {
        Resource {
            id: ResourceId::parse(id).unwrap(),
            kind: Kind::Agent,
            name: id.to_string(),
            description: String::new(),
            summary: String::new(),
            version: "v1.0.0".to_string(),
            author: None,
            file_type: ".md".to_string(),
            source: Source {
                repo: "org/repo".to_string(),
                path: String::new(),
                url: Url::parse("https://raw.githubusercontent.com/org/repo/main/a.md").unwrap(),
            },
            install_path: install_path.to_string(),
            metadata: Default::default(),
            required: Vec::<Dependency>::new(),
            recommended: vec![],
        }
    }

    struct ScriptedFetcher {
        responses: StdMutex<Vec<Result<&'static [u8], FetchError>>>,
        attempts: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<&'static [u8], ()>>) -> Self {
            let responses = responses
                .into_iter()
                .map(|r| r.map_err(|()| FetchError::Retryable(Error::Io { path: "x".into(), message: "503".into() })))
                .rev()
                .collect::<Vec<_>>();
            Self { responses: StdMutex::new(responses), attempts: AtomicUsize::new(0) }
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(&self, _url: &Url) -> BoxFuture<'_, Result<Bytes, FetchError>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop();
            Box::pin(async move {
                match next {
                    Some(Ok(bytes)) => Ok(Bytes::from_static(bytes)),
                    Some(Err(e)) => Err(e),
                    None => Err(FetchError::Terminal(Error::Io { path: "x".into(), message: "exhausted".into() })),
                }
            })
        }
    }

    #[tokio::test]
    async fn sandbox_violation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let installer = Installer::new(dir.path());
        let resource = resource("evil", "../escape.md");

        let outcome = installer.install(&resource, &InstallOptions::default()).await;
        assert!(matches!(outcome.status, InstallStatus::Failed(Error::PathSecurity(_))));

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn successful_install_writes_file_and_audit_record() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(b"body")]));
        let installer = Installer::with_fetcher(dir.path(), fetcher);
        let resource = resource("architect", "agents/architect.md");

        let outcome = installer.install(&resource, &InstallOptions::default()).await;
        assert!(matches!(outcome.status, InstallStatus::Installed));

        let written = tokio::fs::read(dir.path().join("agents/architect.md")).await.unwrap();
        assert_eq!(written, b"body");
        assert!(!dir.path().join("agents/architect.md.tmp").exists());

        let history = tokio::fs::read_to_string(dir.path().join(".install-history")).await.unwrap();
        assert_eq!(history.lines().count(), 1);
        assert!(history.contains("\"id\":\"architect\""));
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(()), Err(()), Ok(b"ok")]));
        let installer = Installer::with_fetcher(dir.path(), fetcher.clone());
        let resource = resource("architect", "agents/architect.md");

        let outcome = installer.install(&resource, &InstallOptions::default()).await;
        assert!(matches!(outcome.status, InstallStatus::Installed));
        assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn already_installed_is_a_no_op_without_force() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("agents")).await.unwrap();
        tokio::fs::write(dir.path().join("agents/architect.md"), b"existing").await.unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let installer = Installer::with_fetcher(dir.path(), fetcher.clone());
        let resource = resource("architect", "agents/architect.md");

        let outcome = installer.install(&resource, &InstallOptions::default()).await;
        assert!(matches!(outcome.status, InstallStatus::AlreadyInstalled));
        assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dry_run_performs_no_io() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let installer = Installer::with_fetcher(dir.path(), fetcher.clone());
        let resource = resource("architect", "agents/architect.md");

        let options = InstallOptions { dry_run: true, ..Default::default() };
        let outcome = installer.install(&resource, &options).await;
        assert!(matches!(outcome.status, InstallStatus::Installed));
        assert!(!dir.path().join("agents/architect.md").exists());
        assert_eq!(fetcher.attempts.load(Ordering::SeqCst), 0);
    }
}
