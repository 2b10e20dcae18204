use async_trait::async_trait;
use dashmap::DashMap;
use ignore::WalkBuilder;
use log::{debug, trace};
use std::{
    collections::{BTreeMap, HashSet},
    fmt, io,
    path::{Path, PathBuf},
};

/// Storage behind a project: enumerates virtual paths and fetches their bytes.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    async fn list(&self) -> io::Result<Vec<String>>;
    async fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Serves a directory tree, optionally mounted below a virtual namespace.
#[derive(Debug, Clone)]
pub struct FsAdapter {
    root: PathBuf,
    namespace: String,
}

impl FsAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), namespace: String::new() }
    }

    /// Mounts the directory below `namespace`, so `my/lib` serves `Button.js`
    /// as `my/lib/Button.js`.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        let namespace = namespace.trim_matches('/');
        self.namespace =
            if namespace.is_empty() { String::new() } else { format!("{}/", namespace) };
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, path: &str) -> io::Result<PathBuf> {
        let relative = path.trim_start_matches('/').strip_prefix(&self.namespace).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is outside namespace '{}'", path, self.namespace),
            )
        })?;
        Ok(self.root.join(relative))
    }
}

fn walk(root: &Path, namespace: &str) -> io::Result<Vec<String>> {
    debug!("Walking directory tree from root: {}", root.display());
    let walker = WalkBuilder::new(root).hidden(false).ignore(true).git_ignore(true).build();

    let mut paths = Vec::new();
    for res in walker {
        let dent = res.map_err(io::Error::other)?;
        let p = dent.path();
        if !p.is_file() {
            continue;
        }
        let Ok(rel_path) = p.strip_prefix(root) else {
            continue;
        };
        let rel_str = rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        trace!("Found resource: {}{}", namespace, rel_str);
        paths.push(format!("{}{}", namespace, rel_str));
    }
    paths.sort();
    debug!("Collected {} resources under {}", paths.len(), root.display());
    Ok(paths)
}

#[async_trait]
impl Adapter for FsAdapter {
    async fn list(&self) -> io::Result<Vec<String>> {
        let root = self.root.clone();
        let namespace = self.namespace.clone();
        tokio::task::spawn_blocking(move || walk(&root, &namespace))
            .await
            .map_err(io::Error::other)?
    }

    async fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let file = self.file_path(path)?;
        trace!("Reading {}", file.display());
        tokio::fs::read(&file).await
    }
}

/// In-memory storage that counts fetches per path.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    files: BTreeMap<String, Vec<u8>>,
    unreadable: HashSet<String>,
    fetches: DashMap<String, usize>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.trim_start_matches('/').to_string(), content.into());
        self
    }

    /// Lists `path` but fails every read of it.
    pub fn with_unreadable(mut self, path: &str) -> Self {
        let path = path.trim_start_matches('/').to_string();
        self.files.entry(path.clone()).or_default();
        self.unreadable.insert(path);
        self
    }

    /// Number of times `path` was fetched through [`Adapter::read`].
    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches.get(path).map(|n| *n).unwrap_or(0)
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    async fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        *self.fetches.entry(path.to_string()).or_insert(0) += 1;
        // Give concurrent readers a chance to interleave.
        tokio::task::yield_now().await;
        if self.unreadable.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "storage unavailable"));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}
