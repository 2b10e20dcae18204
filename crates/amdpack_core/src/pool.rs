use dashmap::DashMap;
use log::{debug, trace};
use std::{
    collections::{BTreeMap, HashSet},
    io,
    sync::Arc,
};

use crate::{adapter::Adapter, resource::Resource};

/// A named set of resources enumerated from one adapter.
#[derive(Debug)]
pub struct Project {
    name: String,
    resources: BTreeMap<String, Arc<Resource>>,
}

impl Project {
    /// Enumerates the adapter. Content is not read until requested.
    pub async fn load(name: impl Into<String>, adapter: Arc<dyn Adapter>) -> io::Result<Self> {
        let name = name.into();
        let paths = adapter.list().await?;
        debug!("Project {} has {} resources", name, paths.len());
        let resources = paths
            .into_iter()
            .map(|path| {
                let resource = Resource::file(path.clone(), name.clone(), adapter.clone());
                (path, Arc::new(resource))
            })
            .collect();
        Ok(Self { name, resources })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Resource>> {
        self.resources.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Virtual namespace merged from a root project and its dependency projects.
///
/// Lookups prefer the root project, then dependencies in declared order. Hits in
/// a dependency are handed out as locators owned by the root project, memoized
/// so every caller shares the same content cell.
#[derive(Debug)]
pub struct ResourcePool {
    root: Project,
    dependencies: Vec<Project>,
    locators: DashMap<String, Arc<Resource>>,
}

impl ResourcePool {
    pub fn new(root: Project, dependencies: Vec<Project>) -> Self {
        debug!(
            "Creating pool for {} with {} dependency projects",
            root.name(),
            dependencies.len()
        );
        Self { root, dependencies, locators: DashMap::new() }
    }

    pub fn root_project(&self) -> &str {
        self.root.name()
    }

    pub fn resolve(&self, path: &str) -> Option<Arc<Resource>> {
        let path = path.trim_start_matches('/');
        if let Some(resource) = self.root.get(path) {
            trace!("Resolved {} in root project", path);
            return Some(Arc::clone(resource));
        }
        if let Some(locator) = self.locators.get(path) {
            trace!("Cache hit for locator: {}", path);
            return Some(Arc::clone(locator.value()));
        }
        for project in &self.dependencies {
            if let Some(target) = project.get(path) {
                trace!("Resolved {} in dependency project {}", path, project.name());
                let locator = self.locators.entry(path.to_string()).or_insert_with(|| {
                    Arc::new(Resource::locator(path, self.root.name(), Arc::clone(target)))
                });
                return Some(Arc::clone(locator.value()));
            }
        }
        trace!("Could not resolve {}", path);
        None
    }

    /// Every visible resource once, in precedence order.
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        self.resources_below("")
    }

    pub fn resources_below(&self, prefix: &str) -> Vec<Arc<Resource>> {
        let prefix = prefix.trim_start_matches('/');
        let mut seen = HashSet::new();
        std::iter::once(&self.root)
            .chain(&self.dependencies)
            .flat_map(|project| project.paths())
            .filter(|path| path.starts_with(prefix) && seen.insert(*path))
            .filter_map(|path| self.resolve(path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;

    async fn project(name: &str, files: &[(&str, &str)]) -> (Project, Arc<MemoryAdapter>) {
        let adapter = files
            .iter()
            .fold(MemoryAdapter::new(), |adapter, (path, content)| {
                adapter.with_file(path, *content)
            });
        let adapter = Arc::new(adapter);
        (Project::load(name, adapter.clone()).await.unwrap(), adapter)
    }

    #[tokio::test]
    async fn test_resolve_prefers_root_project() {
        let (app, _) = project("app", &[("a/B.js", "app version")]).await;
        let (lib, lib_adapter) =
            project("lib", &[("a/B.js", "lib version"), ("lib/C.js", "lib only")]).await;
        let pool = ResourcePool::new(app, vec![lib]);

        let b = pool.resolve("a/B.js").unwrap();
        assert!(!b.is_locator());
        assert_eq!(b.text().await.unwrap(), "app version");
        assert_eq!(lib_adapter.fetch_count("a/B.js"), 0);
    }

    #[tokio::test]
    async fn test_resolve_dependency_yields_locator() {
        let (app, _) = project("app", &[("a/B.js", "")]).await;
        let (lib, lib_adapter) = project("lib", &[("lib/C.js", "lib only")]).await;
        let pool = ResourcePool::new(app, vec![lib]);

        let c = pool.resolve("/lib/C.js").unwrap();
        assert!(c.is_locator());
        assert_eq!(c.path(), "lib/C.js");
        assert_eq!(c.project(), "app");
        assert_eq!(c.origin_project(), "lib");

        let again = pool.resolve("lib/C.js").unwrap();
        assert!(Arc::ptr_eq(&c, &again));
        assert_eq!(again.text().await.unwrap(), "lib only");
        assert_eq!(c.text().await.unwrap(), "lib only");
        assert_eq!(lib_adapter.fetch_count("lib/C.js"), 1);
    }

    #[tokio::test]
    async fn test_dependency_precedence_follows_declared_order() {
        let (app, _) = project("app", &[]).await;
        let (first, _) = project("first", &[("x.js", "first")]).await;
        let (second, _) = project("second", &[("x.js", "second")]).await;
        let pool = ResourcePool::new(app, vec![first, second]);

        let x = pool.resolve("x.js").unwrap();
        assert_eq!(x.origin_project(), "first");
        assert_eq!(x.text().await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_resolve_missing_is_none() {
        let (app, _) = project("app", &[("a/B.js", "")]).await;
        let pool = ResourcePool::new(app, vec![]);
        assert!(pool.resolve("a/Missing.js").is_none());
    }

    #[tokio::test]
    async fn test_resources_lists_shadowed_paths_once() {
        let (app, _) = project("app", &[("a/B.js", "app"), ("a/D.js", "")]).await;
        let (lib, _) = project("lib", &[("a/B.js", "lib"), ("lib/C.js", "")]).await;
        let pool = ResourcePool::new(app, vec![lib]);

        let paths: Vec<String> = pool.resources().iter().map(|r| r.path().to_string()).collect();
        assert_eq!(paths, vec!["a/B.js", "a/D.js", "lib/C.js"]);

        let below: Vec<String> =
            pool.resources_below("lib/").iter().map(|r| r.path().to_string()).collect();
        assert_eq!(below, vec!["lib/C.js"]);
    }
}
