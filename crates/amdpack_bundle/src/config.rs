use amdpack_core::{FsAdapter, Project, ResourcePool};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{debug, info};
use std::{path::PathBuf, sync::Arc};

use crate::types::{BundleRequest, Selection, Variant};

#[derive(Debug, Clone, Parser)]
#[command(name = "bundle")]
#[command(about = "Analyze AMD module sources and build preload bundles")]
pub struct Config {
    /// Root directory of the project (defaults to git root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Virtual namespace the project's files are mounted below
    #[arg(long, default_value = "")]
    pub namespace: String,

    /// Dependency project as `<dir>` or `<dir>=<namespace>`, in precedence order
    #[arg(long = "dependency")]
    pub dependencies: Vec<String>,

    /// Module to bundle together with its dependencies
    #[arg(long = "module")]
    pub modules: Vec<String>,

    /// Bundle every module whose resource lives below this virtual path
    #[arg(long)]
    pub below: Option<String>,

    #[arg(long, value_enum, default_value_t = Variant::Preload)]
    pub variant: Variant,

    /// Append a dependency cache block
    #[arg(long)]
    pub dep_cache: bool,

    /// Source map reference to append to the bundle
    #[arg(long)]
    pub source_map: Option<String>,

    /// Virtual path of the generated bundle
    #[arg(long, default_value = "preload.js")]
    pub name: String,

    /// Directory to write artifacts to (prints a summary only when omitted)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl Config {
    /// Resolves the root directory, falling back to the git root.
    pub fn initialize(&mut self) -> Result<()> {
        let root = if let Some(r) = self.root.take() {
            debug!("Using provided root directory: {:?}", r);
            r.canonicalize().unwrap_or(r)
        } else {
            debug!("No root provided, searching for git root");
            amdpack_core::find_git_root()?
        };
        info!("Using root directory: {}", root.display());
        self.root = Some(root);
        Ok(())
    }

    pub fn root(&self) -> Result<&PathBuf> {
        self.root
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }

    /// Loads the root project and its dependency projects into one pool.
    pub async fn load_pool(&self) -> Result<ResourcePool> {
        let root = self.root()?;
        let adapter = FsAdapter::new(root).with_namespace(&self.namespace);
        let project = Project::load(project_name(root), Arc::new(adapter))
            .await
            .with_context(|| format!("Failed to enumerate {}", root.display()))?;

        let mut dependencies = Vec::with_capacity(self.dependencies.len());
        for entry in &self.dependencies {
            let (dir, namespace) = parse_dependency(entry);
            let dir = PathBuf::from(dir);
            let adapter = FsAdapter::new(&dir).with_namespace(namespace);
            let project = Project::load(project_name(&dir), Arc::new(adapter))
                .await
                .with_context(|| format!("Failed to enumerate dependency {}", dir.display()))?;
            dependencies.push(project);
        }
        Ok(ResourcePool::new(project, dependencies))
    }

    pub fn bundle_request(&self) -> Result<BundleRequest> {
        let selection = match (&self.below, self.modules.is_empty()) {
            (Some(prefix), true) => Selection::Below(prefix.clone()),
            (None, false) => Selection::Modules(self.modules.clone()),
            (Some(_), false) => return Err(anyhow!("--module and --below are mutually exclusive")),
            (None, true) => return Err(anyhow!("Nothing to bundle: pass --module or --below")),
        };
        Ok(BundleRequest {
            name: self.name.clone(),
            selection,
            variant: self.variant,
            dep_cache: self.dep_cache,
            source_map: self.source_map.clone(),
        })
    }
}

fn project_name(dir: &std::path::Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.display().to_string())
}

fn parse_dependency(entry: &str) -> (&str, &str) {
    entry.split_once('=').unwrap_or((entry, ""))
}
