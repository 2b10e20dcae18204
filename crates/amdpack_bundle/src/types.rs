use amdpack_core::Diagnostic;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

use crate::graph::DependencyGraph;

/// Outcome of analyzing every module source in a pool.
#[derive(Debug, Clone)]
pub struct AnalysisPass {
    pub graph: DependencyGraph,
    /// Resource-scoped and run-wide problems that did not stop the pass
    pub diagnostics: Vec<Diagnostic>,
    pub resources_analyzed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Copy each requested resource unchanged, without expansion
    Debug,
    /// Register the closure through the module loader's preload table
    Preload,
    /// Register the closure through the legacy preload call
    Legacy,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Debug => write!(f, "debug"),
            Variant::Preload => write!(f, "preload"),
            Variant::Legacy => write!(f, "legacy"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Selection {
    Modules(Vec<String>),
    /// All modules whose resource lives below a virtual path prefix
    Below(String),
}

#[derive(Debug, Clone)]
pub struct BundleRequest {
    /// Virtual path of the bundle, e.g. `my/lib/library-preload.js`
    pub name: String,
    pub selection: Selection,
    pub variant: Variant,
    pub dep_cache: bool,
    pub source_map: Option<String>,
}

impl BundleRequest {
    pub fn new(name: impl Into<String>, selection: Selection, variant: Variant) -> Self {
        Self { name: name.into(), selection, variant, dep_cache: false, source_map: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Embedding {
    /// Source wrapped in a function literal, executed by the loader directly
    Function,
    /// Escaped string literal, evaluated in global scope
    String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleEntry {
    /// Resource path used as table key
    pub key: String,
    pub module: String,
    pub embedding: Embedding,
    #[serde(skip)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub path: String,
    #[serde(skip)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleOutput {
    pub name: String,
    pub variant: Variant,
    pub entries: Vec<BundleEntry>,
    /// Module resource key -> direct dependency resource keys
    pub dep_cache: Vec<(String, Vec<String>)>,
    /// Transitive dependencies with no module in the graph
    pub missing: Vec<String>,
    pub artifacts: Vec<Artifact>,
}
