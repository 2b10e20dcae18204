//! Dependency graph construction and preload bundle generation for AMD projects.
//!
//! An analysis pass parses every module source of a [`amdpack_core::ResourcePool`]
//! into a [`DependencyGraph`]. Bundles are then generated from the graph, each
//! request independently.
//!
//! # Examples
//!
//! ```no_run
//! use amdpack_bundle::{
//!     AnalysisOptions, BundleRequest, Config, Selection, Variant, generate, run_analysis_pass,
//! };
//! use clap::Parser;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut cfg = Config::parse_from(["bundle", "--root", "/path/to/app", "--namespace", "my/app"]);
//! cfg.initialize()?;
//! let pool = cfg.load_pool().await?;
//!
//! let pass = run_analysis_pass(&pool, &AnalysisOptions::default()).await?;
//! let request = BundleRequest::new(
//!     "my/app/Component-preload.js",
//!     Selection::Modules(vec!["my/app/Component".to_string()]),
//!     Variant::Preload,
//! );
//! let output = generate(&pass.graph, &pool, &request).await?;
//! println!("{}", output.artifacts[0].content);
//! # Ok(())
//! # }
//! ```

mod analysis;
mod config;
mod constants;
mod error;
mod generator;
mod graph;
mod reporter;
mod types;

// Re-export public API
pub use analysis::{AnalysisOptions, run_analysis_pass};
pub use config::Config;
pub use error::BundleError;
pub use generator::{debug_path, escape_js_string, generate};
pub use graph::{DependencyGraph, ModuleNode};
pub use reporter::{
    print_bundle_summary, print_diagnostics, print_graph_summary, write_json_summary,
};
pub use types::{
    AnalysisPass, Artifact, BundleEntry, BundleOutput, BundleRequest, Embedding, Selection, Variant,
};
