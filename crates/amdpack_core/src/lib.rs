//! Core building blocks for amdpack.
//!
//! This crate provides the pieces every bundling run is built from:
//! - A virtual resource pool merged from several projects, with lazily loaded,
//!   single-flight cached content and locators into dependency projects
//! - A static analyzer that finds module declarations and their dependencies
//! - Access to the external binding-expression parser
//! - Project root discovery

mod adapter;
mod analyzer;
mod config;
mod constants;
mod error;
mod expression;
mod pool;
mod resource;
mod types;

// Re-export public API
pub use adapter::{Adapter, FsAdapter, MemoryAdapter};
pub use analyzer::{AnalyzerOptions, analyze, resolve_dependency_name};
pub use config::{find_git_root, find_git_root_from};
pub use constants::{DECLARE_CALLEES, MODULE_EXTENSIONS, REQUIRE_CALLEES, is_module_source};
pub use error::{AnalyzeError, CollaboratorUnavailable, Diagnostic, DiagnosticKind, ResourceIoError};
pub use expression::{
    ExpressionParser, ExpressionParserCell, ExpressionParserFactory, get_expression_parser,
};
pub use pool::{Project, ResourcePool};
pub use resource::{FileResource, LocatorResource, Resource};
pub use types::{Analysis, Dependency, ModuleFormat, ModuleInfo, module_name_for};
