//! Call shapes and file extensions the analyzer recognizes.
//!
//! Callees are matched by their terminal name, so `define`, `sap.ui.define`,
//! `sap.ui["define"]` and `(ns?.ui).define` all count as declarations.

/// Extensions of resources that are analyzed as module sources
pub const MODULE_EXTENSIONS: &[&str] = &["js", "mjs"];

/// Terminal callee names of module declarations
pub const DECLARE_CALLEES: &[&str] = &["define", "predefine"];

/// Terminal callee names of eager requires
pub const REQUIRE_CALLEES: &[&str] = &["require", "requireSync"];

/// AMD pseudo-dependencies injected by the loader itself
pub const PSEUDO_DEPENDENCIES: &[&str] = &["require", "exports", "module"];

pub fn is_module_source(path: &str) -> bool {
    path.rsplit_once('.').is_some_and(|(_, ext)| MODULE_EXTENSIONS.contains(&ext))
}
