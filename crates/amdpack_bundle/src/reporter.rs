use std::{
    env,
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use amdpack_core::{Diagnostic, ModuleFormat};
use colored::Colorize;
use log::{debug, trace};
use serde::Serialize;

use crate::types::{AnalysisPass, BundleOutput};

/// Renders an output path relative to the current directory so terminals can link it.
fn relativize_to_cwd(path: &Path) -> String {
    let Ok(cwd) = env::current_dir() else {
        debug!("Failed to get current directory");
        return path.display().to_string();
    };
    match make_relative(path, &cwd) {
        Some(rel) => {
            trace!("Relativized {:?} to {:?}", path, rel);
            rel.to_string_lossy().to_string()
        }
        None => path.display().to_string(),
    }
}

/// Builds the relative path leading from `base` to `target`.
fn make_relative(target: &Path, base: &Path) -> Option<PathBuf> {
    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    if target_parts.first() != base_parts.first() {
        return None;
    }
    let common = target_parts.iter().zip(&base_parts).take_while(|(t, b)| t == b).count();

    let mut result = PathBuf::new();
    for _ in common..base_parts.len() {
        result.push("..");
    }
    for component in &target_parts[common..] {
        match component {
            Component::Normal(p) => result.push(p),
            Component::ParentDir => result.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if result.as_os_str().is_empty() { Some(PathBuf::from(".")) } else { Some(result) }
}

pub fn print_graph_summary<W: Write>(writer: &mut W, pass: &AnalysisPass) -> io::Result<()> {
    let legacy = pass.graph.modules().filter(|m| m.info.format == ModuleFormat::Legacy).count();
    let edges: usize = pass.graph.modules().map(|m| m.dependencies.len()).sum();
    debug!("Printing graph summary for {} modules", pass.graph.len());

    writeln!(
        writer,
        "{} {} modules ({} legacy) with {} dependency edges",
        "●".bright_blue(),
        pass.graph.len().to_string().cyan(),
        legacy.to_string().cyan(),
        edges.to_string().cyan()
    )?;

    for node in pass.graph.modules() {
        writeln!(writer, "{}", node.info.name.bright_white().bold())?;
        let count = node.dependencies.len();
        for (idx, dep) in node.dependencies.iter().enumerate() {
            let prefix = if idx + 1 == count { "└──" } else { "├──" };
            if pass.graph.contains(dep) {
                writeln!(writer, "{}  {}", prefix.dimmed(), dep)?;
            } else {
                writeln!(writer, "{}  {} {}", prefix.dimmed(), dep.yellow(), "(missing)".dimmed())?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

pub fn print_diagnostics<W: Write>(writer: &mut W, diagnostics: &[Diagnostic]) -> io::Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }

    writeln!(
        writer,
        "\n{} {} diagnostics",
        "⚠".yellow().bold(),
        diagnostics.len().to_string().yellow()
    )?;
    for diagnostic in diagnostics {
        let resource = diagnostic.resource.as_deref().unwrap_or("<run>");
        writeln!(
            writer,
            "  {} [{}] {}",
            resource.blue(),
            serde_json::to_value(diagnostic.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
                .red(),
            diagnostic.message
        )?;
    }

    writer.flush()?;
    Ok(())
}

/// Prints one bundle's entries and the artifacts written for it. `out` is the
/// directory artifacts were written to, if any.
pub fn print_bundle_summary<W: Write>(
    writer: &mut W,
    output: &BundleOutput,
    out: Option<&Path>,
) -> io::Result<()> {
    writeln!(
        writer,
        "{} {} ({} variant, {} entries)",
        "✓".green().bold(),
        output.name.bright_white().bold(),
        output.variant,
        output.entries.len().to_string().cyan()
    )?;

    for entry in &output.entries {
        writeln!(writer, "  {} {}", "├──".dimmed(), entry.key)?;
    }
    if !output.dep_cache.is_empty() {
        writeln!(
            writer,
            "  {} dependency cache for {} modules",
            "├──".dimmed(),
            output.dep_cache.len()
        )?;
    }
    for name in &output.missing {
        writeln!(writer, "  {} {} {}", "├──".dimmed(), name.yellow(), "(missing)".dimmed())?;
    }

    for artifact in &output.artifacts {
        let shown = match out {
            Some(dir) => relativize_to_cwd(&dir.join(&artifact.path)),
            None => artifact.path.clone(),
        };
        writeln!(writer, "  {} {}", "└──".dimmed(), shown.blue())?;
    }

    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct Summary<'a> {
    modules: usize,
    resources_analyzed: usize,
    diagnostics: &'a [Diagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    bundle: Option<&'a BundleOutput>,
}

pub fn write_json_summary<W: Write>(
    writer: &mut W,
    pass: &AnalysisPass,
    bundle: Option<&BundleOutput>,
) -> io::Result<()> {
    let summary = Summary {
        modules: pass.graph.len(),
        resources_analyzed: pass.resources_analyzed,
        diagnostics: &pass.diagnostics,
        bundle,
    };
    serde_json::to_writer_pretty(&mut *writer, &summary)?;
    writeln!(writer)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraph;
    use crate::types::{Artifact, BundleEntry, Embedding, Variant};
    use amdpack_core::{Dependency, DiagnosticKind, ModuleInfo};

    fn plain(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn sample_pass() -> AnalysisPass {
        let mut graph = DependencyGraph::new();
        graph.add_module(ModuleInfo {
            name: "a/B".to_string(),
            resource: "a/B.js".to_string(),
            format: ModuleFormat::Amd,
            dependencies: vec![Dependency::named("a/C"), Dependency::named("a/Gone")],
        });
        graph.add_module(ModuleInfo {
            name: "a/C".to_string(),
            resource: "a/C.js".to_string(),
            format: ModuleFormat::Amd,
            dependencies: vec![],
        });
        AnalysisPass {
            graph,
            diagnostics: vec![Diagnostic {
                resource: Some("a/Broken.js".to_string()),
                kind: DiagnosticKind::Parse,
                message: "Unexpected token".to_string(),
            }],
            resources_analyzed: 3,
        }
    }

    #[test]
    fn test_make_relative_child_dir() {
        let result = make_relative(Path::new("/project/dist/a/B.js"), Path::new("/project/dist"));
        assert_eq!(result, Some(PathBuf::from("a/B.js")));
    }

    #[test]
    fn test_make_relative_sibling_dir() {
        let target = Path::new("/project/dist/preload.js");
        let result = make_relative(target, Path::new("/project/src"));
        assert_eq!(result, Some(PathBuf::from("../dist/preload.js")));
    }

    #[test]
    fn test_make_relative_same_path() {
        let result = make_relative(Path::new("/project/dist"), Path::new("/project/dist"));
        assert_eq!(result, Some(PathBuf::from(".")));
    }

    #[test]
    fn test_make_relative_multiple_levels_up() {
        let base = Path::new("/project/apps/web/src");
        let result = make_relative(Path::new("/project/out.js"), base);
        assert_eq!(result, Some(PathBuf::from("../../../out.js")));
    }

    #[test]
    fn test_make_relative_without_shared_root() {
        assert_eq!(make_relative(Path::new("dist/a.js"), Path::new("/project")), None);
    }

    #[test]
    fn test_graph_summary_marks_missing_dependencies() {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        print_graph_summary(&mut buf, &sample_pass()).unwrap();
        let text = plain(buf);
        assert!(text.contains("2 modules (0 legacy) with 2 dependency edges"));
        assert!(text.contains("a/Gone (missing)"));
        assert!(text.contains("├──  a/C"));
    }

    #[test]
    fn test_diagnostics_listing() {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        print_diagnostics(&mut buf, &sample_pass().diagnostics).unwrap();
        assert!(plain(buf).contains("a/Broken.js [parse] Unexpected token"));

        let mut empty = Vec::new();
        print_diagnostics(&mut empty, &[]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_json_summary_shape() {
        let output = BundleOutput {
            name: "preload.js".to_string(),
            variant: Variant::Preload,
            entries: vec![BundleEntry {
                key: "a/B.js".to_string(),
                module: "a/B".to_string(),
                embedding: Embedding::Function,
                content: "define(...)".to_string(),
            }],
            dep_cache: vec![],
            missing: vec!["a/Gone".to_string()],
            artifacts: vec![Artifact { path: "preload.js".to_string(), content: String::new() }],
        };
        let mut buf = Vec::new();
        write_json_summary(&mut buf, &sample_pass(), Some(&output)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["modules"], 2);
        assert_eq!(value["resources_analyzed"], 3);
        assert_eq!(value["diagnostics"][0]["kind"], "parse");
        assert_eq!(value["bundle"]["variant"], "preload");
        assert_eq!(value["bundle"]["entries"][0]["embedding"], "function");
        assert_eq!(value["bundle"]["missing"][0], "a/Gone");
        assert!(value["bundle"]["entries"][0].get("content").is_none());
    }
}
