use amdpack_core::{
    AnalyzerOptions, Diagnostic, DiagnosticKind, ExpressionParserFactory, ResourcePool, analyze,
    get_expression_parser, is_module_source,
};
use anyhow::{Context, Result, anyhow};
use futures::future::join_all;
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use std::{sync::Arc, thread};

use crate::{graph::DependencyGraph, types::AnalysisPass};

#[derive(Clone, Default)]
pub struct AnalysisOptions {
    /// Source of the binding-expression parser; analysis degrades without it
    pub expression_parsers: Option<Arc<dyn ExpressionParserFactory>>,
}

/// Analyzes every module source in `pool` and builds the dependency graph.
///
/// Problems tied to a single resource end up in the pass's diagnostics; the
/// rest of the pool is still analyzed.
pub async fn run_analysis_pass(
    pool: &ResourcePool,
    options: &AnalysisOptions,
) -> Result<AnalysisPass> {
    info!("Starting analysis pass for project {}", pool.root_project());
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    let mut analyzer_options = AnalyzerOptions::default();
    if let Some(factory) = &options.expression_parsers {
        match get_expression_parser(factory.as_ref()).await {
            Ok(parser) => analyzer_options.expression_parser = Some(parser),
            Err(e) => {
                warn!("Continuing without binding expression analysis: {}", e);
                diagnostics.push(Diagnostic::from(&e));
            }
        }
    }

    let resources: Vec<_> =
        pool.resources().into_iter().filter(|r| is_module_source(r.path())).collect();
    if resources.is_empty() {
        warn!("No module sources found in project {}", pool.root_project());
        return Err(anyhow!("No module sources found in project {}", pool.root_project()));
    }
    info!("Found {} module sources", resources.len());

    let fetched = join_all(resources.iter().map(|resource| async move {
        (resource.path().to_string(), resource.text().await)
    }))
    .await;

    let mut sources = Vec::with_capacity(fetched.len());
    for (path, result) in fetched {
        match result {
            Ok(text) => sources.push((path, text)),
            Err(e) => {
                warn!("Skipping {}: {}", path, e);
                diagnostics.push(Diagnostic::from(&e));
            }
        }
    }

    let analyzed = sources.len();
    info!("Analyzing {} resources in parallel", analyzed);
    let analyses: Vec<_> = tokio::task::spawn_blocking(move || {
        sources
            .par_iter()
            .map(|(path, text)| {
                trace!("Thread {:?} analyzing: {}", thread::current().id(), path);
                analyze(path, text, &analyzer_options)
            })
            .collect::<Vec<_>>()
    })
    .await
    .context("Analysis worker failed")?;

    let mut graph = DependencyGraph::new();
    for result in analyses {
        match result {
            Ok(analysis) => {
                diagnostics.extend(analysis.expression_errors.iter().map(|message| Diagnostic {
                    resource: Some(analysis.resource.clone()),
                    kind: DiagnosticKind::BindingExpression,
                    message: message.clone(),
                }));
                if let Some(legacy) = analysis.legacy_module() {
                    graph.add_module(legacy);
                } else {
                    analysis.modules.into_iter().for_each(|module| graph.add_module(module));
                }
            }
            Err(e) => {
                warn!("{}", e);
                diagnostics.push(Diagnostic::from(&e));
            }
        }
    }

    info!(
        "Analysis pass complete: {} modules, {} diagnostics",
        graph.len(),
        diagnostics.len()
    );
    debug!("Analyzed {} of {} resources", analyzed, resources.len());

    Ok(AnalysisPass { graph, diagnostics, resources_analyzed: analyzed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use amdpack_core::{DiagnosticKind, ExpressionParser, MemoryAdapter, ModuleFormat, Project};
    use async_trait::async_trait;

    async fn pool_with(adapter: MemoryAdapter) -> ResourcePool {
        let project = Project::load("app", Arc::new(adapter)).await.unwrap();
        ResourcePool::new(project, vec![])
    }

    #[tokio::test]
    async fn test_named_and_implicit_modules_become_nodes() {
        let pool = pool_with(
            MemoryAdapter::new()
                .with_file("a/B.js", r#"define("a/B", ["a/C"], function () {});"#)
                .with_file("a/E.js", r#"define(["a/D"], function () {});"#),
        )
        .await;

        let pass = run_analysis_pass(&pool, &AnalysisOptions::default()).await.unwrap();
        assert!(pass.diagnostics.is_empty());
        assert_eq!(pass.resources_analyzed, 2);
        let b: Vec<&String> = pass.graph.direct_dependencies("a/B").unwrap().iter().collect();
        let e: Vec<&String> = pass.graph.direct_dependencies("a/E").unwrap().iter().collect();
        assert_eq!(b, vec!["a/C"]);
        assert_eq!(e, vec!["a/D"]);
    }

    #[tokio::test]
    async fn test_resource_errors_are_collected() {
        let pool = pool_with(
            MemoryAdapter::new()
                .with_file("a/Good.js", "define(function () {});")
                .with_file("a/Broken.js", "define([, function (")
                .with_file("a/Twice.js", "define(function () {}); define(function () {});")
                .with_unreadable("a/Gone.js")
                .with_file("a/notes.txt", "not a module"),
        )
        .await;

        let pass = run_analysis_pass(&pool, &AnalysisOptions::default()).await.unwrap();
        assert_eq!(pass.graph.names().collect::<Vec<_>>(), vec!["a/Good"]);
        assert_eq!(pass.resources_analyzed, 3);

        let mut kinds: Vec<(String, DiagnosticKind)> = pass
            .diagnostics
            .iter()
            .map(|d| (d.resource.clone().unwrap(), d.kind))
            .collect();
        kinds.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            kinds,
            vec![
                ("a/Broken.js".to_string(), DiagnosticKind::Parse),
                ("a/Gone.js".to_string(), DiagnosticKind::ResourceIo),
                ("a/Twice.js".to_string(), DiagnosticKind::AmbiguousModuleName),
            ]
        );
    }

    #[tokio::test]
    async fn test_legacy_scripts_are_registered() {
        let pool = pool_with(
            MemoryAdapter::new()
                .with_file("lib/global.js", "jQuery.sap.require('lib/base'); var x;"),
        )
        .await;

        let pass = run_analysis_pass(&pool, &AnalysisOptions::default()).await.unwrap();
        let node = pass.graph.get("lib/global").unwrap();
        assert_eq!(node.info.format, ModuleFormat::Legacy);
        assert!(node.dependencies.contains("lib/base"));
    }

    #[tokio::test]
    async fn test_dependency_projects_are_analyzed_through_locators() {
        let app = Project::load(
            "app",
            Arc::new(
                MemoryAdapter::new()
                    .with_file("app/Main.js", r#"define(["lib/Util"], function () {});"#),
            ),
        )
        .await
        .unwrap();
        let lib = Project::load(
            "lib",
            Arc::new(MemoryAdapter::new().with_file("lib/Util.js", "define(function () {});")),
        )
        .await
        .unwrap();
        let pool = ResourcePool::new(app, vec![lib]);

        let pass = run_analysis_pass(&pool, &AnalysisOptions::default()).await.unwrap();
        assert!(pass.graph.contains("lib/Util"));
        assert!(pool.resolve("lib/Util.js").unwrap().is_locator());
        assert_eq!(pass.graph.transitive_closure(["app/Main"]).len(), 2);
    }

    #[tokio::test]
    async fn test_empty_pool_is_an_error() {
        let pool = pool_with(MemoryAdapter::new().with_file("README.md", "# docs")).await;
        assert!(run_analysis_pass(&pool, &AnalysisOptions::default()).await.is_err());
    }

    struct UnavailableFactory;

    #[async_trait]
    impl ExpressionParserFactory for UnavailableFactory {
        async fn create(&self) -> Result<Arc<dyn ExpressionParser>> {
            Err(anyhow!("expression runtime failed to start"))
        }
    }

    #[tokio::test]
    async fn test_missing_expression_parser_degrades() {
        let pool =
            pool_with(MemoryAdapter::new().with_file("a/B.js", "define(function () {});")).await;
        let options = AnalysisOptions { expression_parsers: Some(Arc::new(UnavailableFactory)) };

        let pass = run_analysis_pass(&pool, &options).await.unwrap();
        assert!(pass.graph.contains("a/B"));
        assert_eq!(pass.diagnostics.len(), 1);
        assert_eq!(pass.diagnostics[0].kind, DiagnosticKind::CollaboratorUnavailable);
        assert!(pass.diagnostics[0].resource.is_none());
    }
}
