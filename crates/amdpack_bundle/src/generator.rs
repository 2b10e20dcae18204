use amdpack_core::{ModuleInfo, ResourceIoError, ResourcePool};
use futures::future::try_join_all;
use log::{debug, info, trace, warn};
use std::{collections::HashSet, fmt::Write as _, io};

use crate::{
    constants::{
        BUNDLE_HEADER, DEBUG_SUFFIX, DEP_CACHE_KEY, LEGACY_PRELOAD_CALL, LEGACY_PRELOAD_VERSION,
        LOADER_CONFIG_CALL, PRELOAD_CALL,
    },
    error::BundleError,
    graph::DependencyGraph,
    types::{Artifact, BundleEntry, BundleOutput, BundleRequest, Embedding, Selection, Variant},
};

/// Builds one bundle from a finished analysis pass.
///
/// The graph is only read. Resource content is fetched through the pool, so
/// concurrent requests share fetches; any failure aborts this request only.
pub async fn generate(
    graph: &DependencyGraph,
    pool: &ResourcePool,
    request: &BundleRequest,
) -> Result<BundleOutput, BundleError> {
    info!("Generating {} bundle {}", request.variant, request.name);

    let requested = match &request.selection {
        Selection::Modules(names) => names.clone(),
        Selection::Below(prefix) => graph.modules_below(prefix),
    };
    if let Some(unknown) = requested.iter().find(|name| !graph.contains(name)) {
        warn!("Bundle {} requests unknown module {}", request.name, unknown);
        return Err(BundleError::UnresolvedDependency {
            bundle: request.name.clone(),
            name: unknown.clone(),
        });
    }

    let names = if request.variant == Variant::Debug {
        requested
    } else {
        graph.closure_in_discovery_order(requested.iter().map(String::as_str))
    };
    debug!("Bundle {} covers {} modules", request.name, names.len());

    let mut missing = Vec::new();
    let mut seen_resources = HashSet::new();
    let mut selected: Vec<&ModuleInfo> = Vec::new();
    for name in &names {
        match graph.get(name) {
            // A resource declaring several modules is embedded once.
            Some(node) if seen_resources.insert(node.info.resource.as_str()) => {
                selected.push(&node.info)
            }
            Some(_) => trace!("Resource of {} already embedded", name),
            None => {
                warn!("Bundle {}: no module named {} in the graph", request.name, name);
                missing.push(name.clone());
            }
        }
    }

    let contents = try_join_all(selected.iter().map(|module| fetch(pool, &module.resource)))
        .await
        .map_err(|source| BundleError::ResourceIo { bundle: request.name.clone(), source })?;

    let entries: Vec<BundleEntry> = selected
        .iter()
        .zip(contents)
        .map(|(module, content)| BundleEntry {
            key: module.resource.clone(),
            module: module.name.clone(),
            embedding: if module.is_amd() { Embedding::Function } else { Embedding::String },
            content,
        })
        .collect();

    let dep_cache = if request.dep_cache && request.variant != Variant::Debug {
        dependency_cache(graph, &names)
    } else {
        Vec::new()
    };

    let mut output = BundleOutput {
        name: request.name.clone(),
        variant: request.variant,
        entries,
        dep_cache,
        missing,
        artifacts: Vec::new(),
    };
    output.artifacts = match request.variant {
        Variant::Debug => output
            .entries
            .iter()
            .map(|entry| Artifact { path: debug_path(&entry.key), content: entry.content.clone() })
            .collect(),
        Variant::Preload | Variant::Legacy => {
            vec![Artifact { path: request.name.clone(), content: render(&output, request) }]
        }
    };

    info!(
        "Bundle {} complete: {} entries, {} artifacts",
        request.name,
        output.entries.len(),
        output.artifacts.len()
    );
    Ok(output)
}

async fn fetch(pool: &ResourcePool, path: &str) -> Result<String, ResourceIoError> {
    let resource = pool.resolve(path).ok_or_else(|| ResourceIoError {
        path: path.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "resource vanished from pool"),
    })?;
    resource.text().await
}

/// Direct static dependencies per AMD module resource, keyed by resource path.
fn dependency_cache(graph: &DependencyGraph, names: &[String]) -> Vec<(String, Vec<String>)> {
    let mut cache: Vec<(String, Vec<String>)> = Vec::new();
    let modules = names.iter().filter_map(|name| graph.get(name)).filter(|n| n.info.is_amd());
    for node in modules {
        let resource = &node.info.resource;
        let deps: Vec<String> = node
            .info
            .static_dependencies()
            .map(|dep| dependency_resource(graph, dep))
            .filter(|dep| dep != resource)
            .collect();
        if deps.is_empty() {
            continue;
        }
        // Modules sharing a resource share one entry.
        let index = match cache.iter().position(|(key, _)| key == resource) {
            Some(index) => index,
            None => {
                cache.push((resource.clone(), Vec::new()));
                cache.len() - 1
            }
        };
        for dep in deps {
            if !cache[index].1.contains(&dep) {
                cache[index].1.push(dep);
            }
        }
    }
    cache
}

/// Resource path of a dependency, or `<name>.js` when the graph has no such module.
fn dependency_resource(graph: &DependencyGraph, name: &str) -> String {
    match graph.get(name) {
        Some(node) => node.info.resource.clone(),
        None => format!("{}.js", name),
    }
}

fn render(output: &BundleOutput, request: &BundleRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", BUNDLE_HEADER, output.name);

    let table = output.entries.iter().map(render_entry).collect::<Vec<_>>().join(",\n");
    match output.variant {
        Variant::Legacy => {
            let _ = writeln!(
                out,
                "{}({{\n\"version\":\"{}\",\n\"modules\":{{\n{}\n}}}});",
                LEGACY_PRELOAD_CALL, LEGACY_PRELOAD_VERSION, table
            );
        }
        _ => {
            let _ = writeln!(out, "{}({{\n{}\n}});", PRELOAD_CALL, table);
        }
    }

    if !output.dep_cache.is_empty() {
        let cache = output
            .dep_cache
            .iter()
            .map(|(module, deps)| format!("{}:{}", js_key(module), js_list(deps)))
            .collect::<Vec<_>>()
            .join(",\n");
        let _ = writeln!(out, "{}({{{}:{{\n{}\n}}}});", LOADER_CONFIG_CALL, DEP_CACHE_KEY, cache);
    }

    if let Some(map) = &request.source_map {
        let _ = writeln!(out, "//# sourceMappingURL={}", map);
    }
    out
}

fn render_entry(entry: &BundleEntry) -> String {
    let key = js_key(&entry.key);
    match entry.embedding {
        Embedding::Function => format!("\t{}:function(){{\n{}\n}}", key, entry.content),
        Embedding::String => format!("\t{}:'{}'", key, escape_js_string(&entry.content)),
    }
}

fn js_key(key: &str) -> String {
    serde_json::Value::from(key).to_string()
}

fn js_list(items: &[String]) -> String {
    serde_json::Value::from(items.to_vec()).to_string()
}

/// Escapes `source` for a single-quoted JavaScript string literal.
pub fn escape_js_string(source: &str) -> String {
    let mut escaped = String::with_capacity(source.len() + source.len() / 8);
    for c in source.chars() {
        match c {
            '\r' => escaped.push_str("\\r"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\'' => escaped.push_str("\\'"),
            '\\' => escaped.push_str("\\\\"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// `a/B.js` -> `a/B-dbg.js`
pub fn debug_path(path: &str) -> String {
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let split = file_start + dot;
            format!("{}{}{}", &path[..split], DEBUG_SUFFIX, &path[split..])
        }
        _ => format!("{}{}", path, DEBUG_SUFFIX),
    }
}
