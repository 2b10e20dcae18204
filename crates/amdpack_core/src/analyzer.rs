use log::{debug, trace, warn};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::{GetSpan, SourceType, Span};
use path_clean::clean;
use std::{collections::HashSet, path::Path, sync::Arc};

use crate::{
    constants::{DECLARE_CALLEES, PSEUDO_DEPENDENCIES, REQUIRE_CALLEES},
    error::AnalyzeError,
    expression::ExpressionParser,
    types::{Analysis, Dependency, ModuleFormat, ModuleInfo, module_name_for},
};

#[derive(Clone, Default)]
pub struct AnalyzerOptions {
    /// Enables dependency extraction from `{= ...}` binding strings
    pub expression_parser: Option<Arc<dyn ExpressionParser>>,
}

/// Extracts module declarations and their dependencies from `source` without running it.
///
/// `path` is the resource's virtual path; the first declaration without an
/// explicit name is named after it.
pub fn analyze(
    path: &str,
    source: &str,
    options: &AnalyzerOptions,
) -> Result<Analysis, AnalyzeError> {
    trace!("Parsing {} for module declarations", path);
    let allocator = Allocator::default();
    let ParserReturn { program, errors, panicked, .. } =
        OxcParser::new(&allocator, source, source_type_for(path)).parse();

    if panicked || !errors.is_empty() {
        let message = errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser aborted".to_string());
        debug!("Parse error in {}: {}", path, message);
        return Err(AnalyzeError::Parse { path: path.to_string(), message });
    }

    let mut collector = DeclarationCollector {
        source,
        expression_parser: options.expression_parser.as_deref(),
        declarations: Vec::new(),
        open: Vec::new(),
        ambient: Vec::new(),
        expression_errors: Vec::new(),
    };
    collector.visit_program(&program);
    let analysis = collector.finish(path)?;
    debug!(
        "Found {} module declarations in {}{}",
        analysis.modules.len(),
        path,
        if analysis.is_legacy() { " (legacy script)" } else { "" }
    );
    Ok(analysis)
}

struct PendingModule {
    name: Option<String>,
    dependencies: Vec<Dependency>,
}

struct DeclarationCollector<'s> {
    source: &'s str,
    expression_parser: Option<&'s dyn ExpressionParser>,
    declarations: Vec<PendingModule>,
    /// Declarations whose arguments are currently being walked, innermost last
    open: Vec<usize>,
    ambient: Vec<Dependency>,
    expression_errors: Vec<String>,
}

impl<'a> Visit<'a> for DeclarationCollector<'_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        match callee_name(&call.callee) {
            Some(name) if DECLARE_CALLEES.contains(&name) => {
                if let Some(pending) = self.declaration(call) {
                    trace!("Found declaration: {:?}", pending.name);
                    self.declarations.push(pending);
                    self.open.push(self.declarations.len() - 1);
                    walk::walk_call_expression(self, call);
                    self.open.pop();
                    return;
                }
            }
            Some(name) if REQUIRE_CALLEES.contains(&name) => {
                let dependencies = self.eager_require(call);
                trace!("Found eager require of {} dependencies", dependencies.len());
                self.record(dependencies);
            }
            _ => {}
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_string_literal(&mut self, lit: &StringLiteral<'a>) {
        let Some(parser) = self.expression_parser else {
            return;
        };
        let Some(expression) = binding_expression(lit.value.as_str()) else {
            return;
        };
        match parser.referenced_modules(expression) {
            Ok(names) => {
                trace!("Binding expression references {:?}", names);
                self.record(names.into_iter().map(Dependency::named).collect());
            }
            Err(message) => {
                warn!("Skipping binding expression {:?}: {}", expression, message);
                self.expression_errors
                    .push(format!("binding expression `{}`: {}", expression, message));
            }
        }
    }
}

impl DeclarationCollector<'_> {
    /// Matches `(name?, dependencies?, factory, export?)`.
    fn declaration(&self, call: &CallExpression<'_>) -> Option<PendingModule> {
        let mut args: Vec<&Argument<'_>> = call.arguments.iter().collect();
        if args.len() > 1 && matches!(args.last(), Some(Argument::BooleanLiteral(_))) {
            args.pop();
        }

        let mut rest = args.as_slice();
        let mut name = None;
        let mut literal_name = false;
        if rest.len() >= 3 || (rest.len() == 2 && is_literal_name(rest[0])) {
            literal_name = is_literal_name(rest[0]);
            name = rest[0].as_expression().and_then(static_string);
            rest = &rest[1..];
        }

        let mut dependencies = Vec::new();
        let has_dependency_list = rest.len() >= 2;
        let array_dependencies =
            has_dependency_list && matches!(rest[0], Argument::ArrayExpression(_));
        if has_dependency_list {
            dependencies = self.dependency_list(rest[0]);
            rest = &rest[1..];
        }

        // Any factory expression counts once a literal name or a dependency array
        // precedes it. Bare calls need a factory literal.
        let factory = rest.last()?.as_expression()?;
        let factory_shape = match factory {
            Expression::FunctionExpression(_)
            | Expression::ArrowFunctionExpression(_)
            | Expression::ObjectExpression(_) => true,
            Expression::ClassExpression(_) => false,
            Expression::Identifier(_) => has_dependency_list || literal_name,
            _ => literal_name || array_dependencies,
        };
        factory_shape.then_some(PendingModule { name, dependencies })
    }

    fn eager_require(&self, call: &CallExpression<'_>) -> Vec<Dependency> {
        let Some(first) = call.arguments.first() else {
            return Vec::new();
        };
        match first.as_expression() {
            Some(Expression::ArrayExpression(_)) => self.dependency_list(first),
            Some(expr) => vec![self.dependency(expr)],
            None => vec![self.dynamic(first.span())],
        }
    }

    fn dependency_list(&self, arg: &Argument<'_>) -> Vec<Dependency> {
        match arg.as_expression() {
            Some(Expression::ArrayExpression(array)) => array
                .elements
                .iter()
                .filter_map(|element| match element {
                    ArrayExpressionElement::Elision(_) => None,
                    ArrayExpressionElement::SpreadElement(spread) => {
                        Some(self.dynamic(spread.span))
                    }
                    _ => element.as_expression().map(|expr| self.dependency(expr)),
                })
                .collect(),
            // A list computed at runtime still names at least one dependency.
            _ => vec![self.dynamic(arg.span())],
        }
    }

    fn dependency(&self, expr: &Expression<'_>) -> Dependency {
        match static_string(expr) {
            Some(name) => Dependency::named(name),
            None => self.dynamic(expr.span()),
        }
    }

    fn dynamic(&self, span: Span) -> Dependency {
        Dependency::Dynamic { expression: span.source_text(self.source).to_string() }
    }

    fn record(&mut self, dependencies: Vec<Dependency>) {
        match self.open.last() {
            Some(&index) => self.declarations[index].dependencies.extend(dependencies),
            None => self.ambient.extend(dependencies),
        }
    }

    fn finish(self, path: &str) -> Result<Analysis, AnalyzeError> {
        let implicit_name = module_name_for(path);
        let mut implicit_taken = false;
        let mut modules = Vec::with_capacity(self.declarations.len());

        for pending in self.declarations {
            let name = match pending.name {
                Some(name) => name,
                None if implicit_taken => {
                    return Err(AnalyzeError::AmbiguousModuleName { path: path.to_string() });
                }
                None => {
                    implicit_taken = true;
                    implicit_name.clone()
                }
            };
            let dependencies = normalize_dependencies(&name, pending.dependencies);
            modules.push(ModuleInfo {
                name,
                resource: path.to_string(),
                format: ModuleFormat::Amd,
                dependencies,
            });
        }

        let mut ambient = self.ambient;
        if let Some(primary) = modules.first_mut() {
            let extra = normalize_dependencies(&primary.name, std::mem::take(&mut ambient));
            let declared = std::mem::take(&mut primary.dependencies);
            primary.dependencies = dedup(declared.into_iter().chain(extra).collect());
        } else {
            ambient = normalize_dependencies(&implicit_name, ambient);
        }

        Ok(Analysis {
            resource: path.to_string(),
            modules,
            ambient,
            expression_errors: self.expression_errors,
        })
    }
}

/// Terminal name of a callee: `define`, `sap.ui.define`, `sap.ui["define"]`, `(ns?.ui).define`.
fn callee_name<'b>(callee: &'b Expression<'_>) -> Option<&'b str> {
    match callee {
        Expression::Identifier(ident) => Some(ident.name.as_str()),
        Expression::StaticMemberExpression(member) => Some(member.property.name.as_str()),
        Expression::ComputedMemberExpression(member) => string_key(&member.expression),
        Expression::ParenthesizedExpression(paren) => callee_name(&paren.expression),
        Expression::ChainExpression(chain) => match &chain.expression {
            ChainElement::StaticMemberExpression(member) => Some(member.property.name.as_str()),
            ChainElement::ComputedMemberExpression(member) => string_key(&member.expression),
            _ => None,
        },
        _ => None,
    }
}

fn string_key<'b>(expr: &'b Expression<'_>) -> Option<&'b str> {
    match expr {
        Expression::StringLiteral(lit) => Some(lit.value.as_str()),
        _ => None,
    }
}

/// Value of a string literal or of a template literal without substitutions.
fn static_string(expr: &Expression<'_>) -> Option<String> {
    match expr {
        Expression::StringLiteral(lit) => Some(lit.value.to_string()),
        Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => tpl
            .quasis
            .first()
            .map(|quasi| quasi.value.cooked.as_ref().unwrap_or(&quasi.value.raw).to_string()),
        _ => None,
    }
}

fn is_literal_name(arg: &Argument<'_>) -> bool {
    matches!(arg, Argument::StringLiteral(_) | Argument::TemplateLiteral(_))
}

fn binding_expression(value: &str) -> Option<&str> {
    let value = value.trim();
    value
        .strip_prefix("{=")
        .or_else(|| value.strip_prefix("{:="))
        .and_then(|rest| rest.strip_suffix('}'))
        .map(str::trim)
}

/// Drops pseudo-dependencies, resolves relative names against `module` and removes duplicates.
fn normalize_dependencies(module: &str, dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let resolved = dependencies
        .into_iter()
        .filter(|dep| !dep.name().is_some_and(|name| PSEUDO_DEPENDENCIES.contains(&name)))
        .map(|dep| match dep {
            Dependency::Static { name } => {
                Dependency::named(resolve_dependency_name(module, &name))
            }
            dynamic => dynamic,
        })
        .collect();
    dedup(resolved)
}

fn dedup(dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let mut seen = HashSet::new();
    dependencies
        .into_iter()
        .filter(|dep| match dep.name() {
            Some(name) => seen.insert(name.to_string()),
            None => true,
        })
        .collect()
}

pub fn resolve_dependency_name(module: &str, dependency: &str) -> String {
    let dependency = dependency.strip_suffix(".js").unwrap_or(dependency);
    if !(dependency.starts_with("./") || dependency.starts_with("../")) {
        return dependency.to_string();
    }
    let joined = match module.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, dependency),
        None => dependency.to_string(),
    };
    clean(joined).to_string_lossy().replace('\\', "/")
}

fn source_type_for(path: &str) -> SourceType {
    let ext = Path::new(path).extension().and_then(|e| e.to_str());

    let st = SourceType::default()
        .with_jsx(matches!(ext, Some("jsx")))
        .with_typescript(matches!(ext, Some("ts") | Some("tsx")));

    // Module sources are mostly sloppy-mode scripts; only .mjs gets the module goal
    if matches!(ext, Some("mjs")) { st.with_module(true) } else { st.with_script(true) }
}
