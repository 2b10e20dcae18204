use serde::Serialize;

/// A dependency reference recorded for a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Dependency {
    Static { name: String },
    /// Known to exist, but the target name is only known at runtime.
    Dynamic { expression: String },
}

impl Dependency {
    pub fn named(name: impl Into<String>) -> Self {
        Dependency::Static { name: name.into() }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Dependency::Static { name } => Some(name.as_str()),
            Dependency::Dynamic { .. } => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Dependency::Dynamic { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// Registered through a recognized declaration call.
    Amd,
    /// Plain script that expects to run in global scope.
    Legacy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: String,
    /// Virtual path of the resource the module was found in
    pub resource: String,
    pub format: ModuleFormat,
    pub dependencies: Vec<Dependency>,
}

impl ModuleInfo {
    pub fn is_amd(&self) -> bool {
        self.format == ModuleFormat::Amd
    }

    pub fn static_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().filter_map(Dependency::name)
    }
}

/// Result of analyzing a single resource.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub resource: String,
    pub modules: Vec<ModuleInfo>,
    /// Eager requires of a resource that declares nothing
    pub ambient: Vec<Dependency>,
    /// Binding expressions the expression parser rejected
    pub expression_errors: Vec<String>,
}

impl Analysis {
    pub fn is_legacy(&self) -> bool {
        self.modules.is_empty()
    }

    /// Describes a resource without declarations as a legacy script record.
    pub fn legacy_module(&self) -> Option<ModuleInfo> {
        if !self.is_legacy() {
            return None;
        }
        Some(ModuleInfo {
            name: module_name_for(&self.resource),
            resource: self.resource.clone(),
            format: ModuleFormat::Legacy,
            dependencies: self.ambient.clone(),
        })
    }
}

/// Module name implied by a resource path: the path without its final extension.
pub fn module_name_for(path: &str) -> String {
    let path = path.trim_start_matches('/');
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => path[..file_start + dot].to_string(),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_strips_extension() {
        assert_eq!(module_name_for("a/E.js"), "a/E");
        assert_eq!(module_name_for("/a/E.js"), "a/E");
        assert_eq!(module_name_for("jquery.sap.global.js"), "jquery.sap.global");
    }

    #[test]
    fn test_module_name_keeps_dotted_directories() {
        assert_eq!(module_name_for("lib/v1.2/Mod.js"), "lib/v1.2/Mod");
        assert_eq!(module_name_for("lib/v1.2/Mod"), "lib/v1.2/Mod");
        assert_eq!(module_name_for("lib/.hidden"), "lib/.hidden");
    }

    #[test]
    fn test_legacy_module_only_for_declaration_free_resources() {
        let legacy = Analysis {
            resource: "lib/global.js".to_string(),
            modules: vec![],
            ambient: vec![Dependency::named("lib/base")],
            expression_errors: vec![],
        };
        let module = legacy.legacy_module().unwrap();
        assert_eq!(module.name, "lib/global");
        assert_eq!(module.format, ModuleFormat::Legacy);
        assert_eq!(module.static_dependencies().collect::<Vec<_>>(), vec!["lib/base"]);

        let amd = Analysis {
            resource: "lib/Amd.js".to_string(),
            modules: vec![ModuleInfo {
                name: "lib/Amd".to_string(),
                resource: "lib/Amd.js".to_string(),
                format: ModuleFormat::Amd,
                dependencies: vec![],
            }],
            ambient: vec![],
            expression_errors: vec![],
        };
        assert!(amd.legacy_module().is_none());
    }
}
