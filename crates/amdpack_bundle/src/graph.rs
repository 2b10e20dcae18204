use amdpack_core::ModuleInfo;
use log::{debug, trace, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub info: ModuleInfo,
    /// Direct static dependencies; dynamic placeholders stay on `info`
    pub dependencies: BTreeSet<String>,
}

/// Module name -> module record and direct dependency names.
///
/// Built once per analysis pass and read-only afterwards. Cycles are allowed.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, ModuleNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `module`, replacing any earlier record with the same name.
    pub fn add_module(&mut self, module: ModuleInfo) {
        let dependencies = module.static_dependencies().map(str::to_string).collect();
        trace!("Adding module {} from {}", module.name, module.resource);
        let node = ModuleNode { info: module, dependencies };
        if let Some(previous) = self.nodes.insert(node.info.name.clone(), node)
            && let Some(current) = self.nodes.get(&previous.info.name)
            && previous.info.resource != current.info.resource
        {
            warn!(
                "Module {} declared in {} replaces the one from {}",
                current.info.name, current.info.resource, previous.info.resource
            );
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModuleNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn direct_dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.nodes.get(name).map(|node| &node.dependencies)
    }

    /// Every name reachable from `seeds`, including the seeds and names without a node.
    pub fn transitive_closure<'n>(
        &self,
        seeds: impl IntoIterator<Item = &'n str>,
    ) -> HashSet<String> {
        self.closure_in_discovery_order(seeds).into_iter().collect()
    }

    /// Breadth-first closure that lists the seeds first, in the order given.
    pub fn closure_in_discovery_order<'n>(
        &self,
        seeds: impl IntoIterator<Item = &'n str>,
    ) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for seed in seeds {
            if visited.insert(seed.to_string()) {
                queue.push_back(seed.to_string());
            }
        }

        while let Some(cur) = queue.pop_front() {
            trace!("Visiting module: {}", cur);
            if let Some(deps) = self.direct_dependencies(&cur) {
                for dep in deps {
                    if visited.insert(dep.clone()) {
                        queue.push_back(dep.clone());
                    }
                }
            }
            order.push(cur);
        }

        debug!("Computed closure of {} modules", order.len());
        order
    }

    /// Names of modules whose resource lives below `prefix`, sorted.
    pub fn modules_below(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.trim_start_matches('/');
        self.nodes
            .values()
            .filter(|node| node.info.resource.starts_with(prefix))
            .map(|node| node.info.name.clone())
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
