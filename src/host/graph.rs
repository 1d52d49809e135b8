//! Module dependency graph for impact resolution.
//!
//! Maintains both forward (module → packages it depends on) and reverse
//! (package → modules that depend on it) mappings. Built once per round from
//! the host's project model and dropped afterwards.
//!
//! Module names and package names share one namespace: a module is matched to
//! a package by exact name equality.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

type NameSet = FxHashSet<String>;
type NameSetMap = FxHashMap<String, NameSet>;

/// Bidirectional module dependency graph.
///
/// # Invariants
/// - Forward and reverse mappings are always consistent
/// - Self-references are excluded
#[derive(Debug, Default, Clone)]
pub struct ModuleGraph {
    /// Forward: module → packages it depends on
    forward: NameSetMap,
    /// Reverse: package → modules that depend on it
    reverse: NameSetMap,
}

impl ModuleGraph {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dependencies of one module.
    ///
    /// Replaces any existing dependencies for this module.
    pub fn record<I, S>(&mut self, module: &str, depends: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_module(module);

        let deps: NameSet = depends
            .into_iter()
            .map(Into::into)
            .filter(|dep| dep != module)
            .collect();

        for dep in &deps {
            self.reverse
                .entry(dep.clone())
                .or_default()
                .insert(module.to_owned());
        }

        self.forward.insert(module.to_owned(), deps);
    }

    /// Modules that directly depend on `package`.
    #[inline]
    pub fn used_by(&self, package: &str) -> Option<&NameSet> {
        self.reverse.get(package)
    }

    /// Packages that `module` directly depends on.
    #[cfg(test)]
    #[inline]
    pub fn uses(&self, module: &str) -> Option<&NameSet> {
        self.forward.get(module)
    }

    /// All modules that depend on any of `packages`, directly or transitively.
    ///
    /// A seed package only appears in the result when it is itself reached
    /// through another seed's dependents.
    pub fn dependents_of<'a, I>(&self, packages: I) -> NameSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found = NameSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for package in packages {
            queue.push_back(package);
        }

        while let Some(package) = queue.pop_front() {
            let Some(users) = self.used_by(package) else {
                continue;
            };
            for user in users {
                if found.insert(user.clone()) {
                    queue.push_back(user.as_str());
                }
            }
        }

        found
    }

    /// Number of modules with recorded dependencies.
    #[cfg(test)]
    #[inline]
    pub fn module_count(&self) -> usize {
        self.forward.len()
    }

    fn remove_module(&mut self, module: &str) {
        let Some(old_deps) = self.forward.remove(module) else {
            return;
        };

        for dep in old_deps {
            if let Some(users) = self.reverse.get_mut(&dep) {
                users.remove(module);
                if users.is_empty() {
                    self.reverse.remove(&dep);
                }
            }
        }
    }
}
