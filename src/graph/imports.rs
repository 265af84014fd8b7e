//! Import map
//!
//! Per-module mapping from a local alias to the qualified name it imports.
//! Wildcard imports get keys prefixed with `*` so the resolver can iterate
//! them separately from ordinary aliases.

use std::collections::{BTreeMap, HashMap};

/// module QN → (local alias → imported QN)
#[derive(Default)]
pub struct ImportMap {
    by_module: HashMap<String, BTreeMap<String, String>>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `local_name` as an alias for `imported_qn` inside `module_qn`.
    pub fn register(&mut self, module_qn: &str, local_name: &str, imported_qn: &str) {
        self.by_module
            .entry(module_qn.to_string())
            .or_default()
            .insert(local_name.to_string(), imported_qn.to_string());
    }

    /// Register a wildcard import of `imported_qn` inside `module_qn`.
    pub fn register_wildcard(&mut self, module_qn: &str, imported_qn: &str) {
        let key = format!("*{imported_qn}");
        self.register(module_qn, &key, imported_qn);
    }

    pub fn module(&self, module_qn: &str) -> Option<&BTreeMap<String, String>> {
        self.by_module.get(module_qn)
    }

    pub fn lookup(&self, module_qn: &str, local_name: &str) -> Option<&str> {
        self.by_module
            .get(module_qn)?
            .get(local_name)
            .map(String::as_str)
    }

    /// Imported QNs of every wildcard entry in `module_qn`, in key order.
    pub fn wildcards<'a>(&'a self, module_qn: &str) -> Vec<&'a str> {
        match self.by_module.get(module_qn) {
            Some(map) => map
                .iter()
                .filter(|(local, _)| local.starts_with('*'))
                .map(|(_, qn)| qn.as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_lookup() {
        let mut imports = ImportMap::new();
        imports.register("proj.svc", "User", "proj.models.user.User");
        imports.register("proj.svc", "u", "proj.models.user");

        assert_eq!(
            imports.lookup("proj.svc", "User"),
            Some("proj.models.user.User")
        );
        assert_eq!(imports.lookup("proj.svc", "u"), Some("proj.models.user"));
        assert_eq!(imports.lookup("proj.svc", "unknown"), None);
        assert_eq!(imports.lookup("proj.other", "User"), None);
    }

    #[test]
    fn test_wildcards_are_kept_apart_from_aliases() {
        let mut imports = ImportMap::new();
        imports.register("proj.svc", "helper", "proj.utils.helper");
        imports.register_wildcard("proj.svc", "proj.utils");
        imports.register_wildcard("proj.svc", "external.lib");

        assert_eq!(
            imports.wildcards("proj.svc"),
            ["external.lib", "proj.utils"]
        );
        // a wildcard never shadows a direct alias
        assert_eq!(
            imports.lookup("proj.svc", "helper"),
            Some("proj.utils.helper")
        );
    }
}
