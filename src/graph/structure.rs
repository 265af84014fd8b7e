//! Structure walker
//!
//! First pass over the directory tree: classify every directory as a
//! Package (it holds a language's package-indicator file) or a plain
//! Folder, emit the containment edges, and remember the classification so
//! later passes can attach files and modules to the right container.

use crate::core::config::IndexConfig;
use crate::graph::sink::{props, GraphSink, NodeLabel, NodeRef, RelKind};
use crate::lang::Lang;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Classifies directories and emits the structural skeleton of the graph.
pub struct StructureWalker<'a> {
    config: &'a IndexConfig,
    /// repo-relative directory → package QN (None marks a plain folder)
    containers: BTreeMap<PathBuf, Option<String>>,
}

impl<'a> StructureWalker<'a> {
    pub fn new(config: &'a IndexConfig) -> Self {
        Self {
            config,
            containers: BTreeMap::new(),
        }
    }

    /// Walk the repository, emitting Package/Folder nodes and containment
    /// edges. The Project node itself is emitted here too.
    pub fn identify_structure(&mut self, sink: &mut dyn GraphSink) {
        sink.ensure_node(
            NodeLabel::Project,
            props([("name", json!(self.config.project_name))]),
        );

        let mut directories: Vec<PathBuf> = vec![PathBuf::new()];
        for entry in WalkDir::new(&self.config.repo_path)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            let relative = match entry.path().strip_prefix(&self.config.repo_path) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            if !self.config.is_ignored(&relative) {
                directories.push(relative);
            }
        }
        directories.sort();

        for relative in directories {
            let absolute = self.config.repo_path.join(&relative);
            let is_package = package_indicators()
                .iter()
                .any(|indicator| absolute.join(indicator).is_file());

            if is_package {
                let mut qn_parts = vec![self.config.project_name.clone()];
                qn_parts.extend(
                    relative
                        .components()
                        .filter_map(|c| c.as_os_str().to_str().map(str::to_string)),
                );
                let package_qn = qn_parts.join(".");
                debug!(package = %package_qn, "identified package");

                sink.ensure_node(
                    NodeLabel::Package,
                    props([
                        ("qualified_name", json!(package_qn)),
                        ("name", json!(dir_name(&relative, &self.config.project_name))),
                        ("path", json!(relative.to_string_lossy())),
                    ]),
                );
                let parent = self.parent_ref(&relative);
                sink.ensure_relationship(
                    parent,
                    RelKind::ContainsPackage,
                    NodeRef::new(NodeLabel::Package, package_qn.clone()),
                    None,
                );
                self.containers.insert(relative, Some(package_qn));
            } else if !relative.as_os_str().is_empty() {
                debug!(folder = %relative.display(), "identified folder");
                sink.ensure_node(
                    NodeLabel::Folder,
                    props([
                        ("path", json!(relative.to_string_lossy())),
                        ("name", json!(dir_name(&relative, &self.config.project_name))),
                    ]),
                );
                let parent = self.parent_ref(&relative);
                sink.ensure_relationship(
                    parent,
                    RelKind::ContainsFolder,
                    NodeRef::new(NodeLabel::Folder, relative.to_string_lossy()),
                    None,
                );
                self.containers.insert(relative, None);
            } else {
                // repository root without a package indicator
                self.containers.insert(relative, None);
            }
        }

        info!(
            directories = self.containers.len(),
            "structure walk complete"
        );
    }

    /// The container a child of `relative` hangs off: the repository root
    /// maps to the Project, a classified package to its Package node, and
    /// anything else to a Folder node.
    pub fn container_ref(&self, dir: &Path) -> NodeRef {
        if dir.as_os_str().is_empty() {
            return NodeRef::new(NodeLabel::Project, self.config.project_name.clone());
        }
        match self.containers.get(dir) {
            Some(Some(package_qn)) => NodeRef::new(NodeLabel::Package, package_qn.clone()),
            _ => NodeRef::new(NodeLabel::Folder, dir.to_string_lossy()),
        }
    }

    fn parent_ref(&self, relative: &Path) -> NodeRef {
        let parent = relative.parent().unwrap_or(Path::new(""));
        self.container_ref(parent)
    }

    /// Emit a File node for a non-parseable file.
    pub fn process_generic_file(&self, relative: &Path, sink: &mut dyn GraphSink) {
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = relative
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        sink.ensure_node(
            NodeLabel::File,
            props([
                ("path", json!(relative.to_string_lossy())),
                ("name", json!(name)),
                ("extension", json!(extension)),
            ]),
        );
        let parent = self.parent_ref(relative);
        sink.ensure_relationship(
            parent,
            RelKind::ContainsFile,
            NodeRef::new(NodeLabel::File, relative.to_string_lossy()),
            None,
        );
    }
}

fn dir_name(relative: &Path, project_name: &str) -> String {
    relative
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| project_name.to_string())
}

fn package_indicators() -> Vec<&'static str> {
    let mut indicators: Vec<&'static str> = Lang::ALL
        .iter()
        .flat_map(|lang| lang.spec().package_indicators.iter().copied())
        .collect();
    indicators.sort_unstable();
    indicators.dedup();
    indicators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::sink::MemorySink;
    use std::fs;

    fn walk(dir: &Path) -> (MemorySink, IndexConfig) {
        let config = IndexConfig::new(dir, Some("proj".into())).unwrap();
        let mut sink = MemorySink::new();
        let mut walker = StructureWalker::new(&config);
        walker.identify_structure(&mut sink);
        (sink, config)
    }

    #[test]
    fn test_package_vs_folder_classification() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("models")).unwrap();
        fs::write(dir.path().join("models/__init__.py"), "").unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();

        let (sink, _) = walk(dir.path());

        assert!(sink.has_node(NodeLabel::Package, "proj.models"));
        assert!(sink.has_node(NodeLabel::Folder, "docs"));
        assert!(sink.has_relationship("proj", RelKind::ContainsPackage, "proj.models"));
        assert!(sink.has_relationship("proj", RelKind::ContainsFolder, "docs"));
    }

    #[test]
    fn test_nested_packages_chain_through_parents() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/models")).unwrap();
        fs::write(dir.path().join("app/__init__.py"), "").unwrap();
        fs::write(dir.path().join("app/models/__init__.py"), "").unwrap();

        let (sink, _) = walk(dir.path());

        assert!(sink.has_relationship("proj", RelKind::ContainsPackage, "proj.app"));
        assert!(sink.has_relationship(
            "proj.app",
            RelKind::ContainsPackage,
            "proj.app.models"
        ));
    }

    #[test]
    fn test_ignored_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let (sink, _) = walk(dir.path());

        assert!(sink.has_node(NodeLabel::Folder, "src"));
        assert!(!sink.has_node(NodeLabel::Folder, "node_modules"));
        assert!(!sink.has_node(NodeLabel::Folder, "node_modules/pkg"));
    }

    #[test]
    fn test_generic_file_emission() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/logo.svg"), "<svg/>").unwrap();

        let config = IndexConfig::new(dir.path(), Some("proj".into())).unwrap();
        let mut sink = MemorySink::new();
        let mut walker = StructureWalker::new(&config);
        walker.identify_structure(&mut sink);
        walker.process_generic_file(Path::new("assets/logo.svg"), &mut sink);

        assert!(sink.has_node(NodeLabel::File, "assets/logo.svg"));
        assert!(sink.has_relationship(
            "assets",
            RelKind::ContainsFile,
            "assets/logo.svg"
        ));
    }
}
