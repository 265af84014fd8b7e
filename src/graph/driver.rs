//! Driver
//!
//! Sequences the whole run: structure walk, parallel parse fan-out into
//! the AST cache, definitions (pass 1), call resolution (pass 2), sink
//! flush. Pass 1 strictly precedes pass 2; the symbol table, import map,
//! inheritance map, and AST cache are frozen between the passes.

use crate::core::config::IndexConfig;
use crate::core::error::Result;
use crate::graph::calls::CallProcessor;
use crate::graph::definitions::DefinitionExtractor;
use crate::graph::infer::TypeInference;
use crate::graph::sink::GraphSink;
use crate::graph::structure::StructureWalker;
use crate::graph::CodeIndex;
use crate::lang::{Lang, QuerySet};
use crate::parse::{parse_source, AstCache};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Counters reported after a run
#[derive(Debug, Default, Clone)]
pub struct BuildStats {
    pub files_parsed: usize,
    pub parse_failures: usize,
    pub generic_files: usize,
    pub modules_indexed: usize,
    pub call_edges: usize,
    pub unresolved_calls: usize,
    pub cancelled: bool,
}

/// Owns the run: configuration, query bundles, and the cancellation flag.
pub struct GraphBuilder {
    config: IndexConfig,
    queries: QuerySet,
    cancel: Arc<AtomicBool>,
}

impl GraphBuilder {
    pub fn new(config: IndexConfig) -> Result<Self> {
        Ok(Self {
            config,
            queries: QuerySet::compile()?,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Cooperative cancellation: flip the flag and the driver stops at the
    /// next file boundary. Partial output is valid; the graph is additive.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&self, sink: &mut dyn GraphSink) -> Result<BuildStats> {
        let mut stats = BuildStats::default();

        // structure
        let mut walker = StructureWalker::new(&self.config);
        walker.identify_structure(sink);

        // collect files
        let mut parseable: Vec<(PathBuf, Lang)> = Vec::new();
        let mut generic: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(&self.config.repo_path)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = match entry.path().strip_prefix(&self.config.repo_path) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            if self.config.is_ignored(&relative) {
                continue;
            }
            match Lang::from_path(&relative) {
                Some(lang) => parseable.push((relative, lang)),
                None => generic.push(relative),
            }
        }
        parseable.sort();
        generic.sort();

        for relative in &generic {
            walker.process_generic_file(relative, sink);
            stats.generic_files += 1;
        }

        // parse fan-out; the cache itself is assembled sequentially so the
        // barrier before pass 1 is explicit
        let parsed_files: Vec<_> = parseable
            .par_iter()
            .map(|(relative, lang)| {
                let absolute = self.config.repo_path.join(relative);
                let result = std::fs::read(&absolute)
                    .map_err(crate::core::error::Error::from)
                    .and_then(|source| parse_source(&absolute, source, *lang));
                (relative.clone(), result)
            })
            .collect();

        let mut cache = AstCache::new();
        for (relative, result) in parsed_files {
            match result {
                Ok(parsed) => {
                    cache.insert(relative, parsed);
                    stats.files_parsed += 1;
                }
                Err(e) => {
                    warn!(file = %relative.display(), error = %e, "parse failed; file kept as generic");
                    walker.process_generic_file(&relative, sink);
                    stats.parse_failures += 1;
                }
            }
        }
        info!(
            parsed = stats.files_parsed,
            failed = stats.parse_failures,
            generic = stats.generic_files,
            "file collection complete"
        );

        // pass 1: definitions and imports
        let mut index = CodeIndex::new();
        let extractor =
            DefinitionExtractor::new(&self.config.project_name, &self.config.repo_path, &self.queries);
        for (relative, parsed) in cache.iter() {
            debug!(file = %relative.display(), "pass 1");
            extractor.process_file(relative, parsed, &mut index, &walker, sink)?;
            stats.modules_indexed += 1;
        }
        info!(
            modules = stats.modules_indexed,
            symbols = index.symbols.len(),
            "pass 1 complete"
        );

        // pass 2: calls; the index is read-only from here on
        let index = index;
        let inference = TypeInference::new(&index, &cache, &self.queries);
        let processor = CallProcessor::new(
            &self.config.project_name,
            &self.queries,
            &index,
            &inference,
        );
        for (relative, parsed) in cache.iter() {
            if self.cancel.load(Ordering::Relaxed) {
                info!("cancellation requested; stopping before {}", relative.display());
                stats.cancelled = true;
                break;
            }
            let file_stats = processor.process_calls_in_file(relative, parsed, sink);
            stats.call_edges += file_stats.emitted;
            stats.unresolved_calls += file_stats.unresolved;
        }
        info!(
            call_edges = stats.call_edges,
            unresolved = stats.unresolved_calls,
            "pass 2 complete"
        );

        sink.flush();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::sink::{MemorySink, NodeLabel, RelKind};
    use std::fs;

    fn build_repo(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let absolute = dir.path().join(path);
            fs::create_dir_all(absolute.parent().unwrap()).unwrap();
            fs::write(&absolute, content).unwrap();
        }
        dir
    }

    fn index_repo(files: &[(&str, &str)]) -> (MemorySink, BuildStats) {
        let dir = build_repo(files);
        let config = IndexConfig::new(dir.path(), Some("proj".into())).unwrap();
        let builder = GraphBuilder::new(config).unwrap();
        let mut sink = MemorySink::new();
        let stats = builder.run(&mut sink).unwrap();
        (sink, stats)
    }

    #[test]
    fn test_python_cross_file_method_call() {
        let (sink, _) = index_repo(&[
            (
                "models/user.py",
                r#"
class User:
    def __init__(self, name):
        self.name = name

    def get_name(self):
        return self.name
"#,
            ),
            (
                "services/svc.py",
                r#"
from models.user import User

def fetch_label():
    u = User("a")
    return u.get_name()
"#,
            ),
        ]);

        assert!(sink.has_relationship(
            "proj.services.svc.fetch_label",
            RelKind::Calls,
            "proj.models.user.User.get_name"
        ));
    }

    #[test]
    fn test_python_list_comprehension_element_calls() {
        let (sink, _) = index_repo(&[
            (
                "models/user.py",
                r#"
class User:
    def get_name(self):
        return "u"
"#,
            ),
            (
                "report.py",
                r#"
from models.user import User

def labels():
    users = [User("a"), User("b")]
    return [u.get_name() for u in users]
"#,
            ),
        ]);

        assert!(sink.has_relationship(
            "proj.report.labels",
            RelKind::Calls,
            "proj.models.user.User.get_name"
        ));
    }

    #[test]
    fn test_javascript_super_constructor_call() {
        let (sink, _) = index_repo(&[(
            "widgets.js",
            r#"
class A {
  constructor() {}
}

class B extends A {
  constructor() {
    super();
  }
}
"#,
        )]);

        assert!(sink.has_relationship(
            "proj.widgets.B.constructor",
            RelKind::Calls,
            "proj.widgets.A.constructor"
        ));
    }

    #[test]
    fn test_rust_impl_method_self_call() {
        let (sink, _) = index_repo(&[(
            "src/lib.rs",
            r#"
pub struct Foo;

impl Foo {
    pub fn bar(&self) {
        self.baz();
    }

    pub fn baz(&self) {}
}
"#,
        )]);

        assert!(sink.has_relationship(
            "proj.src.lib.Foo.bar",
            RelKind::Calls,
            "proj.src.lib.Foo.baz"
        ));
    }

    #[test]
    fn test_cpp_operator_falls_back_to_builtin() {
        let (sink, _) = index_repo(&[(
            "src/main.cpp",
            r#"
int compute(int a, int b) {
    int x = a + b;
    return x;
}
"#,
        )]);

        assert!(sink.has_relationship(
            "proj.src.main.compute",
            RelKind::Calls,
            "builtin.cpp.operator_plus"
        ));
    }

    #[test]
    fn test_python_fluent_chain_resolves_through_return_types() {
        let (sink, _) = index_repo(&[(
            "query.py",
            r#"
class Query:
    def filter(self, cond):
        return self

    def run(self):
        return []

def go():
    q = Query()
    q.filter("x").run()
"#,
        )]);

        assert!(sink.has_relationship(
            "proj.query.go",
            RelKind::Calls,
            "proj.query.Query.run"
        ));
    }

    #[test]
    fn test_python_inherited_method_call() {
        let (sink, _) = index_repo(&[
            (
                "models/base.py",
                "class Base:\n    def save(self):\n        pass\n",
            ),
            (
                "models/user.py",
                "from models.base import Base\n\nclass User(Base):\n    pass\n",
            ),
            (
                "svc.py",
                r#"
from models.user import User

def persist():
    u = User()
    u.save()
"#,
            ),
        ]);

        assert!(sink.has_relationship(
            "proj.svc.persist",
            RelKind::Calls,
            "proj.models.base.Base.save"
        ));
    }

    #[test]
    fn test_unresolved_call_emits_no_edge() {
        let (sink, stats) = index_repo(&[(
            "app.py",
            r#"
def run():
    completely_unknown_symbol()
"#,
        )]);

        assert!(stats.unresolved_calls >= 1);
        let callers: Vec<_> = sink
            .relationships_of(RelKind::Calls)
            .into_iter()
            .filter(|r| r.from.key == "proj.app.run")
            .collect();
        assert!(callers.is_empty(), "no edge for an unresolved call: {callers:?}");
    }

    #[test]
    fn test_same_module_definition_wins_over_other_module_suffix() {
        let (sink, _) = index_repo(&[
            (
                "app.py",
                r#"
def helper():
    pass

def run():
    helper()
"#,
            ),
            ("lib.py", "def helper():\n    pass\n"),
        ]);

        assert!(sink.has_relationship("proj.app.run", RelKind::Calls, "proj.app.helper"));
        assert!(!sink.has_relationship("proj.app.run", RelKind::Calls, "proj.lib.helper"));
    }

    #[test]
    fn test_each_file_parsed_exactly_once() {
        let files = [
            ("a.py", "def fa():\n    pass\n"),
            ("b.py", "def fb():\n    fa()\n"),
            ("c.rs", "pub fn fc() {}\n"),
        ];
        let dir = build_repo(&files);
        let config = IndexConfig::new(dir.path(), Some("proj".into())).unwrap();
        let builder = GraphBuilder::new(config).unwrap();
        let mut sink = MemorySink::new();

        let stats = builder.run(&mut sink).unwrap();

        assert_eq!(stats.files_parsed, 3);
        // return-type inference in pass 2 must revisit cached trees, never
        // the parser
        for (path, _) in files {
            assert_eq!(
                crate::parse::parse_count(&dir.path().join(path)),
                1,
                "{path} parsed more than once"
            );
        }
    }

    #[test]
    fn test_idempotent_runs_produce_identical_graphs() {
        let files = [
            (
                "models/user.py",
                "class User:\n    def get_name(self):\n        return self.name\n",
            ),
            (
                "svc.py",
                "from models.user import User\n\ndef go():\n    u = User()\n    u.get_name()\n",
            ),
        ];
        let dir = build_repo(&files);
        let config = IndexConfig::new(dir.path(), Some("proj".into())).unwrap();

        let run = || {
            let builder = GraphBuilder::new(config.clone()).unwrap();
            let mut sink = MemorySink::new();
            builder.run(&mut sink).unwrap();
            sink.fingerprint()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_parse_failure_degrades_to_file_node() {
        let dir = build_repo(&[("ok.py", "def fine():\n    pass\n")]);
        // invalid UTF-8 makes parse_source fail without touching tree-sitter
        fs::write(dir.path().join("broken.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let config = IndexConfig::new(dir.path(), Some("proj".into())).unwrap();
        let builder = GraphBuilder::new(config).unwrap();
        let mut sink = MemorySink::new();
        let stats = builder.run(&mut sink).unwrap();

        assert_eq!(stats.parse_failures, 1);
        assert!(sink.has_node(NodeLabel::File, "broken.py"));
        assert!(sink.has_node(NodeLabel::Module, "proj.ok"));
    }

    #[test]
    fn test_cancellation_stops_pass_two() {
        let dir = build_repo(&[
            ("a.py", "def fa():\n    pass\n"),
            ("b.py", "def fb():\n    pass\n"),
        ]);
        let config = IndexConfig::new(dir.path(), Some("proj".into())).unwrap();
        let builder = GraphBuilder::new(config).unwrap();
        builder.cancellation_flag().store(true, Ordering::Relaxed);

        let mut sink = MemorySink::new();
        let stats = builder.run(&mut sink).unwrap();

        assert!(stats.cancelled);
        assert_eq!(stats.call_edges, 0);
        // pass 1 output is still valid partial output
        assert!(sink.has_node(NodeLabel::Module, "proj.a"));
        assert!(sink.was_flushed());
    }

    #[test]
    fn test_no_call_edge_before_definitions_complete() {
        // mutually recursive across files: resolving either call needs the
        // other file's definitions, so emission order proves the barrier
        let (sink, _) = index_repo(&[
            ("a.py", "from z import fb\n\ndef fa():\n    fb()\n"),
            ("z.py", "from a import fa\n\ndef fb():\n    fa()\n"),
        ]);

        let sequence = sink.relationship_sequence();
        let first_call = sequence.iter().position(|r| r.rel == RelKind::Calls);
        let last_defines = sequence.iter().rposition(|r| r.rel == RelKind::Defines);

        let (Some(first_call), Some(last_defines)) = (first_call, last_defines) else {
            panic!("expected both DEFINES and CALLS edges");
        };
        assert!(
            last_defines < first_call,
            "a CALLS edge was emitted before pass 1 finished"
        );
        assert!(sink.has_relationship("proj.a.fa", RelKind::Calls, "proj.z.fb"));
        assert!(sink.has_relationship("proj.z.fb", RelKind::Calls, "proj.a.fa"));
    }

    #[test]
    fn test_flush_called_after_run() {
        let (sink, _) = index_repo(&[("m.py", "x = 1\n")]);
        assert!(sink.was_flushed());
    }

    #[test]
    fn test_module_containment_edges() {
        let (sink, _) = index_repo(&[
            ("pkg/__init__.py", ""),
            ("pkg/mod.py", "def f():\n    pass\n"),
            ("assets/data.txt", "not code"),
        ]);

        assert!(sink.has_relationship("proj.pkg", RelKind::ContainsFile, "proj.pkg.mod"));
        assert!(sink.has_relationship("assets", RelKind::ContainsFile, "assets/data.txt"));
    }
}
