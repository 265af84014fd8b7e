//! Parsing and the AST cache
//!
//! Each source file is parsed exactly once per run; the resulting tree,
//! source bytes, and language tag live in the [`AstCache`] for the rest of
//! the run so pass 2 and return-type inference can revisit any file without
//! reparsing. Parse invocations are counted so tests can observe the
//! parse-once property.

use crate::core::error::{Error, Result};
use crate::lang::Lang;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tree_sitter::{Node, Parser, Tree};

static PARSE_INVOCATIONS: AtomicUsize = AtomicUsize::new(0);
static PARSE_COUNTS: Lazy<Mutex<HashMap<PathBuf, usize>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Number of tree-sitter parse calls made by this process so far.
pub fn parse_invocations() -> usize {
    PARSE_INVOCATIONS.load(Ordering::Relaxed)
}

/// How often a specific path has been handed to the parser. The driver
/// parses by absolute path, so a run's files are individually observable.
pub fn parse_count(path: &Path) -> usize {
    PARSE_COUNTS
        .lock()
        .map(|counts| counts.get(path).copied().unwrap_or(0))
        .unwrap_or(0)
}

/// A parsed source file retained for the whole run
pub struct ParsedFile {
    pub tree: Tree,
    pub source: Vec<u8>,
    pub lang: Lang,
}

impl ParsedFile {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Repo-relative path → parsed file. BTreeMap so every pass iterates files
/// in a stable order.
pub type AstCache = BTreeMap<PathBuf, ParsedFile>;

/// Parse one file's content. Sources must be UTF-8; identifier extraction
/// reads node text throughout the run.
pub fn parse_source(path: &Path, source: Vec<u8>, lang: Lang) -> Result<ParsedFile> {
    if let Err(e) = std::str::from_utf8(&source) {
        return Err(Error::FileParse {
            path: path.to_path_buf(),
            message: format!("not valid UTF-8: {e}"),
        });
    }

    let mut parser = Parser::new();
    parser
        .set_language(&lang.grammar())
        .map_err(|e| Error::FileParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    PARSE_INVOCATIONS.fetch_add(1, Ordering::Relaxed);
    if let Ok(mut counts) = PARSE_COUNTS.lock() {
        *counts.entry(path.to_path_buf()).or_insert(0) += 1;
    }
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| Error::FileParse {
            path: path.to_path_buf(),
            message: "parser returned no tree".to_string(),
        })?;

    Ok(ParsedFile { tree, source, lang })
}

/// Decode a node's text from the file's source bytes.
pub fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> Option<&'a str> {
    node.utf8_text(source).ok()
}
