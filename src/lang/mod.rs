//! Language registry
//!
//! One `Lang` variant per supported grammar, plus the per-language spec the
//! pipeline consults for scoping rules: which node kinds open a module, a
//! class, or a function scope, and which files mark a directory as a
//! package. Query bundles live in [`queries`].

pub mod queries;

use std::path::Path;
use tree_sitter::Language;

pub use queries::{QueryBundle, QuerySet};

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lang {
    Python,
    Java,
    JavaScript,
    TypeScript,
    Rust,
    Cpp,
    C,
    Go,
    Lua,
}

impl Lang {
    pub const ALL: [Lang; 9] = [
        Lang::Python,
        Lang::Java,
        Lang::JavaScript,
        Lang::TypeScript,
        Lang::Rust,
        Lang::Cpp,
        Lang::C,
        Lang::Go,
        Lang::Lua,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Python => "python",
            Lang::Java => "java",
            Lang::JavaScript => "javascript",
            Lang::TypeScript => "typescript",
            Lang::Rust => "rust",
            Lang::Cpp => "cpp",
            Lang::C => "c",
            Lang::Go => "go",
            Lang::Lua => "lua",
        }
    }

    /// Detect language from a file path extension.
    pub fn from_path(path: &Path) -> Option<Lang> {
        let ext = path.extension()?.to_str()?;
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Some(Lang::Python),
            "java" => Some(Lang::Java),
            "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Lang::TypeScript),
            "rs" => Some(Lang::Rust),
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Some(Lang::Cpp),
            "c" | "h" => Some(Lang::C),
            "go" => Some(Lang::Go),
            "lua" => Some(Lang::Lua),
            _ => None,
        }
    }

    /// The tree-sitter grammar for this language.
    pub fn grammar(&self) -> Language {
        match self {
            Lang::Python => tree_sitter_python::LANGUAGE.into(),
            Lang::Java => tree_sitter_java::LANGUAGE.into(),
            Lang::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Lang::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Lang::Rust => tree_sitter_rust::LANGUAGE.into(),
            Lang::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Lang::C => tree_sitter_c::LANGUAGE.into(),
            Lang::Go => tree_sitter_go::LANGUAGE.into(),
            Lang::Lua => tree_sitter_lua::LANGUAGE.into(),
        }
    }

    /// Scoping rules and package indicators for this language.
    pub fn spec(&self) -> &'static LanguageSpec {
        match self {
            Lang::Python => &PYTHON_SPEC,
            Lang::Java => &JAVA_SPEC,
            Lang::JavaScript => &JAVASCRIPT_SPEC,
            Lang::TypeScript => &TYPESCRIPT_SPEC,
            Lang::Rust => &RUST_SPEC,
            Lang::Cpp => &CPP_SPEC,
            Lang::C => &C_SPEC,
            Lang::Go => &GO_SPEC,
            Lang::Lua => &LUA_SPEC,
        }
    }

    /// File names that collapse to the directory's qualified name.
    pub fn is_root_module_file(&self, file_name: &str) -> bool {
        match self {
            Lang::Python => file_name == "__init__.py",
            Lang::Rust => file_name == "mod.rs",
            _ => false,
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tree-sitter node kinds and package indicators for one language
#[derive(Debug)]
pub struct LanguageSpec {
    /// Node kinds that terminate upward QN walks (the file root)
    pub module_node_types: &'static [&'static str],
    /// Node kinds that open a class-like scope
    pub class_node_types: &'static [&'static str],
    /// Node kinds that open a function-like scope
    pub function_node_types: &'static [&'static str],
    /// File names whose presence makes a directory a Package
    pub package_indicators: &'static [&'static str],
}

static PYTHON_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["module"],
    class_node_types: &["class_definition"],
    function_node_types: &["function_definition"],
    package_indicators: &["__init__.py"],
};

static JAVA_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["program"],
    class_node_types: &["class_declaration", "interface_declaration", "enum_declaration"],
    function_node_types: &["method_declaration", "constructor_declaration"],
    package_indicators: &["package-info.java"],
};

static JAVASCRIPT_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["program"],
    class_node_types: &["class_declaration", "class"],
    function_node_types: &[
        "function_declaration",
        "function_expression",
        "generator_function_declaration",
        "method_definition",
        "arrow_function",
    ],
    package_indicators: &["package.json"],
};

static TYPESCRIPT_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["program"],
    class_node_types: &["class_declaration", "class"],
    function_node_types: &[
        "function_declaration",
        "function_expression",
        "generator_function_declaration",
        "method_definition",
        "arrow_function",
    ],
    package_indicators: &["package.json"],
};

static RUST_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["source_file"],
    class_node_types: &["struct_item", "enum_item", "trait_item", "impl_item"],
    function_node_types: &["function_item"],
    package_indicators: &["mod.rs", "lib.rs"],
};

static CPP_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["translation_unit"],
    class_node_types: &["class_specifier", "struct_specifier"],
    function_node_types: &["function_definition"],
    package_indicators: &[],
};

static C_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["translation_unit"],
    class_node_types: &[],
    function_node_types: &["function_definition"],
    package_indicators: &[],
};

static GO_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["source_file"],
    class_node_types: &["type_spec"],
    function_node_types: &["function_declaration", "method_declaration"],
    package_indicators: &["go.mod"],
};

static LUA_SPEC: LanguageSpec = LanguageSpec {
    module_node_types: &["chunk"],
    class_node_types: &[],
    function_node_types: &["function_declaration"],
    package_indicators: &["init.lua"],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language_from_extension() {
        assert_eq!(Lang::from_path(Path::new("foo.py")), Some(Lang::Python));
        assert_eq!(Lang::from_path(Path::new("foo.ts")), Some(Lang::TypeScript));
        assert_eq!(Lang::from_path(Path::new("foo.rs")), Some(Lang::Rust));
        assert_eq!(Lang::from_path(Path::new("foo.cc")), Some(Lang::Cpp));
        assert_eq!(Lang::from_path(Path::new("foo.h")), Some(Lang::C));
        assert_eq!(Lang::from_path(Path::new("foo.lua")), Some(Lang::Lua));
        assert_eq!(Lang::from_path(Path::new("foo.txt")), None);
        assert_eq!(Lang::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_root_module_files_collapse() {
        assert!(Lang::Python.is_root_module_file("__init__.py"));
        assert!(Lang::Rust.is_root_module_file("mod.rs"));
        assert!(!Lang::Rust.is_root_module_file("lib.rs"));
        assert!(!Lang::Go.is_root_module_file("main.go"));
    }

    #[test]
    fn test_every_language_has_a_spec() {
        for lang in Lang::ALL {
            let spec = lang.spec();
            assert!(
                !spec.module_node_types.is_empty(),
                "{lang} must name its module node"
            );
            assert!(
                !spec.function_node_types.is_empty(),
                "{lang} must name its function nodes"
            );
        }
    }
}
