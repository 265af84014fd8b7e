//! Tree-sitter query bundles
//!
//! One bundle per language: captures for function-like definitions
//! (`@function`), class-like definitions (`@class`), call sites (`@call`),
//! and import statements (`@import`). Compiled once at startup; an invalid
//! query is a bug in this file, surfaced as a fatal [`Error::Query`].

use crate::core::error::{Error, Result};
use crate::lang::Lang;
use std::collections::HashMap;
use tree_sitter::Query;

/// Compiled queries for one language
pub struct QueryBundle {
    pub functions: Query,
    pub classes: Option<Query>,
    pub calls: Query,
    pub imports: Option<Query>,
}

/// All compiled bundles, keyed by language
pub struct QuerySet {
    bundles: HashMap<Lang, QueryBundle>,
}

impl QuerySet {
    /// Compile every language's bundle.
    pub fn compile() -> Result<Self> {
        let mut bundles = HashMap::new();
        for lang in Lang::ALL {
            bundles.insert(lang, QueryBundle::compile(lang)?);
        }
        Ok(Self { bundles })
    }

    pub fn get(&self, lang: Lang) -> &QueryBundle {
        // compile() covers Lang::ALL, so every variant is present
        &self.bundles[&lang]
    }
}

impl QueryBundle {
    fn compile(lang: Lang) -> Result<Self> {
        let grammar = lang.grammar();
        let build = |source: &str| -> Result<Query> {
            Query::new(&grammar, source).map_err(|e| Error::Query {
                language: lang.as_str().to_string(),
                message: e.to_string(),
            })
        };

        let classes = match class_query(lang) {
            "" => None,
            src => Some(build(src)?),
        };
        let imports = match import_query(lang) {
            "" => None,
            src => Some(build(src)?),
        };

        Ok(Self {
            functions: build(function_query(lang))?,
            classes,
            calls: build(call_query(lang))?,
            imports,
        })
    }
}

fn function_query(lang: Lang) -> &'static str {
    match lang {
        Lang::Python => "(function_definition) @function",
        Lang::Java => {
            "(method_declaration) @function
(constructor_declaration) @function"
        }
        Lang::JavaScript | Lang::TypeScript => {
            "(function_declaration) @function
(generator_function_declaration) @function
(method_definition) @function
(variable_declarator
  name: (identifier)
  value: [(arrow_function) (function_expression)]) @function"
        }
        Lang::Rust => "(function_item) @function",
        Lang::Cpp => "(function_definition) @function",
        Lang::C => "(function_definition) @function",
        Lang::Go => {
            "(function_declaration) @function
(method_declaration) @function"
        }
        Lang::Lua => "(function_declaration) @function",
    }
}

fn class_query(lang: Lang) -> &'static str {
    match lang {
        Lang::Python => "(class_definition) @class",
        Lang::Java => {
            "(class_declaration) @class
(interface_declaration) @class
(enum_declaration) @class"
        }
        Lang::JavaScript | Lang::TypeScript => "(class_declaration) @class",
        Lang::Rust => {
            "(struct_item) @class
(enum_item) @class
(trait_item) @class
(impl_item) @class"
        }
        Lang::Cpp => {
            "(class_specifier) @class
(struct_specifier) @class"
        }
        Lang::C => "",
        Lang::Go => {
            "(type_spec name: (type_identifier) type: (struct_type)) @class
(type_spec name: (type_identifier) type: (interface_type)) @class"
        }
        Lang::Lua => "",
    }
}

fn call_query(lang: Lang) -> &'static str {
    match lang {
        Lang::Python => "(call) @call",
        Lang::Java => {
            "(method_invocation) @call
(object_creation_expression) @call"
        }
        Lang::JavaScript | Lang::TypeScript => "(call_expression) @call",
        Lang::Rust => "(call_expression) @call",
        // Operator usage resolves to builtin.cpp.* unless user-overloaded
        Lang::Cpp => {
            "(call_expression) @call
(binary_expression) @call
(unary_expression) @call
(update_expression) @call"
        }
        Lang::C => "(call_expression) @call",
        Lang::Go => "(call_expression) @call",
        Lang::Lua => "(function_call) @call",
    }
}

fn import_query(lang: Lang) -> &'static str {
    match lang {
        Lang::Python => {
            "(import_statement) @import
(import_from_statement) @import"
        }
        Lang::Java => "(import_declaration) @import",
        Lang::JavaScript | Lang::TypeScript => "(import_statement) @import",
        Lang::Rust => "(use_declaration) @import",
        Lang::Cpp | Lang::C => "(preproc_include) @import",
        Lang::Go => "(import_declaration) @import",
        Lang::Lua => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_bundles_compile() {
        let set = QuerySet::compile().expect("every query bundle must compile");
        for lang in Lang::ALL {
            let bundle = set.get(lang);
            assert!(bundle.functions.pattern_count() > 0, "{lang} functions");
            assert!(bundle.calls.pattern_count() > 0, "{lang} calls");
        }
    }

    #[test]
    fn test_class_queries_exist_where_expected() {
        let set = QuerySet::compile().unwrap();
        assert!(set.get(Lang::Python).classes.is_some());
        assert!(set.get(Lang::Rust).classes.is_some());
        assert!(set.get(Lang::C).classes.is_none());
        assert!(set.get(Lang::Lua).classes.is_none());
    }
}
