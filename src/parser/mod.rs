//! Function boundary extraction using tree-sitter
//!
//! Walks the syntax tree of a changed file and reports every
//! function/method definition with its 1-based line range, so the
//! extractor can correlate boundaries with modified diff lines.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A function or method found in source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBoundary {
    /// Display name, `<anonymous>` when the node carries no name
    pub name: String,
    /// 1-based inclusive start line in the new file
    pub start_line: usize,
    /// 1-based inclusive end line in the new file
    pub end_line: usize,
    /// Source text of the definition, edge-trimmed
    pub content: String,
}

/// Per-language parsing configuration
#[derive(Clone)]
pub struct LanguageConfig {
    /// Language name as reported in extracted functions
    pub name: &'static str,
    /// Tree-sitter grammar
    language: tree_sitter::Language,
    /// Node kinds that represent a function definition
    function_kinds: &'static [&'static str],
}

/// Build the immutable extension → language table
///
/// Constructed once at startup and owned by the [`Parser`]; there is no
/// global registry.
fn language_configs() -> HashMap<&'static str, LanguageConfig> {
    let mut configs = HashMap::new();

    configs.insert(
        "rs",
        LanguageConfig {
            name: "rust",
            language: tree_sitter_rust::LANGUAGE.into(),
            function_kinds: &["function_item"],
        },
    );
    configs.insert(
        "py",
        LanguageConfig {
            name: "python",
            language: tree_sitter_python::LANGUAGE.into(),
            function_kinds: &["function_definition"],
        },
    );
    configs.insert(
        "go",
        LanguageConfig {
            name: "go",
            language: tree_sitter_go::LANGUAGE.into(),
            function_kinds: &["function_declaration", "method_declaration"],
        },
    );

    let javascript = LanguageConfig {
        name: "javascript",
        language: tree_sitter_javascript::LANGUAGE.into(),
        function_kinds: &[
            "function_declaration",
            "method_definition",
            "arrow_function",
            "function_expression",
        ],
    };
    configs.insert("js", javascript.clone());
    configs.insert("jsx", javascript);

    configs.insert(
        "ts",
        LanguageConfig {
            name: "typescript",
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            function_kinds: &[
                "function_declaration",
                "method_definition",
                "arrow_function",
                "function_expression",
            ],
        },
    );
    configs.insert(
        "tsx",
        LanguageConfig {
            name: "typescript",
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
            function_kinds: &[
                "function_declaration",
                "method_definition",
                "arrow_function",
                "function_expression",
            ],
        },
    );

    configs.insert(
        "java",
        LanguageConfig {
            name: "java",
            language: tree_sitter_java::LANGUAGE.into(),
            function_kinds: &["method_declaration", "constructor_declaration"],
        },
    );

    let c = LanguageConfig {
        name: "c",
        language: tree_sitter_c::LANGUAGE.into(),
        function_kinds: &["function_definition"],
    };
    configs.insert("c", c.clone());
    configs.insert("h", c);

    let cpp = LanguageConfig {
        name: "cpp",
        language: tree_sitter_cpp::LANGUAGE.into(),
        function_kinds: &["function_definition"],
    };
    configs.insert("cpp", cpp.clone());
    configs.insert("cc", cpp.clone());
    configs.insert("hpp", cpp);

    configs.insert(
        "cs",
        LanguageConfig {
            name: "csharp",
            language: tree_sitter_c_sharp::LANGUAGE.into(),
            function_kinds: &["method_declaration", "constructor_declaration"],
        },
    );

    configs.insert(
        "php",
        LanguageConfig {
            name: "php",
            language: tree_sitter_php::LANGUAGE_PHP.into(),
            function_kinds: &["function_definition", "method_declaration"],
        },
    );

    configs.insert(
        "rb",
        LanguageConfig {
            name: "ruby",
            language: tree_sitter_ruby::LANGUAGE.into(),
            function_kinds: &["method", "singleton_method"],
        },
    );

    let bash = LanguageConfig {
        name: "bash",
        language: tree_sitter_bash::LANGUAGE.into(),
        function_kinds: &["function_definition"],
    };
    configs.insert("sh", bash.clone());
    configs.insert("bash", bash);

    configs
}

fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Parses source files into function boundaries
pub struct Parser {
    parser: tree_sitter::Parser,
    configs: HashMap<&'static str, LanguageConfig>,
}

impl Parser {
    /// Create a new parser
    pub fn new() -> Self {
        Self {
            parser: tree_sitter::Parser::new(),
            configs: language_configs(),
        }
    }

    /// Get the language configuration for a file path
    pub fn config_for(&self, path: &str) -> Option<&LanguageConfig> {
        self.configs.get(extension_of(path).as_str())
    }

    /// Check whether the file extension has a supported grammar
    pub fn is_supported(&self, path: &str) -> bool {
        self.config_for(path).is_some()
    }

    /// All supported file extensions, sorted
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<_> = self.configs.keys().copied().collect();
        extensions.sort_unstable();
        extensions
    }

    /// Parse source code and return all function boundaries plus the
    /// language name
    pub fn parse(&mut self, path: &str, content: &str) -> Result<(Vec<FunctionBoundary>, &'static str)> {
        let config = self
            .config_for(path)
            .with_context(|| format!("unsupported file type: {}", path))?
            .clone();

        self.parser
            .set_language(&config.language)
            .with_context(|| format!("failed to set {} language", config.name))?;

        let tree = self
            .parser
            .parse(content, None)
            .with_context(|| format!("failed to parse {}", path))?;

        let mut functions = Vec::new();
        let mut seen = HashSet::new();
        collect_functions(
            tree.root_node(),
            content,
            config.function_kinds,
            &mut seen,
            &mut functions,
        );

        Ok((functions, config.name))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk the tree and collect every function-kind node
fn collect_functions(
    node: tree_sitter::Node,
    source: &str,
    function_kinds: &[&str],
    seen: &mut HashSet<(usize, usize)>,
    functions: &mut Vec<FunctionBoundary>,
) {
    if function_kinds.contains(&node.kind()) {
        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;

        // Identical line ranges collapse to one entry; they are duplicate
        // matches for the same definition, not distinct functions.
        if seen.insert((start_line, end_line)) {
            let name = node_name(node, source).unwrap_or("<anonymous>").to_string();

            let content = node
                .utf8_text(source.as_bytes())
                .unwrap_or("")
                .trim()
                .to_string();

            functions.push(FunctionBoundary {
                name,
                start_line,
                end_line,
                content,
            });
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_functions(child, source, function_kinds, seen, functions);
    }
}

/// Resolve the display name of a function node
///
/// Most grammars expose a `name` field directly. The C family nests the
/// identifier inside declarators (`function_definition` → `function_declarator`
/// → `identifier`, with pointer/reference declarators possibly in between), so
/// the declarator chain is followed until a name-bearing node appears.
fn node_name<'a>(node: tree_sitter::Node, source: &'a str) -> Option<&'a str> {
    if let Some(name) = node.child_by_field_name("name") {
        return name.utf8_text(source.as_bytes()).ok();
    }

    let mut current = node.child_by_field_name("declarator");
    while let Some(declarator) = current {
        match declarator.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "operator_name"
            | "destructor_name" => {
                return declarator.utf8_text(source.as_bytes()).ok();
            }
            _ => current = declarator.child_by_field_name("declarator"),
        }
    }

    None
}
