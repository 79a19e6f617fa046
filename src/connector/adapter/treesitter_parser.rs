use async_trait::async_trait;
use streaming_iterator::StreamingIterator;
use tracing::debug;
use tree_sitter::{Node, Parser, Query, QueryCursor};

use crate::application::ParserService;
use crate::domain::{content_hash, Chunk, Language, OracleError, OracleResult, SymbolType};

/// Registered grammars (spec §4.3): a `tree_sitter::Query` per language that
/// distinguishes function/class/method. Unregistered languages return
/// `Unknown` from [`Language`] and never reach this parser.
pub struct TreeSitterParser {
    supported_languages: Vec<Language>,
}

impl TreeSitterParser {
    pub fn new() -> Self {
        Self {
            supported_languages: Language::all_registered(),
        }
    }

    fn ts_language(&self, language: Language) -> Option<tree_sitter::Language> {
        match language {
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
            Language::Php => Some(tree_sitter_php::LANGUAGE_PHP.into()),
            Language::Unknown => None,
        }
    }

    fn query_patterns(&self, language: Language) -> &'static str {
        match language {
            Language::Rust => {
                r#"
                (function_item name: (identifier) @name) @function
                (struct_item name: (type_identifier) @name) @class
                (enum_item name: (type_identifier) @name) @class
                (trait_item name: (type_identifier) @name) @class
                "#
            }
            Language::Python => {
                r#"
                (function_definition name: (identifier) @name) @function
                (class_definition name: (identifier) @name) @class
                "#
            }
            Language::JavaScript => {
                r#"
                (function_declaration name: (identifier) @name) @function
                (class_declaration name: (identifier) @name) @class
                (method_definition name: (property_identifier) @name) @method
                "#
            }
            Language::TypeScript => {
                r#"
                (function_declaration name: (identifier) @name) @function
                (class_declaration name: (type_identifier) @name) @class
                (method_definition name: (property_identifier) @name) @method
                "#
            }
            Language::Go => {
                r#"
                (function_declaration name: (identifier) @name) @function
                (method_declaration name: (field_identifier) @name) @method
                (type_declaration (type_spec name: (type_identifier) @name)) @class
                "#
            }
            Language::Php => {
                r#"
                (function_definition name: (name) @name) @function
                (method_declaration name: (name) @name) @method
                (class_declaration name: (name) @name) @class
                "#
            }
            Language::Unknown => "",
        }
    }

    fn primary_symbol_type(capture_name: &str) -> Option<SymbolType> {
        match capture_name {
            "function" => Some(SymbolType::Function),
            "class" => Some(SymbolType::Class),
            "method" => Some(SymbolType::Method),
            _ => None,
        }
    }

    /// Node kinds that delimit a class body for each language. A `Function`
    /// whose node is nested inside one of these is re-tagged `Method`,
    /// honoring the invariant that `symbol_type = method` implies nesting
    /// inside a class node (spec §3).
    fn class_container_kinds(language: Language) -> &'static [&'static str] {
        match language {
            Language::Rust => &["impl_item"],
            Language::Python => &["class_definition"],
            Language::JavaScript | Language::TypeScript => &["class_declaration", "class_body"],
            Language::Go | Language::Php => &[],
            Language::Unknown => &[],
        }
    }

    fn is_nested_in_class(node: Node, language: Language) -> bool {
        let container_kinds = Self::class_container_kinds(language);
        if container_kinds.is_empty() {
            return false;
        }
        let mut current = node.parent();
        while let Some(n) = current {
            if container_kinds.contains(&n.kind()) {
                return true;
            }
            current = n.parent();
        }
        false
    }
}

impl Default for TreeSitterParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParserService for TreeSitterParser {
    async fn parse_file(
        &self,
        content: &str,
        file_path: &str,
        language: Language,
    ) -> OracleResult<Vec<Chunk>> {
        let ts_language = self
            .ts_language(language)
            .ok_or_else(|| OracleError::parse(format!("unsupported language: {language}")))?;

        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| OracleError::parse(format!("failed to set language: {e}")))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| OracleError::parse("failed to parse file"))?;

        let query_source = self.query_patterns(language);
        if query_source.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::new(&ts_language, query_source)
            .map_err(|e| OracleError::parse(format!("failed to compile query: {e}")))?;

        let mut cursor = QueryCursor::new();
        let text_bytes = content.as_bytes();
        let capture_names: Vec<&str> = query.capture_names().to_vec();

        let file_hash = content_hash(text_bytes);
        let mut chunks = Vec::new();
        let mut matches_iter = cursor.matches(&query, tree.root_node(), text_bytes);

        while let Some(query_match) = matches_iter.next() {
            let mut symbol_name: Option<String> = None;
            let mut main_node = None;
            let mut symbol_type = None;

            for capture in query_match.captures {
                let capture_name = capture_names
                    .get(capture.index as usize)
                    .copied()
                    .unwrap_or("");

                if capture_name == "name" {
                    symbol_name = Some(content[capture.node.byte_range()].to_string());
                } else if let Some(st) = Self::primary_symbol_type(capture_name) {
                    main_node = Some(capture.node);
                    symbol_type = Some(st);
                }
            }

            let (Some(node), Some(mut symbol_type)) = (main_node, symbol_type) else {
                continue;
            };

            if symbol_type == SymbolType::Function && Self::is_nested_in_class(node, language) {
                symbol_type = SymbolType::Method;
            }

            let start_line = node.start_position().row as u32 + 1;
            let end_line = node.end_position().row as u32 + 1;
            let node_content = content[node.byte_range()].to_string();

            if node_content.trim().len() < 10 {
                continue;
            }

            let mut chunk = Chunk::new(file_path, node_content, start_line, end_line, language, symbol_type)
                .with_file_hash(file_hash.clone());
            if let Some(name) = symbol_name {
                chunk = chunk.with_symbol_name(name);
            }
            chunks.push(chunk);
        }

        debug!(file = file_path, chunks = chunks.len(), ?language, "parsed file");
        Ok(chunks)
    }

    fn supported_languages(&self) -> Vec<Language> {
        self.supported_languages.clone()
    }
}
