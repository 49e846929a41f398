//! Go source parser adapter.
//!
//! Parses `.go` files with tree-sitter and lowers the interesting top-level
//! declarations into a [`decl`](crate::decl) tree. Across calls the parser
//! accumulates every interface declaration it sees (the interface catalog)
//! and remembers the first file that looks like a dependency-injection
//! provider (the registration entry).

use crate::decl::{self, SyntaxKind::*, SyntaxNode, TreeBuilder};
use crate::scanner::FileVisitor;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tree_sitter::Node;

/// An interface declaration discovered in a source file.
#[derive(Debug, Clone)]
pub struct InterfaceRecord {
    pub name: String,
    /// File declaring the interface.
    pub file_name: PathBuf,
    /// Package clause of the declaring file.
    pub package: String,
    /// The interface's `TYPE_DECL` node.
    pub node: SyntaxNode,
}

/// The provider file used to synthesize the mock registration.
#[derive(Debug, Clone)]
pub struct RegistrationEntry {
    pub file_name: PathBuf,
    /// `ROOT` node of the file's declaration tree.
    pub syntax: SyntaxNode,
}

/// Per-scan parse counters.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct ParseStats {
    pub files_parsed: usize,
    pub files_failed: usize,
}

pub struct Parser {
    ts: tree_sitter::Parser,
    build_tags: Vec<String>,
    interfaces: Vec<InterfaceRecord>,
    registration: Option<RegistrationEntry>,
    stats: ParseStats,
}

impl Parser {
    /// Creates a parser. Build tags are recorded but not interpreted.
    pub fn new(build_tags: &[String]) -> Result<Self> {
        let mut ts = tree_sitter::Parser::new();
        ts.set_language(&tree_sitter_go::language())
            .map_err(|e| anyhow::anyhow!("Failed to load Go grammar: {:?}", e))?;
        if !build_tags.is_empty() {
            debug!(tags = ?build_tags, "build tags accepted without evaluation");
        }
        Ok(Self {
            ts,
            build_tags: build_tags.to_vec(),
            interfaces: Vec::new(),
            registration: None,
            stats: ParseStats::default(),
        })
    }

    pub fn build_tags(&self) -> &[String] {
        &self.build_tags
    }

    /// Interfaces discovered so far, in discovery order.
    pub fn interfaces(&self) -> &[InterfaceRecord] {
        &self.interfaces
    }

    pub fn registration(&self) -> Option<&RegistrationEntry> {
        self.registration.as_ref()
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Reads and parses one file, adding its declarations to the catalog.
    pub fn parse(&mut self, path: &Path) -> Result<()> {
        let result = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|source| self.parse_source(path, &source));
        match result {
            Ok(()) => self.stats.files_parsed += 1,
            Err(_) => self.stats.files_failed += 1,
        }
        result
    }

    /// Parses `source` as if it were the contents of `path`.
    pub fn parse_source(&mut self, path: &Path, source: &str) -> Result<()> {
        let tree = self
            .ts
            .parse(source, None)
            .with_context(|| format!("Parser produced no tree for {}", path.display()))?;
        let root = tree.root_node();
        if root.has_error() {
            anyhow::bail!("Syntax errors in {}", path.display());
        }

        let syntax = lower_file(root, source);
        let package = decl::child(&syntax, PACKAGE)
            .and_then(|p| decl::ident(&p))
            .unwrap_or_default();

        for type_decl in syntax.children().filter(|c| c.kind() == TYPE_DECL) {
            let is_interface =
                decl::type_of(&type_decl).is_some_and(|t| t.kind() == INTERFACE_TYPE);
            if let Some(name) = decl::ident(&type_decl)
                && is_interface
            {
                debug!(interface = %name, file = %path.display(), "found interface");
                self.interfaces.push(InterfaceRecord {
                    name,
                    file_name: path.to_path_buf(),
                    package: package.clone(),
                    node: type_decl,
                });
            }
        }

        if is_provider(&syntax) {
            match &self.registration {
                None => {
                    debug!(file = %path.display(), "found registration entry");
                    self.registration = Some(RegistrationEntry {
                        file_name: path.to_path_buf(),
                        syntax,
                    });
                }
                Some(first) => warn!(
                    file = %path.display(),
                    kept = %first.file_name.display(),
                    "ignoring additional registration entry"
                ),
            }
        }

        Ok(())
    }
}

impl FileVisitor for Parser {
    fn visit_file(&mut self, path: &Path) -> Result<bool> {
        self.parse(path)?;
        Ok(false)
    }
}

/// A file is a provider when one of its structs opens with an embedded `pkg.In`.
fn is_provider(root: &SyntaxNode) -> bool {
    root.descendants()
        .filter(|n| n.kind() == FIELD_LIST)
        .any(|list| decl::embeds_in_marker(&list))
}

fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

fn lower_file(root: Node, source: &str) -> SyntaxNode {
    let mut b = TreeBuilder::new();
    b.start(ROOT);
    for child in named_children(root) {
        match child.kind() {
            "package_clause" => {
                if let Some(name) = child.named_child(0) {
                    b.leaf(PACKAGE, IDENT, text(name, source));
                }
            }
            "import_declaration" => lower_imports(&mut b, child, source),
            "function_declaration" | "method_declaration" => {
                lower_function(&mut b, child, source)
            }
            "type_declaration" => {
                for spec in named_children(child) {
                    if matches!(spec.kind(), "type_spec" | "type_alias") {
                        lower_type_spec(&mut b, spec, source);
                    }
                }
            }
            _ => {}
        }
    }
    b.finish();
    b.build()
}

fn lower_imports(b: &mut TreeBuilder, node: Node, source: &str) {
    for child in named_children(node) {
        match child.kind() {
            "import_spec" => {
                let Some(path) = child.child_by_field_name("path") else {
                    continue;
                };
                b.start(IMPORT);
                if let Some(alias) = child.child_by_field_name("name") {
                    b.token(IDENT, text(alias, source));
                }
                b.token(STRING, text(path, source).trim_matches('"'));
                b.finish();
            }
            "import_spec_list" => lower_imports(b, child, source),
            _ => {}
        }
    }
}

fn lower_function(b: &mut TreeBuilder, node: Node, source: &str) {
    let Some(name) = node.child_by_field_name("name") else {
        return;
    };
    b.start(FUNC_DECL);
    b.token(IDENT, text(name, source));
    lower_signature(b, node, source);
    b.finish();
}

/// Lowers the `parameters` and `result` fields shared by functions and methods.
fn lower_signature(b: &mut TreeBuilder, node: Node, source: &str) {
    b.start(PARAMS);
    if let Some(params) = node.child_by_field_name("parameters") {
        lower_parameters(b, params, source);
    }
    b.finish();

    if let Some(result) = node.child_by_field_name("result") {
        b.start(RESULTS);
        if result.kind() == "parameter_list" {
            lower_parameters(b, result, source);
        } else {
            b.start(PARAM);
            lower_type(b, result, source);
            b.finish();
        }
        b.finish();
    }
}

fn lower_parameters(b: &mut TreeBuilder, list: Node, source: &str) {
    for param in named_children(list) {
        let variadic = match param.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        b.start(PARAM);
        let mut cursor = param.walk();
        for name in param.children_by_field_name("name", &mut cursor) {
            b.token(IDENT, text(name, source));
        }
        if variadic {
            b.token(PUNCT, "...");
        }
        if let Some(ty) = param.child_by_field_name("type") {
            lower_type(b, ty, source);
        }
        b.finish();
    }
}

fn lower_type_spec(b: &mut TreeBuilder, spec: Node, source: &str) {
    let (Some(name), Some(ty)) = (
        spec.child_by_field_name("name"),
        spec.child_by_field_name("type"),
    ) else {
        return;
    };
    b.start(TYPE_DECL);
    b.token(IDENT, text(name, source));
    lower_type(b, ty, source);
    b.finish();
}

fn lower_type(b: &mut TreeBuilder, ty: Node, source: &str) {
    match ty.kind() {
        "type_identifier" => b.leaf(TYPE_NAME, IDENT, text(ty, source)),
        "qualified_type" => {
            let (Some(pkg), Some(name)) = (
                ty.child_by_field_name("package"),
                ty.child_by_field_name("name"),
            ) else {
                b.leaf(OTHER_TYPE, TEXT, text(ty, source));
                return;
            };
            b.start(QUALIFIED_TYPE);
            b.token(IDENT, text(pkg, source));
            b.token(PUNCT, ".");
            b.token(IDENT, text(name, source));
            b.finish();
        }
        "pointer_type" => match ty.named_child(0) {
            Some(inner) => {
                b.start(POINTER_TYPE);
                b.token(PUNCT, "*");
                lower_type(b, inner, source);
                b.finish();
            }
            None => b.leaf(OTHER_TYPE, TEXT, text(ty, source)),
        },
        "slice_type" => match ty.child_by_field_name("element") {
            Some(elem) => {
                b.start(SLICE_TYPE);
                b.token(PUNCT, "[]");
                lower_type(b, elem, source);
                b.finish();
            }
            None => b.leaf(OTHER_TYPE, TEXT, text(ty, source)),
        },
        "struct_type" => {
            b.start(STRUCT_TYPE);
            b.start(FIELD_LIST);
            let lists = named_children(ty)
                .into_iter()
                .filter(|c| c.kind() == "field_declaration_list");
            for list in lists {
                for field in named_children(list) {
                    if field.kind() == "field_declaration" {
                        lower_field(b, field, source);
                    }
                }
            }
            b.finish();
            b.finish();
        }
        "interface_type" => {
            b.start(INTERFACE_TYPE);
            lower_interface_elems(b, ty, source);
            b.finish();
        }
        _ => b.leaf(OTHER_TYPE, TEXT, text(ty, source)),
    }
}

fn lower_field(b: &mut TreeBuilder, field: Node, source: &str) {
    b.start(FIELD);
    let mut cursor = field.walk();
    for name in field.children_by_field_name("name", &mut cursor) {
        b.token(IDENT, text(name, source));
    }
    if let Some(ty) = field.child_by_field_name("type") {
        // Embedded `*T` keeps its star outside the type field.
        let mut cursor = field.walk();
        let starred = field.children(&mut cursor).any(|c| c.kind() == "*");
        if starred {
            b.start(POINTER_TYPE);
            b.token(PUNCT, "*");
            lower_type(b, ty, source);
            b.finish();
        } else {
            lower_type(b, ty, source);
        }
    }
    if let Some(tag) = field.child_by_field_name("tag") {
        b.leaf(TAG, STRING, text(tag, source));
    }
    b.finish();
}

fn lower_interface_elems(b: &mut TreeBuilder, node: Node, source: &str) {
    for elem in named_children(node) {
        match elem.kind() {
            "method_elem" | "method_spec" => {
                let Some(name) = elem.child_by_field_name("name") else {
                    continue;
                };
                b.start(METHOD);
                b.token(IDENT, text(name, source));
                lower_signature(b, elem, source);
                b.finish();
            }
            "method_spec_list" => lower_interface_elems(b, elem, source),
            "comment" => {}
            _ => b.leaf(EMBED, TEXT, text(elem, source)),
        }
    }
}
