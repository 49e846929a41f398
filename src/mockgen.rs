//! Mock body generation.
//!
//! [`MockGenerator`] is the seam the walker renders mocks through.
//! [`StubGenerator`] is the bundled implementation: it emits a
//! testify-style mock with one stub per interface method, using only what
//! the declaring file says (no cross-file type resolution, embedded
//! interfaces are not expanded).

use crate::decl::{self, SyntaxKind::*, SyntaxNode};
use crate::parser::InterfaceRecord;
use anyhow::Result;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::LazyLock;

const MOCK_IMPORT: &str = "github.com/stretchr/testify/mock";

/// `pkg.` qualifiers inside type text the lowering keeps verbatim.
static INLINE_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\.[A-Za-z_]").expect("qualifier pattern is valid")
});

/// Package a mock is generated into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPackage {
    /// Beside the interface, in the declaring file's package.
    InPackage,
    /// A separate package that imports the interface's package.
    External { name: String, source_import: String },
}

pub trait MockGenerator {
    /// Renders the prologue and body of the mock for `iface` into `out`.
    fn generate(
        &self,
        iface: &InterfaceRecord,
        package: &OutputPackage,
        out: &mut dyn Write,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct StubGenerator {
    note: String,
}

impl StubGenerator {
    pub fn new(note: impl Into<String>) -> Self {
        Self { note: note.into() }
    }
}

struct Param {
    name: String,
    ty: String,
    variadic: bool,
}

struct Method {
    name: String,
    params: Vec<Param>,
    results: Vec<String>,
}

/// Renders type nodes, qualifying exported local names when the mock lives
/// in another package.
struct TypeRenderer<'a> {
    qualifier: Option<&'a str>,
    used_local: bool,
}

impl TypeRenderer<'_> {
    fn render(&mut self, ty: &SyntaxNode) -> String {
        match ty.kind() {
            TYPE_NAME => {
                let name = decl::ident(ty).unwrap_or_default();
                match self.qualifier {
                    Some(pkg) if is_exported(&name) => {
                        self.used_local = true;
                        format!("{}.{}", pkg, name)
                    }
                    _ => name,
                }
            }
            POINTER_TYPE | SLICE_TYPE => {
                let prefix = if ty.kind() == POINTER_TYPE { "*" } else { "[]" };
                match decl::type_of(ty) {
                    Some(inner) => format!("{}{}", prefix, self.render(&inner)),
                    None => ty.text().to_string(),
                }
            }
            _ => ty.text().to_string(),
        }
    }

    fn params(&mut self, list: Option<SyntaxNode>, prefix: &str) -> Vec<Param> {
        let mut params = Vec::new();
        let Some(list) = list else {
            return params;
        };
        for param in list.children().filter(|c| c.kind() == PARAM) {
            let ty = decl::type_of(&param)
                .map(|t| self.render(&t))
                .unwrap_or_default();
            let variadic = param
                .children_with_tokens()
                .filter_map(|e| e.into_token())
                .any(|t| t.kind() == PUNCT && t.text() == "...");
            let mut names = decl::idents(&param);
            if names.is_empty() {
                names.push(String::new());
            }
            for name in names {
                let name = if name.is_empty() || name == "_" {
                    format!("{}{}", prefix, params.len())
                } else {
                    name
                };
                params.push(Param {
                    name,
                    ty: ty.clone(),
                    variadic,
                });
            }
        }
        params
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn mock_name(iface: &InterfaceRecord, package: &OutputPackage) -> String {
    match package {
        OutputPackage::External { .. } => iface.name.clone(),
        OutputPackage::InPackage if is_exported(&iface.name) => {
            format!("Mock{}", iface.name)
        }
        OutputPackage::InPackage => {
            let mut chars = iface.name.chars();
            let first = chars.next().map(|c| c.to_uppercase().to_string()).unwrap_or_default();
            format!("mock{}{}", first, chars.as_str())
        }
    }
}

/// Package qualifiers referenced anywhere in the interface's signatures.
fn used_qualifiers(iface: &InterfaceRecord) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    for node in iface.node.descendants() {
        match node.kind() {
            QUALIFIED_TYPE => {
                if let Some((pkg, _)) = decl::qualified_parts(&node) {
                    used.insert(pkg);
                }
            }
            OTHER_TYPE => {
                let text = node.text().to_string();
                used.extend(INLINE_QUALIFIER.captures_iter(&text).map(|c| c[1].to_string()));
            }
            _ => {}
        }
    }
    used
}

/// Import lines of the declaring file whose package names are in `used`.
fn file_imports(iface: &InterfaceRecord, used: &BTreeSet<String>) -> Vec<String> {
    let Some(root) = iface.node.ancestors().last() else {
        return Vec::new();
    };
    root.children()
        .filter(|c| c.kind() == IMPORT)
        .filter_map(|import| {
            let path = import
                .children_with_tokens()
                .filter_map(|e| e.into_token())
                .find(|t| t.kind() == STRING)?
                .text()
                .to_string();
            let alias = decl::ident(&import);
            let name = alias
                .clone()
                .unwrap_or_else(|| path.rsplit('/').next().unwrap_or_default().to_string());
            if !used.contains(&name) {
                return None;
            }
            Some(match alias {
                Some(alias) => format!("{} \"{}\"", alias, path),
                None => format!("\"{}\"", path),
            })
        })
        .collect()
}

fn methods(iface: &InterfaceRecord, renderer: &mut TypeRenderer) -> Vec<Method> {
    let Some(body) = decl::type_of(&iface.node) else {
        return Vec::new();
    };
    body.children()
        .filter(|c| c.kind() == METHOD)
        .map(|method| Method {
            name: decl::ident(&method).unwrap_or_default(),
            params: renderer.params(decl::child(&method, PARAMS), "_a"),
            results: renderer
                .params(decl::child(&method, RESULTS), "r")
                .into_iter()
                .map(|p| p.ty)
                .collect(),
        })
        .collect()
}

fn render_method(mock: &str, method: &Method) -> String {
    let names: Vec<_> = method.params.iter().map(|p| p.name.as_str()).collect();
    let signature: Vec<_> = method
        .params
        .iter()
        .map(|p| {
            let dots = if p.variadic { "..." } else { "" };
            format!("{} {}{}", p.name, dots, p.ty)
        })
        .collect();
    let results = match method.results.len() {
        0 => String::new(),
        1 => format!(" {}", method.results[0]),
        _ => format!(" ({})", method.results.join(", ")),
    };

    let mut out = String::new();
    if names.is_empty() {
        out.push_str(&format!("// {} provides a mock function with given fields:\n", method.name));
    } else {
        out.push_str(&format!(
            "// {} provides a mock function with given fields: {}\n",
            method.name,
            names.join(", ")
        ));
    }
    out.push_str(&format!(
        "func (_m *{}) {}({}){} {{\n",
        mock,
        method.name,
        signature.join(", "),
        results
    ));

    if method.results.is_empty() {
        out.push_str(&format!("\t_m.Called({})\n}}\n", names.join(", ")));
        return out;
    }

    out.push_str(&format!("\tret := _m.Called({})\n\n", names.join(", ")));
    let mut returns = Vec::new();
    for (i, ty) in method.results.iter().enumerate() {
        if ty == "error" {
            out.push_str(&format!("\tr{} := ret.Error({})\n", i, i));
        } else {
            out.push_str(&format!("\tr{}, _ := ret.Get({}).({})\n", i, i, ty));
        }
        returns.push(format!("r{}", i));
    }
    out.push_str(&format!("\n\treturn {}\n}}\n", returns.join(", ")));
    out
}

impl MockGenerator for StubGenerator {
    fn generate(
        &self,
        iface: &InterfaceRecord,
        package: &OutputPackage,
        out: &mut dyn Write,
    ) -> Result<()> {
        let (package_clause, qualifier) = match package {
            OutputPackage::InPackage => (iface.package.as_str(), None),
            OutputPackage::External { name, .. } => (name.as_str(), Some(iface.package.as_str())),
        };
        let mut renderer = TypeRenderer {
            qualifier,
            used_local: false,
        };
        let methods = methods(iface, &mut renderer);
        let mock = mock_name(iface, package);

        let mut imports = vec![format!("mock \"{}\"", MOCK_IMPORT)];
        imports.extend(file_imports(iface, &used_qualifiers(iface)));
        if let OutputPackage::External { source_import, .. } = package
            && renderer.used_local
        {
            if source_import.rsplit('/').next() == Some(iface.package.as_str()) {
                imports.push(format!("\"{}\"", source_import));
            } else {
                imports.push(format!("{} \"{}\"", iface.package, source_import));
            }
        }

        writeln!(
            out,
            "// Code generated by mockwalk v{}. DO NOT EDIT.",
            env!("CARGO_PKG_VERSION")
        )?;
        for line in self.note.lines() {
            writeln!(out, "// {}", line)?;
        }
        writeln!(out)?;
        writeln!(out, "package {}", package_clause)?;
        writeln!(out)?;
        writeln!(out, "import (")?;
        for import in &imports {
            writeln!(out, "\t{}", import)?;
        }
        writeln!(out, ")")?;
        writeln!(out)?;
        writeln!(out, "// {} is a mock type for the {} type", mock, iface.name)?;
        writeln!(out, "type {} struct {{\n\tmock.Mock\n}}", mock)?;
        for method in &methods {
            writeln!(out)?;
            write!(out, "{}", render_method(&mock, method))?;
        }
        Ok(())
    }
}
