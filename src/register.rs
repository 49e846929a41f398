//! Mock registration synthesis.
//!
//! Pattern-matches the provider file captured during parsing and renders a
//! `register.go` that hands a mock to the dependency-injection manager.
//!
//! Four strings are pulled out of the provider:
//!
//! - the interface name, from the first result of the first `Get*` function
//! - the dependency key, from the tag of the member following an embedded
//!   `pkg.In` in a two-member struct
//! - the import path, the provider's directory relative to the module source root
//! - the package alias, the import path's last segment
//!
//! Shapes that don't match leave the corresponding field empty. The template
//! is rendered regardless.

use crate::config::ModuleRootResolver;
use crate::decl::{self, SyntaxKind::*, SyntaxNode};
use crate::parser::RegistrationEntry;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

pub const REGISTER_FILE: &str = "register.go";
const DIMANAGER_IMPORT: &str = "github.com/17media/api/setup/dimanager";
const GETTER_PREFIX: &str = "Get";

/// Strings extracted from a registration entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationFields {
    pub import_path: String,
    pub package_alias: String,
    pub interface_name: String,
    pub dependency_key: String,
}

/// Extracts the registration fields from `entry`.
///
/// Fails only if the source root cannot be resolved or the entry's path
/// cannot be made absolute.
pub fn extract(
    entry: &RegistrationEntry,
    resolver: &dyn ModuleRootResolver,
) -> Result<RegistrationFields> {
    let source_root = resolver.absolute_source_root()?;
    let file = std::path::absolute(&entry.file_name)
        .with_context(|| format!("Failed to resolve {}", entry.file_name.display()))?;
    let dir = file.parent().unwrap_or(Path::new(""));

    let import_path = import_path(dir, &source_root);
    let package_alias = package_alias(&import_path);

    let interface_name = interface_name(&entry.syntax).unwrap_or_else(|| {
        warn!(file = %entry.file_name.display(), "no Get* function with a named result type");
        String::new()
    });
    let dependency_key = dependency_key(&entry.syntax).unwrap_or_else(|| {
        warn!(file = %entry.file_name.display(), "no In-embedding field grouping with a tag");
        String::new()
    });

    Ok(RegistrationFields {
        import_path,
        package_alias,
        interface_name,
        dependency_key,
    })
}

/// Name of the type returned first by the first `Get*` function.
///
/// Accepts `T` and `*T`; anything else (qualified, slice, map...) yields `None`.
pub fn interface_name(root: &SyntaxNode) -> Option<String> {
    let mut getters = root.descendants().filter(|n| {
        n.kind() == FUNC_DECL && decl::ident(n).is_some_and(|name| name.starts_with(GETTER_PREFIX))
    });
    let getter = getters.next()?;
    let extra = getters.count();
    if extra > 0 {
        debug!(extra, "using first Get* function, ignoring the rest");
    }

    let results = decl::child(&getter, RESULTS)?;
    let first = decl::child(&results, PARAM)?;
    let mut ty = decl::type_of(&first)?;
    if ty.kind() == POINTER_TYPE {
        ty = decl::type_of(&ty)?;
    }
    if ty.kind() != TYPE_NAME {
        return None;
    }
    decl::ident(&ty)
}

/// First quoted string in the tag of the member paired with an `In` marker.
pub fn dependency_key(root: &SyntaxNode) -> Option<String> {
    let mut groupings = root.descendants().filter(|n| n.kind() == FIELD_LIST).filter_map(|list| {
        let fields: Vec<_> = list.children().filter(|c| c.kind() == FIELD).collect();
        match fields.as_slice() {
            [first, second] if decl::is_in_marker(first) => Some(second.clone()),
            _ => None,
        }
    });
    let member = groupings.next()?;
    if groupings.next().is_some() {
        debug!("using first In field grouping, ignoring the rest");
    }

    let tag = decl::child(&member, TAG)?;
    first_quoted(&tag.text().to_string()).map(str::to_string)
}

fn first_quoted(tag: &str) -> Option<&str> {
    tag.split('"').nth(1)
}

/// `dir` relative to `source_root`, joined with `/`.
///
/// A directory outside the root is returned as-is.
pub fn import_path(dir: &Path, source_root: &Path) -> String {
    let relative = dir.strip_prefix(source_root).unwrap_or(dir);
    if relative.is_absolute() {
        return relative.to_string_lossy().into_owned();
    }
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn package_alias(import_path: &str) -> String {
    import_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Renders `register.go`.
pub fn render(fields: &RegistrationFields) -> String {
    format!(
        "\npackage mocks\n\nimport (\n\t\"{import}\"\n\t\n\t\"{dimanager}\"\n)\n\t\n\
         func RegisterMock(m *dimanager.Manager) *{iface} {{\n\
         \tmockObj := &{iface}{{}}\n\
         \tm.ProvideMock(func() {alias}.{iface} {{ return mockObj }}, \"{key}\")\n\
         \treturn mockObj\n\
         }}\n",
        import = fields.import_path,
        dimanager = DIMANAGER_IMPORT,
        iface = fields.interface_name,
        alias = fields.package_alias,
        key = fields.dependency_key,
    )
}

/// Extracts, renders and writes `<output_dir>/register.go`, replacing any
/// previous contents. Returns the written path.
pub fn write_registration(
    entry: &RegistrationEntry,
    resolver: &dyn ModuleRootResolver,
    output_dir: &Path,
) -> Result<PathBuf> {
    let fields = extract(entry, resolver)?;
    let contents = render(&fields);
    debug!(?fields, "rendered registration:\n{}", contents);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let path = output_dir.join(REGISTER_FILE);
    std::fs::write(&path, &contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
