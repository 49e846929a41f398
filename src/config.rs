//! Run configuration.
//!
//! [`WalkConfig`] controls discovery and filtering; [`GeneratorConfig`]
//! controls where and how mocks and the registration file are written. Both
//! are built once from the command line and stay immutable for the run.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Discovery settings for one run.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    pub base_dir: PathBuf,
    pub recursive: bool,
    /// Matched against bare interface names.
    pub filter: Regex,
    /// Stop after the first successful result.
    pub limit_one: bool,
    /// Passed through to the parser, never evaluated.
    pub build_tags: Vec<String>,
}

impl WalkConfig {
    /// Non-recursive walk of `base_dir` matching every interface.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            recursive: false,
            filter: Regex::new(".*").expect("match-all pattern is valid"),
            limit_one: false,
            build_tags: Vec::new(),
        }
    }

    /// Applies an interface selection: its filter and limit policy.
    pub fn with_selection(mut self, selection: &Selection) -> Result<Self> {
        self.filter = selection.filter()?;
        self.limit_one = selection.limit_one();
        Ok(self)
    }
}

/// Which interfaces a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A single interface; the walk stops at the first hit.
    Name(String),
    /// Every interface found.
    All,
}

impl Selection {
    /// Builds the selection from `--name` / `--all`.
    pub fn from_flags(name: Option<String>, all: bool) -> Result<Self> {
        match (name, all) {
            (_, true) => Ok(Self::All),
            (Some(name), false) => Ok(Self::Name(name)),
            (None, false) => anyhow::bail!(
                "Use --name to specify the name of the interface or --all for all interfaces found"
            ),
        }
    }

    pub fn filter(&self) -> Result<Regex> {
        let pattern = match self {
            Self::Name(name) => format!("^{}$", name),
            Self::All => ".*".to_string(),
        };
        Regex::new(&pattern).with_context(|| format!("Invalid interface filter '{}'", pattern))
    }

    pub fn limit_one(&self) -> bool {
        matches!(self, Self::Name(_))
    }
}

/// Splits a `--tags` value into individual build tags.
pub fn parse_build_tags(tags: &str) -> Vec<String> {
    tags.split_whitespace().map(str::to_string).collect()
}

/// Output settings for mock and registration generation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Place each mock beside its interface instead of in `output_dir`.
    pub in_package: bool,
    /// Package clause for mocks written outside the interface's package.
    pub package_name: String,
    /// Extra text for the generated-code header.
    pub note: String,
    /// Directory for external-package mocks and `register.go`.
    pub output_dir: PathBuf,
    /// Write mocks to stdout instead of files.
    pub print: bool,
    /// Overrides the `$GOPATH/src` module source root.
    pub src_root: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            in_package: false,
            package_name: "mocks".to_string(),
            note: String::new(),
            output_dir: PathBuf::from("./mocks"),
            print: false,
            src_root: None,
        }
    }
}

impl GeneratorConfig {
    /// The module root resolver selected by this configuration.
    pub fn root_resolver(&self) -> Box<dyn ModuleRootResolver> {
        match &self.src_root {
            Some(root) => Box::new(FixedRoot(root.clone())),
            None => Box::new(GoPathRoot),
        }
    }
}

/// Resolves the directory that import paths are relative to.
pub trait ModuleRootResolver {
    fn source_root(&self) -> Result<PathBuf>;

    /// [`source_root`](Self::source_root) made absolute against the working
    /// directory, so it can be stripped from absolute source paths.
    fn absolute_source_root(&self) -> Result<PathBuf> {
        let root = self.source_root()?;
        std::path::absolute(&root)
            .with_context(|| format!("Failed to resolve source root {}", root.display()))
    }
}

/// `$GOPATH/src`, with `GOPATH` defaulting to `$HOME/go`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoPathRoot;

impl ModuleRootResolver for GoPathRoot {
    fn source_root(&self) -> Result<PathBuf> {
        let gopath = match std::env::var_os("GOPATH") {
            Some(value) if !value.is_empty() => std::env::split_paths(&value)
                .next()
                .context("GOPATH is empty")?,
            _ => {
                let home = std::env::var_os("HOME")
                    .context("Neither GOPATH nor HOME is set; pass --src-root")?;
                Path::new(&home).join("go")
            }
        };
        Ok(gopath.join("src"))
    }
}

/// A root supplied explicitly.
#[derive(Debug, Clone)]
pub struct FixedRoot(pub PathBuf);

impl ModuleRootResolver for FixedRoot {
    fn source_root(&self) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}
