//! Run orchestration.
//!
//! A run scans the tree into the parser's catalog, synthesizes the
//! registration file once if a provider was found, then visits every
//! catalogued interface whose name passes the filter.

use crate::config::{GeneratorConfig, ModuleRootResolver, WalkConfig};
use crate::mockgen::{MockGenerator, OutputPackage};
use crate::output::OutputSink;
use crate::parser::{InterfaceRecord, Parser, RegistrationEntry};
use crate::register;
use crate::scanner;
use anyhow::{Context, Result};
use serde::Serialize;
use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// How a single interface visit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    Generated,
    /// Generation panicked; the fault was logged and the run goes on.
    Faulted,
}

/// Receives the products of a walk.
pub trait WalkerVisitor {
    /// Visits one interface that passed the filter. `Err` aborts the run.
    fn visit_interface(&mut self, iface: &InterfaceRecord) -> Result<VisitOutcome>;

    /// Handles the registration entry. Returns the file written.
    fn generate_registration(&mut self, entry: &RegistrationEntry) -> Result<PathBuf>;
}

/// What a run did.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub files_parsed: usize,
    pub files_failed: usize,
    pub interfaces_found: usize,
    /// Interfaces visited successfully, in visit order.
    pub generated: Vec<String>,
    /// Interfaces whose generation faulted.
    pub faulted: Vec<String>,
    pub registration: Option<PathBuf>,
}

impl RunSummary {
    pub fn any_generated(&self) -> bool {
        !self.generated.is_empty()
    }
}

/// Scans `config.base_dir` and returns the populated parser.
pub fn scan(config: &WalkConfig) -> Result<Parser> {
    let mut parser = Parser::new(&config.build_tags)?;
    scanner::walk(config, &mut parser);
    debug!(
        interfaces = parser.interfaces().len(),
        registration = parser.registration().is_some(),
        "scan complete"
    );
    Ok(parser)
}

/// Runs the full pipeline against `visitor`.
pub fn run(config: &WalkConfig, visitor: &mut dyn WalkerVisitor) -> Result<RunSummary> {
    let parser = scan(config)?;
    let stats = parser.stats();
    let mut summary = RunSummary {
        files_parsed: stats.files_parsed,
        files_failed: stats.files_failed,
        interfaces_found: parser.interfaces().len(),
        ..RunSummary::default()
    };

    if let Some(entry) = parser.registration() {
        summary.registration = Some(visitor.generate_registration(entry)?);
    }

    for iface in parser.interfaces() {
        if !config.filter.is_match(&iface.name) {
            continue;
        }
        match visitor
            .visit_interface(iface)
            .with_context(|| format!("Error walking {}", iface.name))?
        {
            VisitOutcome::Generated => {
                summary.generated.push(iface.name.clone());
                if config.limit_one {
                    break;
                }
            }
            VisitOutcome::Faulted => summary.faulted.push(iface.name.clone()),
        }
    }

    Ok(summary)
}

/// The production visitor: writes mocks through a sink and the registration
/// file into the output directory.
pub struct GeneratorVisitor<'a> {
    config: &'a GeneratorConfig,
    sink: &'a dyn OutputSink,
    generator: &'a dyn MockGenerator,
    roots: Box<dyn ModuleRootResolver>,
}

impl<'a> GeneratorVisitor<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        sink: &'a dyn OutputSink,
        generator: &'a dyn MockGenerator,
    ) -> Self {
        Self {
            config,
            sink,
            generator,
            roots: config.root_resolver(),
        }
    }

    /// Replaces the resolver taken from the configuration.
    pub fn with_root_resolver(mut self, roots: Box<dyn ModuleRootResolver>) -> Self {
        self.roots = roots;
        self
    }

    fn output_package(&self, iface: &InterfaceRecord) -> Result<OutputPackage> {
        if self.config.in_package {
            return Ok(OutputPackage::InPackage);
        }
        let source_root = self.roots.absolute_source_root()?;
        let dir = iface.file_name.parent().unwrap_or(Path::new(""));
        let dir = std::path::absolute(dir)
            .with_context(|| format!("Failed to resolve {}", dir.display()))?;
        Ok(OutputPackage::External {
            name: self.config.package_name.clone(),
            source_import: register::import_path(&dir, &source_root),
        })
    }
}

impl WalkerVisitor for GeneratorVisitor<'_> {
    fn visit_interface(&mut self, iface: &InterfaceRecord) -> Result<VisitOutcome> {
        let package = self.output_package(iface)?;
        let mut out = self
            .sink
            .writer(iface)
            .with_context(|| format!("Unable to get writer for {}", iface.name))?;

        let mut rendered = Vec::new();
        let generator = self.generator;
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            generator.generate(iface, &package, &mut rendered)
        }));
        match attempt {
            Ok(result) => result?,
            Err(payload) => {
                error!(
                    interface = %iface.name,
                    "Unable to generate mock for '{}': {}",
                    iface.name,
                    panic_message(payload.as_ref())
                );
                return Ok(VisitOutcome::Faulted);
            }
        }

        out.write_all(&rendered)
            .and_then(|()| out.flush())
            .with_context(|| format!("Failed to write mock for {}", iface.name))?;
        Ok(VisitOutcome::Generated)
    }

    fn generate_registration(&mut self, entry: &RegistrationEntry) -> Result<PathBuf> {
        register::write_registration(entry, self.roots.as_ref(), &self.config.output_dir)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
