//! Output sinks for generated mocks.
//!
//! A sink hands out one writer per interface. Writers are owned values, so
//! whatever they hold (a file handle, a stdout lock) is released when the
//! caller drops them, whichever way the caller exits.

use crate::parser::InterfaceRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub trait OutputSink {
    fn writer(&self, iface: &InterfaceRecord) -> Result<Box<dyn Write>>;
}

/// Writes each mock to its own file.
///
/// In-package mocks go next to the interface as `mock_<Name>.go`; otherwise
/// they go to `<output_dir>/<Name>.go`.
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
    in_package: bool,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>, in_package: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            in_package,
        }
    }

    /// Destination file for `iface`.
    pub fn path_for(&self, iface: &InterfaceRecord) -> PathBuf {
        if self.in_package {
            let dir = iface.file_name.parent().unwrap_or(Path::new("."));
            dir.join(format!("mock_{}.go", iface.name))
        } else {
            self.output_dir.join(format!("{}.go", iface.name))
        }
    }
}

impl OutputSink for FileSink {
    fn writer(&self, iface: &InterfaceRecord) -> Result<Box<dyn Write>> {
        let path = self.path_for(iface);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        info!(interface = %iface.name, file = %path.display(), "Generating mock");
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Writes every mock to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn writer(&self, _iface: &InterfaceRecord) -> Result<Box<dyn Write>> {
        Ok(Box::new(std::io::stdout()))
    }
}
