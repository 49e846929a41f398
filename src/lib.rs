//! mockwalk library for generating Go interface mocks.
//!
//! The pipeline runs in three phases:
//!
//! 1. **Scanning**: walk a source tree and parse every non-test `.go` file,
//!    collecting interface declarations and at most one dig-style provider
//! 2. **Registration**: pattern-match the provider and write `register.go`
//! 3. **Mock dispatch**: render a mock for each interface passing the name
//!    filter, isolating generator faults per interface
//!
//! # Example
//!
//! ```no_run
//! use mockwalk::config::{GeneratorConfig, Selection, WalkConfig};
//! use mockwalk::mockgen::StubGenerator;
//! use mockwalk::output::FileSink;
//! use mockwalk::walker::{self, GeneratorVisitor};
//!
//! let walk = WalkConfig { recursive: true, ..WalkConfig::new("./pkg") }
//!     .with_selection(&Selection::All)
//!     .unwrap();
//! let config = GeneratorConfig::default();
//! let sink = FileSink::new(&config.output_dir, config.in_package);
//! let generator = StubGenerator::new("");
//! let mut visitor = GeneratorVisitor::new(&config, &sink, &generator);
//!
//! let summary = walker::run(&walk, &mut visitor).unwrap();
//! println!("Generated {} mocks", summary.generated.len());
//! ```

pub mod config;
pub mod decl;
pub mod mockgen;
pub mod output;
pub mod parser;
pub mod register;
pub mod scanner;
pub mod walker;

// Re-export commonly used types at crate root
pub use config::{GeneratorConfig, WalkConfig};
pub use parser::{InterfaceRecord, RegistrationEntry};
pub use walker::{RunSummary, VisitOutcome, WalkerVisitor};
