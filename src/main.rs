//! mockwalk: generate Go interface mocks and a mock registration file.
//!
//! Scans a Go source tree for interface declarations, renders a mock for each
//! selected interface and, when a dig-style provider is found, writes a
//! `register.go` that registers the mock with the DI manager.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Commands, TreeArgs};
use colored::Colorize;
use mockwalk::config::{self, GeneratorConfig, Selection, WalkConfig};
use mockwalk::mockgen::StubGenerator;
use mockwalk::output::{FileSink, OutputSink, StdoutSink};
use mockwalk::scanner;
use mockwalk::walker::{self, GeneratorVisitor, RunSummary};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Generate {
            tree,
            name,
            all,
            inpackage,
            output,
            outpkg,
            print,
            note,
            src_root,
            json,
        } => {
            let generator = GeneratorConfig {
                in_package: inpackage,
                package_name: outpkg,
                note,
                output_dir: output,
                print,
                src_root,
            };
            cmd_generate(&tree, name, all, &generator, json)
        }
        Commands::Scan { tree } => cmd_scan(&tree),
        Commands::List { tree, name, json } => cmd_list(&tree, name, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "mockwalk=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn walk_config(tree: &TreeArgs, selection: &Selection) -> Result<WalkConfig> {
    WalkConfig {
        recursive: tree.recursive,
        build_tags: config::parse_build_tags(&tree.tags),
        ..WalkConfig::new(&tree.dir)
    }
    .with_selection(selection)
}

fn cmd_generate(
    tree: &TreeArgs,
    name: Option<String>,
    all: bool,
    generator_config: &GeneratorConfig,
    json_output: bool,
) -> Result<()> {
    let selection = Selection::from_flags(name, all)?;
    let walk = walk_config(tree, &selection)?;

    let sink: Box<dyn OutputSink> = if generator_config.print {
        Box::new(StdoutSink)
    } else {
        Box::new(FileSink::new(
            &generator_config.output_dir,
            generator_config.in_package,
        ))
    };
    let generator = StubGenerator::new(generator_config.note.clone());
    let mut visitor = GeneratorVisitor::new(generator_config, sink.as_ref(), &generator);

    let summary = walker::run(&walk, &mut visitor)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if let Selection::Name(name) = &selection
        && !summary.any_generated()
    {
        anyhow::bail!("Unable to find {} in any go files under this path", name);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if let Some(path) = &summary.registration {
        eprintln!("{} Wrote {}", "info:".blue().bold(), path.display());
    }
    for name in &summary.faulted {
        eprintln!("{} Mock for {} was not generated", "warn:".yellow().bold(), name);
    }
    eprintln!(
        "{} Generated {} mock(s) from {} interface(s) in {} file(s)",
        "ok:".green().bold(),
        summary.generated.len(),
        summary.interfaces_found,
        summary.files_parsed
    );
}

fn cmd_scan(tree: &TreeArgs) -> Result<()> {
    let walk = walk_config(tree, &Selection::All)?;
    let files = scanner::collect_source_files(&walk);

    println!("Would scan {} files:", files.len());
    for file in files {
        println!("  {}", file.display());
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct ListedInterface {
    name: String,
    package: String,
    file: PathBuf,
}

#[derive(Debug, Serialize)]
struct Listing {
    interfaces: Vec<ListedInterface>,
    registration: Option<PathBuf>,
}

fn cmd_list(tree: &TreeArgs, name: Option<String>, json_output: bool) -> Result<()> {
    let selection = Selection::from_flags(name.clone(), name.is_none())?;
    let walk = walk_config(tree, &selection)?;
    let parser = walker::scan(&walk)?;

    let listing = Listing {
        interfaces: parser
            .interfaces()
            .iter()
            .filter(|iface| walk.filter.is_match(&iface.name))
            .map(|iface| ListedInterface {
                name: iface.name.clone(),
                package: iface.package.clone(),
                file: iface.file_name.clone(),
            })
            .collect(),
        registration: parser.registration().map(|entry| entry.file_name.clone()),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.interfaces.is_empty() {
        println!("{} No interfaces found", "info:".blue().bold());
    }
    for iface in &listing.interfaces {
        println!(
            "  {}.{} {}",
            iface.package,
            iface.name.bold(),
            iface.file.display().to_string().dimmed()
        );
    }
    if let Some(file) = &listing.registration {
        println!("\n{} {}", "Registration entry:".bold(), file.display());
    }

    Ok(())
}
