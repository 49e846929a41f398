use anyhow::Result;
use mockwalk::config::{FixedRoot, GeneratorConfig, Selection, WalkConfig};
use mockwalk::mockgen::{MockGenerator, OutputPackage, StubGenerator};
use mockwalk::output::OutputSink;
use mockwalk::walker::{self, GeneratorVisitor};
use mockwalk::{InterfaceRecord, RegistrationEntry, VisitOutcome, WalkerVisitor};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

const PROVIDER: &str = r#"package widgets

import "go.uber.org/dig"

type Widget interface {
    Spin(speed int) error
}

type Params struct {
    dig.In
    Widget Widget `name:"widget-key"`
}

func GetWidget(p Params) *Widget { return nil }
"#;

fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (file, contents) in files {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    dir
}

fn walk_config(dir: &TempDir, selection: &Selection) -> WalkConfig {
    WalkConfig {
        recursive: true,
        ..WalkConfig::new(dir.path())
    }
    .with_selection(selection)
    .unwrap()
}

#[derive(Default)]
struct Recorder {
    visits: Vec<String>,
    registrations: Vec<PathBuf>,
}

impl WalkerVisitor for Recorder {
    fn visit_interface(&mut self, iface: &InterfaceRecord) -> Result<VisitOutcome> {
        self.visits.push(iface.name.clone());
        Ok(VisitOutcome::Generated)
    }

    fn generate_registration(&mut self, entry: &RegistrationEntry) -> Result<PathBuf> {
        self.registrations.push(entry.file_name.clone());
        Ok(entry.file_name.clone())
    }
}

/// Collects written mocks in memory, keyed by interface name.
#[derive(Clone, Default)]
struct MemorySink {
    files: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

struct MemoryFile {
    name: String,
    files: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.files
            .borrow_mut()
            .entry(self.name.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl OutputSink for MemorySink {
    fn writer(&self, iface: &InterfaceRecord) -> Result<Box<dyn Write>> {
        Ok(Box::new(MemoryFile {
            name: iface.name.clone(),
            files: Rc::clone(&self.files),
        }))
    }
}

impl MemorySink {
    fn written(&self, name: &str) -> Option<String> {
        self.files
            .borrow()
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

struct FailingSink;

impl OutputSink for FailingSink {
    fn writer(&self, iface: &InterfaceRecord) -> Result<Box<dyn Write>> {
        anyhow::bail!("disk full while opening {}", iface.name)
    }
}

/// Panics for the named interfaces, returns an error for `Broken`.
struct FlakyGenerator {
    panics_on: Vec<&'static str>,
}

impl MockGenerator for FlakyGenerator {
    fn generate(
        &self,
        iface: &InterfaceRecord,
        package: &OutputPackage,
        out: &mut dyn Write,
    ) -> Result<()> {
        if self.panics_on.contains(&iface.name.as_str()) {
            panic!("unsupported method set in {}", iface.name);
        }
        if iface.name == "Broken" {
            anyhow::bail!("cannot render {}", iface.name);
        }
        StubGenerator::new("").generate(iface, package, out)
    }
}

fn generator_config(dir: &TempDir) -> GeneratorConfig {
    GeneratorConfig {
        output_dir: dir.path().join("mocks"),
        src_root: Some(dir.path().to_path_buf()),
        ..GeneratorConfig::default()
    }
}

#[test]
fn test_files_are_excluded_end_to_end() {
    let dir = tree(&[
        ("pkgX/types.go", "package pkgX\ntype Foo interface{ Do() }\n"),
        ("pkgX/types_test.go", "package pkgX\ntype Bar interface{ Do() }\n"),
    ]);
    let mut recorder = Recorder::default();
    let summary = walker::run(&walk_config(&dir, &Selection::All), &mut recorder).unwrap();

    assert_eq!(recorder.visits, vec!["Foo"]);
    assert_eq!(summary.files_parsed, 1);
    assert!(recorder.registrations.is_empty());
    assert!(summary.registration.is_none());
}

#[test]
fn visits_every_match_in_discovery_order() {
    let dir = tree(&[
        ("a/first.go", "package a\ntype Zeta interface{}\ntype Alpha interface{}\n"),
        ("b/second.go", "package b\ntype Mid interface{}\n"),
    ]);
    let mut recorder = Recorder::default();
    let summary = walker::run(&walk_config(&dir, &Selection::All), &mut recorder).unwrap();

    assert_eq!(recorder.visits, vec!["Zeta", "Alpha", "Mid"]);
    assert_eq!(summary.generated, recorder.visits);
    assert_eq!(summary.interfaces_found, 3);
}

#[test]
fn limit_one_visits_exactly_one_match() {
    let dir = tree(&[(
        "svc/svc.go",
        "package svc\ntype Service interface{}\ntype Service2 interface{}\n",
    )]);
    let mut config = walk_config(&dir, &Selection::All);
    config.limit_one = true;

    let mut recorder = Recorder::default();
    walker::run(&config, &mut recorder).unwrap();
    assert_eq!(recorder.visits, vec!["Service"]);
}

#[test]
fn name_selection_only_visits_exact_name() {
    let dir = tree(&[(
        "svc/svc.go",
        "package svc\ntype ServiceReader interface{}\ntype Service interface{}\n",
    )]);
    let config = walk_config(&dir, &Selection::Name("Service".to_string()));

    let mut recorder = Recorder::default();
    let summary = walker::run(&config, &mut recorder).unwrap();
    assert_eq!(recorder.visits, vec!["Service"]);
    assert!(summary.any_generated());
}

#[test]
fn unmatched_name_generates_nothing() {
    let dir = tree(&[("svc/svc.go", "package svc\ntype Service interface{}\n")]);
    let config = walk_config(&dir, &Selection::Name("Missing".to_string()));

    let mut recorder = Recorder::default();
    let summary = walker::run(&config, &mut recorder).unwrap();
    assert!(recorder.visits.is_empty());
    assert!(!summary.any_generated());
}

#[test]
fn unparsable_files_are_skipped() {
    let dir = tree(&[
        ("a/bad.go", "package a\ntype Broken interface {\n"),
        ("a/good.go", "package a\ntype Fine interface{}\n"),
    ]);
    let mut recorder = Recorder::default();
    let summary = walker::run(&walk_config(&dir, &Selection::All), &mut recorder).unwrap();

    assert_eq!(recorder.visits, vec!["Fine"]);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.files_parsed, 1);
}

#[test]
fn panicking_generation_is_isolated() {
    let dir = tree(&[(
        "svc/svc.go",
        "package svc\ntype Alpha interface{ A() }\ntype Beta interface{ B() error }\n",
    )]);
    let config = generator_config(&dir);
    let sink = MemorySink::default();
    let generator = FlakyGenerator {
        panics_on: vec!["Alpha"],
    };
    let mut visitor = GeneratorVisitor::new(&config, &sink, &generator);

    let summary = walker::run(&walk_config(&dir, &Selection::All), &mut visitor).unwrap();

    assert_eq!(summary.faulted, vec!["Alpha"]);
    assert_eq!(summary.generated, vec!["Beta"]);
    let beta = sink.written("Beta").unwrap();
    assert!(beta.contains("func (_m *Beta) B() error {"));
}

#[test]
fn faulted_visit_does_not_satisfy_limit_one() {
    let dir = tree(&[(
        "svc/svc.go",
        "package svc\ntype Alpha interface{}\ntype Beta interface{}\ntype Gamma interface{}\n",
    )]);
    let config = generator_config(&dir);
    let sink = MemorySink::default();
    let generator = FlakyGenerator {
        panics_on: vec!["Alpha"],
    };
    let mut visitor = GeneratorVisitor::new(&config, &sink, &generator);
    let mut walk = walk_config(&dir, &Selection::All);
    walk.limit_one = true;

    let summary = walker::run(&walk, &mut visitor).unwrap();
    assert_eq!(summary.faulted, vec!["Alpha"]);
    assert_eq!(summary.generated, vec!["Beta"]);
}

#[test]
fn generator_errors_abort_the_run() {
    let dir = tree(&[(
        "svc/svc.go",
        "package svc\ntype Broken interface{}\ntype Later interface{}\n",
    )]);
    let config = generator_config(&dir);
    let sink = MemorySink::default();
    let generator = FlakyGenerator { panics_on: vec![] };
    let mut visitor = GeneratorVisitor::new(&config, &sink, &generator);

    let err = walker::run(&walk_config(&dir, &Selection::All), &mut visitor).unwrap_err();
    assert!(format!("{:#}", err).contains("cannot render Broken"));
    assert!(sink.written("Later").is_none());
}

#[test]
fn writer_acquisition_failure_is_fatal() {
    let dir = tree(&[("svc/svc.go", "package svc\ntype Service interface{}\n")]);
    let config = generator_config(&dir);
    let generator = StubGenerator::new("");
    let mut visitor = GeneratorVisitor::new(&config, &FailingSink, &generator);

    let err = walker::run(&walk_config(&dir, &Selection::All), &mut visitor).unwrap_err();
    assert!(format!("{:#}", err).contains("Unable to get writer for Service"));
}

#[test]
fn registration_file_is_written_from_provider() {
    let dir = tree(&[("github.com/acme/widgets/provider.go", PROVIDER)]);
    let config = generator_config(&dir);
    let sink = MemorySink::default();
    let generator = StubGenerator::new("");
    let mut visitor = GeneratorVisitor::new(&config, &sink, &generator);

    let summary = walker::run(&walk_config(&dir, &Selection::All), &mut visitor).unwrap();

    let register = summary.registration.expect("register.go written");
    assert_eq!(register, dir.path().join("mocks").join("register.go"));
    let contents = fs::read_to_string(&register).unwrap();
    assert!(contents.contains("\t\"github.com/acme/widgets\"\n"));
    assert!(contents.contains("func RegisterMock(m *dimanager.Manager) *Widget {"));
    assert!(contents.contains(
        "m.ProvideMock(func() widgets.Widget { return mockObj }, \"widget-key\")"
    ));

    let mock = sink.written("Widget").unwrap();
    assert!(mock.contains("\npackage mocks\n"));
    assert!(mock.contains("type Widget struct {"));
}

#[test]
fn in_package_mocks_use_source_package() {
    let dir = tree(&[("store/store.go", "package store\ntype Store interface{ Len() int }\n")]);
    let config = GeneratorConfig {
        in_package: true,
        ..generator_config(&dir)
    };
    let sink = MemorySink::default();
    let generator = StubGenerator::new("");
    let mut visitor = GeneratorVisitor::new(&config, &sink, &generator)
        .with_root_resolver(Box::new(FixedRoot(PathBuf::from("/unused"))));

    walker::run(&walk_config(&dir, &Selection::All), &mut visitor).unwrap();
    let mock = sink.written("Store").unwrap();
    assert!(mock.contains("\npackage store\n"));
    assert!(mock.contains("func (_m *MockStore) Len() int {"));
    assert!(!Path::new(&config.output_dir).join("register.go").exists());
}
