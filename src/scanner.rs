//! Go source tree scanner.
//!
//! Walks `base_dir` depth-first in file-name order, skipping entries whose
//! names start with `.` or `_`, and hands every non-test `.go` file to a
//! [`FileVisitor`]. Subdirectories are only entered when the walk is
//! recursive.

use crate::config::WalkConfig;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

const SOURCE_SUFFIX: &str = ".go";
const TEST_SUFFIX: &str = "_test.go";

/// Receives each eligible source file found by [`walk`].
pub trait FileVisitor {
    /// Visits one file. Returns `Ok(true)` when the visit produced a result,
    /// which lets a `limit_one` walk stop early.
    fn visit_file(&mut self, path: &Path) -> Result<bool>;
}

/// Walks the tree described by `config`, feeding eligible files to `visitor`.
///
/// A failed visit is logged and the walk moves on. Returns whether any visit
/// produced a result.
pub fn walk(config: &WalkConfig, visitor: &mut impl FileVisitor) -> bool {
    let mut walker = WalkDir::new(&config.base_dir).sort_by_file_name();
    if !config.recursive {
        walker = walker.max_depth(1);
    }

    let mut produced = false;
    for entry in walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_or_underscore(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !is_source_file(&entry) {
            continue;
        }

        match visitor.visit_file(entry.path()) {
            Ok(true) => {
                produced = true;
                if config.limit_one {
                    break;
                }
            }
            Ok(false) => {}
            Err(err) => warn!(file = %entry.path().display(), "Error parsing file: {:#}", err),
        }
    }

    produced
}

/// Lists the files [`walk`] would visit.
pub fn collect_source_files(config: &WalkConfig) -> Vec<PathBuf> {
    struct Collect(Vec<PathBuf>);

    impl FileVisitor for Collect {
        fn visit_file(&mut self, path: &Path) -> Result<bool> {
            self.0.push(path.to_path_buf());
            Ok(false)
        }
    }

    let mut collect = Collect(Vec::new());
    walk(config, &mut collect);
    collect.0
}

fn is_hidden_or_underscore(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.') || s.starts_with('_'))
}

fn is_source_file(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|s| s.ends_with(SOURCE_SUFFIX) && !s.ends_with(TEST_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "package p\n").unwrap();
        }
        dir
    }

    fn config(dir: &TempDir, recursive: bool) -> WalkConfig {
        WalkConfig {
            recursive,
            ..WalkConfig::new(dir.path())
        }
    }

    fn relative(dir: &TempDir, files: Vec<PathBuf>) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    /// Records visits and reports a result for files named in `produces`.
    struct Recorder {
        visited: Vec<PathBuf>,
        produces: Vec<&'static str>,
        fails: Vec<&'static str>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                visited: Vec::new(),
                produces: Vec::new(),
                fails: Vec::new(),
            }
        }
    }

    impl FileVisitor for Recorder {
        fn visit_file(&mut self, path: &Path) -> Result<bool> {
            self.visited.push(path.to_path_buf());
            let name = path.file_name().unwrap().to_str().unwrap();
            if self.fails.contains(&name) {
                anyhow::bail!("cannot parse {}", name);
            }
            Ok(self.produces.contains(&name))
        }
    }

    #[test]
    fn non_recursive_walk_stays_in_base_dir() {
        let dir = tree(&["a.go", "b.go", "sub/c.go", "sub/deeper/d.go"]);
        let files = collect_source_files(&config(&dir, false));
        assert_eq!(relative(&dir, files), vec!["a.go", "b.go"]);
    }

    #[test]
    fn recursive_walk_is_depth_first_in_name_order() {
        let dir = tree(&["z.go", "a/x.go", "a/b/y.go", "m.go"]);
        let files = collect_source_files(&config(&dir, true));
        assert_eq!(relative(&dir, files), vec!["a/b/y.go", "a/x.go", "m.go", "z.go"]);
    }

    #[test]
    fn skips_dot_and_underscore_entries() {
        let dir = tree(&[
            "keep.go",
            ".hidden.go",
            "_ignored.go",
            ".git/objects.go",
            "_vendor/dep.go",
            "pkg/_gen.go",
            "pkg/ok.go",
        ]);
        for recursive in [false, true] {
            let files = relative(&dir, collect_source_files(&config(&dir, recursive)));
            assert!(files.iter().all(|f| !f.contains("/.") && !f.starts_with('.')));
            assert!(files.iter().all(|f| !f.contains("/_") && !f.starts_with('_')));
        }
        let files = collect_source_files(&config(&dir, true));
        assert_eq!(relative(&dir, files), vec!["keep.go", "pkg/ok.go"]);
    }

    #[test]
    fn skips_test_and_foreign_files() {
        let dir = tree(&["types.go", "types_test.go", "README.md", "main.go.orig"]);
        let files = collect_source_files(&config(&dir, true));
        assert_eq!(relative(&dir, files), vec!["types.go"]);
    }

    #[test]
    fn dot_base_dir_is_walked() {
        let dir = tree(&["a.go"]);
        let config = WalkConfig::new(dir.path().join("."));
        assert_eq!(collect_source_files(&config).len(), 1);
    }

    #[test]
    fn visit_errors_do_not_stop_the_walk() {
        let dir = tree(&["a.go", "b.go", "c.go"]);
        let mut recorder = Recorder::new();
        recorder.fails = vec!["a.go"];
        let produced = walk(&config(&dir, false), &mut recorder);
        assert!(!produced);
        assert_eq!(recorder.visited.len(), 3);
    }

    #[test]
    fn limit_one_stops_after_first_result() {
        let dir = tree(&["a/one.go", "a/two.go", "b/three.go"]);
        let mut recorder = Recorder::new();
        recorder.produces = vec!["one.go", "two.go", "three.go"];
        let config = WalkConfig {
            limit_one: true,
            ..config(&dir, true)
        };
        assert!(walk(&config, &mut recorder));
        assert_eq!(relative(&dir, recorder.visited), vec!["a/one.go"]);
    }

    #[test]
    fn without_limit_every_file_is_visited() {
        let dir = tree(&["a/one.go", "a/two.go", "b/three.go"]);
        let mut recorder = Recorder::new();
        recorder.produces = vec!["two.go"];
        assert!(walk(&config(&dir, true), &mut recorder));
        assert_eq!(recorder.visited.len(), 3);
    }
}
