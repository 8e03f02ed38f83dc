//! Project-wide export index: lex every CommonJS file under a root in parallel.

use crate::cache::{CacheError, IncrementalCache};
use crate::error::LexErrorKind;
use crate::lexer::{parse_cjs_with, CjsExports};
use crate::options::LexerOptions;
use dashmap::DashMap;
use indexmap::IndexSet;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Bump when `FileReport` changes shape so stale cache entries are ignored.
const CACHE_VERSION: &str = concat!("cjs-lexer-", env!("CARGO_PKG_VERSION"), "-1");

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("cannot walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("invalid exclude pattern: {0}")]
    Exclude(#[from] regex::Error),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// File extensions (without the dot) that are lexed.
    pub extensions: Vec<String>,
    /// Directory names that are never descended into.
    pub skip_dirs: Vec<String>,
    /// Paths matching this regex are skipped.
    pub exclude: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub lexer: LexerOptions,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["js".into(), "cjs".into()],
            skip_dirs: ["node_modules", ".git", "target", "dist", "build"].map(String::from).to_vec(),
            exclude: None,
            cache_dir: None,
            lexer: LexerOptions::default(),
        }
    }
}

/// Outcome of lexing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileReport {
    Cjs { exports: IndexSet<String>, reexports: IndexSet<String> },
    Esm,
    Error { kind: LexErrorKind, message: String, offset: usize },
}

impl From<CjsExports> for FileReport {
    fn from(out: CjsExports) -> Self {
        FileReport::Cjs { exports: out.exports, reexports: out.reexports }
    }
}

#[derive(Serialize)]
struct IndexSnapshot<'a> {
    files: BTreeMap<String, &'a FileReport>,
}

pub struct ExportIndex {
    files: DashMap<String, FileReport>,
}

impl ExportIndex {
    pub fn index_project(root: impl AsRef<Path>, options: &IndexOptions) -> Result<Self, IndexError> {
        let root = root.as_ref();
        let exclude = options.exclude.as_deref().map(Regex::new).transpose()?;
        let cache = options
            .cache_dir
            .as_ref()
            .map(|dir| IncrementalCache::<FileReport>::new(dir, CACHE_VERSION))
            .transpose()?;

        let files = find_source_files(root, options, exclude.as_ref())?;
        info!(root = %root.display(), files = files.len(), "indexing project");

        let index = DashMap::new();
        files.par_iter().for_each(|path| {
            let key = path.to_string_lossy().into_owned();
            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(err) => {
                    warn!(file = %key, error = %err, "skipping unreadable file");
                    return;
                }
            };
            if let Some(report) = cache.as_ref().and_then(|c| c.get(&key, &source)) {
                debug!(file = %key, "cache hit");
                index.insert(key, report);
                return;
            }
            let report = lex_file(&key, &source, &options.lexer);
            if let Some(cache) = &cache {
                if let Err(err) = cache.set(&key, &source, report.clone()) {
                    warn!(file = %key, error = %err, "could not write cache entry");
                }
            }
            index.insert(key, report);
        });

        Ok(Self { files: index })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<FileReport> {
        self.files.get(path).map(|r| r.value().clone())
    }

    /// Paths whose named exports include `name`, sorted.
    pub fn files_exporting(&self, name: &str) -> Vec<String> {
        self.matching(|report| matches!(report, FileReport::Cjs { exports, .. } if exports.contains(name)))
    }

    /// Paths that re-export everything from `specifier`, sorted.
    pub fn reexporters_of(&self, specifier: &str) -> Vec<String> {
        self.matching(|report| matches!(report, FileReport::Cjs { reexports, .. } if reexports.contains(specifier)))
    }

    fn matching(&self, pred: impl Fn(&FileReport) -> bool) -> Vec<String> {
        let mut out: Vec<String> =
            self.files.iter().filter(|e| pred(e.value())).map(|e| e.key().clone()).collect();
        out.sort();
        out
    }

    /// Path-sorted JSON snapshot of every report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries: Vec<_> = self.files.iter().collect();
        let files = entries.iter().map(|e| (e.key().clone(), e.value())).collect();
        serde_json::to_string(&IndexSnapshot { files })
    }
}

fn lex_file(key: &str, source: &str, options: &LexerOptions) -> FileReport {
    match parse_cjs_with(source, Some(key), options) {
        Ok(out) => out.into(),
        Err(err) if err.is_esm_syntax() => FileReport::Esm,
        Err(err) => {
            debug!(file = key, error = %err, "lex failed");
            FileReport::Error { kind: err.kind, message: err.message, offset: err.offset }
        }
    }
}

pub fn find_source_files(
    root: &Path,
    options: &IndexOptions,
    exclude: Option<&Regex>,
) -> Result<Vec<PathBuf>, IndexError> {
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !options.skip_dirs.iter().any(|d| entry.file_name() == d.as_str())
    });

    let mut out = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(IndexError::Walk { root: root.to_path_buf(), source });
            }
            Err(err) => {
                warn!(error = %err, "skipping unwalkable entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let wanted = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| options.extensions.iter().any(|e| e == ext));
        if !wanted {
            continue;
        }
        if exclude.is_some_and(|re| re.is_match(&path.to_string_lossy())) {
            debug!(file = %path.display(), "excluded");
            continue;
        }
        out.push(path.to_path_buf());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, body: &str) -> String {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn indexes_cjs_esm_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let a = write(root, "lib/a.js", "exports.foo = 1;\nexports.bar = 2;");
        let b = write(root, "lib/b.cjs", "module.exports = require('./a');");
        let c = write(root, "lib/c.js", "export default 1;");
        let d = write(root, "lib/d.js", "exports.x = {");
        write(root, "lib/readme.md", "exports.nope = 1;");
        write(root, "node_modules/dep/index.js", "exports.dep = 1;");

        let index = ExportIndex::index_project(root, &IndexOptions::default()).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.files_exporting("foo"), [a.clone()]);
        assert!(index.files_exporting("dep").is_empty());
        assert_eq!(index.reexporters_of("./a"), [b]);
        assert_eq!(index.get(&c), Some(FileReport::Esm));
        assert!(matches!(
            index.get(&d),
            Some(FileReport::Error { kind: LexErrorKind::UnterminatedBracket, .. })
        ));
    }

    #[test]
    fn exclude_regex_and_extensions_are_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/keep.js", "exports.a = 1;");
        write(root, "src/skip.test.js", "exports.b = 1;");
        let mjs = write(root, "src/other.mjs", "exports.c = 1;");

        let options = IndexOptions {
            extensions: vec!["js".into(), "mjs".into()],
            exclude: Some(r"\.test\.js$".into()),
            ..IndexOptions::default()
        };
        let index = ExportIndex::index_project(root, &options).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.files_exporting("b").is_empty());
        assert_eq!(index.files_exporting("c"), [mjs]);
    }

    #[test]
    fn bad_exclude_pattern_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = IndexOptions { exclude: Some("(".into()), ..IndexOptions::default() };
        let err = ExportIndex::index_project(dir.path(), &options).err().unwrap();
        assert!(matches!(err, IndexError::Exclude(_)));
    }

    #[test]
    fn missing_root_is_a_walk_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExportIndex::index_project(dir.path().join("absent"), &IndexOptions::default()).err().unwrap();
        assert!(matches!(err, IndexError::Walk { .. }));
    }

    #[test]
    fn cached_reports_are_reused() {
        let src_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let a = write(src_dir.path(), "a.js", "exports.a = 1;");
        let options = IndexOptions { cache_dir: Some(cache_dir.path().to_path_buf()), ..IndexOptions::default() };

        let first = ExportIndex::index_project(src_dir.path(), &options).unwrap();
        let second = ExportIndex::index_project(src_dir.path(), &options).unwrap();
        assert_eq!(first.get(&a), second.get(&a));
        assert!(fs::read_dir(cache_dir.path()).unwrap().count() >= 1);
    }

    #[test]
    fn snapshot_is_sorted_json() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.js", "exports.b = 1;");
        write(dir.path(), "a.js", "export const a = 1;");
        let index = ExportIndex::index_project(dir.path(), &IndexOptions::default()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&index.to_json().unwrap()).unwrap();
        let files = json["files"].as_object().unwrap();
        let keys: Vec<_> = files.keys().cloned().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        let statuses: Vec<_> = files.values().map(|v| v["status"].as_str().unwrap()).collect();
        assert_eq!(statuses, ["esm", "cjs"]);
    }

    #[test]
    fn empty_project_snapshot_has_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = ExportIndex::index_project(dir.path(), &IndexOptions::default()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.to_json().unwrap(), r#"{"files":{}}"#);
    }
}
