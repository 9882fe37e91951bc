use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::element::{NamespaceScope, ThriftFileElement};
use crate::error::{LoadError, ThriftError};
use crate::location::Location;
use crate::naming::FieldNamingPolicy;
use crate::parser::parse_thrift_file;
use crate::reporter::ErrorReporter;
use crate::resolver::{resolve, SourceFile};
use crate::schema::Schema;
use crate::utils::quote;
use crate::verifier::verify_schema;

/// Loads a set of `.thrift` files and everything they include into a
/// [Schema].
///
/// Example usage:
///
/// ```no_run
/// use brine_thrift_compiler::{FieldNamingPolicy, Loader};
///
/// let schema = Loader::new()
///     .add_thrift_file("idl/service.thrift")
///     .add_include_path("idl/shared")
///     .field_naming_policy(FieldNamingPolicy::Java)
///     .load()
///     .unwrap();
/// for s in schema.structs() {
///     println!("{}", s.name);
/// }
/// ```
///
#[derive(Debug, Clone, Default)]
pub struct Loader {
    thrift_files:  Vec<PathBuf>,
    include_paths: Vec<PathBuf>,
    policy:        FieldNamingPolicy,
}

impl Loader {
    pub fn new() -> Loader {
        Loader::default()
    }

    /// A `.thrift` file, or a directory whose `.thrift` files are all loaded.
    pub fn add_thrift_file(mut self, path: impl Into<PathBuf>) -> Loader {
        self.thrift_files.push(path.into());
        self
    }

    /// A directory searched for includes, after the including file's own
    /// directory. Searched in the order added.
    pub fn add_include_path(mut self, path: impl Into<PathBuf>) -> Loader {
        self.include_paths.push(path.into());
        self
    }

    pub fn field_naming_policy(mut self, policy: FieldNamingPolicy) -> Loader {
        self.policy = policy;
        self
    }

    /// Parses, resolves and validates. Fails with every diagnostic collected
    /// along the way; syntax errors stop the load before resolution.
    pub fn load(self) -> Result<Schema, LoadError> {
        let mut state = LoadState {
            include_paths: &self.include_paths,
            reporter:      ErrorReporter::new(),
            visited:       HashMap::new(),
            stack:         Vec::new(),
            files:         Vec::new(),
        };

        for root in self.roots(&mut state.reporter) {
            state.visit(&root, None);
        }
        if state.reporter.has_errors() {
            return Err(LoadError::new(state.reporter));
        }

        let LoadState { mut reporter, files, .. } = state;
        let files: Vec<SourceFile> = files.into_iter().flatten().collect();
        let (programs, types) = resolve(&files, self.policy, &mut reporter);
        let schema = Schema::new(programs, types);
        verify_schema(&schema, &mut reporter);

        if reporter.has_errors() {
            return Err(LoadError::new(reporter));
        }
        debug!(programs = schema.programs().len(), "schema loaded");
        Ok(schema.with_warnings(reporter.into_warnings()))
    }

    /// The files named directly, with directories expanded. Without any, the
    /// include paths are scanned instead.
    fn roots(&self, reporter: &mut ErrorReporter) -> Vec<PathBuf> {
        let inputs = if self.thrift_files.is_empty() {
            &self.include_paths
        } else {
            &self.thrift_files
        };

        let mut roots = Vec::new();
        for input in inputs {
            if input.is_dir() {
                roots.extend(thrift_files_in(input, reporter));
            } else if input.is_file() {
                roots.push(input.clone());
            } else {
                reporter.error(&Location::file(input), "File not found");
            }
        }
        roots
    }
}

fn thrift_files_in(dir: &Path, reporter: &mut ErrorReporter) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_file() && path.extension().map_or(false, |ext| ext == "thrift") {
                    debug!(path = %path.display(), "found thrift file");
                    found.push(path.to_path_buf());
                }
            }
            Err(err) => reporter.error(&Location::file(dir), err.to_string()),
        }
    }
    found
}

struct LoadState<'a> {
    include_paths: &'a [PathBuf],
    reporter:      ErrorReporter,
    /// Canonical path to index in `files`, for files that finished loading.
    visited:       HashMap<PathBuf, usize>,
    /// Files whose includes are being loaded, outermost first.
    stack:         Vec<PathBuf>,
    /// In completion order, so every file comes after the files it includes.
    /// `None` marks a file that failed to parse.
    files:         Vec<Option<SourceFile>>,
}

impl<'a> LoadState<'a> {
    /// Loads `path` and, first, everything it includes. Returns the file's
    /// index in `files`. `from` is the include statement that led here.
    fn visit(&mut self, path: &Path, from: Option<&Location>) -> Option<usize> {
        let canonical = match fs::canonicalize(path) {
            Ok(canonical) => canonical,
            Err(err) => {
                let location = from.cloned().unwrap_or_else(|| Location::file(path));
                self.reporter.error(&location, format!("Unable to read {}: {}", path.display(), err));
                return None;
            }
        };

        if let Some(position) = self.stack.iter().position(|open| *open == canonical) {
            let mut cycle: Vec<String> = self.stack[position..].iter().map(|p| file_name(p)).collect();
            cycle.push(file_name(&canonical));
            let location = from.cloned().unwrap_or_else(|| Location::file(path));
            self.reporter.error(
                &location,
                format!("Circular include detected: {}", cycle.join(" -> ")),
            );
            return None;
        }
        if let Some(index) = self.visited.get(&canonical) {
            return Some(*index);
        }

        debug!(path = %canonical.display(), "parsing");
        let element = match self.parse(&canonical) {
            Some(element) => element,
            None => {
                let index = self.finish(canonical, None);
                return Some(index);
            }
        };
        for namespace in &element.namespaces {
            if let NamespaceScope::Unknown(scope) = &namespace.scope {
                self.reporter.warn(
                    &namespace.location,
                    format!("Unknown namespace scope {}", quote(scope)),
                );
            }
        }

        self.stack.push(canonical.clone());
        let mut includes = Vec::new();
        for include in &element.includes {
            match self.find_include(&canonical, &include.path) {
                Some(target) => {
                    debug!(include = %include.path, target = %target.display(), "resolved include");
                    if let Some(index) = self.visit(&target, Some(&include.location)) {
                        includes.push(index);
                    }
                }
                None => self.reporter.error(
                    &include.location,
                    format!("Could not find include {}", quote(&include.path)),
                ),
            }
        }
        self.stack.pop();

        let name = file_stem(&canonical);
        let index = self.finish(canonical, Some(SourceFile { element, name, includes }));
        Some(index)
    }

    fn finish(&mut self, canonical: PathBuf, file: Option<SourceFile>) -> usize {
        let index = self.files.len();
        self.files.push(file);
        self.visited.insert(canonical, index);
        index
    }

    fn parse(&mut self, path: &Path) -> Option<ThriftFileElement> {
        let location = Location::file(path);
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                self.reporter.error(&location, format!("Unable to read file: {}", err));
                return None;
            }
        };
        match parse_thrift_file(&location, &text) {
            Ok(element) => Some(element),
            Err(ThriftError::ParseError { msg, location }) => {
                self.reporter.error(&location, msg);
                None
            }
            Err(ThriftError::UnsupportedEscape { escape, location }) => {
                self.reporter.error(&location, format!("Unsupported escape sequence {}", escape));
                None
            }
            Err(err) => {
                self.reporter.error(&location, err.to_string());
                None
            }
        }
    }

    /// Relative to the including file first, then each include path.
    fn find_include(&self, including: &Path, include: &str) -> Option<PathBuf> {
        let own_dir = including.parent().map(Path::to_path_buf);
        own_dir
            .iter()
            .chain(self.include_paths.iter())
            .map(|dir| dir.join(include))
            .find(|candidate| candidate.is_file())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
