use std::fmt;
use std::path::Path;

use serde::Serialize;

/// A position in a `.thrift` source file. Lines and columns are 1-based; a
/// location with line 0 refers to the file as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub path:   String,
    pub line:   usize,
    pub column: usize,
}

impl Location {
    pub fn new(path: impl Into<String>, line: usize, column: usize) -> Location {
        Location {
            path: path.into(),
            line,
            column,
        }
    }

    /// The location of a whole file.
    pub fn file(path: &Path) -> Location {
        Location::new(path.display().to_string(), 0, 0)
    }

    /// Same file, different position.
    pub fn at(&self, line: usize, column: usize) -> Location {
        Location::new(self.path.clone(), line, column)
    }

    /// The final path component, e.g. `common.thrift`.
    pub fn file_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}:{}:{}", self.path, self.line, self.column)
        }
    }
}

#[test]
fn location_display() {
    let file = Location::file(Path::new("idl/common.thrift"));
    assert_eq!(file.to_string(), "idl/common.thrift");
    assert_eq!(file.file_name(), "common.thrift");
    assert_eq!(file.at(3, 7).to_string(), "idl/common.thrift:3:7");
}
