use std::fmt;

use thiserror::Error;

use crate::location::Location;
use crate::reporter::ErrorReporter;

#[derive(Debug, Error)]
pub enum ThriftError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{location}: {msg}")]
    ParseError {
        msg:      String,
        location: Location,
    },

    #[error("{location}: Unsupported escape sequence {escape}")]
    UnsupportedEscape {
        escape:   String,
        location: Location,
    },

    #[error(transparent)]
    LoadFailed(#[from] LoadError),
}

impl ThriftError {
    /// Where the problem was found, for errors tied to a source position.
    pub fn location(&self) -> Option<&Location> {
        match self {
            ThriftError::ParseError { location, .. }
            | ThriftError::UnsupportedEscape { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// A load that produced at least one error. Carries every diagnostic that was
/// collected, warnings included.
#[derive(Debug)]
pub struct LoadError {
    reporter: ErrorReporter,
}

impl LoadError {
    pub fn new(reporter: ErrorReporter) -> LoadError {
        LoadError { reporter }
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// The error messages, in the order they were reported.
    pub fn messages(&self) -> Vec<String> {
        self.reporter.errors().map(|report| report.message.clone()).collect()
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.reporter.errors().count();
        write!(f, "Schema failed to load with {} error(s)", count)?;
        for report in self.reporter.errors() {
            write!(f, "\n  {}", report)?;
        }
        Ok(())
    }
}

impl std::error::Error for LoadError {}
