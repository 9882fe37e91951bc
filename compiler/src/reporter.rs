use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Warning,
    Error,
}

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub level:    Level,
    pub location: Location,
    pub message:  String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Warning => "warning",
            Level::Error => "error",
        };
        write!(f, "{}: {}: {}", self.location, level, self.message)
    }
}

/// Collects diagnostics across a whole load so that every problem can be
/// shown at once instead of stopping at the first.
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    reports: Vec<Report>,
}

impl ErrorReporter {
    pub fn new() -> ErrorReporter {
        ErrorReporter::default()
    }

    pub fn warn(&mut self, location: &Location, message: impl Into<String>) {
        let message = message.into();
        warn!(%location, "{}", message);
        self.reports.push(Report {
            level:    Level::Warning,
            location: location.clone(),
            message,
        });
    }

    pub fn error(&mut self, location: &Location, message: impl Into<String>) {
        self.reports.push(Report {
            level:    Level::Error,
            location: location.clone(),
            message:  message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(|report| report.level == Level::Error)
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn errors(&self) -> impl Iterator<Item = &Report> {
        self.reports.iter().filter(|report| report.level == Level::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Report> {
        self.reports.iter().filter(|report| report.level == Level::Warning)
    }

    pub(crate) fn into_warnings(self) -> Vec<Report> {
        self.reports
            .into_iter()
            .filter(|report| report.level == Level::Warning)
            .collect()
    }
}
