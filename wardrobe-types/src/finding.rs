use serde::{Deserialize, Serialize};

use crate::path::PathKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Machine-readable category of a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingCode {
    MissingTrackedObject { slot: usize, path: PathKey },
    NoResolvablePaths { slot: usize },
    AmbiguousName { slot: usize, path: PathKey },
    SelectorMissing,
    SelectorWrongType,
    MenuEntryMissing { slot: usize },
    MenuEntryWrongParameter { slot: usize },
    MenuEntryWrongValue { slot: usize },
    LayerMissing,
    LayerEmpty,
}

/// A non-fatal observation produced while capturing, compiling or validating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: FindingCode,
    pub message: String,
}

impl Finding {
    pub fn new(severity: Severity, code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
        }
    }

    pub fn info(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub(crate) fn missing_object(slot: usize, slot_name: &str, path: &PathKey) -> Self {
        Self::warning(
            FindingCode::MissingTrackedObject {
                slot,
                path: path.clone(),
            },
            format!("{}: tracked object '{}' not found in scene", slot_name, path),
        )
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Highest severity present, if any.
pub fn worst(findings: &[Finding]) -> Option<Severity> {
    findings.iter().map(|f| f.severity).max()
}
