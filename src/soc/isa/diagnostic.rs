//! Structured diagnostics shared by the loader, validator, decode synthesis, and lowering passes.

use std::fmt;
use std::path::PathBuf;

use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticPhase {
    Loading,
    Validation,
    Decode,
    Lowering,
}

impl fmt::Display for DiagnosticPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticPhase::Loading => "loading",
            DiagnosticPhase::Validation => "validation",
            DiagnosticPhase::Decode => "decode",
            DiagnosticPhase::Lowering => "lowering",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// Points at the definition a diagnostic was raised for. Definitions are whole YAML files, so
/// the span is the file plus the instruction (and optionally field) it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub path: Option<PathBuf>,
    pub instruction: Option<String>,
    pub field: Option<String>,
}

impl SourceSpan {
    pub fn instruction(name: impl Into<String>) -> Self {
        Self {
            path: None,
            instruction: Some(name.into()),
            field: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        if let Some(path) = &self.path {
            write!(f, "{}", path.display())?;
            wrote = true;
        }
        if let Some(instr) = &self.instruction {
            if wrote {
                f.write_str(": ")?;
            }
            write!(f, "{instr}")?;
            wrote = true;
        }
        if let Some(field) = &self.field {
            if wrote {
                f.write_str(".")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsaDiagnostic {
    pub phase: DiagnosticPhase,
    pub level: DiagnosticLevel,
    pub code: &'static str,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl IsaDiagnostic {
    pub fn new(
        phase: DiagnosticPhase,
        level: DiagnosticLevel,
        code: &'static str,
        message: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Self {
        Self {
            phase,
            level,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// Emits the diagnostic as a tracing event at its own level.
    pub fn log(&self) {
        match self.level {
            DiagnosticLevel::Error => error!(code = self.code, "{self}"),
            DiagnosticLevel::Warning => warn!(code = self.code, "{self}"),
        }
    }
}

impl fmt::Display for IsaDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        };
        match &self.span {
            Some(span) => write!(f, "{level}[{}] {span}: {}", self.code, self.message),
            None => write!(f, "{level}[{}] {}", self.code, self.message),
        }
    }
}
