use std::fmt;

use super::diagnostic::{DiagnosticPhase, IsaDiagnostic};

/// Represents any failure that can occur while loading, validating, synthesizing decode tables
/// for, or assembling instruction definitions.
#[derive(Debug)]
pub enum IsaError {
    Io(std::io::Error),
    Parser(String),
    Validation(String),
    Diagnostics {
        phase: DiagnosticPhase,
        diagnostics: Vec<IsaDiagnostic>,
    },
    DuplicateTemplate {
        width: u32,
        first: String,
        second: String,
    },
    UnresolvedAmbiguity {
        width: u32,
        candidates: Vec<String>,
    },
    OperandCount {
        instruction: String,
        expected: usize,
        got: usize,
    },
    ExcludedOperand {
        instruction: String,
        field: String,
        value: u64,
    },
}

impl From<std::io::Error> for IsaError {
    fn from(err: std::io::Error) -> Self {
        IsaError::Io(err)
    }
}

impl From<serde_yaml::Error> for IsaError {
    fn from(err: serde_yaml::Error) -> Self {
        IsaError::Parser(format!("yaml: {err}"))
    }
}

impl fmt::Display for IsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsaError::Io(err) => write!(f, "I/O error: {err}"),
            IsaError::Parser(msg) => write!(f, "parser error: {msg}"),
            IsaError::Validation(msg) => write!(f, "validation error: {msg}"),
            IsaError::Diagnostics { phase, diagnostics } => {
                write!(f, "{phase} failed with {} diagnostic(s)", diagnostics.len())?;
                for diag in diagnostics {
                    write!(f, "\n  {diag}")?;
                }
                Ok(())
            }
            IsaError::DuplicateTemplate {
                width,
                first,
                second,
            } => write!(
                f,
                "instructions '{first}' and '{second}' share an identical {width}-bit template"
            ),
            IsaError::UnresolvedAmbiguity { width, candidates } => write!(
                f,
                "no discriminating field separates {width}-bit instructions {}",
                candidates.join(", ")
            ),
            IsaError::OperandCount {
                instruction,
                expected,
                got,
            } => write!(
                f,
                "instruction '{instruction}' expects {expected} operand(s), got {got}"
            ),
            IsaError::ExcludedOperand {
                instruction,
                field,
                value,
            } => write!(
                f,
                "instruction '{instruction}' field '{field}' may not encode value {value}"
            ),
        }
    }
}

impl std::error::Error for IsaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IsaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl IsaError {
    /// Diagnostics carried by the error, if it was produced by a collecting phase.
    pub fn diagnostics(&self) -> &[IsaDiagnostic] {
        match self {
            IsaError::Diagnostics { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}
