//! Semantic validation of raw instruction and CSR definitions. Each definition is checked on its
//! own: a broken definition yields diagnostics and is left out, the rest still validate.

mod csrs;
mod encoding;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::diagnostic::{DiagnosticLevel, DiagnosticPhase, IsaDiagnostic, SourceSpan};
use super::error::IsaError;

#[derive(Default)]
pub struct Validator {
    seen_instructions: BTreeMap<String, Option<PathBuf>>,
    seen_csrs: BTreeSet<String>,
    diagnostics: Vec<IsaDiagnostic>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[IsaDiagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(IsaDiagnostic::is_error)
    }

    /// Hands the collected diagnostics to the caller, leaving the validator empty.
    pub fn take_diagnostics(&mut self) -> Vec<IsaDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Fails with every collected diagnostic if any of them is an error.
    pub fn finish(&mut self) -> Result<(), IsaError> {
        if self.has_errors() {
            Err(IsaError::Diagnostics {
                phase: DiagnosticPhase::Validation,
                diagnostics: self.take_diagnostics(),
            })
        } else {
            Ok(())
        }
    }

    fn push_validation_diagnostic(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        span: Option<SourceSpan>,
    ) {
        self.diagnostics.push(IsaDiagnostic::new(
            DiagnosticPhase::Validation,
            DiagnosticLevel::Error,
            code,
            message,
            span,
        ));
    }

    fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|diag| diag.is_error()).count()
    }
}

fn span_for(name: &str, path: Option<&Path>) -> SourceSpan {
    let span = SourceSpan::instruction(name);
    match path {
        Some(path) => span.with_path(path),
        None => span,
    }
}
