//! ISA definition loading: reads per-instruction and per-CSR YAML files, validates each one, and
//! assembles the immutable [`Catalog`] the decode and lowering stages work from.

pub mod literals;
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::soc::isa::catalog::{Catalog, InstructionFilter};
use crate::soc::isa::csr::CsrTable;
use crate::soc::isa::diagnostic::{DiagnosticLevel, DiagnosticPhase, IsaDiagnostic, SourceSpan};
use crate::soc::isa::error::IsaError;
use crate::soc::isa::validator::Validator;

pub use schema::{CsrSource, InstructionSource};

pub fn parse_instruction_str(text: &str) -> Result<InstructionSource, IsaError> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn parse_csr_str(text: &str) -> Result<CsrSource, IsaError> {
    Ok(serde_yaml::from_str(text)?)
}

/// Everything a load produced: the catalog of definitions that validated, and the diagnostics
/// of those that did not.
#[derive(Debug)]
pub struct LoadReport {
    pub catalog: Catalog,
    pub diagnostics: Vec<IsaDiagnostic>,
}

impl LoadReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(IsaDiagnostic::is_error)
    }

    /// The catalog, or every diagnostic when any definition failed to load.
    pub fn into_result(self) -> Result<Catalog, IsaError> {
        if self.has_errors() {
            Err(IsaError::Diagnostics {
                phase: DiagnosticPhase::Validation,
                diagnostics: self.diagnostics,
            })
        } else {
            Ok(self.catalog)
        }
    }
}

#[derive(Default)]
pub struct IsaLoader {
    filter: InstructionFilter,
}

impl IsaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: InstructionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Loads every CSR under `csr_dirs`, then every instruction under `inst_dir` (if given).
    /// CSRs come first so lowering always sees the full table. A broken file is reported and
    /// skipped; only an unreadable directory fails the whole load.
    pub fn load_catalog(
        &self,
        inst_dir: Option<&Path>,
        csr_dirs: &[PathBuf],
    ) -> Result<LoadReport, IsaError> {
        let mut validator = Validator::new();
        let mut diagnostics = Vec::new();

        let mut csrs = CsrTable::new();
        for dir in csr_dirs {
            for path in yaml_files(dir)? {
                let Some(src) = read_yaml::<CsrSource>(&path, &mut diagnostics)? else {
                    continue;
                };
                if let Some(csr) = validator.validate_csr(&src, Some(path.as_path())) {
                    debug!(csr = %csr.name, address = csr.address, "loaded CSR");
                    csrs.insert(csr);
                }
            }
        }

        let mut catalog = Catalog::new(csrs, self.filter.clone());
        let mut skipped = 0usize;
        let inst_files = match inst_dir {
            Some(dir) => yaml_files(dir)?,
            None => Vec::new(),
        };
        for path in inst_files {
            let Some(src) = read_yaml::<InstructionSource>(&path, &mut diagnostics)? else {
                continue;
            };
            if self.filter.skips(&src.name) {
                skipped += 1;
                continue;
            }
            if let Some(instr) = validator.validate_instruction(&src, Some(path.as_path())) {
                debug!(instruction = %instr.name, width = instr.bit_width(), "loaded instruction");
                catalog.insert(instr);
            }
        }

        diagnostics.extend(validator.take_diagnostics());
        for diag in &diagnostics {
            diag.log();
        }
        info!(
            instructions = catalog.len(),
            csrs = catalog.csrs().len(),
            skipped,
            errors = diagnostics.iter().filter(|diag| diag.is_error()).count(),
            "catalog loaded"
        );
        Ok(LoadReport {
            catalog,
            diagnostics,
        })
    }
}

/// Sorted `*.yaml` files directly inside `dir`.
fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>, IsaError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parses one file. Malformed YAML becomes a diagnostic and `None`; I/O failures propagate.
fn read_yaml<T: serde::de::DeserializeOwned>(
    path: &Path,
    diagnostics: &mut Vec<IsaDiagnostic>,
) -> Result<Option<T>, IsaError> {
    let text = fs::read_to_string(path)?;
    match serde_yaml::from_str(&text) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            diagnostics.push(IsaDiagnostic::new(
                DiagnosticPhase::Loading,
                DiagnosticLevel::Error,
                "loading.yaml",
                err.to_string(),
                Some(SourceSpan {
                    path: Some(path.to_path_buf()),
                    ..SourceSpan::default()
                }),
            ));
            Ok(None)
        }
    }
}
