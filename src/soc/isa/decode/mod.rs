//! Decode-table synthesis. Instructions are bucketed by width; within a bucket, instructions
//! whose fixed bits overlap are clustered and given a field-value dispatch, everything else gets
//! a plain format line.

pub mod cluster;
pub mod dispatch;
pub mod format;

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, error, info};

use super::bitfield::next_power_of_two;
use super::catalog::Catalog;
use super::diagnostic::{DiagnosticLevel, DiagnosticPhase, IsaDiagnostic};
use super::error::IsaError;
use super::instruction::InstructionDef;

pub use cluster::ClusterStrategy;
pub use dispatch::DispatchNode;
pub use format::{FieldMacro, FormatLine};

#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesisOptions {
    pub strategy: ClusterStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEntry {
    Single(FormatLine),
    Group {
        members: Vec<FormatLine>,
        dispatch: DispatchNode,
    },
}

/// Hard decode errors found while building a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeIssue {
    DuplicateTemplate { first: String, second: String },
    UnresolvedAmbiguity { candidates: Vec<String> },
}

impl DecodeIssue {
    pub fn to_error(&self, width: u32) -> IsaError {
        match self {
            DecodeIssue::DuplicateTemplate { first, second } => IsaError::DuplicateTemplate {
                width,
                first: first.clone(),
                second: second.clone(),
            },
            DecodeIssue::UnresolvedAmbiguity { candidates } => IsaError::UnresolvedAmbiguity {
                width,
                candidates: candidates.clone(),
            },
        }
    }

    pub fn to_diagnostic(&self, width: u32) -> IsaDiagnostic {
        let code = match self {
            DecodeIssue::DuplicateTemplate { .. } => "decode.template.duplicate",
            DecodeIssue::UnresolvedAmbiguity { .. } => "decode.ambiguity.unresolved",
        };
        IsaDiagnostic::new(
            DiagnosticPhase::Decode,
            DiagnosticLevel::Error,
            code,
            self.to_error(width).to_string(),
            None,
        )
    }
}

/// Decode table for one instruction width.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    width: u32,
    container_bits: u32,
    macros: Vec<FieldMacro>,
    macro_index: AHashMap<String, usize>,
    entries: Vec<DecodeEntry>,
    issues: Vec<DecodeIssue>,
}

impl DecodeTable {
    /// Builds the table for `instrs`, which must all be `width` bits wide. Problems are recorded
    /// as issues rather than aborting so the table can still be rendered.
    pub fn build(width: u32, instrs: &[&InstructionDef], options: &SynthesisOptions) -> Self {
        let container_bits = next_power_of_two(width);
        let mut table = Self {
            width,
            container_bits,
            macros: Vec::new(),
            macro_index: AHashMap::new(),
            entries: Vec::new(),
            issues: Vec::new(),
        };

        for (a, b) in cluster::duplicate_pairs(instrs) {
            error!(
                width,
                first = %instrs[a].name,
                second = %instrs[b].name,
                "identical decode templates"
            );
            table.issues.push(DecodeIssue::DuplicateTemplate {
                first: instrs[a].name.clone(),
                second: instrs[b].name.clone(),
            });
        }

        let clusters = cluster::cluster(instrs, options.strategy);
        let mut grouped: AHashSet<String> = AHashSet::new();
        for members in &clusters {
            let mut members: Vec<&InstructionDef> =
                members.iter().map(|idx| instrs[*idx]).collect();
            // Most specific pattern first so decodetree tries it before the looser ones.
            members.sort_by(|a, b| {
                b.encoding
                    .fixed_bit_count()
                    .cmp(&a.encoding.fixed_bit_count())
                    .then_with(|| a.name.cmp(&b.name))
            });
            grouped.extend(members.iter().map(|instr| instr.name.clone()));

            let dispatch = dispatch::build_dispatch(&members);
            for candidates in dispatch.unresolved() {
                if !all_duplicates(candidates, &members) {
                    error!(width, candidates = ?candidates, "unresolved decode ambiguity");
                    table.issues.push(DecodeIssue::UnresolvedAmbiguity {
                        candidates: candidates.to_vec(),
                    });
                }
            }
            let lines = members.iter().map(|instr| table.format_line(instr)).collect();
            table.entries.push(DecodeEntry::Group {
                members: lines,
                dispatch,
            });
        }

        for instr in instrs {
            if !grouped.contains(&instr.name) {
                let line = table.format_line(instr);
                table.entries.push(DecodeEntry::Single(line));
            }
        }

        debug!(
            width,
            container_bits,
            macros = table.macros.len(),
            groups = clusters.len(),
            "built decode table"
        );
        table
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn container_bits(&self) -> u32 {
        self.container_bits
    }

    pub fn macros(&self) -> &[FieldMacro] {
        &self.macros
    }

    pub fn entries(&self) -> &[DecodeEntry] {
        &self.entries
    }

    pub fn issues(&self) -> &[DecodeIssue] {
        &self.issues
    }

    /// Fails on the recorded issue, or with every issue as diagnostics when there are several.
    pub fn ensure_resolved(&self) -> Result<(), IsaError> {
        match self.issues.as_slice() {
            [] => Ok(()),
            [issue] => Err(issue.to_error(self.width)),
            issues => Err(IsaError::Diagnostics {
                phase: DiagnosticPhase::Decode,
                diagnostics: issues
                    .iter()
                    .map(|issue| issue.to_diagnostic(self.width))
                    .collect(),
            }),
        }
    }

    fn format_line(&mut self, instr: &InstructionDef) -> FormatLine {
        let shift = self.container_bits - self.width;
        let bindings = instr
            .fields()
            .iter()
            .map(|field| {
                let signed = format::field_is_signed(instr, field);
                let name = self.intern(FieldMacro::for_field(field, signed, shift));
                (field.name.clone(), name)
            })
            .collect();
        FormatLine {
            instruction: instr.symbol(),
            pattern: format::render_pattern(instr),
            bindings,
        }
    }

    fn intern(&mut self, mac: FieldMacro) -> String {
        let name = mac.name.clone();
        if !self.macro_index.contains_key(&name) {
            self.macro_index.insert(name.clone(), self.macros.len());
            self.macros.push(mac);
        }
        name
    }
}

fn all_duplicates(candidates: &[String], members: &[&InstructionDef]) -> bool {
    let defs: Vec<&InstructionDef> = candidates
        .iter()
        .filter_map(|name| members.iter().find(|instr| instr.name == *name).copied())
        .collect();
    match defs.split_first() {
        Some((first, rest)) => rest
            .iter()
            .all(|other| other.encoding.same_template(&first.encoding)),
        None => false,
    }
}

/// Builds one table per width without failing on decode issues.
pub fn synthesize_tables(
    catalog: &Catalog,
    options: &SynthesisOptions,
) -> BTreeMap<u32, DecodeTable> {
    let tables: BTreeMap<u32, DecodeTable> = catalog
        .by_width()
        .into_iter()
        .map(|(width, instrs)| (width, DecodeTable::build(width, &instrs, options)))
        .collect();
    info!(widths = tables.len(), "synthesized decode tables");
    tables
}

/// Builds every table and fails if any of them carries a decode issue.
pub fn synthesize(
    catalog: &Catalog,
    options: &SynthesisOptions,
) -> Result<BTreeMap<u32, DecodeTable>, IsaError> {
    let tables = synthesize_tables(catalog, options);
    let mut failures: Vec<IsaError> = tables
        .values()
        .filter_map(|table| table.ensure_resolved().err())
        .collect();
    match failures.len() {
        0 => Ok(tables),
        1 => Err(failures.remove(0)),
        _ => Err(IsaError::Diagnostics {
            phase: DiagnosticPhase::Decode,
            diagnostics: tables
                .values()
                .flat_map(|table| {
                    table
                        .issues()
                        .iter()
                        .map(|issue| issue.to_diagnostic(table.width()))
                })
                .collect(),
        }),
    }
}
