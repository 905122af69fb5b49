//! Semantics lowering: rewrites an instruction's pseudocode into calls against the runtime
//! vocabulary through an ordered list of rewrite passes. Pass order matters because several
//! patterns are textual prefixes of later, more general ones.

pub mod passes;
pub mod scan;

use std::fmt;
use std::fmt::Write as _;

use tracing::{debug, warn};

use super::bitfield::storage_bits;
use super::catalog::Catalog;
use super::classify::{FieldKind, classify_instruction};
use super::csr::CsrTable;
use super::diagnostic::{DiagnosticLevel, DiagnosticPhase, IsaDiagnostic, SourceSpan};
use super::instruction::InstructionDef;

pub use passes::{RewritePass, pipeline};

/// Selects how register writes and side-effecting primitives are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoweringTarget {
    /// Register writes go through the register-file mutator for later code generation.
    #[default]
    Execution,
    /// Registers stay directly assignable and jumps/memory accesses use traced variants.
    Symbolic,
}

impl fmt::Display for LoweringTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoweringTarget::Execution => f.write_str("execution"),
            LoweringTarget::Symbolic => f.write_str("symbolic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweringOptions {
    /// Prefix of runtime entry points (`xqci` gives `xqci_jump`, `xqci_csrr_xreg`, ...).
    pub runtime_prefix: String,
    /// Name of the CPU-state argument passed to CSR accessors.
    pub env_arg: String,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            runtime_prefix: "xqci".to_string(),
            env_arg: "env".to_string(),
        }
    }
}

/// State visible to every pass while lowering one body.
pub struct LoweringContext<'a> {
    pub target: LoweringTarget,
    pub csrs: &'a CsrTable,
    pub options: &'a LoweringOptions,
    pub instruction: Option<&'a str>,
    diagnostics: Vec<IsaDiagnostic>,
}

impl<'a> LoweringContext<'a> {
    pub fn new(
        target: LoweringTarget,
        csrs: &'a CsrTable,
        options: &'a LoweringOptions,
        instruction: Option<&'a str>,
    ) -> Self {
        Self {
            target,
            csrs,
            options,
            instruction,
            diagnostics: Vec::new(),
        }
    }

    /// Runtime entry point name carrying the configured prefix.
    pub fn runtime(&self, name: &str) -> String {
        if self.options.runtime_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{name}", self.options.runtime_prefix)
        }
    }

    pub fn env(&self) -> &str {
        &self.options.env_arg
    }

    pub fn warn(&mut self, code: &'static str, message: impl Into<String>) {
        let message = message.into();
        let span = self.instruction.map(SourceSpan::instruction);
        if self.diagnostics.iter().any(|d| d.code == code && d.message == message) {
            return;
        }
        self.diagnostics.push(IsaDiagnostic::new(
            DiagnosticPhase::Lowering,
            DiagnosticLevel::Warning,
            code,
            message,
            span,
        ));
    }

    pub fn into_diagnostics(self) -> Vec<IsaDiagnostic> {
        self.diagnostics
    }
}

/// Lowered text plus the gaps found while lowering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    pub text: String,
    pub diagnostics: Vec<IsaDiagnostic>,
}

/// Lowers `text` with the default runtime vocabulary.
pub fn lower(text: &str, csrs: &CsrTable, target: LoweringTarget) -> Lowered {
    Lowerer::new(csrs, LoweringOptions::default()).lower_text(text, target, None)
}

/// Runs the pass pipeline. Construct once and reuse across instructions.
pub struct Lowerer<'a> {
    csrs: &'a CsrTable,
    options: LoweringOptions,
    passes: Vec<Box<dyn RewritePass>>,
}

impl<'a> Lowerer<'a> {
    pub fn new(csrs: &'a CsrTable, options: LoweringOptions) -> Self {
        Self {
            csrs,
            options,
            passes: pipeline(),
        }
    }

    pub fn options(&self) -> &LoweringOptions {
        &self.options
    }

    pub fn lower_text(
        &self,
        text: &str,
        target: LoweringTarget,
        instruction: Option<&str>,
    ) -> Lowered {
        let mut ctx = LoweringContext::new(target, self.csrs, &self.options, instruction);
        let mut current = text.to_string();
        for pass in &self.passes {
            if !pass.applies_to(target) {
                continue;
            }
            current = pass.rewrite(&current, &mut ctx);
        }
        passes::residual::report(&current, &mut ctx);

        let diagnostics = ctx.into_diagnostics();
        for diag in &diagnostics {
            warn!(
                instruction = instruction.unwrap_or("<text>"),
                code = diag.code,
                "{}",
                diag.message
            );
        }
        Lowered {
            text: current,
            diagnostics,
        }
    }

    pub fn lower_instruction(
        &self,
        instr: &InstructionDef,
        target: LoweringTarget,
    ) -> LoweredInstruction {
        let lowered = self.lower_text(&instr.semantics, target, Some(instr.name.as_str()));
        let params = classify_instruction(instr)
            .into_iter()
            .zip(instr.fields())
            .map(|((name, kind), field)| LoweredParam {
                name: name.to_string(),
                kind,
                width: field.width(),
                left_shift: field.left_shift,
            })
            .collect();
        debug!(instruction = %instr.name, %target, "lowered semantics");
        LoweredInstruction {
            name: instr.name.clone(),
            symbol: instr.symbol(),
            target,
            params,
            body: lowered.text,
            diagnostics: lowered.diagnostics,
        }
    }

    /// Lowers every lowerable instruction of `catalog`, in name order.
    pub fn lower_catalog(
        &self,
        catalog: &Catalog,
        target: LoweringTarget,
    ) -> Vec<LoweredInstruction> {
        catalog
            .lowerable()
            .map(|instr| self.lower_instruction(instr, target))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredParam {
    pub name: String,
    pub kind: FieldKind,
    pub width: u32,
    /// Encoded bits dropped from the operand; restored on function entry.
    pub left_shift: u32,
}

impl LoweredParam {
    /// Immediates travel as bit vectors wide enough for the shifted operand, register indices
    /// as host integers.
    pub fn c_type(&self) -> String {
        match self.kind {
            FieldKind::Immediate => format!("Bits<{}>", self.width + self.left_shift),
            FieldKind::Register | FieldKind::CompressedRegister => {
                format!("uint{}_t", storage_bits(self.width))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredInstruction {
    pub name: String,
    pub symbol: String,
    pub target: LoweringTarget,
    pub params: Vec<LoweredParam>,
    pub body: String,
    pub diagnostics: Vec<IsaDiagnostic>,
}

impl LoweredInstruction {
    pub fn render_function(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|param| format!("{} {}", param.c_type(), param.name))
            .collect();
        let mut out = String::new();
        let _ = writeln!(out, "void {}({}) {{", self.symbol, params.join(", "));
        for param in self.params.iter().filter(|param| param.left_shift > 0) {
            let _ = writeln!(
                out,
                "    {name} = {name} << {shift};",
                name = param.name,
                shift = param.left_shift
            );
        }
        for line in self.body.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "    {line}");
            }
        }
        out.push_str("}\n");
        out
    }
}
