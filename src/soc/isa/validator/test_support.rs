use crate::loader::isa::schema::{CsrSource, InstructionSource};
use crate::soc::isa::bitfield::BitField;
use crate::soc::isa::csr::CsrDef;
use crate::soc::isa::error::IsaError;
use crate::soc::isa::instruction::{Encoding, Field, InstructionDef};

use super::Validator;

pub(crate) const LOAD_WORD_YAML: &str = r#"
name: lw
definedBy: I
assembly: xd, imm(xs1)
encoding:
  match: "-----------------010-----0000011"
  variables:
    - name: imm
      location: 31-20
      sign_extend: true
    - name: rd
      location: 11-7
      not: 0
    - name: rs1
      location: 19-15
operation(): |
  XReg virtual_address = X[rs1] + $signed(imm);
  X[rd] = read_memory<32>(virtual_address, $encoding);
"#;

pub(crate) fn validate_yaml(yaml: &str) -> Result<InstructionDef, IsaError> {
    let src: InstructionSource = serde_yaml::from_str(yaml)?;
    let mut validator = Validator::new();
    let instr = validator.validate_instruction(&src, None);
    validator.finish()?;
    instr.ok_or_else(|| IsaError::Validation(format!("'{}' produced no model", src.name)))
}

pub(crate) fn validate_csr_yaml(yaml: &str) -> Result<CsrDef, IsaError> {
    let src: CsrSource = serde_yaml::from_str(yaml)?;
    let mut validator = Validator::new();
    let csr = validator.validate_csr(&src, None);
    validator.finish()?;
    csr.ok_or_else(|| IsaError::Validation(format!("'{}' produced no model", src.name)))
}

pub(crate) fn expect_validation_diag(err: IsaError, needle: &str) {
    match err {
        IsaError::Diagnostics { diagnostics, .. } => {
            assert!(
                diagnostics.iter().any(|diag| diag.message.contains(needle)),
                "expected diagnostic containing '{needle}', got {diagnostics:?}"
            );
        }
        other => panic!("expected diagnostics error, got {other:?}"),
    }
}

/// Builds an instruction from a `0`/`1`/`-` pattern, giving every run of `-` its own field named
/// after the run's lowest bit (`f0`, `f4`, ...).
pub(crate) fn synthetic(name: &str, pattern: &str) -> InstructionDef {
    let width = pattern.len() as u32;
    let mut fields = Vec::new();
    let mut run_end: Option<u32> = None;
    for (idx, ch) in pattern.chars().enumerate() {
        let bit = width - 1 - idx as u32;
        match (ch, run_end) {
            ('-', None) => run_end = Some(bit),
            ('-', Some(_)) => {}
            (_, Some(msb)) => {
                fields.push(run_field(msb, bit + 1));
                run_end = None;
            }
            (_, None) => {}
        }
        if bit == 0
            && let Some(msb) = run_end
        {
            fields.push(run_field(msb, 0));
        }
    }
    let encoding = Encoding::new(pattern, fields).expect("synthetic encoding");
    InstructionDef::new(name, encoding, "")
}

fn run_field(msb: u32, lsb: u32) -> Field {
    Field::new(format!("f{lsb}"), BitField::from_range(lsb, msb - lsb + 1))
}
