//! Decodetree text rendering: field-position macros, per-instruction format lines, and the
//! `{ ... }` blocks that group ambiguous instructions.

use std::fmt;
use std::fmt::Write as _;

use crate::soc::isa::bitfield::BitRange;
use crate::soc::isa::instruction::{Field, InstructionDef, TemplateBit};

use super::{DecodeEntry, DecodeTable};

/// Named extraction recipe for one field, with ranges already normalized to the container.
/// Structurally identical fields share one macro because the name encodes every range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMacro {
    pub name: String,
    pub ranges: Vec<BitRange>,
    pub signed: bool,
}

impl FieldMacro {
    pub fn for_field(field: &Field, signed: bool, shift: u32) -> Self {
        let ranges: Vec<BitRange> = field
            .ranges()
            .iter()
            .map(|range| range.shifted(shift))
            .collect();
        let mut name = field.name.clone();
        for (idx, range) in ranges.iter().enumerate() {
            let sign = if signed && idx == 0 { "s" } else { "" };
            let _ = write!(name, "_{}_{sign}{}", range.start, range.length);
        }
        Self {
            name,
            ranges,
            signed,
        }
    }
}

impl fmt::Display for FieldMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.name)?;
        for (idx, range) in self.ranges.iter().enumerate() {
            let sign = if self.signed && idx == 0 { "s" } else { "" };
            write!(f, " {}:{sign}{}", range.start, range.length)?;
        }
        Ok(())
    }
}

/// One decodetree pattern line: instruction symbol, bit pattern and field bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatLine {
    pub instruction: String,
    pub pattern: String,
    pub bindings: Vec<(String, String)>,
}

impl fmt::Display for FormatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.instruction, self.pattern)?;
        for (field, macro_name) in &self.bindings {
            write!(f, " {field}=%{macro_name}")?;
        }
        Ok(())
    }
}

/// A field is emitted signed when declared `sign_extend` or read through `$signed(name)`.
pub fn field_is_signed(instr: &InstructionDef, field: &Field) -> bool {
    field.sign_extend() || instr.semantics.contains(&format!("$signed({})", field.name))
}

/// Renders the template most significant bit first, fixed runs literally and variable runs as
/// dots, each run separated by a space.
pub fn render_pattern(instr: &InstructionDef) -> String {
    let encoding = &instr.encoding;
    let mut runs: Vec<String> = Vec::new();
    let mut last_variable: Option<bool> = None;
    for bit in (0..encoding.bit_width()).rev() {
        let (ch, variable) = match encoding.bit(bit) {
            TemplateBit::Zero => ('0', false),
            TemplateBit::One => ('1', false),
            TemplateBit::Field(_) => ('.', true),
        };
        match runs.last_mut() {
            Some(run) if last_variable == Some(variable) => run.push(ch),
            _ => runs.push(ch.to_string()),
        }
        last_variable = Some(variable);
    }
    runs.join(" ")
}

impl DecodeTable {
    /// Decodetree input for this width: macros first, then grouped and plain format lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for mac in self.macros() {
            let _ = writeln!(out, "{mac}");
        }
        for entry in self.entries() {
            match entry {
                DecodeEntry::Single(line) => {
                    let _ = writeln!(out, "{line}");
                }
                DecodeEntry::Group { members, .. } => {
                    out.push_str("{\n");
                    for line in members {
                        let _ = writeln!(out, "  {line}");
                    }
                    out.push_str("}\n");
                }
            }
        }
        out
    }

    /// Dispatch switches of every group, each headed by a comment naming its members.
    pub fn render_switches(&self) -> String {
        let mut out = String::new();
        for entry in self.entries() {
            if let DecodeEntry::Group { members, dispatch } = entry {
                let names: Vec<&str> = members
                    .iter()
                    .map(|line| line.instruction.as_str())
                    .collect();
                let _ = writeln!(out, "// group: {}", names.join(", "));
                out.push_str(&dispatch.render_switch());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::validator::test_support::{LOAD_WORD_YAML, synthetic, validate_yaml};

    #[test]
    fn pattern_separates_fixed_and_variable_runs() {
        let lw = validate_yaml(LOAD_WORD_YAML).expect("lw");
        assert_eq!(render_pattern(&lw), "................. 010 ..... 0000011");
        assert_eq!(render_pattern(&synthetic("x", "1-0")), "1 . 0");
    }

    #[test]
    fn macros_encode_ranges_and_sign() {
        let lw = validate_yaml(LOAD_WORD_YAML).expect("lw");
        let imm = lw.encoding.field("imm").expect("imm");
        let mac = FieldMacro::for_field(imm, field_is_signed(&lw, imm), 0);
        assert_eq!(mac.name, "imm_20_s12");
        assert_eq!(mac.to_string(), "%imm_20_s12 20:s12");

        let rd = lw.encoding.field("rd").expect("rd");
        let mac = FieldMacro::for_field(rd, field_is_signed(&lw, rd), 16);
        assert_eq!(mac.to_string(), "%rd_23_5 23:5", "ranges move into the container");
    }

    #[test]
    fn signed_reads_mark_the_macro_signed() {
        let mut instr = synthetic("x", "----0000");
        instr.semantics = "X[1] = $signed(f4);".into();
        let field = &instr.fields()[0];
        assert!(field_is_signed(&instr, field));
        assert_eq!(FieldMacro::for_field(field, true, 0).to_string(), "%f4_4_s4 4:s4");
    }
}
