//! Textual field classification: decides from an instruction's semantics whether a field indexes
//! the register file, indexes the compressed register window, or is an immediate.

use std::fmt;

use ahash::AHashSet;

use super::instruction::InstructionDef;

/// Fields that name registers only implicitly, so they never appear inside an indexing idiom.
const IMPLICIT_REGISTER_FIELDS: [&str; 2] = ["r1s", "r2s"];

/// Register number offset of the compressed window (x8..x15).
pub const COMPRESSED_WINDOW_BASE: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Immediate,
    Register,
    CompressedRegister,
}

impl FieldKind {
    pub fn is_register(self) -> bool {
        !matches!(self, FieldKind::Immediate)
    }

    /// Register number selected by a raw field value.
    pub fn register_number(self, raw: u64) -> Option<u64> {
        match self {
            FieldKind::Immediate => None,
            FieldKind::Register => Some(raw),
            FieldKind::CompressedRegister => Some(raw | COMPRESSED_WINDOW_BASE),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldKind::Immediate => "immediate",
            FieldKind::Register => "register",
            FieldKind::CompressedRegister => "compressed-register",
        };
        f.write_str(label)
    }
}

/// Classifies `name` against the semantics `text` of its owning instruction.
pub fn classify_field(name: &str, text: &str) -> FieldKind {
    IndexingIdioms::scan(text).classify(name)
}

/// Classifies every field of `instr`, in declaration order.
pub fn classify_instruction(instr: &InstructionDef) -> Vec<(&str, FieldKind)> {
    let idioms = IndexingIdioms::scan(&instr.semantics);
    instr
        .fields()
        .iter()
        .map(|field| (field.name.as_str(), idioms.classify(&field.name)))
        .collect()
}

/// The bracketed arguments of every `X[...]` and `creg2reg(...)` occurrence in a semantics body,
/// with whitespace removed so `X[ rd + 8 ]` and `X[rd+8]` compare equal.
#[derive(Default)]
struct IndexingIdioms {
    register_file: AHashSet<String>,
    creg2reg: AHashSet<String>,
}

impl IndexingIdioms {
    fn scan(text: &str) -> Self {
        let mut idioms = Self::default();
        collect_arguments(text, "X[", ']', &mut idioms.register_file);
        collect_arguments(text, "creg2reg(", ')', &mut idioms.creg2reg);
        idioms
    }

    fn classify(&self, name: &str) -> FieldKind {
        let windowed = format!("{name}+8");
        if self.register_file.contains(&windowed) || self.creg2reg.contains(name) {
            return FieldKind::CompressedRegister;
        }
        if self.register_file.contains(name)
            || self.creg2reg.contains(&windowed)
            || IMPLICIT_REGISTER_FIELDS.contains(&name)
        {
            return FieldKind::Register;
        }
        FieldKind::Immediate
    }
}

fn collect_arguments(text: &str, opener: &str, closer: char, out: &mut AHashSet<String>) {
    let mut rest = text;
    while let Some(pos) = rest.find(opener) {
        let preceded_by_ident = rest[..pos]
            .chars()
            .next_back()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        rest = &rest[pos + opener.len()..];
        if preceded_by_ident {
            continue;
        }
        if let Some(end) = rest.find(closer) {
            let arg: String = rest[..end].chars().filter(|ch| !ch.is_whitespace()).collect();
            out.insert(arg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_indexing_is_a_register() {
        let text = "X[rd] = X[rs1] + imm;";
        assert_eq!(classify_field("rd", text), FieldKind::Register);
        assert_eq!(classify_field("rs1", text), FieldKind::Register);
        assert_eq!(classify_field("imm", text), FieldKind::Immediate);
    }

    #[test]
    fn window_offset_wins_over_plain_indexing() {
        let text = "X[rd+8] = X[rd] + 1;";
        assert_eq!(classify_field("rd", text), FieldKind::CompressedRegister);
        let text = "X[creg2reg(rs1)] = 0;";
        assert_eq!(classify_field("rs1", text), FieldKind::CompressedRegister);
    }

    #[test]
    fn creg2reg_of_an_offset_name_is_a_plain_register() {
        assert_eq!(
            classify_field("rs2", "X[1] = creg2reg(rs2+8);"),
            FieldKind::Register
        );
    }

    #[test]
    fn implicit_operands_are_registers() {
        assert_eq!(classify_field("r1s", "XReg a = 0;"), FieldKind::Register);
        assert_eq!(classify_field("r2s", ""), FieldKind::Register);
    }

    #[test]
    fn names_inside_longer_identifiers_do_not_match() {
        let text = "X[rd] = X[rdx];";
        assert_eq!(classify_field("rdx", text), FieldKind::Register);
        assert_eq!(classify_field("x", "MX[x] = 0;"), FieldKind::Immediate);
    }

    #[test]
    fn compressed_registers_map_into_the_window() {
        assert_eq!(FieldKind::CompressedRegister.register_number(0), Some(8));
        assert_eq!(FieldKind::CompressedRegister.register_number(7), Some(15));
        assert_eq!(FieldKind::Register.register_number(3), Some(3));
        assert_eq!(FieldKind::Immediate.register_number(3), None);
    }
}
