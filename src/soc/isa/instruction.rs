//! Validated instruction model: fixed/variable templates, fields, and the per-instruction
//! definition shared by decode synthesis, classification, and lowering.

use std::collections::BTreeSet;
use std::fmt;

use super::bitfield::{BitField, BitRange, width_mask};
use super::error::IsaError;

/// Classification of one template bit. Variable bits point at the owning field by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateBit {
    Zero,
    One,
    Field(usize),
}

impl TemplateBit {
    pub fn fixed(self) -> Option<bool> {
        match self {
            TemplateBit::Zero => Some(false),
            TemplateBit::One => Some(true),
            TemplateBit::Field(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub placement: BitField,
    pub left_shift: u32,
    pub excluded_values: BTreeSet<u64>,
}

impl Field {
    pub fn new(name: impl Into<String>, placement: BitField) -> Self {
        Self {
            name: name.into(),
            placement,
            left_shift: 0,
            excluded_values: BTreeSet::new(),
        }
    }

    pub fn with_left_shift(mut self, shift: u32) -> Self {
        self.left_shift = shift;
        self
    }

    pub fn with_excluded(mut self, values: impl IntoIterator<Item = u64>) -> Self {
        self.excluded_values.extend(values);
        self
    }

    pub fn ranges(&self) -> &[BitRange] {
        &self.placement.ranges
    }

    pub fn width(&self) -> u32 {
        self.placement.total_width()
    }

    pub fn sign_extend(&self) -> bool {
        self.placement.is_signed()
    }

    /// Raw field bits as stored in the encoding (no sign extension, no shift).
    pub fn decode(&self, word: u64) -> u64 {
        self.placement.decode(word)
    }

    /// Value an executing instruction sees: sign-extended when requested, then left-shifted.
    pub fn operand_value(&self, word: u64) -> i64 {
        self.placement.decode_logical(word) << self.left_shift
    }

    /// Converts an operand value back into raw field bits, undoing the left shift.
    pub fn raw_from_operand(&self, value: i64) -> u64 {
        ((value >> self.left_shift) as u64) & width_mask(self.width())
    }

    pub fn is_excluded(&self, raw: u64) -> bool {
        self.excluded_values.contains(&raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    EmptyTemplate,
    TooWide(u32),
    BadTemplateChar { bit: u32, ch: char },
    FieldOutOfBounds { field: String, range: BitRange },
    FieldOverlap { first: String, second: String, bit: u32 },
    FieldOnFixedBit { field: String, bit: u32 },
    UncoveredBit { bit: u32 },
    ExcludedValueTooWide { field: String, value: u64 },
}

impl EncodingError {
    /// Name of the field the error concerns, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            EncodingError::FieldOutOfBounds { field, .. }
            | EncodingError::FieldOnFixedBit { field, .. }
            | EncodingError::ExcludedValueTooWide { field, .. } => Some(field),
            EncodingError::FieldOverlap { second, .. } => Some(second),
            _ => None,
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::EmptyTemplate => write!(f, "match template is empty"),
            EncodingError::TooWide(width) => {
                write!(f, "{width}-bit template exceeds the 64-bit word limit")
            }
            EncodingError::BadTemplateChar { bit, ch } => {
                write!(f, "bit {bit} uses '{ch}', expected '0', '1' or '-'")
            }
            EncodingError::FieldOutOfBounds { field, range } => {
                write!(f, "field '{field}' range {range} lies outside the template")
            }
            EncodingError::FieldOverlap { first, second, bit } => {
                write!(f, "fields '{first}' and '{second}' both claim bit {bit}")
            }
            EncodingError::FieldOnFixedBit { field, bit } => {
                write!(f, "field '{field}' covers fixed bit {bit}")
            }
            EncodingError::UncoveredBit { bit } => {
                write!(f, "variable bit {bit} is not covered by any field")
            }
            EncodingError::ExcludedValueTooWide { field, value } => {
                write!(f, "excluded value {value} does not fit field '{field}'")
            }
        }
    }
}

impl std::error::Error for EncodingError {}

/// Fixed-width encoding. Every variable template bit is owned by exactly one field and every
/// field bit is a variable template bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    bit_width: u32,
    template: Vec<TemplateBit>,
    fields: Vec<Field>,
}

impl Encoding {
    /// Builds an encoding from a `match` string written most significant bit first, using `0`,
    /// `1` and `-` for fixed and variable bits.
    pub fn new(pattern: &str, fields: Vec<Field>) -> Result<Self, EncodingError> {
        let chars: Vec<char> = pattern.trim().chars().collect();
        if chars.is_empty() {
            return Err(EncodingError::EmptyTemplate);
        }
        let bit_width = chars.len() as u32;
        if bit_width > 64 {
            return Err(EncodingError::TooWide(bit_width));
        }

        let mut variable = vec![false; chars.len()];
        let mut template = vec![TemplateBit::Zero; chars.len()];
        for (idx, ch) in chars.iter().enumerate() {
            let bit = bit_width - 1 - idx as u32;
            template[bit as usize] = match ch {
                '0' => TemplateBit::Zero,
                '1' => TemplateBit::One,
                '-' => {
                    variable[bit as usize] = true;
                    TemplateBit::Zero
                }
                other => return Err(EncodingError::BadTemplateChar { bit, ch: *other }),
            };
        }

        let mut owner: Vec<Option<usize>> = vec![None; chars.len()];
        for (field_idx, field) in fields.iter().enumerate() {
            for range in field.ranges() {
                let end = match range.end() {
                    Some(end) if end <= bit_width => end,
                    _ => {
                        return Err(EncodingError::FieldOutOfBounds {
                            field: field.name.clone(),
                            range: *range,
                        });
                    }
                };
                for bit in range.start..end {
                    let slot = bit as usize;
                    if !variable[slot] {
                        return Err(EncodingError::FieldOnFixedBit {
                            field: field.name.clone(),
                            bit,
                        });
                    }
                    if let Some(previous) = owner[slot] {
                        return Err(EncodingError::FieldOverlap {
                            first: fields[previous].name.clone(),
                            second: field.name.clone(),
                            bit,
                        });
                    }
                    owner[slot] = Some(field_idx);
                    template[slot] = TemplateBit::Field(field_idx);
                }
            }
            if let Some(value) = field
                .excluded_values
                .iter()
                .find(|value| **value > field.placement.max_value())
            {
                return Err(EncodingError::ExcludedValueTooWide {
                    field: field.name.clone(),
                    value: *value,
                });
            }
        }

        if let Some(bit) =
            (0..bit_width).find(|bit| variable[*bit as usize] && owner[*bit as usize].is_none())
        {
            return Err(EncodingError::UncoveredBit { bit });
        }

        Ok(Self {
            bit_width,
            template,
            fields,
        })
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Per-bit classification indexed by bit position (bit 0 first).
    pub fn template(&self) -> &[TemplateBit] {
        &self.template
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn bit(&self, bit: u32) -> TemplateBit {
        self.template[bit as usize]
    }

    /// Positions with a required literal value.
    pub fn fixed_mask(&self) -> u64 {
        self.template
            .iter()
            .enumerate()
            .filter(|(_, bit)| bit.fixed().is_some())
            .fold(0u64, |acc, (idx, _)| acc | (1u64 << idx))
    }

    /// Template value with every variable position coerced to zero.
    pub fn fixed_value(&self) -> u64 {
        self.template
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit == TemplateBit::One)
            .fold(0u64, |acc, (idx, _)| acc | (1u64 << idx))
    }

    pub fn fixed_bit_count(&self) -> u32 {
        self.fixed_mask().count_ones()
    }

    pub fn matches(&self, word: u64) -> bool {
        word & self.fixed_mask() == self.fixed_value()
    }

    /// Two templates are compatible when no position holds a fixed 1 in one and a fixed 0 in
    /// the other. Compatible templates cannot be told apart by fixed bits alone.
    pub fn compatible_with(&self, other: &Encoding) -> bool {
        if self.bit_width != other.bit_width {
            return false;
        }
        let shared = self.fixed_mask() & other.fixed_mask();
        (self.fixed_value() ^ other.fixed_value()) & shared == 0
    }

    /// Same fixed positions holding the same values.
    pub fn same_template(&self, other: &Encoding) -> bool {
        self.bit_width == other.bit_width
            && self.fixed_mask() == other.fixed_mask()
            && self.fixed_value() == other.fixed_value()
    }

    /// Renders the template back into its `0`/`1`/`-` form, most significant bit first.
    pub fn pattern(&self) -> String {
        (0..self.bit_width)
            .rev()
            .map(|bit| match self.bit(bit) {
                TemplateBit::Zero => '0',
                TemplateBit::One => '1',
                TemplateBit::Field(_) => '-',
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDef {
    pub name: String,
    pub encoding: Encoding,
    pub semantics: String,
    pub assembly: Option<String>,
    pub defining_extensions: Vec<String>,
}

impl InstructionDef {
    pub fn new(name: impl Into<String>, encoding: Encoding, semantics: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoding,
            semantics: semantics.into(),
            assembly: None,
            defining_extensions: Vec::new(),
        }
    }

    /// Identifier form of the name used by every emitted artifact.
    pub fn symbol(&self) -> String {
        symbol_name(&self.name)
    }

    pub fn bit_width(&self) -> u32 {
        self.encoding.bit_width()
    }

    pub fn fields(&self) -> &[Field] {
        self.encoding.fields()
    }

    /// Assembles an instruction word from one operand per field, in declaration order. Operands
    /// are the values the instruction sees, so left-shifted fields take the shifted value.
    pub fn assemble(&self, operands: &[i64]) -> Result<u64, IsaError> {
        let fields = self.encoding.fields();
        if operands.len() != fields.len() {
            return Err(IsaError::OperandCount {
                instruction: self.name.clone(),
                expected: fields.len(),
                got: operands.len(),
            });
        }
        let mut word = self.encoding.fixed_value();
        for (field, operand) in fields.iter().zip(operands) {
            let raw = field.raw_from_operand(*operand);
            if field.is_excluded(raw) {
                return Err(IsaError::ExcludedOperand {
                    instruction: self.name.clone(),
                    field: field.name.clone(),
                    value: raw,
                });
            }
            word = field.placement.encode(raw, word);
        }
        Ok(word)
    }

    /// Little-endian byte image of an assembled word.
    pub fn encode_bytes(&self, word: u64) -> Vec<u8> {
        let bytes = self.bit_width().div_ceil(8) as usize;
        word.to_le_bytes()[..bytes].to_vec()
    }

    /// Operand values carried by `word`, in field declaration order.
    pub fn operands(&self, word: u64) -> Vec<(&str, i64)> {
        self.encoding
            .fields()
            .iter()
            .map(|field| (field.name.as_str(), field.operand_value(word)))
            .collect()
    }
}

pub fn symbol_name(name: &str) -> String {
    name.replace('.', "_")
}
