use std::path::Path;

use super::{Validator, span_for};
use crate::loader::isa::schema::{InstructionSource, VariableSource};
use crate::soc::isa::bitfield::BitField;
use crate::soc::isa::diagnostic::SourceSpan;
use crate::soc::isa::instruction::{Encoding, EncodingError, Field, InstructionDef};

impl Validator {
    /// Checks one instruction definition and builds its model. Returns `None` when the
    /// definition produced errors; the diagnostics stay in the validator.
    pub fn validate_instruction(
        &mut self,
        src: &InstructionSource,
        path: Option<&Path>,
    ) -> Option<InstructionDef> {
        let errors_before = self.error_count();
        let span = span_for(&src.name, path);

        if src.name.trim().is_empty() {
            self.push_validation_diagnostic(
                "validation.instruction.name",
                "instruction name may not be empty",
                Some(span.clone()),
            );
        }
        if let Some(first) = self.seen_instructions.get(&src.name) {
            let origin = first
                .as_ref()
                .map(|path| format!(" (first defined in {})", path.display()))
                .unwrap_or_default();
            self.push_validation_diagnostic(
                "validation.instruction.duplicate",
                format!("instruction '{}' is defined more than once{origin}", src.name),
                Some(span.clone()),
            );
        } else {
            self.seen_instructions
                .insert(src.name.clone(), path.map(Path::to_path_buf));
        }

        let mut fields = Vec::with_capacity(src.encoding.variables.len());
        for var in &src.encoding.variables {
            if fields.iter().any(|field: &Field| field.name == var.name) {
                self.push_validation_diagnostic(
                    "validation.field.duplicate",
                    format!("field '{}' is declared twice", var.name),
                    Some(span.clone().with_field(&var.name)),
                );
                continue;
            }
            if let Some(field) = self.build_field(var, &span) {
                fields.push(field);
            }
        }

        if self.error_count() > errors_before {
            return None;
        }

        let encoding = match Encoding::new(&src.encoding.pattern, fields) {
            Ok(encoding) => encoding,
            Err(err) => {
                let span = match err.field() {
                    Some(field) => span.with_field(field),
                    None => span,
                };
                self.push_validation_diagnostic(encoding_code(&err), err.to_string(), Some(span));
                return None;
            }
        };

        let mut instr = InstructionDef::new(src.name.clone(), encoding, src.operation.clone());
        instr.assembly = src.assembly.clone();
        instr.defining_extensions = src
            .defined_by
            .as_ref()
            .map(|defined_by| defined_by.extensions())
            .unwrap_or_default();
        Some(instr)
    }

    fn build_field(&mut self, var: &VariableSource, span: &SourceSpan) -> Option<Field> {
        let location = var.location.to_text();
        let mut placement = match BitField::from_location(&location) {
            Ok(placement) => placement,
            Err(err) => {
                self.push_validation_diagnostic(
                    "validation.field.location",
                    format!("field '{}' location '{location}': {err}", var.name),
                    Some(span.clone().with_field(&var.name)),
                );
                return None;
            }
        };
        placement.signed = var.sign_extend;

        if var.left_shift >= 64 {
            self.push_validation_diagnostic(
                "validation.field.left-shift",
                format!("field '{}' left shift {} is out of range", var.name, var.left_shift),
                Some(span.clone().with_field(&var.name)),
            );
            return None;
        }

        let excluded = var
            .excluded
            .as_ref()
            .map(|excluded| excluded.values())
            .unwrap_or_default();
        Some(
            Field::new(var.name.clone(), placement)
                .with_left_shift(var.left_shift)
                .with_excluded(excluded),
        )
    }
}

fn encoding_code(err: &EncodingError) -> &'static str {
    match err {
        EncodingError::EmptyTemplate
        | EncodingError::TooWide(_)
        | EncodingError::BadTemplateChar { .. } => "validation.encoding.template",
        EncodingError::UncoveredBit { .. } => "validation.encoding.uncovered",
        EncodingError::FieldOutOfBounds { .. } => "validation.field.bounds",
        EncodingError::FieldOverlap { .. } => "validation.field.overlap",
        EncodingError::FieldOnFixedBit { .. } => "validation.field.fixed-bit",
        EncodingError::ExcludedValueTooWide { .. } => "validation.field.excluded",
    }
}
