use std::path::Path;

use super::Validator;
use crate::loader::isa::literals::parse_numeric_literal;
use crate::loader::isa::schema::{CsrAddress, CsrFieldSource, CsrSource, Location};
use crate::soc::isa::bitfield::BitField;
use crate::soc::isa::csr::{CsrDef, CsrField};
use crate::soc::isa::diagnostic::SourceSpan;

/// CSR numbers occupy a 12-bit space.
const CSR_ADDRESS_LIMIT: u64 = 0xfff;

impl Validator {
    pub fn validate_csr(&mut self, src: &CsrSource, path: Option<&Path>) -> Option<CsrDef> {
        let errors_before = self.error_count();
        let mut span = SourceSpan::instruction(&src.name);
        if let Some(path) = path {
            span = span.with_path(path);
        }

        if !self.seen_csrs.insert(src.name.clone()) {
            self.push_validation_diagnostic(
                "validation.csr.duplicate",
                format!("CSR '{}' is defined more than once", src.name),
                Some(span.clone()),
            );
        }

        let address = match &src.address {
            CsrAddress::Number(value) => Ok(u64::from(*value)),
            CsrAddress::Text(text) => parse_numeric_literal(text),
        };
        let address = match address {
            Ok(value) if value <= CSR_ADDRESS_LIMIT => value as u32,
            Ok(value) => {
                self.push_validation_diagnostic(
                    "validation.csr.address",
                    format!("CSR '{}' address {value:#x} exceeds {CSR_ADDRESS_LIMIT:#x}", src.name),
                    Some(span.clone()),
                );
                0
            }
            Err(reason) => {
                self.push_validation_diagnostic(
                    "validation.csr.address",
                    format!("CSR '{}' address: {reason}", src.name),
                    Some(span.clone()),
                );
                0
            }
        };

        let mut csr = CsrDef::new(src.name.clone(), address);
        for (name, field_src) in &src.fields {
            if let Some(field) = self.build_csr_field(name, field_src, &span) {
                csr = csr.with_field(field);
            }
        }

        (self.error_count() == errors_before).then_some(csr)
    }

    fn build_csr_field(
        &mut self,
        name: &str,
        src: &CsrFieldSource,
        span: &SourceSpan,
    ) -> Option<CsrField> {
        if src.location.is_none() && src.location_rv32.is_none() && src.location_rv64.is_none() {
            self.push_validation_diagnostic(
                "validation.csr.field-location",
                format!("field '{name}' has no location"),
                Some(span.clone().with_field(name)),
            );
            return None;
        }
        let field = CsrField {
            name: name.to_string(),
            location: self.csr_location(name, src.location.as_ref(), span),
            location_rv32: self.csr_location(name, src.location_rv32.as_ref(), span),
            location_rv64: self.csr_location(name, src.location_rv64.as_ref(), span),
        };
        Some(field)
    }

    fn csr_location(
        &mut self,
        name: &str,
        location: Option<&Location>,
        span: &SourceSpan,
    ) -> Option<BitField> {
        let text = location?.to_text();
        match BitField::from_location(&text) {
            Ok(field) => Some(field),
            Err(err) => {
                self.push_validation_diagnostic(
                    "validation.csr.field-location",
                    format!("field '{name}' location '{text}': {err}"),
                    Some(span.clone().with_field(name)),
                );
                None
            }
        }
    }
}
