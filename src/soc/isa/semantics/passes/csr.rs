use super::RewritePass;
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::{
    find_assignment, find_token, find_top_level, is_ident_byte, matching_close,
};

/// CSR access forms, most specific first. Each rule only fires on its own suffix, so running
/// them in this order keeps a generic rule from claiming part of a more specific form.
const RULES: [CsrRule; 7] = [
    CsrRule::Address,
    CsrRule::SoftwareRead,
    CsrRule::SoftwareWrite,
    CsrRule::FieldWrite,
    CsrRule::FieldRead,
    CsrRule::WholeWrite,
    CsrRule::WholeRead,
];

/// Rewrites CSR accesses:
///
/// | source                      | lowered                                        |
/// |-----------------------------|------------------------------------------------|
/// | `CSR[c].address()`          | `c`                                            |
/// | `CSR[c].sw_read()`          | `P_csrr_xreg(env, c)`                          |
/// | `CSR[c].sw_write(v)`        | `P_csrw_xreg(env, c, v)`                       |
/// | `CSR[c].FIELD = v;`         | `P_csrw_field_xreg(env, c, C_FIELD, v);`       |
/// | `CSR[c].FIELD`              | `P_csrr_field_xreg(env, c, C_FIELD)`           |
/// | `CSR[c] = v;`               | `P_csrw_xreg(env, c, v);`                      |
/// | `CSR[c]`                    | `P_csrr_xreg(env, c)`                          |
///
/// `c` is the CSR symbol (dots replaced) when the name is a known CSR.
pub struct CsrPass;

impl RewritePass for CsrPass {
    fn name(&self) -> &'static str {
        "csr"
    }

    fn rewrite_code(&self, code: &str, ctx: &mut LoweringContext<'_>) -> String {
        RULES
            .iter()
            .fold(code.to_string(), |text, rule| rule.apply(&text, ctx))
    }
}

#[derive(Clone, Copy)]
enum CsrRule {
    Address,
    SoftwareRead,
    SoftwareWrite,
    FieldWrite,
    FieldRead,
    WholeWrite,
    WholeRead,
}

/// One `CSR[...]` occurrence.
struct Access<'a> {
    start: usize,
    /// Text inside the brackets, trimmed.
    operand: &'a str,
    /// Byte after the closing bracket.
    after: usize,
}

impl CsrRule {
    fn apply(self, code: &str, ctx: &mut LoweringContext<'_>) -> String {
        let mut out = String::with_capacity(code.len());
        let mut cursor = 0;
        let mut search = 0;
        while let Some(access) = next_access(code, search) {
            search = access.after;
            if let Some((end, replacement)) = self.lower(code, &access, ctx) {
                out.push_str(&code[cursor..access.start]);
                out.push_str(&replacement);
                cursor = end;
                search = end;
            }
        }
        out.push_str(&code[cursor..]);
        out
    }

    /// Replacement text and the end of the consumed source, when this rule matches.
    fn lower(
        self,
        code: &str,
        access: &Access<'_>,
        ctx: &mut LoweringContext<'_>,
    ) -> Option<(usize, String)> {
        let rest = &code[access.after..];
        match self {
            CsrRule::Address => {
                let end = access.after + rest.strip_prefix(".address()").map(|_| 10)?;
                Some((end, csr_symbol(access.operand, ctx)))
            }
            CsrRule::SoftwareRead => {
                let end = access.after + rest.strip_prefix(".sw_read()").map(|_| 10)?;
                let csr = csr_symbol(access.operand, ctx);
                Some((end, format!("{}({}, {csr})", ctx.runtime("csrr_xreg"), ctx.env())))
            }
            CsrRule::SoftwareWrite => {
                let open = access.after + ".sw_write".len();
                if !rest.starts_with(".sw_write(") {
                    return None;
                }
                let close = matching_close(code, open)?;
                let value = code[open + 1..close].trim();
                let csr = csr_symbol(access.operand, ctx);
                Some((
                    close + 1,
                    format!("{}({}, {csr}, {value})", ctx.runtime("csrw_xreg"), ctx.env()),
                ))
            }
            CsrRule::FieldWrite => {
                let (field, field_end) = field_suffix(code, access.after)?;
                let (value, end) = assigned_value(code, field_end)?;
                let csr = csr_symbol(access.operand, ctx);
                let mask = field_symbol(access.operand, field, ctx);
                Some((
                    end,
                    format!(
                        "{}({}, {csr}, {mask}, {value});",
                        ctx.runtime("csrw_field_xreg"),
                        ctx.env()
                    ),
                ))
            }
            CsrRule::FieldRead => {
                let (field, field_end) = field_suffix(code, access.after)?;
                let csr = csr_symbol(access.operand, ctx);
                let mask = field_symbol(access.operand, field, ctx);
                Some((
                    field_end,
                    format!("{}({}, {csr}, {mask})", ctx.runtime("csrr_field_xreg"), ctx.env()),
                ))
            }
            CsrRule::WholeWrite => {
                let (value, end) = assigned_value(code, access.after)?;
                let csr = csr_symbol(access.operand, ctx);
                Some((
                    end,
                    format!("{}({}, {csr}, {value});", ctx.runtime("csrw_xreg"), ctx.env()),
                ))
            }
            CsrRule::WholeRead => {
                if rest.starts_with('.') {
                    return None;
                }
                let csr = csr_symbol(access.operand, ctx);
                Some((
                    access.after,
                    format!("{}({}, {csr})", ctx.runtime("csrr_xreg"), ctx.env()),
                ))
            }
        }
    }
}

fn next_access(code: &str, from: usize) -> Option<Access<'_>> {
    let start = find_token(code, "CSR[", from)?;
    let open = start + 3;
    let close = matching_close(code, open)?;
    Some(Access {
        start,
        operand: code[open + 1..close].trim(),
        after: close + 1,
    })
}

/// `.FIELD` directly after the brackets, where FIELD starts upper case and is not a call.
fn field_suffix(code: &str, after: usize) -> Option<(&str, usize)> {
    let bytes = code.as_bytes();
    if bytes.get(after) != Some(&b'.') || !bytes.get(after + 1)?.is_ascii_uppercase() {
        return None;
    }
    let mut end = after + 1;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    if bytes.get(end) == Some(&b'(') {
        return None;
    }
    Some((&code[after + 1..end], end))
}

/// ` = value;` starting right at `from`. Returns the value and the end past the semicolon.
fn assigned_value(code: &str, from: usize) -> Option<(&str, usize)> {
    let eq = find_assignment(code, from)?;
    if !code[from..eq].trim().is_empty() {
        return None;
    }
    let semi = find_top_level(code, ";", eq + 1)?;
    Some((code[eq + 1..semi].trim(), semi + 1))
}

fn csr_symbol(operand: &str, ctx: &mut LoweringContext<'_>) -> String {
    match ctx.csrs.get(operand) {
        Some(csr) => csr.symbol(),
        None => {
            if operand.contains('.') {
                ctx.warn(
                    "lowering.csr.unknown",
                    format!("CSR '{operand}' is not defined"),
                );
            }
            operand.replace('.', "_")
        }
    }
}

fn field_symbol(operand: &str, field: &str, ctx: &mut LoweringContext<'_>) -> String {
    match ctx.csrs.get(operand) {
        Some(csr) => {
            if csr.field(field).is_none() {
                ctx.warn(
                    "lowering.csr.field",
                    format!("CSR '{}' has no field '{field}'", csr.name),
                );
            }
            csr.field_symbol(field)
        }
        None => format!("{}_{field}", operand.replace('.', "_").to_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::bitfield::BitField;
    use crate::soc::isa::csr::{CsrDef, CsrField, CsrTable};
    use crate::soc::isa::semantics::{LoweringContext, LoweringOptions, LoweringTarget};

    fn lower(text: &str) -> (String, Vec<&'static str>) {
        let csrs: CsrTable = [CsrDef::new("qc.mmcr", 0x7c0).with_field(CsrField {
            name: "MODE".into(),
            location: Some(BitField::from_location("1-0").expect("location")),
            ..CsrField::default()
        })]
        .into_iter()
        .collect();
        let options = LoweringOptions::default();
        let mut ctx = LoweringContext::new(LoweringTarget::Execution, &csrs, &options, None);
        let out = CsrPass.rewrite(text, &mut ctx);
        let codes = ctx.into_diagnostics().iter().map(|d| d.code).collect();
        (out, codes)
    }

    #[test]
    fn every_form_lowers_to_its_own_call() {
        let (out, codes) = lower(
            "a = CSR[qc.mmcr].address();\n\
             b = CSR[qc.mmcr].sw_read();\n\
             CSR[qc.mmcr].sw_write(b + 1);\n\
             CSR[qc.mmcr].MODE = 3;\n\
             c = CSR[qc.mmcr].MODE;\n\
             CSR[qc.mmcr] = c;\n\
             d = CSR[qc.mmcr];",
        );
        assert_eq!(
            out,
            "a = qc_mmcr;\n\
             b = xqci_csrr_xreg(env, qc_mmcr);\n\
             xqci_csrw_xreg(env, qc_mmcr, b + 1);\n\
             xqci_csrw_field_xreg(env, qc_mmcr, QC_MMCR_MODE, 3);\n\
             c = xqci_csrr_field_xreg(env, qc_mmcr, QC_MMCR_MODE);\n\
             xqci_csrw_xreg(env, qc_mmcr, c);\n\
             d = xqci_csrr_xreg(env, qc_mmcr);"
        );
        assert!(codes.is_empty(), "{codes:?}");
    }

    #[test]
    fn comparisons_are_reads_not_writes() {
        let (out, _) = lower("if (CSR[qc.mmcr].MODE == 1) {");
        assert_eq!(out, "if (xqci_csrr_field_xreg(env, qc_mmcr, QC_MMCR_MODE) == 1) {");
    }

    #[test]
    fn dynamic_operands_pass_through() {
        let (out, codes) = lower("X[rd] = CSR[csr + 1];");
        assert_eq!(out, "X[rd] = xqci_csrr_xreg(env, csr + 1);");
        assert!(codes.is_empty());
    }

    #[test]
    fn unknown_csrs_and_fields_are_reported() {
        let (out, codes) = lower("CSR[qc.nope].MODE = 1;\nx = CSR[qc.mmcr].BOGUS;");
        assert_eq!(
            out,
            "xqci_csrw_field_xreg(env, qc_nope, QC_NOPE_MODE, 1);\nx = xqci_csrr_field_xreg(env, qc_mmcr, QC_MMCR_BOGUS);"
        );
        assert_eq!(codes, vec!["lowering.csr.unknown", "lowering.csr.field"]);
    }
}
