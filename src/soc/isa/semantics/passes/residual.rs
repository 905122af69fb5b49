//! Reports source constructs that survived every pass.

use super::registers::next_register_write;
use crate::soc::isa::semantics::scan::{find_token, split_comment};
use crate::soc::isa::semantics::{LoweringContext, LoweringTarget};

/// Triggers that no lowered body may still contain, with what each one means.
const LEFTOVERS: [(&str, &str); 9] = [
    ("$", "sigil"),
    ("`", "widening operator"),
    ("CSR[", "CSR access"),
    ("implemented?(", "extension check"),
    ("raise(", "exception"),
    ("set_mode(", "privilege change"),
    ("jump_halfword(", "halfword jump"),
    ("jump(", "jump"),
    ("'", "sized literal"),
];

pub(crate) fn report(text: &str, ctx: &mut LoweringContext<'_>) {
    for line in text.lines() {
        let (code, _) = split_comment(line);
        let statement = code.trim();
        if statement.is_empty() {
            continue;
        }
        for (trigger, what) in LEFTOVERS {
            if find_token(code, trigger, 0).is_some() {
                ctx.warn(
                    "lowering.residual",
                    format!("unlowered {what} in `{statement}`"),
                );
            }
        }
        if ctx.target == LoweringTarget::Execution && next_register_write(code, 0).is_some() {
            ctx.warn(
                "lowering.residual",
                format!("unlowered register write in `{statement}`"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::csr::CsrTable;
    use crate::soc::isa::semantics::LoweringOptions;

    fn residuals(text: &str, target: LoweringTarget) -> Vec<String> {
        let csrs = CsrTable::new();
        let options = LoweringOptions::default();
        let mut ctx = LoweringContext::new(target, &csrs, &options, Some("t"));
        report(text, &mut ctx);
        ctx.into_diagnostics().into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn clean_text_has_no_residuals() {
        let text =
            "xqci_set_gpr_xreg(rd, to_bits(a));\n// raise(x) in a comment\nxqci_jump(t, 0);\n";
        assert!(residuals(text, LoweringTarget::Execution).is_empty());
    }

    #[test]
    fn leftovers_are_named() {
        let found = residuals("x = a `* b;\nX[rd] = 1;\n", LoweringTarget::Execution);
        assert_eq!(
            found,
            vec![
                "unlowered widening operator in `x = a `* b;`".to_string(),
                "unlowered register write in `X[rd] = 1;`".to_string(),
            ]
        );
        assert!(residuals("X[rd] = 1;", LoweringTarget::Symbolic).is_empty());
    }
}
