use super::RewritePass;
use crate::soc::isa::semantics::scan::{
    find_assignment, find_token, find_top_level, is_ident_byte, matching_close, prev_non_space,
};
use crate::soc::isa::semantics::{LoweringContext, LoweringTarget};

/// Statement-level register writes `X[idx] = value;` become `P_set_gpr_xreg(idx, value);` for
/// the execution target. Writes to part of a register are reported and left as written.
pub struct RegistersPass;

impl RewritePass for RegistersPass {
    fn name(&self) -> &'static str {
        "registers"
    }

    fn applies_to(&self, target: LoweringTarget) -> bool {
        target == LoweringTarget::Execution
    }

    fn rewrite_code(&self, code: &str, ctx: &mut LoweringContext<'_>) -> String {
        let setter = ctx.runtime("set_gpr_xreg");
        let mut out = String::with_capacity(code.len());
        let mut cursor = 0;
        let mut search = 0;
        while let Some(write) = next_register_write(code, search) {
            search = write.end;
            if !write.postfix.is_empty() {
                ctx.warn(
                    "lowering.register.partial-write",
                    format!(
                        "write to X[{}]{} is not lowered",
                        write.index, write.postfix
                    ),
                );
                continue;
            }
            out.push_str(&code[cursor..write.start]);
            out.push_str(&format!("{setter}({}, {});", write.index, write.value));
            cursor = write.end;
        }
        out.push_str(&code[cursor..]);
        out
    }
}

/// One `X[index]postfix = value;` statement.
pub(super) struct RegisterWrite<'a> {
    pub start: usize,
    pub end: usize,
    pub index: &'a str,
    pub postfix: &'a str,
    pub value: &'a str,
}

/// Next register write at or after `from` that starts a statement.
pub(super) fn next_register_write(code: &str, from: usize) -> Option<RegisterWrite<'_>> {
    let mut search = from;
    while let Some(start) = find_token(code, "X[", search) {
        search = start + 2;
        if !starts_statement(code, start) {
            continue;
        }
        let Some(close) = matching_close(code, start + 1) else {
            continue;
        };
        let Some(eq) = find_assignment(code, close + 1) else {
            continue;
        };
        let Some(semi) = find_top_level(code, ";", eq + 1) else {
            continue;
        };
        return Some(RegisterWrite {
            start,
            end: semi + 1,
            index: code[start + 2..close].trim(),
            postfix: code[close + 1..eq].trim(),
            value: code[eq + 1..semi].trim(),
        });
    }
    None
}

/// True when `pos` opens a statement: after `;`, a brace, a closing parenthesis, or a
/// braceless `else`.
fn starts_statement(code: &str, pos: usize) -> bool {
    match prev_non_space(code, pos) {
        None | Some((_, b';' | b'{' | b'}' | b')')) => true,
        Some((idx, _)) => {
            let head = &code[..=idx];
            head.ends_with("else")
                && head[..head.len() - 4]
                    .bytes()
                    .next_back()
                    .is_none_or(|byte| !is_ident_byte(byte))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::csr::CsrTable;
    use crate::soc::isa::semantics::LoweringOptions;
    use crate::soc::isa::semantics::passes::tests_support::run;

    #[test]
    fn statement_writes_use_the_register_setter() {
        let out = run(
            &RegistersPass,
            "if (c) { X[rd] = X[rs1] + 1; } else { X[rd] = 0; }",
            LoweringTarget::Execution,
        );
        assert_eq!(
            out,
            "if (c) { xqci_set_gpr_xreg(rd, X[rs1] + 1); } else { xqci_set_gpr_xreg(rd, 0); }"
        );
    }

    #[test]
    fn braceless_else_branches_are_statements() {
        let out = run(
            &RegistersPass,
            "if (c) X[rd] = 1; else X[rd] = 0;",
            LoweringTarget::Execution,
        );
        assert_eq!(
            out,
            "if (c) xqci_set_gpr_xreg(rd, 1); else xqci_set_gpr_xreg(rd, 0);"
        );
        let text = "v = myelse X[rd] = 0;";
        assert_eq!(run(&RegistersPass, text, LoweringTarget::Execution), text);
    }

    #[test]
    fn reads_and_comparisons_are_untouched() {
        let text = "if (X[rs1] == X[rs2]) {\nv = X[rd];";
        assert_eq!(run(&RegistersPass, text, LoweringTarget::Execution), text);
    }

    #[test]
    fn partial_writes_are_reported() {
        let csrs = CsrTable::new();
        let options = LoweringOptions::default();
        let mut ctx = LoweringContext::new(LoweringTarget::Execution, &csrs, &options, Some("t"));
        let text = "X[rd].range(0, 7) = v;";
        assert_eq!(RegistersPass.rewrite(text, &mut ctx), text);
        let diags = ctx.into_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "lowering.register.partial-write");
    }

    #[test]
    fn symbolic_target_skips_the_pass() {
        assert!(!RegistersPass.applies_to(LoweringTarget::Symbolic));
    }
}
