use super::{RewritePass, rewrite_calls};
use crate::soc::isa::semantics::scan::{find_token, is_ident_byte, split_top_level};
use crate::soc::isa::semantics::{LoweringContext, LoweringTarget};

/// Control transfers and memory accesses.
///
/// `jump_halfword(pc + off)` becomes `P_jump_pcrel(off)`, any other halfword target and a
/// one-argument `jump(t)` become `P_jump(t, 0)`. The symbolic target uses the traced jump
/// entry points and prefixes `read_memory<`/`write_memory<` with `traced_`.
pub struct JumpsPass;

impl RewritePass for JumpsPass {
    fn name(&self) -> &'static str {
        "jumps"
    }

    fn rewrite_code(&self, code: &str, ctx: &mut LoweringContext<'_>) -> String {
        let traced = ctx.target == LoweringTarget::Symbolic;
        let (pcrel, absolute) = if traced {
            (ctx.runtime("traced_jump_pcrel"), ctx.runtime("traced_jump"))
        } else {
            (ctx.runtime("jump_pcrel"), ctx.runtime("jump"))
        };

        let text = rewrite_calls(code, "jump_halfword", |args| {
            Some(match pc_offset(args) {
                Some(offset) => format!("{pcrel}({offset})"),
                None => format!("{absolute}({}, 0)", args.trim()),
            })
        });
        let mut text = rewrite_calls(&text, "jump", |args| {
            (split_top_level(args, ',').len() == 1)
                .then(|| format!("{absolute}({}, 0)", args.trim()))
        });

        if traced {
            for access in ["read_memory<", "write_memory<"] {
                text = prefix_traced(&text, access);
            }
        }
        text
    }
}

/// `pc + off` gives `off`, `pc - off` gives `-(off)`.
fn pc_offset(args: &str) -> Option<String> {
    let rest = args.trim().strip_prefix("pc")?;
    if rest.as_bytes().first().copied().is_some_and(is_ident_byte) {
        return None;
    }
    let rest = rest.trim_start();
    if let Some(offset) = rest.strip_prefix('+') {
        Some(offset.trim().to_string())
    } else {
        rest.strip_prefix('-').map(|offset| format!("-({})", offset.trim()))
    }
}

fn prefix_traced(code: &str, access: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    while let Some(pos) = find_token(code, access, cursor) {
        out.push_str(&code[cursor..pos]);
        out.push_str("traced_");
        out.push_str(access);
        cursor = pos + access.len();
    }
    out.push_str(&code[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::semantics::passes::tests_support::run;

    #[test]
    fn pc_relative_jumps_keep_only_the_offset() {
        let text = "jump_halfword(pc + imm);\njump_halfword(pc - 4);\njump_halfword(X[rs1] & ~1);";
        assert_eq!(
            run(&JumpsPass, text, LoweringTarget::Execution),
            "xqci_jump_pcrel(imm);\nxqci_jump_pcrel(-(4));\nxqci_jump(X[rs1] & ~1, 0);"
        );
    }

    #[test]
    fn symbolic_target_traces_jumps_and_memory() {
        let text = "jump(target);\nX[rd] = read_memory<32>(a, 0);\nwrite_memory<8>(a, v, 0);";
        let once = run(&JumpsPass, text, LoweringTarget::Symbolic);
        assert_eq!(
            once,
            "xqci_traced_jump(target, 0);\nX[rd] = traced_read_memory<32>(a, 0);\ntraced_write_memory<8>(a, v, 0);"
        );
        assert_eq!(run(&JumpsPass, &once, LoweringTarget::Symbolic), once);
    }

    #[test]
    fn execution_target_leaves_memory_untraced() {
        let text = "x = read_memory<16>(a, 0);";
        assert_eq!(run(&JumpsPass, text, LoweringTarget::Execution), text);
    }
}
