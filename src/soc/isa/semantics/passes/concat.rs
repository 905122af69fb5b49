use super::RewritePass;
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::{matching_close, prev_non_space, split_top_level};

/// Bytes after which a `{` starts an expression rather than a block.
const EXPRESSION_LEADS: &[u8] = b"=(,?:{<+-*/&|^!~[";

/// `{count{expr}}` becomes `repeat<count>(expr)` and `{a, b, ...}` becomes `concat(a, b, ...)`.
/// Braces opening a block are left alone.
pub struct ConcatPass;

impl RewritePass for ConcatPass {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn rewrite_code(&self, code: &str, _ctx: &mut LoweringContext<'_>) -> String {
        rewrite_braces(code)
    }
}

fn rewrite_braces(code: &str) -> String {
    let mut text = code.to_string();
    let mut search = 0;
    while let Some(rel) = text[search..].find('{') {
        let open = search + rel;
        if !starts_expression(&text, open) {
            search = open + 1;
            continue;
        }
        let Some(close) = matching_close(&text, open) else {
            break;
        };
        let replacement = lower_group(&text[open + 1..close]);
        text.replace_range(open..=close, &replacement);
        search = open + replacement.len();
    }
    text
}

fn starts_expression(text: &str, open: usize) -> bool {
    match prev_non_space(text, open) {
        Some((idx, byte)) => {
            EXPRESSION_LEADS.contains(&byte) || text[..=idx].ends_with("return")
        }
        None => false,
    }
}

fn lower_group(inner: &str) -> String {
    if let Some(repeat) = replication(inner) {
        return repeat;
    }
    let parts: Vec<String> = split_top_level(inner, ',')
        .into_iter()
        .map(|part| rewrite_nested(part))
        .collect();
    format!("concat({})", parts.join(", "))
}

/// `count{expr}`, where the inner braces run to the end of the group.
fn replication(inner: &str) -> Option<String> {
    let trimmed = inner.trim();
    let open = trimmed.find('{')?;
    if open == 0 || split_top_level(trimmed, ',').len() > 1 {
        return None;
    }
    let close = matching_close(trimmed, open)?;
    if close + 1 != trimmed.len() {
        return None;
    }
    let count = trimmed[..open].trim();
    let expr = rewrite_nested(&trimmed[open + 1..close]);
    Some(format!("repeat<{count}>({expr})"))
}

/// Element braces nested directly inside a group are always expressions.
fn rewrite_nested(part: &str) -> String {
    let trimmed = part.trim();
    if trimmed.starts_with('{') && matching_close(trimmed, 0) == Some(trimmed.len() - 1) {
        lower_group(&trimmed[1..trimmed.len() - 1])
    } else {
        rewrite_braces(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::semantics::LoweringTarget;
    use crate::soc::isa::semantics::passes::tests_support::run;

    #[test]
    fn concatenation_and_replication_are_rewritten() {
        let out = run(
            &ConcatPass,
            "XReg v = {{XLEN-5{b}}, a, {c, d}};",
            LoweringTarget::Execution,
        );
        assert_eq!(out, "XReg v = concat(repeat<XLEN-5>(b), a, concat(c, d));");
    }

    #[test]
    fn block_braces_are_kept() {
        let text = "if (a) { x = 1; } else {";
        assert_eq!(run(&ConcatPass, text, LoweringTarget::Execution), text);
    }

    #[test]
    fn return_and_ternary_operands_are_expressions() {
        let out = run(
            &ConcatPass,
            "return c ? {a, b} : {2{b}};",
            LoweringTarget::Execution,
        );
        assert_eq!(out, "return c ? concat(a, b) : repeat<2>(b);");
        let out = run(&ConcatPass, "return {a, b};", LoweringTarget::Execution);
        assert_eq!(out, "return concat(a, b);");
    }
}
