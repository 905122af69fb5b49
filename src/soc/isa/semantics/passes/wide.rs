use super::RewritePass;
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::{operand_end, operand_start};

/// Widening operators, binding to their nearest operands and folding left:
/// ``a `+ b`` gives `wide_add(a, b)`, ``a `- b`` gives `wide_sub(a, b)` and
/// ``a `<< n`` gives `wide_shl<n>(a)`.
pub struct WidePass;

const OPERATORS: [&str; 3] = ["`+", "`-", "`<<"];

impl RewritePass for WidePass {
    fn name(&self) -> &'static str {
        "wide"
    }

    fn rewrite_code(&self, code: &str, _ctx: &mut LoweringContext<'_>) -> String {
        let mut text = code.to_string();
        while let Some((pos, op)) = first_operator(&text) {
            let lhs_start = operand_start(&text, pos);
            let rhs_end = operand_end(&text, pos + op.len());
            let lhs = text[lhs_start..pos].trim();
            let rhs = text[pos + op.len()..rhs_end].trim();
            if lhs.is_empty() || rhs.is_empty() {
                break;
            }
            let call = match op {
                "`+" => format!("wide_add({lhs}, {rhs})"),
                "`-" => format!("wide_sub({lhs}, {rhs})"),
                _ => format!("wide_shl<{rhs}>({lhs})"),
            };
            text.replace_range(lhs_start..rhs_end, &call);
        }
        text
    }
}

fn first_operator(text: &str) -> Option<(usize, &'static str)> {
    OPERATORS
        .iter()
        .filter_map(|op| text.find(op).map(|pos| (pos, *op)))
        .min_by_key(|(pos, _)| *pos)
}
