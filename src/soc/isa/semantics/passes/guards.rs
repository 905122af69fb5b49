use super::RewritePass;
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::{find_top_level, is_ident_byte};

/// `raise Code if cond;` becomes `// guard: Code if cond`. Guard conditions are not evaluated by
/// the lowered code.
pub struct GuardsPass;

impl RewritePass for GuardsPass {
    fn name(&self) -> &'static str {
        "guards"
    }

    fn rewrite_code(&self, code: &str, _ctx: &mut LoweringContext<'_>) -> String {
        let trimmed = code.trim_start();
        let indent = &code[..code.len() - trimmed.len()];
        let Some(rest) = trimmed.strip_prefix("raise") else {
            return code.to_string();
        };
        if rest.as_bytes().first().copied().is_some_and(is_ident_byte) {
            return code.to_string();
        }
        let Some(cond_at) = find_top_level(rest, " if ", 0) else {
            return code.to_string();
        };
        let Some(end) = find_top_level(rest, ";", cond_at) else {
            return code.to_string();
        };
        let exception = rest[..cond_at].trim();
        let condition = rest[cond_at + 4..end].trim();
        let tail = rest[end + 1..].trim();
        let mut out = format!("{indent}// guard: {exception} if {condition}");
        if !tail.is_empty() {
            out = format!("{indent}{tail} {}", out.trim_start());
        }
        out
    }
}
