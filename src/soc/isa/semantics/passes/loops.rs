use super::RewritePass;
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::{find_token, split_comment};

pub const UNROLL_MARKER: &str = "// @unroll";

/// Puts an `// @unroll` line, at the loop's indentation, before every line opening a `for`
/// loop.
pub struct LoopsPass;

impl RewritePass for LoopsPass {
    fn name(&self) -> &'static str {
        "loops"
    }

    fn rewrite(&self, text: &str, _ctx: &mut LoweringContext<'_>) -> String {
        let mut out: Vec<String> = Vec::new();
        for line in text.lines() {
            let (code, _) = split_comment(line);
            let opens_loop = find_token(code, "for (", 0).is_some();
            let marked = out.last().is_some_and(|prev| prev.trim() == UNROLL_MARKER);
            if opens_loop && !marked {
                let indent = &line[..line.len() - line.trim_start().len()];
                out.push(format!("{indent}{UNROLL_MARKER}"));
            }
            out.push(line.to_string());
        }
        let mut joined = out.join("\n");
        if text.ends_with('\n') && !joined.is_empty() {
            joined.push('\n');
        }
        joined
    }
}
