use super::{RewritePass, rewrite_calls};
use crate::soc::isa::semantics::LoweringContext;

/// `$bits(e)` becomes `to_bits(e)`.
pub struct BitsPass;

impl RewritePass for BitsPass {
    fn name(&self) -> &'static str {
        "bits"
    }

    fn rewrite_code(&self, code: &str, _ctx: &mut LoweringContext<'_>) -> String {
        lower_bits(code)
    }
}

fn lower_bits(code: &str) -> String {
    rewrite_calls(code, "$bits", |args| Some(format!("to_bits({})", lower_bits(args.trim()))))
}
