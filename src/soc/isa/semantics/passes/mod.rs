//! The ordered rewrite passes. Each pass documents the pattern it consumes and the text it
//! produces; none of them backtracks, and each is a no-op on text free of its trigger.

mod bits;
mod capability;
mod comments;
mod concat;
mod csr;
mod guards;
mod jumps;
mod literals;
mod loops;
mod registers;
pub(crate) mod residual;
mod slices;
mod wide;

use super::{LoweringContext, LoweringTarget, scan};

pub use bits::BitsPass;
pub use capability::CapabilityPass;
pub use comments::CommentsPass;
pub use concat::ConcatPass;
pub use csr::CsrPass;
pub use guards::GuardsPass;
pub use jumps::JumpsPass;
pub use literals::LiteralsPass;
pub use loops::LoopsPass;
pub use registers::RegistersPass;
pub use slices::SlicesPass;
pub use wide::WidePass;

pub trait RewritePass {
    fn name(&self) -> &'static str;

    fn applies_to(&self, _target: LoweringTarget) -> bool {
        true
    }

    /// Rewrites the code portion of a single line.
    fn rewrite_code(&self, code: &str, _ctx: &mut LoweringContext<'_>) -> String {
        code.to_string()
    }

    /// Rewrites a whole body. The default maps [`RewritePass::rewrite_code`] over the code
    /// portion of every line.
    fn rewrite(&self, text: &str, ctx: &mut LoweringContext<'_>) -> String {
        scan::map_code(text, |code| self.rewrite_code(code, ctx))
    }
}

/// The passes in the order they must run.
pub fn pipeline() -> Vec<Box<dyn RewritePass>> {
    vec![
        Box::new(CommentsPass),
        Box::new(GuardsPass),
        Box::new(LoopsPass),
        Box::new(LiteralsPass),
        Box::new(SlicesPass),
        Box::new(ConcatPass),
        Box::new(CsrPass),
        Box::new(CapabilityPass),
        Box::new(JumpsPass),
        Box::new(WidePass),
        Box::new(BitsPass),
        Box::new(RegistersPass),
    ]
}

/// Replaces every call `name(args)` (identifier boundary respected) with `render(args)`.
/// `render` returning `None` leaves that occurrence unchanged.
pub(crate) fn rewrite_calls(
    code: &str,
    name: &str,
    mut render: impl FnMut(&str) -> Option<String>,
) -> String {
    let opener = format!("{name}(");
    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    while let Some(pos) = scan::find_token(code, &opener, cursor) {
        let open = pos + opener.len() - 1;
        let Some(close) = scan::matching_close(code, open) else {
            break;
        };
        out.push_str(&code[cursor..pos]);
        match render(&code[open + 1..close]) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&code[pos..=close]),
        }
        cursor = close + 1;
    }
    out.push_str(&code[cursor..]);
    out
}
