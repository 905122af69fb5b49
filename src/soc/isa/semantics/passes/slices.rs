use super::RewritePass;
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::{find_top_level, is_ident_byte, matching_close};

/// `expr[hi:lo]` becomes `expr.range(lo, hi)`. A bare identifier receiver is wrapped first,
/// giving `to_bits(name).range(lo, hi)`; call and index receivers are already bit vectors.
pub struct SlicesPass;

impl RewritePass for SlicesPass {
    fn name(&self) -> &'static str {
        "slices"
    }

    fn rewrite_code(&self, code: &str, _ctx: &mut LoweringContext<'_>) -> String {
        let mut text = code.to_string();
        let mut search = 0;
        while let Some(rel) = text[search..].find('[') {
            let open = search + rel;
            let Some(close) = matching_close(&text, open) else {
                break;
            };
            let inner = &text[open + 1..close];
            let Some(colon) = slice_colon(inner) else {
                search = open + 1;
                continue;
            };
            let hi = inner[..colon].trim().to_string();
            let lo = inner[colon + 1..].trim().to_string();
            let receiver_start = bare_identifier_start(&text, open);
            let range = format!(".range({lo}, {hi})");
            let rewritten = match receiver_start {
                Some(start) => {
                    let receiver = text[start..open].to_string();
                    let replacement = format!("to_bits({receiver}){range}");
                    text.replace_range(start..=close, &replacement);
                    start + replacement.len()
                }
                None => {
                    text.replace_range(open..=close, &range);
                    open + range.len()
                }
            };
            search = rewritten;
        }
        text
    }
}

/// Position of the `:` separating the bounds, ignoring `::` paths.
fn slice_colon(inner: &str) -> Option<usize> {
    let pos = find_top_level(inner, ":", 0)?;
    let bytes = inner.as_bytes();
    let doubled = bytes.get(pos + 1) == Some(&b':') || (pos > 0 && bytes[pos - 1] == b':');
    (!doubled).then_some(pos)
}

/// Start of the identifier directly in front of `open`, if the receiver is just a name.
fn bare_identifier_start(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut start = open;
    while start > 0 && is_ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    if start == open || bytes[start].is_ascii_digit() {
        return None;
    }
    let member = start > 0 && bytes[start - 1] == b'.';
    (!member).then_some(start)
}
