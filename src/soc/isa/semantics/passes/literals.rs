use super::RewritePass;
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::is_ident_byte;

/// Sized literals `N'bDIGITS`, `N'hDIGITS` and `N'dDIGITS` become `bits(VALUE, N)` with the
/// value in C notation.
pub struct LiteralsPass;

impl RewritePass for LiteralsPass {
    fn name(&self) -> &'static str {
        "literals"
    }

    fn rewrite_code(&self, code: &str, _ctx: &mut LoweringContext<'_>) -> String {
        let bytes = code.as_bytes();
        let mut out = String::with_capacity(code.len());
        let mut cursor = 0;
        let mut idx = 0;
        while idx < bytes.len() {
            if bytes[idx] != b'\'' {
                idx += 1;
                continue;
            }
            let Some(literal) = sized_literal(code, idx) else {
                idx += 1;
                continue;
            };
            out.push_str(&code[cursor..literal.start]);
            out.push_str(&format!("bits({}, {})", literal.value, literal.width));
            cursor = literal.end;
            idx = literal.end;
        }
        out.push_str(&code[cursor..]);
        out
    }
}

struct SizedLiteral<'a> {
    start: usize,
    end: usize,
    width: &'a str,
    value: String,
}

/// Parses the literal whose quote sits at `quote`.
fn sized_literal(code: &str, quote: usize) -> Option<SizedLiteral<'_>> {
    let bytes = code.as_bytes();
    let mut start = quote;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == quote || (start > 0 && is_ident_byte(bytes[start - 1])) {
        return None;
    }
    let (prefix, valid): (&str, fn(u8) -> bool) = match bytes.get(quote + 1)? {
        b'b' => ("0b", |b| b == b'0' || b == b'1' || b == b'_'),
        b'h' => ("0x", |b| b.is_ascii_hexdigit() || b == b'_'),
        b'd' => ("", |b| b.is_ascii_digit() || b == b'_'),
        _ => return None,
    };
    let digits_start = quote + 2;
    let mut end = digits_start;
    while end < bytes.len() && valid(bytes[end]) {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    let digits = code[digits_start..end].replace('_', "");
    Some(SizedLiteral {
        start,
        end,
        width: &code[start..quote],
        value: format!("{prefix}{digits}"),
    })
}
