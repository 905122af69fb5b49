/// Parses an unsigned integer written in decimal or with a `0x`, `0b` or `0o` prefix. Digit
/// separators (`_`) are ignored.
pub fn parse_numeric_literal(text: &str) -> Result<u64, &'static str> {
    let text = text.trim();
    if text.starts_with('-') {
        return Err("negative values are not supported here");
    }
    let cleaned = text.replace('_', "").to_ascii_lowercase();
    let (radix, digits) = if let Some(stripped) = cleaned.strip_prefix("0x") {
        (16, stripped)
    } else if let Some(stripped) = cleaned.strip_prefix("0b") {
        (2, stripped)
    } else if let Some(stripped) = cleaned.strip_prefix("0o") {
        (8, stripped)
    } else {
        (10, cleaned.as_str())
    };
    if digits.is_empty() {
        return Err("numeric literal missing digits");
    }
    u64::from_str_radix(digits, radix).map_err(|_| "numeric literal out of range")
}
