//! Lightweight scanning over pseudocode text: comment splitting, bracket matching, identifier
//! boundaries and operand extents. Positions are byte offsets; every delimiter searched for is
//! ASCII, so slicing at returned offsets stays on character boundaries.

pub fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Splits a line into its code and its trailing `//` comment (comment keeps the `//`).
pub fn split_comment(line: &str) -> (&str, &str) {
    match line.find("//") {
        Some(pos) => (&line[..pos], &line[pos..]),
        None => (line, ""),
    }
}

/// Applies `rewrite` to the code portion of every line, leaving comments untouched.
pub fn map_code(text: &str, mut rewrite: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, line) in text.lines().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let (code, comment) = split_comment(line);
        if code.trim().is_empty() {
            out.push_str(code);
        } else {
            out.push_str(&rewrite(code));
        }
        out.push_str(comment);
    }
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Finds `token` at or after `from`, skipping matches glued to a preceding identifier when the
/// token itself starts with an identifier character.
pub fn find_token(text: &str, token: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let needs_boundary = token.as_bytes().first().copied().is_some_and(is_ident_byte);
    let mut search = from;
    while search <= text.len() {
        let pos = search + text.get(search..)?.find(token)?;
        let glued = needs_boundary && pos > 0 && is_ident_byte(bytes[pos - 1]);
        if !glued {
            return Some(pos);
        }
        search = pos + token.len();
    }
    None
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

fn opener_for(close: u8) -> Option<u8> {
    match close {
        b')' => Some(b'('),
        b']' => Some(b'['),
        b'}' => Some(b'{'),
        _ => None,
    }
}

/// Index of the bracket closing the one at `open`.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    closer_for(*bytes.get(open)?)?;
    let mut stack = Vec::new();
    for (idx, byte) in bytes.iter().enumerate().skip(open) {
        if let Some(close) = closer_for(*byte) {
            stack.push(close);
        } else if opener_for(*byte).is_some() {
            if stack.pop() != Some(*byte) {
                return None;
            }
            if stack.is_empty() {
                return Some(idx);
            }
        }
    }
    None
}

/// Index of the bracket opening the one at `close`.
pub fn matching_open(text: &str, close: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    opener_for(*bytes.get(close)?)?;
    let mut stack = Vec::new();
    for idx in (0..=close).rev() {
        let byte = bytes[idx];
        if let Some(open) = opener_for(byte) {
            stack.push(open);
        } else if closer_for(byte).is_some() {
            if stack.pop() != Some(byte) {
                return None;
            }
            if stack.is_empty() {
                return Some(idx);
            }
        }
    }
    None
}

/// First occurrence of `pat` at or after `from` that sits outside every bracket pair opened
/// after `from`.
pub fn find_top_level(text: &str, pat: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut idx = from;
    while idx < bytes.len() {
        let byte = bytes[idx];
        if closer_for(byte).is_some() {
            depth += 1;
        } else if opener_for(byte).is_some() {
            if depth == 0 {
                return None;
            }
            depth -= 1;
        } else if depth == 0 && text[idx..].starts_with(pat) {
            return Some(idx);
        }
        idx += 1;
    }
    None
}

/// Splits on `sep` at bracket depth zero, trimming each part.
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if ch == sep && depth == 0 => {
                parts.push(text[start..idx].trim());
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// Index of the first `=` at bracket depth zero that is an assignment rather than part of
/// `==`, `!=`, `<=` or `>=`.
pub fn find_assignment(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut search = from;
    while let Some(pos) = find_top_level(text, "=", search) {
        let prev = pos.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(pos + 1).copied();
        let comparison = matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || next == Some(b'=');
        if !comparison {
            return Some(pos);
        }
        search = pos + if next == Some(b'=') { 2 } else { 1 };
    }
    None
}

/// Last non-whitespace byte before `end`, with its index.
pub fn prev_non_space(text: &str, end: usize) -> Option<(usize, u8)> {
    let bytes = text.as_bytes();
    (0..end).rev().find(|idx| !bytes[*idx].is_ascii_whitespace()).map(|idx| (idx, bytes[idx]))
}

/// Start of the operand that ends right before `end` (trailing whitespace skipped): an
/// identifier or literal followed by any chain of calls, indexing and member accesses, or a
/// parenthesized group.
pub fn operand_start(text: &str, end: usize) -> usize {
    let bytes = text.as_bytes();
    let Some((mut idx, _)) = prev_non_space(text, end) else {
        return end;
    };
    loop {
        let byte = bytes[idx];
        if byte == b')' || byte == b']' {
            let Some(open) = matching_open(text, idx) else {
                return idx + 1;
            };
            if open == 0 {
                return 0;
            }
            let before = bytes[open - 1];
            if is_ident_byte(before) || before == b')' || before == b']' || before == b'>' {
                idx = open - 1;
                if before == b'>'
                    && let Some(lt) = text[..idx].rfind('<')
                    && lt > 0
                    && is_ident_byte(bytes[lt - 1])
                {
                    idx = lt - 1;
                }
                continue;
            }
            return open;
        }
        if is_ident_byte(byte) {
            let mut start = idx;
            while start > 0 && is_ident_byte(bytes[start - 1]) {
                start -= 1;
            }
            if start > 1 && bytes[start - 1] == b'.' {
                idx = start - 2;
                continue;
            }
            if start > 2 && &text[start - 2..start] == "::" {
                idx = start - 3;
                continue;
            }
            return start;
        }
        return idx + 1;
    }
}

/// End (exclusive) of the operand starting at `start` (leading whitespace skipped). Accepts
/// an optional unary prefix.
pub fn operand_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    while idx < bytes.len() && matches!(bytes[idx], b'-' | b'~' | b'!') {
        idx += 1;
    }
    if idx < bytes.len() && closer_for(bytes[idx]) == Some(b')') {
        return matching_close(text, idx).map_or(bytes.len(), |close| close + 1);
    }
    loop {
        let ident_start = idx;
        while idx < bytes.len() && is_ident_byte(bytes[idx]) {
            idx += 1;
        }
        if idx == ident_start {
            return idx;
        }
        if idx < bytes.len()
            && bytes[idx] == b'<'
            && let Some(gt) = text[idx..].find('>')
            && bytes.get(idx + gt + 1) == Some(&b'(')
        {
            idx += gt + 1;
        }
        while idx < bytes.len() && matches!(bytes[idx], b'(' | b'[') {
            match matching_close(text, idx) {
                Some(close) => idx = close + 1,
                None => return bytes.len(),
            }
        }
        if text[idx..].starts_with("::") {
            idx += 2;
        } else if idx < bytes.len() && bytes[idx] == b'.' {
            idx += 1;
        } else {
            return idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_split_off() {
        assert_eq!(split_comment("a = 1; // note"), ("a = 1; ", "// note"));
        assert_eq!(split_comment("a = 1;"), ("a = 1;", ""));
    }

    #[test]
    fn map_code_leaves_comments_alone() {
        let out = map_code("x = CSR; // CSR\n// CSR\n", |code| code.replace("CSR", "y"));
        assert_eq!(out, "x = y; // CSR\n// CSR\n");
    }

    #[test]
    fn tokens_respect_identifier_boundaries() {
        assert_eq!(find_token("xqci_jump(a); jump(b)", "jump(", 0), Some(14));
        assert_eq!(find_token("X[a] MX[b]", "X[", 1), None);
    }

    #[test]
    fn brackets_match_across_kinds() {
        let text = "f(a[1], {b, (c)})";
        assert_eq!(matching_close(text, 1), Some(16));
        assert_eq!(matching_open(text, 16), Some(1));
        assert_eq!(matching_close(text, 3), Some(5));
    }

    #[test]
    fn top_level_search_skips_nested_text() {
        assert_eq!(split_top_level("a, f(b, c), {d, e}", ','), vec!["a", "f(b, c)", "{d, e}"]);
        assert_eq!(find_assignment("X[a == b].F = c == d;", 0), Some(12));
        assert_eq!(find_assignment("if (a <= b)", 0), None);
    }

    #[test]
    fn operands_extend_over_calls_and_indexing() {
        let text = "r = X[rs1].range(0, 3) `+ read_memory<32>(a) + 1";
        let op_end = text.find(" `+").expect("marker");
        assert_eq!(&text[operand_start(text, op_end)..op_end], "X[rs1].range(0, 3)");
        let rhs = op_end + 3;
        assert_eq!(&text[rhs..operand_end(text, rhs)].trim(), &"read_memory<32>(a)");
        let text = "(a + b) `- c";
        assert_eq!(operand_start(text, 7), 0);
    }
}
