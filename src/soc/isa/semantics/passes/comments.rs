use super::RewritePass;
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::split_comment;

/// Sigils of the source language and their plain replacements.
const SIGILS: [(&str, &str); 3] = [("$signed", "_signed"), ("$encoding", "0"), ("$pc", "pc")];

/// `# text` becomes `// text`, blank lines are dropped, and a statement broken over several
/// lines is joined back onto one line. Source sigils are normalized.
pub struct CommentsPass;

impl RewritePass for CommentsPass {
    fn name(&self) -> &'static str {
        "comments"
    }

    fn rewrite(&self, text: &str, _ctx: &mut LoweringContext<'_>) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut pending: Option<String> = None;
        for raw in text.lines() {
            let line = convert_hash_comment(raw.trim_end());
            if line.trim().is_empty() {
                continue;
            }
            let line = normalize_sigils(&line);
            let joined = match pending.take() {
                Some(head) => format!("{head} {}", line.trim_start()),
                None => line,
            };
            if is_open_statement(&joined) {
                pending = Some(joined);
            } else {
                lines.push(joined);
            }
        }
        lines.extend(pending);

        let mut out = lines.join("\n");
        if text.ends_with('\n') && !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

fn convert_hash_comment(line: &str) -> String {
    let (code, comment) = split_comment(line);
    match code.find('#') {
        Some(pos) => format!("{}//{}{comment}", &code[..pos], &code[pos + 1..]),
        None => line.to_string(),
    }
}

fn normalize_sigils(line: &str) -> String {
    let (code, comment) = split_comment(line);
    let mut code = code.to_string();
    for (sigil, plain) in SIGILS {
        code = code.replace(sigil, plain);
    }
    code + comment
}

/// A line whose code does not end a statement or block continues on the next line. Lines
/// carrying a comment are never joined.
fn is_open_statement(line: &str) -> bool {
    let (code, comment) = split_comment(line);
    if !comment.is_empty() {
        return false;
    }
    !matches!(code.trim_end().chars().last(), Some(';' | '{' | '}') | None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::semantics::LoweringTarget;
    use crate::soc::isa::semantics::passes::tests_support::run;

    #[test]
    fn hash_comments_become_line_comments() {
        let out = run(&CommentsPass, "# note\nX[rd] = 1; # trailing\n", LoweringTarget::Execution);
        assert_eq!(out, "// note\nX[rd] = 1; // trailing\n");
    }

    #[test]
    fn continuation_lines_are_joined_and_blanks_dropped() {
        let out = run(
            &CommentsPass,
            "XReg a = b\n\n    + c;\nif (a)\n{\n}\n",
            LoweringTarget::Execution,
        );
        assert_eq!(out, "XReg a = b + c;\nif (a) {\n}\n");
    }

    #[test]
    fn sigils_are_normalized_outside_comments() {
        let out = run(
            &CommentsPass,
            "jump($pc + $signed(imm)); # $pc stays\nx = $encoding;",
            LoweringTarget::Execution,
        );
        assert_eq!(out, "jump(pc + _signed(imm)); // $pc stays\nx = 0;");
    }
}
