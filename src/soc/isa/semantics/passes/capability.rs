use super::{RewritePass, rewrite_calls};
use crate::soc::isa::semantics::LoweringContext;
use crate::soc::isa::semantics::scan::split_top_level;

/// Extension checks, exceptions and privilege changes become runtime entry points:
/// `implemented?(ExtensionName::X)` gives `P_implemented_X()`, `raise(ExceptionCode::X, ...)`
/// gives `P_raise_X()` and `set_mode(PrivilegeMode::X)` gives `P_set_mode_X()`. Calls whose
/// first argument is not a named enumerator are kept.
pub struct CapabilityPass;

const CALLS: [(&str, &str, &str); 3] = [
    ("implemented?", "ExtensionName::", "implemented"),
    ("raise", "ExceptionCode::", "raise"),
    ("set_mode", "PrivilegeMode::", "set_mode"),
];

impl RewritePass for CapabilityPass {
    fn name(&self) -> &'static str {
        "capability"
    }

    fn rewrite_code(&self, code: &str, ctx: &mut LoweringContext<'_>) -> String {
        CALLS.iter().fold(code.to_string(), |text, (call, scope, entry)| {
            let entry = ctx.runtime(entry);
            rewrite_calls(&text, call, |args| {
                let first = split_top_level(args, ',').into_iter().next()?;
                let variant = first.strip_prefix(scope)?;
                variant
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_')
                    .then(|| format!("{entry}_{variant}()"))
            })
        })
    }
}
