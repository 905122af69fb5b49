//! Runtime dispatch inside an ambiguity cluster: a nested switch on field values that fix a bit
//! range in some members and leave it variable in others.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::soc::isa::bitfield::BitField;
use crate::soc::isa::instruction::{InstructionDef, symbol_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchNode {
    Leaf(String),
    Switch {
        field: String,
        placement: BitField,
        cases: Vec<(u64, DispatchNode)>,
        default: Option<Box<DispatchNode>>,
    },
    /// No field separates these candidates.
    Unresolved(Vec<String>),
}

/// How one candidate relates to a field's bit positions.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Coverage {
    Fixed(u64),
    Variable,
    Partial,
}

/// Builds the dispatch tree for `candidates`, which are expected to be pairwise ambiguous.
pub fn build_dispatch(candidates: &[&InstructionDef]) -> DispatchNode {
    match candidates {
        [] => DispatchNode::Unresolved(Vec::new()),
        [single] => DispatchNode::Leaf(single.name.clone()),
        _ => match pick_discriminator(candidates) {
            Some((field, placement, coverage)) => {
                let mut by_value: BTreeMap<u64, Vec<&InstructionDef>> = BTreeMap::new();
                let mut rest = Vec::new();
                for (instr, cover) in candidates.iter().zip(coverage) {
                    match cover {
                        Coverage::Fixed(value) => by_value.entry(value).or_default().push(*instr),
                        _ => rest.push(*instr),
                    }
                }
                let cases = by_value
                    .into_iter()
                    .map(|(value, members)| (value, build_dispatch(&members)))
                    .collect();
                let default = (!rest.is_empty()).then(|| Box::new(build_dispatch(&rest)));
                DispatchNode::Switch {
                    field,
                    placement,
                    cases,
                    default,
                }
            }
            None => DispatchNode::Unresolved(
                candidates.iter().map(|instr| instr.name.clone()).collect(),
            ),
        },
    }
}

/// First field, in candidate then declaration order, that every candidate either fixes
/// completely or leaves completely variable, and that splits the candidates.
fn pick_discriminator(candidates: &[&InstructionDef]) -> Option<(String, BitField, Vec<Coverage>)> {
    let mut tried: Vec<(String, u64)> = Vec::new();
    for instr in candidates {
        for field in instr.fields() {
            let mask = field.placement.mask();
            if tried.iter().any(|(name, m)| *name == field.name && *m == mask) {
                continue;
            }
            tried.push((field.name.clone(), mask));

            let mut placement = field.placement.clone();
            placement.signed = false;
            let coverage: Vec<Coverage> = candidates
                .iter()
                .map(|other| coverage_of(other, &placement, mask))
                .collect();
            if separates(&coverage) {
                return Some((field.name.clone(), placement, coverage));
            }
        }
    }
    None
}

fn coverage_of(instr: &InstructionDef, placement: &BitField, mask: u64) -> Coverage {
    let fixed = instr.encoding.fixed_mask() & mask;
    if fixed == mask {
        Coverage::Fixed(placement.decode(instr.encoding.fixed_value()))
    } else if fixed == 0 {
        Coverage::Variable
    } else {
        Coverage::Partial
    }
}

fn separates(coverage: &[Coverage]) -> bool {
    if coverage.contains(&Coverage::Partial) {
        return false;
    }
    let mut values: Vec<u64> = coverage
        .iter()
        .filter_map(|cover| match cover {
            Coverage::Fixed(value) => Some(*value),
            _ => None,
        })
        .collect();
    if values.is_empty() {
        return false;
    }
    let has_variable = coverage.contains(&Coverage::Variable);
    values.sort_unstable();
    values.dedup();
    has_variable || values.len() > 1
}

impl DispatchNode {
    /// Picks the instruction for `word`, preferring the members that fix the switched field.
    pub fn resolve(&self, word: u64) -> Option<&str> {
        match self {
            DispatchNode::Leaf(name) => Some(name),
            DispatchNode::Switch {
                placement,
                cases,
                default,
                ..
            } => {
                let value = placement.decode(word);
                match cases.iter().find(|(case, _)| *case == value) {
                    Some((_, node)) => node.resolve(word),
                    None => default.as_ref().and_then(|node| node.resolve(word)),
                }
            }
            DispatchNode::Unresolved(_) => None,
        }
    }

    /// Candidate sets no field could separate.
    pub fn unresolved(&self) -> Vec<&[String]> {
        let mut out = Vec::new();
        self.collect_unresolved(&mut out);
        out
    }

    fn collect_unresolved<'a>(&'a self, out: &mut Vec<&'a [String]>) {
        match self {
            DispatchNode::Leaf(_) => {}
            DispatchNode::Switch { cases, default, .. } => {
                for (_, node) in cases {
                    node.collect_unresolved(out);
                }
                if let Some(node) = default {
                    node.collect_unresolved(out);
                }
            }
            DispatchNode::Unresolved(names) => out.push(names),
        }
    }

    /// Renders the tree as a C switch over the decoded argument struct, calling one translator
    /// per leaf.
    pub fn render_switch(&self) -> String {
        let mut out = String::new();
        self.write_switch(&mut out, 0);
        out
    }

    fn write_switch(&self, out: &mut String, indent: usize) {
        let pad = " ".repeat(indent);
        match self {
            DispatchNode::Leaf(name) => {
                let symbol = symbol_name(name);
                let _ = writeln!(out, "{pad}trans_{symbol}(ctx, (arg_{symbol} *) arg);");
            }
            DispatchNode::Unresolved(names) => {
                let _ = writeln!(out, "{pad}// unresolved: {}", names.join(", "));
            }
            DispatchNode::Switch {
                field,
                cases,
                default,
                ..
            } => {
                let _ = writeln!(out, "{pad}switch (arg->{field}) {{");
                for (value, node) in cases {
                    let _ = writeln!(out, "{pad}case {value}:");
                    node.write_switch(out, indent + 4);
                    let _ = writeln!(out, "{pad}    break;");
                }
                if let Some(node) = default {
                    let _ = writeln!(out, "{pad}default:");
                    node.write_switch(out, indent + 4);
                    let _ = writeln!(out, "{pad}    break;");
                }
                let _ = writeln!(out, "{pad}}}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::validator::test_support::synthetic;

    #[test]
    fn dispatch_keys_on_the_free_bits() {
        let a = synthetic("a", "0000");
        let b = synthetic("b", "00--");
        let node = build_dispatch(&[&a, &b]);
        match &node {
            DispatchNode::Switch {
                field,
                placement,
                cases,
                default,
            } => {
                assert_eq!(field, "f0");
                assert_eq!(placement.total_width(), 2, "switch covers both free bits");
                assert_eq!(cases, &vec![(0, DispatchNode::Leaf("a".into()))]);
                assert_eq!(default.as_deref(), Some(&DispatchNode::Leaf("b".into())));
            }
            other => panic!("expected a switch, got {other:?}"),
        }
        assert_eq!(node.resolve(0b0000), Some("a"));
        assert_eq!(node.resolve(0b0010), Some("b"));
        assert!(node.unresolved().is_empty());
    }

    #[test]
    fn nested_switches_split_remaining_candidates() {
        let a = synthetic("a", "0000");
        let b = synthetic("b", "0001");
        let c = synthetic("c", "00--");
        let node = build_dispatch(&[&a, &b, &c]);
        assert_eq!(node.resolve(0b0000), Some("a"));
        assert_eq!(node.resolve(0b0001), Some("b"));
        assert_eq!(node.resolve(0b0011), Some("c"));
        assert_eq!(
            node.render_switch(),
            "switch (arg->f0) {\ncase 0:\n    trans_a(ctx, (arg_a *) arg);\n    break;\ncase 1:\n    trans_b(ctx, (arg_b *) arg);\n    break;\ndefault:\n    trans_c(ctx, (arg_c *) arg);\n    break;\n}\n"
        );
    }

    #[test]
    fn inseparable_candidates_are_reported() {
        let a = synthetic("a", "01--");
        let b = synthetic("b", "01--");
        let node = build_dispatch(&[&a, &b]);
        assert_eq!(node, DispatchNode::Unresolved(vec!["a".into(), "b".into()]));
        assert_eq!(node.unresolved().len(), 1);
        assert!(node.render_switch().contains("// unresolved: a, b"));
    }

    #[test]
    fn partially_fixed_fields_are_not_used_as_keys() {
        // c fixes only the upper bit of b's two-bit field and no field covers that bit alone.
        let b = synthetic("b", "00--");
        let c = synthetic("c", "001-");
        let node = build_dispatch(&[&b, &c]);
        assert_eq!(node, DispatchNode::Unresolved(vec!["b".into(), "c".into()]));
    }
}
