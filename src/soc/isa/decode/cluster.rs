//! Ambiguity clustering: instructions whose fixed bits cannot tell them apart are grouped so the
//! decoder can dispatch between them on field values.

use std::collections::BTreeMap;

use tracing::warn;

use crate::soc::isa::instruction::InstructionDef;

/// How compatible pairs are merged into clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterStrategy {
    /// Connected components of the compatibility graph.
    #[default]
    Transitive,
    /// Greedy scan that adds a compatible pair to the first cluster already holding either
    /// member. Reproduces legacy decode tables; can leave an instruction in several clusters or
    /// miss transitive links.
    SinglePass,
}

/// Groups indices of `instrs` into ambiguity clusters. Only clusters with two or more members
/// are returned; members are sorted and clusters are ordered by their first member.
pub fn cluster(instrs: &[&InstructionDef], strategy: ClusterStrategy) -> Vec<Vec<usize>> {
    let pairs = compatible_pairs(instrs);
    match strategy {
        ClusterStrategy::Transitive => transitive(instrs.len(), &pairs),
        ClusterStrategy::SinglePass => single_pass(instrs, &pairs),
    }
}

/// Pairs whose templates are identical: same fixed positions with the same values.
pub fn duplicate_pairs(instrs: &[&InstructionDef]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in instrs.iter().enumerate() {
        for (j, b) in instrs.iter().enumerate().skip(i + 1) {
            if a.encoding.same_template(&b.encoding) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

fn compatible_pairs(instrs: &[&InstructionDef]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in instrs.iter().enumerate() {
        for (j, b) in instrs.iter().enumerate().skip(i + 1) {
            if a.encoding.compatible_with(&b.encoding) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

fn transitive(len: usize, pairs: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(len);
    for &(a, b) in pairs {
        sets.union(a, b);
    }
    let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for idx in 0..len {
        by_root.entry(sets.find(idx)).or_default().push(idx);
    }
    let mut clusters: Vec<Vec<usize>> = by_root
        .into_values()
        .filter(|members| members.len() > 1)
        .collect();
    clusters.sort_by_key(|members| members[0]);
    clusters
}

fn single_pass(instrs: &[&InstructionDef], pairs: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for &(a, b) in pairs {
        let existing = clusters
            .iter_mut()
            .find(|members| members.contains(&a) || members.contains(&b));
        match existing {
            Some(members) => {
                let missing = if members.contains(&a) { b } else { a };
                if !members.contains(&missing) {
                    members.push(missing);
                }
            }
            None => clusters.push(vec![a, b]),
        }
    }
    for members in &mut clusters {
        members.sort_unstable();
    }

    let mut seen = vec![0usize; instrs.len()];
    for idx in clusters.iter().flatten() {
        seen[*idx] += 1;
    }
    for (idx, count) in seen.iter().enumerate() {
        if *count > 1 {
            warn!(
                instruction = %instrs[idx].name,
                clusters = count,
                "single-pass clustering placed instruction in more than one group"
            );
        }
    }
    clusters
}

/// Union-find over instruction indices.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, idx: usize) -> usize {
        let mut root = idx;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = idx;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soc::isa::validator::test_support::synthetic;

    fn names<'a>(instrs: &[&'a InstructionDef], clusters: &[Vec<usize>]) -> Vec<Vec<&'a str>> {
        clusters
            .iter()
            .map(|members| members.iter().map(|idx| instrs[*idx].name.as_str()).collect())
            .collect()
    }

    #[test]
    fn overlapping_templates_form_a_cluster() {
        let a = synthetic("a", "0000");
        let b = synthetic("b", "00--");
        let instrs = [&a, &b];
        assert_eq!(cluster(&instrs, ClusterStrategy::Transitive), vec![vec![0, 1]]);
    }

    #[test]
    fn disjoint_templates_do_not_cluster() {
        let a = synthetic("a", "0000");
        let b = synthetic("b", "0010");
        let instrs = [&a, &b];
        assert!(cluster(&instrs, ClusterStrategy::Transitive).is_empty());
        assert!(cluster(&instrs, ClusterStrategy::SinglePass).is_empty());
    }

    #[test]
    fn single_pass_misses_links_that_union_find_keeps() {
        // a~d, b~c and c~d are compatible; a~b, a~c and b~d conflict.
        let a = synthetic("a", "00-0");
        let b = synthetic("b", "1-00");
        let c = synthetic("c", "-1-0");
        let d = synthetic("d", "--10");
        let instrs = [&a, &b, &c, &d];

        let legacy = cluster(&instrs, ClusterStrategy::SinglePass);
        assert_eq!(
            names(&instrs, &legacy),
            vec![vec!["a", "c", "d"], vec!["b", "c"]],
            "legacy scan splits the component and duplicates c"
        );

        let fixed = cluster(&instrs, ClusterStrategy::Transitive);
        assert_eq!(names(&instrs, &fixed), vec![vec!["a", "b", "c", "d"]]);
    }

    #[test]
    fn identical_templates_are_duplicates() {
        let a = synthetic("a", "01--");
        let b = synthetic("b", "01--");
        let c = synthetic("c", "011-");
        let instrs = [&a, &b, &c];
        assert_eq!(duplicate_pairs(&instrs), vec![(0, 1)]);
    }
}
