//! Per-run catalog of validated instruction and CSR definitions. Built once after every source
//! file has been loaded, then shared read-only by decode synthesis and lowering.

use std::collections::BTreeMap;

use ahash::AHashSet;

use super::csr::CsrTable;
use super::instruction::InstructionDef;

/// Instructions in `decode_only` enter the decode tables but are never lowered. Instructions in
/// `skip` are dropped at load time.
#[derive(Debug, Clone, Default)]
pub struct InstructionFilter {
    pub decode_only: AHashSet<String>,
    pub skip: AHashSet<String>,
}

impl InstructionFilter {
    /// Preset for the Xqci extension set, whose interrupt, sync and I/O instructions have no
    /// lowering.
    pub fn xqci() -> Self {
        let decode_only = [
            "qc.brev32",
            "qc.lwmi",
            "qc.lwm",
            "qc.swmi",
            "qc.swm",
            "qc.setwmi",
            "qc.setwm",
            "qc.c.mienter",
            "qc.c.mienter.nest",
            "qc.c.mileaveret",
            "qc.c.sync",
            "qc.c.syncr",
            "qc.c.syncwf",
            "qc.c.syncwl",
            "qc.sync",
            "qc.syncr",
            "qc.syncwf",
            "qc.syncwl",
            "qc.csrrwr",
            "qc.csrrwri",
            "qc.inw",
            "qc.outw",
        ];
        Self {
            decode_only: decode_only.iter().map(|name| name.to_string()).collect(),
            skip: AHashSet::new(),
        }
    }

    pub fn skips(&self, name: &str) -> bool {
        self.skip.contains(name)
    }

    pub fn lowers(&self, name: &str) -> bool {
        !self.skip.contains(name) && !self.decode_only.contains(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    instructions: BTreeMap<String, InstructionDef>,
    csrs: CsrTable,
    filter: InstructionFilter,
}

impl Catalog {
    pub fn new(csrs: CsrTable, filter: InstructionFilter) -> Self {
        Self {
            instructions: BTreeMap::new(),
            csrs,
            filter,
        }
    }

    /// Adds `instr` unless the filter skips it. Returns the definition it replaced.
    pub fn insert(&mut self, instr: InstructionDef) -> Option<InstructionDef> {
        if self.filter.skips(&instr.name) {
            return None;
        }
        self.instructions.insert(instr.name.clone(), instr)
    }

    pub fn get(&self, name: &str) -> Option<&InstructionDef> {
        self.instructions.get(name)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn csrs(&self) -> &CsrTable {
        &self.csrs
    }

    pub fn filter(&self) -> &InstructionFilter {
        &self.filter
    }

    /// Every instruction, ordered by name.
    pub fn instructions(&self) -> impl Iterator<Item = &InstructionDef> {
        self.instructions.values()
    }

    /// Instructions whose semantics should be lowered.
    pub fn lowerable(&self) -> impl Iterator<Item = &InstructionDef> {
        self.instructions()
            .filter(|instr| self.filter.lowers(&instr.name))
    }

    /// Instructions bucketed by encoding width, each bucket ordered by name.
    pub fn by_width(&self) -> BTreeMap<u32, Vec<&InstructionDef>> {
        let mut buckets: BTreeMap<u32, Vec<&InstructionDef>> = BTreeMap::new();
        for instr in self.instructions() {
            buckets.entry(instr.bit_width()).or_default().push(instr);
        }
        buckets
    }
}
