//! Control/status register catalog: names, addresses and field masks referenced by semantics.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use ahash::AHashMap;

use super::bitfield::BitField;
use super::instruction::symbol_name;

/// CSRs whose address constant is provided by the runtime.
const ADDRESSLESS_CSRS: [&str; 1] = ["time"];

/// Field placement for one CSR field. Fields whose layout depends on XLEN carry the per-width
/// placements instead of a shared one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsrField {
    pub name: String,
    pub location: Option<BitField>,
    pub location_rv32: Option<BitField>,
    pub location_rv64: Option<BitField>,
}

impl CsrField {
    /// Placement used for constants: the shared location, then RV32, then RV64.
    pub fn effective_location(&self) -> Option<&BitField> {
        self.location
            .as_ref()
            .or(self.location_rv32.as_ref())
            .or(self.location_rv64.as_ref())
    }

    pub fn mask(&self) -> Option<u64> {
        self.effective_location().map(BitField::mask)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrDef {
    pub name: String,
    pub address: u32,
    pub fields: BTreeMap<String, CsrField>,
}

impl CsrDef {
    pub fn new(name: impl Into<String>, address: u32) -> Self {
        Self {
            name: name.into(),
            address,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: CsrField) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Identifier of the address constant.
    pub fn symbol(&self) -> String {
        symbol_name(&self.name)
    }

    /// Identifier of a field mask constant.
    pub fn field_symbol(&self, field: &str) -> String {
        format!("{}_{}", self.symbol().to_uppercase(), field)
    }

    pub fn field(&self, name: &str) -> Option<&CsrField> {
        self.fields.get(name)
    }
}

/// Immutable CSR table. Semantics may name a CSR either by its definition name or by its symbol,
/// so both resolve.
#[derive(Debug, Clone, Default)]
pub struct CsrTable {
    csrs: BTreeMap<String, CsrDef>,
    by_symbol: AHashMap<String, String>,
}

impl CsrTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `csr`, returning the definition it replaced.
    pub fn insert(&mut self, csr: CsrDef) -> Option<CsrDef> {
        self.by_symbol.insert(csr.symbol(), csr.name.clone());
        self.csrs.insert(csr.name.clone(), csr)
    }

    pub fn get(&self, name: &str) -> Option<&CsrDef> {
        self.csrs.get(name).or_else(|| {
            self.by_symbol
                .get(name)
                .and_then(|canonical| self.csrs.get(canonical))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.csrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.csrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CsrDef> {
        self.csrs.values()
    }

    /// Emits the address constant of every CSR followed by the mask of every field. `time` gets
    /// no address constant; the runtime already declares it.
    pub fn render_constants(&self) -> String {
        let mut out = String::new();
        for csr in self.iter().filter(|csr| !ADDRESSLESS_CSRS.contains(&csr.name.as_str())) {
            let _ = writeln!(out, "const uint32_t {} = {:#x};", csr.symbol(), csr.address);
        }
        for csr in self.iter() {
            for field in csr.fields.values() {
                if let Some(mask) = field.mask() {
                    let _ = writeln!(out, "#define {} {:#x}", csr.field_symbol(&field.name), mask);
                }
            }
        }
        out
    }
}

impl FromIterator<CsrDef> for CsrTable {
    fn from_iter<I: IntoIterator<Item = CsrDef>>(iter: I) -> Self {
        let mut table = CsrTable::new();
        for csr in iter {
            table.insert(csr);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, location: &str) -> CsrField {
        CsrField {
            name: name.to_string(),
            location: Some(BitField::from_location(location).expect("location")),
            ..CsrField::default()
        }
    }

    #[test]
    fn lookup_accepts_name_or_symbol() {
        let table: CsrTable = [CsrDef::new("qc.mmcr", 0x7c0)].into_iter().collect();
        assert!(table.contains("qc.mmcr"));
        assert!(table.contains("qc_mmcr"));
        assert!(!table.contains("mstatus"));
    }

    #[test]
    fn time_has_masks_but_no_address_constant() {
        let table: CsrTable = [
            CsrDef::new("time", 0xc01).with_field(field("LOW", "3-0")),
            CsrDef::new("qc.mmcr", 0x7c0),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            table.render_constants(),
            "const uint32_t qc_mmcr = 0x7c0;\n#define TIME_LOW 0xf\n"
        );
    }

    #[test]
    fn constants_list_addresses_then_masks() {
        let table: CsrTable = [CsrDef::new("qc.mmcr", 0x7c0)
            .with_field(field("MODE", "3-1"))
            .with_field(CsrField {
                name: "WIDE".into(),
                location_rv32: Some(BitField::from_location("31").expect("rv32")),
                location_rv64: Some(BitField::from_location("63").expect("rv64")),
                ..CsrField::default()
            })]
        .into_iter()
        .collect();
        assert_eq!(
            table.render_constants(),
            "const uint32_t qc_mmcr = 0x7c0;\n#define QC_MMCR_MODE 0xe\n#define QC_MMCR_WIDE 0x80000000\n"
        );
    }
}
