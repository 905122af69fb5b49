//! Raw YAML shapes of instruction and CSR definition files. These mirror the source documents
//! one-to-one and carry no invariants; the validator turns them into the checked model.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct InstructionSource {
    pub name: String,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "definedBy", default)]
    pub defined_by: Option<DefinedBy>,
    #[serde(default)]
    pub assembly: Option<String>,
    pub encoding: EncodingSource,
    #[serde(rename = "operation()", default)]
    pub operation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodingSource {
    #[serde(rename = "match")]
    pub pattern: String,
    #[serde(default)]
    pub variables: Vec<VariableSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSource {
    pub name: String,
    pub location: Location,
    #[serde(default)]
    pub sign_extend: bool,
    #[serde(default)]
    pub left_shift: u32,
    #[serde(rename = "not", default)]
    pub excluded: Option<Excluded>,
}

/// Locations are usually strings (`31-20`, `12|6-2`), but single-bit locations may be plain
/// YAML integers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Bit(u32),
    Text(String),
}

impl Location {
    pub fn to_text(&self) -> String {
        match self {
            Location::Bit(bit) => bit.to_string(),
            Location::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Excluded {
    One(u64),
    Many(Vec<u64>),
}

impl Excluded {
    pub fn values(&self) -> Vec<u64> {
        match self {
            Excluded::One(value) => vec![*value],
            Excluded::Many(values) => values.clone(),
        }
    }
}

/// Extension requirement of an instruction.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DefinedBy {
    Name(String),
    Extension {
        name: String,
    },
    AnyOf {
        #[serde(rename = "anyOf")]
        any_of: Vec<DefinedBy>,
    },
    AllOf {
        #[serde(rename = "allOf")]
        all_of: Vec<DefinedBy>,
    },
}

impl DefinedBy {
    /// Every extension named anywhere in the requirement, in document order.
    pub fn extensions(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<String>) {
        match self {
            DefinedBy::Name(name) | DefinedBy::Extension { name } => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            DefinedBy::AnyOf { any_of: list } | DefinedBy::AllOf { all_of: list } => {
                for item in list {
                    item.collect(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsrSource {
    pub name: String,
    pub address: CsrAddress,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, CsrFieldSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CsrAddress {
    Number(u32),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CsrFieldSource {
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub location_rv32: Option<Location>,
    #[serde(default)]
    pub location_rv64: Option<Location>,
    #[serde(default)]
    pub description: Option<String>,
}
