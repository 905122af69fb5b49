//! Validated instruction-set model and the stages built on it: decode-table synthesis and
//! semantics lowering.

pub mod bitfield;
pub mod catalog;
pub mod classify;
pub mod csr;
pub mod decode;
pub mod diagnostic;
pub mod error;
pub mod instruction;
pub mod semantics;
pub mod validator;

pub use bitfield::{BitField, BitRange};
pub use catalog::{Catalog, InstructionFilter};
pub use classify::{FieldKind, classify_field, classify_instruction};
pub use csr::{CsrDef, CsrField, CsrTable};
pub use decode::{ClusterStrategy, DecodeTable, SynthesisOptions, synthesize};
pub use diagnostic::{DiagnosticLevel, DiagnosticPhase, IsaDiagnostic, SourceSpan};
pub use error::IsaError;
pub use instruction::{Encoding, Field, InstructionDef, TemplateBit};
pub use semantics::{Lowerer, LoweringOptions, LoweringTarget, lower};
pub use validator::Validator;
