//! `isagen` compiles YAML instruction definitions into decodetree tables and lowered semantics
//! for a downstream emulator generator.

pub mod loader;
pub mod soc;
