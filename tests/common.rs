#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};

use isagen::loader::isa::{IsaLoader, LoadReport};
use isagen::soc::isa::catalog::{Catalog, InstructionFilter};

/// Global mutex to serialize integration tests that write into the shared output directory.
pub fn serial() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner())
}

/// Path of a fixture set under `defs/`.
pub fn defs(set: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("defs").join(set)
}

pub fn load_report(set: &str, filter: InstructionFilter) -> LoadReport {
    let root = defs(set);
    let csr_dir = root.join("csr");
    let csr_dirs: Vec<PathBuf> = csr_dir.is_dir().then_some(csr_dir).into_iter().collect();
    IsaLoader::new()
        .with_filter(filter)
        .load_catalog(Some(root.join("inst").as_path()), &csr_dirs)
        .unwrap_or_else(|err| panic!("load {set}: {err}"))
}

/// The Xqci fixture catalog with its CSRs and the Xqci filter preset.
pub fn xqci_catalog() -> Catalog {
    load_report("xqci", InstructionFilter::xqci())
        .into_result()
        .unwrap_or_else(|err| panic!("xqci fixtures should validate: {err}"))
}
