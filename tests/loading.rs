mod common;

use std::fs;

use isagen::loader::isa::IsaLoader;
use isagen::soc::isa::catalog::InstructionFilter;
use isagen::soc::isa::error::IsaError;
use isagen::soc::isa::semantics::{Lowerer, LoweringOptions, LoweringTarget};

#[test]
fn broken_definitions_are_isolated() {
    let report = common::load_report("broken", InstructionFilter::default());
    assert!(report.has_errors());
    assert_eq!(
        report.catalog.instructions().map(|i| i.name.as_str()).collect::<Vec<_>>(),
        vec!["qc.good"]
    );
    let codes: Vec<&str> = report.diagnostics.iter().map(|d| d.code).collect();
    assert!(codes.contains(&"loading.yaml"), "{codes:?}");
    assert!(codes.contains(&"validation.field.overlap"), "{codes:?}");
    assert!(codes.contains(&"validation.field.location"), "{codes:?}");
    assert!(codes.contains(&"validation.csr.field-location"), "{codes:?}");

    let overlap = report
        .diagnostics
        .iter()
        .find(|d| d.code == "validation.field.overlap")
        .and_then(|d| d.span.as_ref())
        .expect("overlap span");
    assert_eq!(overlap.instruction.as_deref(), Some("qc.overlap"));
    assert!(overlap.path.as_ref().is_some_and(|p| p.ends_with("overlap.yaml")));
}

#[test]
fn skipped_instructions_are_never_validated() {
    let mut filter = InstructionFilter::default();
    filter.skip.insert("qc.overlap".to_string());
    filter.skip.insert("qc.wide".to_string());
    let report = common::load_report("broken", filter);
    let codes: Vec<&str> = report.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["loading.yaml", "validation.csr.field-location"]);
}

#[test]
fn out_of_range_locations_do_not_stop_the_batch() {
    let report = common::load_report("broken", InstructionFilter::default());
    let wide = report
        .diagnostics
        .iter()
        .filter(|d| d.message.contains("outside the 64-bit codec"))
        .count();
    assert_eq!(wide, 2, "{:?}", report.diagnostics);

    let catalog = &report.catalog;
    assert!(catalog.get("qc.wide").is_none());
    assert_eq!(catalog.csrs().len(), 1);
    assert_eq!(
        catalog.csrs().render_constants(),
        "const uint32_t qc_ok = 0x7d0;\n#define QC_OK_EN 0x1\n"
    );

    let lowered = Lowerer::new(catalog.csrs(), LoweringOptions::default())
        .lower_catalog(catalog, LoweringTarget::Execution);
    assert_eq!(lowered.len(), 1);
    assert_eq!(lowered[0].body, "xqci_set_gpr_xreg(rd, 0);\n");
}

#[test]
fn assembled_words_decode_back_to_their_operands() {
    let catalog = common::xqci_catalog();
    let bnei = catalog.get("qc.bnei").expect("qc.bnei");
    let word = bnei.assemble(&[-8, 3, 5]).expect("assemble");
    assert_eq!(word, 0xFE32_EE7B);
    assert_eq!(bnei.operands(word), vec![("offset", -8), ("imm", 3), ("rs1", 5)]);
    assert_eq!(bnei.encode_bytes(word), vec![0x7B, 0xEE, 0x32, 0xFE]);

    let err = bnei.assemble(&[0]).expect_err("operand count");
    assert!(matches!(err, IsaError::OperandCount { expected: 3, got: 1, .. }), "{err:?}");

    let lw = catalog.get("lw").expect("lw");
    let err = lw.assemble(&[0, 0, 1]).expect_err("rd may not be x0");
    assert!(matches!(err, IsaError::ExcludedOperand { value: 0, .. }), "{err:?}");
}

#[test]
fn missing_directory_fails_the_load() {
    let _guard = common::serial();
    let root = std::env::temp_dir().join("isagen-missing-defs");
    let _ = fs::remove_dir_all(&root);
    let err = IsaLoader::new()
        .load_catalog(Some(root.as_path()), &[])
        .expect_err("missing directory");
    assert!(matches!(err, IsaError::Io(_)), "{err:?}");
}

#[test]
fn only_yaml_files_are_read() {
    let _guard = common::serial();
    let root = std::env::temp_dir().join("isagen-mixed-defs");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).expect("mkdir");
    fs::write(root.join("notes.txt"), "not yaml").expect("write notes");
    fs::write(
        root.join("qc.nop.yaml"),
        "name: qc.nop\nencoding:\n  match: \"0000000000000001\"\noperation(): \"\"\n",
    )
    .expect("write def");

    let report = IsaLoader::new().load_catalog(Some(root.as_path()), &[]).expect("load");
    assert!(!report.has_errors(), "{:?}", report.diagnostics);
    assert_eq!(report.catalog.len(), 1);
    let _ = fs::remove_dir_all(&root);
}
