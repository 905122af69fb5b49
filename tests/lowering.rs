mod common;

use isagen::soc::isa::bitfield::sign_extend;
use isagen::soc::isa::semantics::{Lowerer, LoweringOptions, LoweringTarget, lower};

#[test]
fn decode_only_instructions_are_not_lowered() {
    let catalog = common::xqci_catalog();
    let lowerer = Lowerer::new(catalog.csrs(), LoweringOptions::default());
    let names: Vec<String> = lowerer
        .lower_catalog(&catalog, LoweringTarget::Execution)
        .into_iter()
        .map(|instr| instr.name)
        .collect();
    assert_eq!(
        names,
        vec!["lw", "qc.addsat", "qc.bnei", "qc.c.ei", "qc.c.muliadd", "qc.mmcr.write"]
    );
}

#[test]
fn fixtures_lower_without_gaps_and_idempotently() {
    let catalog = common::xqci_catalog();
    let lowerer = Lowerer::new(catalog.csrs(), LoweringOptions::default());
    for target in [LoweringTarget::Execution, LoweringTarget::Symbolic] {
        for lowered in lowerer.lower_catalog(&catalog, target) {
            assert!(
                lowered.diagnostics.is_empty(),
                "{} ({target}): {:?}",
                lowered.name,
                lowered.diagnostics
            );
            let again = lowerer.lower_text(&lowered.body, target, Some(lowered.name.as_str()));
            assert_eq!(
                again.text, lowered.body,
                "{} ({target}) is not a fixed point",
                lowered.name
            );
        }
    }
}

#[test]
fn saturating_add_lowers_for_execution() {
    let catalog = common::xqci_catalog();
    let lowerer = Lowerer::new(catalog.csrs(), LoweringOptions::default());
    let addsat = lowerer.lower_instruction(
        catalog.get("qc.addsat").expect("qc.addsat"),
        LoweringTarget::Execution,
    );
    assert_eq!(
        addsat.body,
        "if (xqci_implemented_Xqcia() == false) {\n\
         \x20 xqci_raise_IllegalInstruction();\n\
         }\n\
         // widen before saturating\n\
         Bits<MXLEN+1> sum = wide_add(X[rs1], X[rs2]);\n\
         xqci_set_gpr_xreg(rd, sum);\n"
    );
}

#[test]
fn symbolic_target_keeps_register_writes_and_traces_jumps() {
    let catalog = common::xqci_catalog();
    let lowerer = Lowerer::new(catalog.csrs(), LoweringOptions::default());

    let csr = lowerer.lower_instruction(
        catalog.get("qc.mmcr.write").expect("qc.mmcr.write"),
        LoweringTarget::Symbolic,
    );
    assert_eq!(
        csr.body,
        "xqci_csrw_field_xreg(env, qc_mmcr, QC_MMCR_MODE, X[rs1]);\nX[rd] = xqci_csrr_xreg(env, qc_mmcr);\n"
    );

    let branch = lowerer.lower_instruction(
        catalog.get("qc.bnei").expect("qc.bnei"),
        LoweringTarget::Symbolic,
    );
    assert_eq!(
        branch.body,
        "if (X[rs1] != _signed(imm)) {\n  xqci_traced_jump_pcrel(_signed(offset));\n}\n"
    );
}

#[test]
fn compressed_registers_render_as_host_integers() {
    let catalog = common::xqci_catalog();
    let lowerer = Lowerer::new(catalog.csrs(), LoweringOptions::default());
    let muliadd = lowerer.lower_instruction(
        catalog.get("qc.c.muliadd").expect("qc.c.muliadd"),
        LoweringTarget::Execution,
    );
    assert_eq!(
        muliadd.render_function(),
        "void qc_c_muliadd(Bits<5> uimm, uint8_t rs1, uint8_t rd) {\n\
         \x20   xqci_set_gpr_xreg(creg2reg(rd), X[creg2reg(rd)] + (X[creg2reg(rs1)] * uimm));\n\
         }\n"
    );
}

#[test]
fn shifted_immediates_are_restored_on_entry() {
    let catalog = common::xqci_catalog();
    let bnei = catalog.get("qc.bnei").expect("qc.bnei");
    let lowered = Lowerer::new(catalog.csrs(), LoweringOptions::default())
        .lower_instruction(bnei, LoweringTarget::Execution);
    assert_eq!(
        lowered.render_function(),
        "void qc_bnei(Bits<13> offset, Bits<5> imm, uint8_t rs1) {\n\
         \x20   offset = offset << 1;\n\
         \x20   if (X[rs1] != _signed(imm)) {\n\
         \x20     xqci_jump_pcrel(_signed(offset));\n\
         \x20   }\n\
         }\n"
    );

    // The most negative branch offset still fits the widened parameter.
    let word = bnei.assemble(&[-4096, 0, 1]).expect("assemble");
    let raw = bnei.fields()[0].decode(word);
    assert_eq!(sign_extend(raw << 1, 13), -4096);
    assert_eq!(bnei.operands(word)[0], ("offset", -4096));
}

#[test]
fn unknown_constructs_pass_through_with_a_diagnostic() {
    let catalog = common::xqci_catalog();
    let lowered = lower("x = a `* b;\n", catalog.csrs(), LoweringTarget::Execution);
    assert_eq!(lowered.text, "x = a `* b;\n");
    let codes: Vec<&str> = lowered.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["lowering.residual"]);
}

#[test]
fn csr_constants_cover_addresses_and_field_masks() {
    let catalog = common::xqci_catalog();
    assert_eq!(
        catalog.csrs().render_constants(),
        "const uint32_t qc_mmcr = 0x7c0;\n\
         const uint32_t qc_mstktopaddr = 0x7c5;\n\
         #define QC_MMCR_EN 0x80000000\n\
         #define QC_MMCR_MODE 0x3\n"
    );
}
