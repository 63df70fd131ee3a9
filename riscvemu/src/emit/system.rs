//! CSR/SYSTEM group and vector-configuration emission (spec §4.3 "CSR /
//! SYSTEM group", "Vector helpers").

use super::{BlockState, DecoderContext, Emitter};
use crate::csr::decode_csr_address;
use crate::decode::{CsrKind, CsrSrc, SystemKind, VecSrc1, VectorOp, VectorOpKind};
use crate::ir::{ExceptionCause, HelperSymbol, IrBuilder};

pub fn emit_illegal<B: IrBuilder>(e: &mut Emitter<B>, ctx: &mut DecoderContext) {
    e.builder.raise_exception(ExceptionCause::IllegalInstruction);
    ctx.bstate = BlockState::Stop;
}

pub fn emit_fence_i<B: IrBuilder>(e: &mut Emitter<B>, ctx: &mut DecoderContext) {
    e.builder.call_helper(HelperSymbol::FenceI, &[]);
    ctx.bstate = BlockState::Stop;
}

/// `ECALL`/`EBREAK`/`SRET`/`MRET`/`WFI`/`SFENCE.VMA`/`CSRRW/S/C[I]` (spec
/// §4.3). All forms terminate the block: the CSR forms because a write may
/// change privilege or mapping affecting subsequent decode, the rest
/// because they are themselves control transfers or privileged no-ops that
/// must re-enter the execution engine.
pub fn emit_system<B: IrBuilder>(e: &mut Emitter<B>, ctx: &mut DecoderContext, kind: &SystemKind) {
    match kind {
        SystemKind::Ecall => e.builder.raise_exception(ExceptionCause::EnvironmentCallFromMMode),
        SystemKind::Ebreak => e.builder.raise_exception(ExceptionCause::Breakpoint),
        SystemKind::Sret => {
            e.builder.call_helper(HelperSymbol::Sret, &[]);
        }
        SystemKind::Mret => {
            e.builder.call_helper(HelperSymbol::Mret, &[]);
        }
        SystemKind::Wfi => {
            e.builder.set_pc_const(ctx.next_pc);
            e.builder.call_helper(HelperSymbol::Wfi, &[]);
        }
        SystemKind::SfenceVma => {
            e.builder.call_helper(HelperSymbol::TlbFlush, &[]);
        }
        SystemKind::FenceI => {
            e.builder.call_helper(HelperSymbol::FenceI, &[]);
        }
        SystemKind::Csr { kind, csr, rd, src } => emit_csr(e, *kind, *csr, *rd, *src),
    }
    ctx.bstate = BlockState::Stop;
}

fn emit_csr<B: IrBuilder>(e: &mut Emitter<B>, kind: CsrKind, csr: u16, rd: u8, src: CsrSrc) {
    let addr = decode_csr_address(csr as u32);
    let addr_t = e.builder.const_temp(addr.0 as u64);
    let operand = match src {
        CsrSrc::Reg(r) => e.builder.read_gpr(r),
        CsrSrc::Imm(imm) => e.builder.const_temp(imm as u64),
    };
    let (reg_helper, imm_helper) = match kind {
        CsrKind::Rw => (HelperSymbol::CsrRw, HelperSymbol::CsrRwi),
        CsrKind::Rs => (HelperSymbol::CsrRs, HelperSymbol::CsrRsi),
        CsrKind::Rc => (HelperSymbol::CsrRc, HelperSymbol::CsrRci),
    };
    let helper = match src {
        CsrSrc::Reg(_) => reg_helper,
        CsrSrc::Imm(_) => imm_helper,
    };
    let prior = e.builder.call_helper(helper, &[addr_t, operand]).expect("CSR helper always yields the prior value");
    e.builder.write_gpr(rd, prior);
}

/// `vsetvl`/`vsetvli`/`vsetivli`: lowered to a `helper_vsetvl` call carrying
/// the AVL source and raw `vtype` bits (spec §4.3). This crate's
/// [`crate::vector::config::helper_vsetvl`] implements what the helper
/// computes at runtime; the emitter's job is only to describe the call.
pub fn emit_vsetvl<B: IrBuilder>(e: &mut Emitter<B>, ctx: &mut DecoderContext, rd: u8, rs1_is_imm: bool, rs1_or_avl: u8, zimm_vtype: u32) {
    let avl_kind = e.builder.const_temp(rs1_is_imm as u64);
    let avl_operand = if rs1_is_imm {
        e.builder.const_temp(rs1_or_avl as u64)
    } else {
        e.builder.read_gpr(rs1_or_avl)
    };
    let vtype_t = e.builder.const_temp(zimm_vtype as u64);
    let rd_is_x0 = e.builder.const_temp((rd == 0) as u64);
    let result = e
        .builder
        .call_helper(HelperSymbol::HelperVsetVl, &[avl_kind, avl_operand, vtype_t, rd_is_x0])
        .expect("helper_vsetvl always returns the new vl");
    e.builder.write_gpr(rd, result);
    ctx.bstate = BlockState::Stop;
}

/// Elementwise RVV instructions (spec §4.3 "Elementwise move/merge",
/// "vcompress.vm", "Add/sub with carry/borrow masks"): each lowers to a
/// call to its corresponding `helper_v*` symbol, real bodies for which live
/// in [`crate::vector`].
pub fn emit_vector<B: IrBuilder>(e: &mut Emitter<B>, _ctx: &mut DecoderContext, op: &VectorOp) {
    let vd_t = e.builder.const_temp(op.vd as u64);
    let vs2_t = e.builder.const_temp(op.vs2 as u64);
    let vm_t = e.builder.const_temp(op.vm as u64);
    let src1_t = match op.src1 {
        VecSrc1::Vreg(r) => e.builder.const_temp(r as u64),
        VecSrc1::Imm(i) => e.builder.const_temp(i as i64 as u64),
        VecSrc1::Xreg(r) => e.builder.read_gpr(r),
    };
    match op.kind {
        VectorOpKind::Move => {
            e.builder.call_helper(HelperSymbol::HelperVmv, &[vd_t, src1_t]);
        }
        VectorOpKind::Merge => {
            e.builder.call_helper(HelperSymbol::HelperVmerge, &[vd_t, vs2_t, src1_t, vm_t]);
        }
        VectorOpKind::Compress => {
            e.builder.call_helper(HelperSymbol::HelperVcompress, &[vd_t, vs2_t, src1_t]);
        }
        VectorOpKind::Adc => {
            e.builder.call_helper(HelperSymbol::HelperVadc, &[vd_t, vs2_t, src1_t]);
        }
        VectorOpKind::Sbc => {
            e.builder.call_helper(HelperSymbol::HelperVsbc, &[vd_t, vs2_t, src1_t]);
        }
        VectorOpKind::Madc { has_carry_in } => {
            let carry_t = e.builder.const_temp(has_carry_in as u64);
            e.builder.call_helper(HelperSymbol::HelperVmadc, &[vd_t, vs2_t, src1_t, carry_t]);
        }
        VectorOpKind::Msbc { has_carry_in } => {
            let carry_t = e.builder.const_temp(has_carry_in as u64);
            e.builder.call_helper(HelperSymbol::HelperVmsbc, &[vd_t, vs2_t, src1_t, carry_t]);
        }
    }
}
