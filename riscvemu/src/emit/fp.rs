//! Floating-point arithmetic (spec §4.3 "Floating-point arithmetic"). Most
//! FP ops are named calls into an external helper (the body is genuinely
//! unmodeled, per §6); `FSGNJ[N|X]` and `FMV.X.*`/`FMV.*.X` are emitted
//! inline since they are bit-level moves, not arithmetic.

use super::memory::emit_fs_guard;
use super::Emitter;
use crate::decode::{FmaKind, FpOpKind, FpWidth};
use crate::ir::{AluOp, HelperSymbol, IrBuilder};

fn helper_for(kind: FpOpKind, width: FpWidth) -> Option<HelperSymbol> {
    use FpOpKind::*;
    use FpWidth::*;
    use HelperSymbol as H;
    Some(match (kind, width) {
        (Add, Single) => H::FaddS,
        (Add, Double) => H::FaddD,
        (Sub, Single) => H::FsubS,
        (Sub, Double) => H::FsubD,
        (Mul, Single) => H::FmulS,
        (Mul, Double) => H::FmulD,
        (Div, Single) => H::FdivS,
        (Div, Double) => H::FdivD,
        (Sqrt, Single) => H::FsqrtS,
        (Sqrt, Double) => H::FsqrtD,
        (Min, Single) => H::FminS,
        (Min, Double) => H::FminD,
        (Max, Single) => H::FmaxS,
        (Max, Double) => H::FmaxD,
        (Eq, Single) => H::FeqS,
        (Eq, Double) => H::FeqD,
        (Lt, Single) => H::FltS,
        (Lt, Double) => H::FltD,
        (Le, Single) => H::FleS,
        (Le, Double) => H::FleD,
        (Class, Single) => H::FclassS,
        (Class, Double) => H::FclassD,
        (CvtToInt { unsigned, wide }, Single) => match (unsigned, wide) {
            (false, false) => H::FcvtWS,
            (true, false) => H::FcvtWuS,
            (false, true) => H::FcvtLS,
            (true, true) => H::FcvtLuS,
        },
        (CvtToInt { unsigned, wide }, Double) => match (unsigned, wide) {
            (false, false) => H::FcvtWD,
            (true, false) => H::FcvtWuD,
            (false, true) => H::FcvtLD,
            (true, true) => H::FcvtLuD,
        },
        (CvtFromInt { unsigned, wide }, Single) => match (unsigned, wide) {
            (false, false) => H::FcvtSW,
            (true, false) => H::FcvtSWu,
            (false, true) => H::FcvtSL,
            (true, true) => H::FcvtSLu,
        },
        (CvtFromInt { unsigned, wide }, Double) => match (unsigned, wide) {
            (false, false) => H::FcvtDW,
            (true, false) => H::FcvtDWu,
            (false, true) => H::FcvtDL,
            (true, true) => H::FcvtDLu,
        },
        (CvtFmt, Single) => H::FcvtSD,
        (CvtFmt, Double) => H::FcvtDS,
        (SgnJ | SgnJn | SgnJx | MvToInt | MvFromInt, _) => return None,
    })
}

fn fma_helper(kind: FmaKind, width: FpWidth) -> HelperSymbol {
    use HelperSymbol as H;
    match (kind, width) {
        (FmaKind::Madd, FpWidth::Single) => H::FmaddS,
        (FmaKind::Madd, FpWidth::Double) => H::FmaddD,
        (FmaKind::Msub, FpWidth::Single) => H::FmsubS,
        (FmaKind::Msub, FpWidth::Double) => H::FmsubD,
        (FmaKind::Nmsub, FpWidth::Single) => H::FnmsubS,
        (FmaKind::Nmsub, FpWidth::Double) => H::FnmsubD,
        (FmaKind::Nmadd, FpWidth::Single) => H::FnmaddS,
        (FmaKind::Nmadd, FpWidth::Double) => H::FnmaddD,
    }
}

/// Sign-bit mask for `FSGNJ` family: `INT32_MIN` for single, `INT64_MIN`
/// for double (spec §4.3).
fn sign_bit_mask(width: FpWidth) -> u64 {
    match width {
        FpWidth::Single => 0x8000_0000u64,
        FpWidth::Double => 0x8000_0000_0000_0000u64,
    }
}

pub fn emit_fp_op<B: IrBuilder>(e: &mut Emitter<B>, kind: FpOpKind, width: FpWidth, rd: u8, rs1: u8, rs2: u8, rm: u32) {
    emit_fs_guard(e);
    match kind {
        FpOpKind::SgnJ | FpOpKind::SgnJn | FpOpKind::SgnJx => emit_fsgnj(e, kind, width, rd, rs1, rs2),
        FpOpKind::MvToInt => {
            let v = e.builder.read_fpr(rs1);
            let v = match width {
                FpWidth::Single => e.builder.sext32(v),
                FpWidth::Double => v,
            };
            e.builder.write_gpr(rd, v);
        }
        FpOpKind::MvFromInt => {
            let v = e.builder.read_gpr(rs1);
            let v = match width {
                // NaN-box: set the upper 32 bits so a single-width value
                // stored in a 64-bit FPR reads back as a canonical NaN if
                // ever interpreted at double width.
                FpWidth::Single => {
                    let low_mask = e.builder.const_temp(0xFFFF_FFFFu64);
                    let nan_box = e.builder.const_temp(0xFFFF_FFFF_0000_0000u64);
                    let low = e.builder.alu2(AluOp::And, v, low_mask);
                    e.builder.alu2(AluOp::Or, low, nan_box)
                }
                FpWidth::Double => v,
            };
            e.builder.write_fpr(rd, v);
        }
        _ => {
            let a = e.builder.read_fpr(rs1);
            let helper = helper_for(kind, width).expect("inline forms handled above");
            let args = match kind {
                FpOpKind::Sqrt | FpOpKind::Class | FpOpKind::CvtToInt { .. } | FpOpKind::CvtFmt => {
                    let rm_t = e.builder.const_temp(rm as u64);
                    vec![a, rm_t]
                }
                FpOpKind::CvtFromInt { .. } => {
                    let src = e.builder.read_gpr(rs1);
                    let rm_t = e.builder.const_temp(rm as u64);
                    vec![src, rm_t]
                }
                _ => {
                    let b = e.builder.read_fpr(rs2);
                    let rm_t = e.builder.const_temp(rm as u64);
                    vec![a, b, rm_t]
                }
            };
            let result = e.builder.call_helper(helper, &args).expect("FP helper always returns a result temp");
            match kind {
                FpOpKind::Eq | FpOpKind::Lt | FpOpKind::Le | FpOpKind::Class | FpOpKind::CvtToInt { .. } => {
                    e.builder.write_gpr(rd, result)
                }
                _ => e.builder.write_fpr(rd, result),
            }
        }
    }
}

fn emit_fsgnj<B: IrBuilder>(e: &mut Emitter<B>, kind: FpOpKind, width: FpWidth, rd: u8, rs1: u8, rs2: u8) {
    let a = e.builder.read_fpr(rs1);
    let b = e.builder.read_fpr(rs2);
    let mask = e.builder.const_temp(sign_bit_mask(width));
    let not_mask = e.builder.const_temp(!sign_bit_mask(width));
    let a_mag = e.builder.alu2(AluOp::And, a, not_mask);
    let result = match kind {
        FpOpKind::SgnJ => {
            let b_sign = e.builder.alu2(AluOp::And, b, mask);
            e.builder.alu2(AluOp::Or, a_mag, b_sign)
        }
        FpOpKind::SgnJn => {
            let b_sign = e.builder.alu2(AluOp::And, b, mask);
            let flipped = e.builder.alu2(AluOp::Xor, b_sign, mask);
            e.builder.alu2(AluOp::Or, a_mag, flipped)
        }
        FpOpKind::SgnJx => {
            let a_sign = e.builder.alu2(AluOp::And, a, mask);
            let b_sign = e.builder.alu2(AluOp::And, b, mask);
            let xored = e.builder.alu2(AluOp::Xor, a_sign, b_sign);
            e.builder.alu2(AluOp::Or, a_mag, xored)
        }
        _ => unreachable!("emit_fsgnj only called for the three FSGNJ kinds"),
    };
    e.builder.write_fpr(rd, result);
}

pub fn emit_fp_fma<B: IrBuilder>(
    e: &mut Emitter<B>,
    kind: FmaKind,
    width: FpWidth,
    rd: u8,
    rs1: u8,
    rs2: u8,
    rs3: u8,
    rm: u32,
) {
    emit_fs_guard(e);
    let a = e.builder.read_fpr(rs1);
    let b = e.builder.read_fpr(rs2);
    let c = e.builder.read_fpr(rs3);
    let rm_t = e.builder.const_temp(rm as u64);
    let helper = fma_helper(kind, width);
    let result = e.builder.call_helper(helper, &[a, b, c, rm_t]).expect("FMA helper always returns a result temp");
    e.builder.write_fpr(rd, result);
}
