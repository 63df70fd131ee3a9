//! Add/sub-with-carry vector helpers (spec §4.3 "Add/sub with carry/borrow
//! masks").

use super::arith::ElementSource;
use super::{require_aligned, require_vec, VectorCsrState, VectorRegisterFile, MASK_REGISTER};
use crate::error::VectorError;

fn read_source(regs: &VectorRegisterFile, src: ElementSource, i: u32, vsew: u32) -> Result<u64, VectorError> {
    match src {
        ElementSource::Vreg(r) => regs.read_element(r, i, vsew),
        ElementSource::Scalar(v) => Ok(v),
    }
}

/// Full-width add: returns `(wrapped_result, carry_out)`. Computed in
/// `u128` rather than by comparing the truncated result against an operand,
/// which would miss the boundary case where `vs2[i] == all-ones` and
/// `carry_in == 1` (spec §4.3: "including the boundary case where
/// `carry && result+1 == 0`") — the wide add makes that case fall out for
/// free instead of needing special-casing.
fn add_with_carry(a: u64, b: u64, carry_in: bool, vsew: u32) -> (u64, bool) {
    let modulus = 1u128 << vsew;
    let full = a as u128 + b as u128 + carry_in as u128;
    ((full % modulus) as u64, full >= modulus)
}

/// Full-width subtract: returns `(wrapped_result, borrow_out)`.
fn sub_with_borrow(a: u64, b: u64, borrow_in: bool, vsew: u32) -> (u64, bool) {
    let modulus = 1i128 << vsew;
    let diff = a as i128 - b as i128 - borrow_in as i128;
    let borrow = diff < 0;
    let wrapped = diff.rem_euclid(modulus) as u64;
    (wrapped, borrow)
}

/// `vadc.vvm`/`vadc.vim`: add with carry-in read from mask register v0,
/// writing the value result to `vd`.
pub fn vadc(
    regs: &mut VectorRegisterFile,
    csr: &VectorCsrState,
    vd: u8,
    vs2: u8,
    src1: ElementSource,
    vs_enabled: bool,
) -> Result<(), VectorError> {
    require_vec(vs_enabled)?;
    require_aligned(vd, csr)?;
    require_aligned(vs2, csr)?;
    for i in csr.vstart..csr.vl {
        let a = regs.read_element(vs2, i, csr.vsew)?;
        let b = read_source(regs, src1, i, csr.vsew)?;
        let carry_in = regs.read_mask_bit(MASK_REGISTER, i);
        let (result, _) = add_with_carry(a, b, carry_in, csr.vsew);
        regs.write_element(vd, i, csr.vsew, result)?;
    }
    Ok(())
}

/// `vsbc.vvm`/`vsbc.vim`: subtract with borrow-in read from mask register v0.
pub fn vsbc(
    regs: &mut VectorRegisterFile,
    csr: &VectorCsrState,
    vd: u8,
    vs2: u8,
    src1: ElementSource,
    vs_enabled: bool,
) -> Result<(), VectorError> {
    require_vec(vs_enabled)?;
    require_aligned(vd, csr)?;
    require_aligned(vs2, csr)?;
    for i in csr.vstart..csr.vl {
        let a = regs.read_element(vs2, i, csr.vsew)?;
        let b = read_source(regs, src1, i, csr.vsew)?;
        let borrow_in = regs.read_mask_bit(MASK_REGISTER, i);
        let (result, _) = sub_with_borrow(a, b, borrow_in, csr.vsew);
        regs.write_element(vd, i, csr.vsew, result)?;
    }
    Ok(())
}

/// `vmadc.vv/vvm/vi/vim`: produce the add-overflow mask into `vd` (a mask
/// register), optionally consuming a carry-in when `has_carry_in`.
pub fn vmadc(
    regs: &mut VectorRegisterFile,
    csr: &VectorCsrState,
    vd: u8,
    vs2: u8,
    src1: ElementSource,
    has_carry_in: bool,
    vs_enabled: bool,
) -> Result<(), VectorError> {
    require_vec(vs_enabled)?;
    require_aligned(vs2, csr)?;
    regs.zero_mask_prefix(vd, csr.vl);
    for i in csr.vstart..csr.vl {
        let a = regs.read_element(vs2, i, csr.vsew)?;
        let b = read_source(regs, src1, i, csr.vsew)?;
        let carry_in = has_carry_in && regs.read_mask_bit(MASK_REGISTER, i);
        let (_, carry_out) = add_with_carry(a, b, carry_in, csr.vsew);
        regs.write_mask_bit(vd, i, carry_out);
    }
    Ok(())
}

/// `vmsbc.vv/vvm/vi/vim`: produce the subtract-overflow (borrow) mask.
pub fn vmsbc(
    regs: &mut VectorRegisterFile,
    csr: &VectorCsrState,
    vd: u8,
    vs2: u8,
    src1: ElementSource,
    has_carry_in: bool,
    vs_enabled: bool,
) -> Result<(), VectorError> {
    require_vec(vs_enabled)?;
    require_aligned(vs2, csr)?;
    regs.zero_mask_prefix(vd, csr.vl);
    for i in csr.vstart..csr.vl {
        let a = regs.read_element(vs2, i, csr.vsew)?;
        let b = read_source(regs, src1, i, csr.vsew)?;
        let borrow_in = has_carry_in && regs.read_mask_bit(MASK_REGISTER, i);
        let (_, borrow_out) = sub_with_borrow(a, b, borrow_in, csr.vsew);
        regs.write_mask_bit(vd, i, borrow_out);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csr(vl: u32, vsew: u32) -> VectorCsrState {
        VectorCsrState { vsew, vlmul: 0, vlmax: 16, vl, vstart: 0, vta: false, vma: false, vill: false, vlenb: 16 }
    }

    #[test]
    fn vadc_wraps_at_element_width() {
        let mut regs = VectorRegisterFile::new(16);
        regs.write_element(2, 0, 8, 0xff).unwrap();
        regs.write_mask_bit(MASK_REGISTER, 0, true);
        vadc(&mut regs, &csr(1, 8), 3, 2, ElementSource::Scalar(0), true).unwrap();
        assert_eq!(regs.read_element(3, 0, 8).unwrap(), 0);
    }

    #[test]
    fn vmadc_boundary_case_all_ones_plus_carry() {
        // vs2[i] = all-ones at sew=8, src1 = 0, carry_in = 1: must overflow.
        let mut regs = VectorRegisterFile::new(16);
        regs.write_element(2, 0, 8, 0xff).unwrap();
        regs.write_mask_bit(MASK_REGISTER, 0, true);
        vmadc(&mut regs, &csr(1, 8), 4, 2, ElementSource::Scalar(0), true, true).unwrap();
        assert!(regs.read_mask_bit(4, 0));
    }

    #[test]
    fn vmadc_no_overflow_without_carry() {
        let mut regs = VectorRegisterFile::new(16);
        regs.write_element(2, 0, 8, 0xff).unwrap();
        regs.write_mask_bit(MASK_REGISTER, 0, false);
        vmadc(&mut regs, &csr(1, 8), 4, 2, ElementSource::Scalar(0), true, true).unwrap();
        assert!(!regs.read_mask_bit(4, 0));
    }

    #[test]
    fn vmsbc_detects_borrow() {
        let mut regs = VectorRegisterFile::new(16);
        regs.write_element(2, 0, 8, 0).unwrap();
        vmsbc(&mut regs, &csr(1, 8), 4, 2, ElementSource::Scalar(1), false, true).unwrap();
        assert!(regs.read_mask_bit(4, 0));
    }
}
