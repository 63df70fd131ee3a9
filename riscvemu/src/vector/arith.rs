//! Elementwise move/merge/compress vector helpers (spec §4.3 "Elementwise
//! move/merge" and "vcompress.vm").

use super::{require_aligned, require_vec, VectorCsrState, VectorRegisterFile, MASK_REGISTER};
use crate::error::VectorError;

/// The non-mask source operand of a `vmv`/`vmerge` instruction: either
/// another vector register or a scalar already widened to `u64` (the
/// caller sign-extends `vmv.v.i`'s 5-bit immediate or reads the GPR for
/// `vmv.v.x`/`vmerge.vxm` before calling in).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSource {
    Vreg(u8),
    Scalar(u64),
}

fn read_source(regs: &VectorRegisterFile, src: ElementSource, i: u32, vsew: u32) -> Result<u64, VectorError> {
    match src {
        ElementSource::Vreg(r) => regs.read_element(r, i, vsew),
        ElementSource::Scalar(v) => Ok(v),
    }
}

/// `vmv.v.v`/`vmv.v.i`/`vmv.v.x`: copy `src` into every active element of
/// `vd`, unconditionally (these forms carry no mask).
pub fn vmv(
    regs: &mut VectorRegisterFile,
    csr: &VectorCsrState,
    vd: u8,
    src: ElementSource,
    vs_enabled: bool,
) -> Result<(), VectorError> {
    require_vec(vs_enabled)?;
    require_aligned(vd, csr)?;
    for i in csr.vstart..csr.vl {
        let v = read_source(regs, src, i, csr.vsew)?;
        regs.write_element(vd, i, csr.vsew, v)?;
    }
    Ok(())
}

/// `vmerge.vvm`/`vmerge.vim`/`vmerge.vxm`: per active element, select `src1`
/// when mask bit `i` of v0 is set, else the corresponding element of `vs2`.
pub fn vmerge(
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
        let selected = if regs.read_mask_bit(MASK_REGISTER, i) {
            read_source(regs, src1, i, csr.vsew)?
        } else {
            regs.read_element(vs2, i, csr.vsew)?
        };
        regs.write_element(vd, i, csr.vsew, selected)?;
    }
    Ok(())
}

/// `vcompress.vm`: pack the elements of `vs2` selected by mask register
/// `vs1_mask` into `vd`, contiguously starting at index 0. Requires
/// `vstart == 0` (spec §4.3).
pub fn vcompress(
    regs: &mut VectorRegisterFile,
    csr: &VectorCsrState,
    vd: u8,
    vs2: u8,
    vs1_mask: u8,
    vs_enabled: bool,
) -> Result<(), VectorError> {
    require_vec(vs_enabled)?;
    require_aligned(vd, csr)?;
    require_aligned(vs2, csr)?;
    if csr.vstart != 0 {
        return Err(VectorError::CompressRequiresZeroVstart(csr.vstart));
    }
    let mut out = 0u32;
    for i in 0..csr.vl {
        if regs.read_mask_bit(vs1_mask, i) {
            let v = regs.read_element(vs2, i, csr.vsew)?;
            regs.write_element(vd, out, csr.vsew, v)?;
            out += 1;
        }
    }
    Ok(())
}
