//! `helper_vsetvl`: the `vsetvl`/`vsetvli`/`vsetivli` runtime helper
//! (spec §4.3 "vsetvl/vsetvli/vsetvli").

use super::VectorCsrState;

/// Maximum element width this implementation supports, in bits.
const ELEN: u32 = 64;

/// How the new `vl` is selected (spec §4.3 AVL encoding table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvlSource {
    /// `vsetivli`: `rs1_pass` is a 5-bit unsigned immediate, always used.
    Immediate(u32),
    /// `vsetvl[i]` with `rs1 == 0`: keep (`rd == 0`) or maximize
    /// (`rd != 0`) the active vector length.
    X0 { rd_is_x0: bool },
    /// `vsetvl[i]` with `rs1 != 0`: the register value is the requested AVL.
    Register(u32),
}

pub struct VsetVlArgs {
    pub avl: AvlSource,
    pub prev_vl: u32,
    /// Raw `vtype` bits: bit7 `vma`, bit6 `vta`, bits[5:3] `vsew` field,
    /// bits[2:0] `vlmul` field; any other set bit is reserved.
    pub vtype_bits: u32,
    pub vlenb: u32,
}

/// Decode the 3-bit `vlmul` field into a signed shift exponent, per spec §9:
/// values 0..3 are integer LMUL `1,2,4,8`; values 5..7 are fractional LMUL
/// `1/2,1/4,1/8`; value 4 is reserved.
fn decode_vlmul(field: u32) -> Option<i8> {
    match field {
        0b000 => Some(0),
        0b001 => Some(1),
        0b010 => Some(2),
        0b011 => Some(3),
        0b101 => Some(-1),
        0b110 => Some(-2),
        0b111 => Some(-3),
        _ => None,
    }
}

/// Compute `vlmax = VLEN_bytes*8 / vsew * 2^vlmul` using integer shifts
/// instead of the source's floating-point `vflmul` multiply.
fn compute_vlmax(vlenb: u32, vsew: u32, vlmul: i8) -> u32 {
    let vlen_bits = vlenb * 8;
    let base = vlen_bits / vsew;
    if vlmul >= 0 {
        base << vlmul
    } else {
        base >> (-vlmul)
    }
}

/// Run `vsetvl`/`vsetvli`/`vsetivli`: returns the new `vl` and the updated
/// CSR shadow state (`vstart` cleared, per §4.3's final instruction).
pub fn helper_vsetvl(args: VsetVlArgs) -> (u32, VectorCsrState) {
    let vma = args.vtype_bits & (1 << 7) != 0;
    let vta = args.vtype_bits & (1 << 6) != 0;
    let vsew_field = (args.vtype_bits >> 3) & 0b111;
    let vlmul_field = args.vtype_bits & 0b111;
    let reserved = args.vtype_bits >> 8 != 0;

    let vsew = 1u32 << (vsew_field + 3);
    let vlmul = decode_vlmul(vlmul_field);

    let (vlmax, vill) = match vlmul {
        None => (0, true),
        Some(vlmul) => {
            let lmul_too_small = vlmul < -3;
            let lmul_too_large = vlmul > 3;
            // SEW must not exceed min(vflmul, 1)*ELEN: for fractional LMUL
            // (vlmul < 0) the bound shrinks below ELEN (e.g. mf8 -> ELEN/8).
            let sew_bound = if vlmul < 0 { ELEN >> (-vlmul) } else { ELEN };
            let sew_too_wide = vsew > sew_bound;
            if reserved || lmul_too_small || lmul_too_large || sew_too_wide {
                (0, true)
            } else {
                (compute_vlmax(args.vlenb, vsew, vlmul), false)
            }
        }
    };

    let new_vl = if vlmax == 0 {
        0
    } else {
        match args.avl {
            AvlSource::Immediate(uimm) => uimm.min(vlmax),
            AvlSource::X0 { rd_is_x0: true } => args.prev_vl.min(vlmax),
            AvlSource::X0 { rd_is_x0: false } => vlmax,
            AvlSource::Register(avl) => avl.min(vlmax),
        }
    };

    let csr = VectorCsrState {
        vsew,
        vlmul: vlmul.unwrap_or(0),
        vlmax,
        vl: new_vl,
        vstart: 0,
        vta,
        vma,
        vill,
        vlenb: args.vlenb,
    };
    (new_vl, csr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsetvli_example_from_scenario_six() {
        // e32, m1, ta, ma; vlenb = 16; rd != 0, rs1 == x0 -> vlmax.
        let vtype_bits = (1 << 7) | (1 << 6) | (0b010 << 3) | 0b000; // sew=32 (field 2), lmul=1
        let args = VsetVlArgs {
            avl: AvlSource::X0 { rd_is_x0: false },
            prev_vl: 0,
            vtype_bits,
            vlenb: 16,
        };
        let (vl, csr) = helper_vsetvl(args);
        assert_eq!(csr.vsew, 32);
        assert_eq!(csr.vlmul, 0);
        assert_eq!(csr.vlmax, 4);
        assert_eq!(vl, 4);
        assert!(!csr.vill);
    }

    #[test]
    fn reserved_vlmul_field_sets_vill() {
        let vtype_bits = 0b100; // vlmul field = 4, reserved
        let args = VsetVlArgs { avl: AvlSource::Register(1), prev_vl: 0, vtype_bits, vlenb: 16 };
        let (vl, csr) = helper_vsetvl(args);
        assert!(csr.vill);
        assert_eq!(csr.vlmax, 0);
        assert_eq!(vl, 0);
    }

    #[test]
    fn e32_mf8_sets_vill_since_sew_exceeds_fractional_lmul_bound() {
        // e32 (field 2), mf8 (field 0b101 -> vlmul = -3): bound is
        // ELEN >> 3 = 8, and vsew=32 > 8, so vill must be set.
        let vtype_bits = (0b010 << 3) | 0b101;
        let args = VsetVlArgs { avl: AvlSource::Register(1), prev_vl: 0, vtype_bits, vlenb: 16 };
        let (vl, csr) = helper_vsetvl(args);
        assert!(csr.vill);
        assert_eq!(csr.vlmax, 0);
        assert_eq!(vl, 0);
    }

    #[test]
    fn vsetivli_caps_at_vlmax() {
        let vtype_bits = (0b000 << 3) | 0b000; // sew=8, lmul=1
        let args = VsetVlArgs { avl: AvlSource::Immediate(31), prev_vl: 0, vtype_bits, vlenb: 16 };
        let (vl, csr) = helper_vsetvl(args);
        assert_eq!(csr.vlmax, 16);
        assert_eq!(vl, 16);
    }
}
