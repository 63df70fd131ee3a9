//! The 32-bit instruction decoder (spec §4.2, first bullet).
//!
//! Dispatches on the major opcode (bits\[6:0\]), then a secondary dispatch on
//! `funct3`/`funct7`/`funct12` selects the specific operation. Pure function,
//! no CPU-state access, matching the "no inheritance or dynamic dispatch"
//! design note (spec §9): this is a nested `match`, not a lookup tree.

use crate::bits::*;
use crate::error::DecodeError;
use crate::xlen::Xlen;

use super::*;

const OP_LUI: u32 = 0b0110111;
const OP_AUIPC: u32 = 0b0010111;
const OP_JAL: u32 = 0b1101111;
const OP_JALR: u32 = 0b1100111;
const OP_BRANCH: u32 = 0b1100011;
const OP_LOAD: u32 = 0b0000011;
const OP_STORE: u32 = 0b0100011;
const OP_IMM: u32 = 0b0010011;
const OP_IMM_32: u32 = 0b0011011;
const OP_RR: u32 = 0b0110011;
const OP_RR_32: u32 = 0b0111011;
const OP_FP_LOAD: u32 = 0b0000111;
const OP_FP_STORE: u32 = 0b0100111;
const OP_AMO: u32 = 0b0101111;
const OP_FMADD: u32 = 0b1000011;
const OP_FMSUB: u32 = 0b1000111;
const OP_FNMSUB: u32 = 0b1001011;
const OP_FNMADD: u32 = 0b1001111;
const OP_FP: u32 = 0b1010011;
const OP_FENCE: u32 = 0b0001111;
const OP_SYSTEM: u32 = 0b1110011;
const OP_V: u32 = 0b1010111;

/// Decode one 32-bit guest instruction word. Always succeeds in the sense
/// that an unrecognized encoding decodes to [`Op::Illegal`] rather than
/// returning `Err` — the caller (the emitter, via the TB builder) is
/// responsible for turning that into an emitted Illegal-Instruction raise.
pub fn decode(word: u32, xlen: Xlen) -> Op {
    let op = opcode(word);
    match op {
        OP_LUI => Op::Lui { rd: rd(word), imm: imm_u(word) },
        OP_AUIPC => Op::Auipc { rd: rd(word), imm: imm_u(word) },
        OP_JAL => Op::Jal { rd: rd(word), imm: imm_j(word) },
        OP_JALR if funct3(word) == 0 => {
            Op::Jalr { rd: rd(word), rs1: rs1(word), imm: imm_i(word) }
        }
        OP_JALR => illegal(DecodeError::ReservedFunct { opcode: op }),
        OP_BRANCH => decode_branch(word),
        OP_LOAD => decode_load(word, xlen),
        OP_STORE => decode_store(word, xlen),
        OP_IMM => decode_op_imm(word, xlen, false),
        OP_IMM_32 if xlen.is_64() => decode_op_imm(word, xlen, true),
        OP_IMM_32 => illegal(DecodeError::Rv64OnlyOnRv32),
        OP_RR => decode_op_rr(word, xlen, false),
        OP_RR_32 if xlen.is_64() => decode_op_rr(word, xlen, true),
        OP_RR_32 => illegal(DecodeError::Rv64OnlyOnRv32),
        OP_FENCE if funct3(word) == 0 => Op::Fence,
        OP_FENCE if funct3(word) == 1 => Op::FenceI,
        OP_FENCE => illegal(DecodeError::ReservedFunct { opcode: op }),
        OP_AMO => decode_amo(word, xlen),
        OP_FP_LOAD => decode_fp_load(word),
        OP_FP_STORE => decode_fp_store(word),
        OP_FMADD => decode_fma(word, FmaKind::Madd),
        OP_FMSUB => decode_fma(word, FmaKind::Msub),
        OP_FNMSUB => decode_fma(word, FmaKind::Nmsub),
        OP_FNMADD => decode_fma(word, FmaKind::Nmadd),
        OP_FP => decode_fp(word),
        OP_SYSTEM => decode_system(word),
        OP_V => decode_vector(word),
        _ => illegal(DecodeError::ReservedOpcode(op)),
    }
}

fn illegal(e: DecodeError) -> Op {
    Op::Illegal(e)
}

fn fp_width(bit: u32) -> Result<FpWidth, DecodeError> {
    match bit {
        0b00 => Ok(FpWidth::Single),
        0b01 => Ok(FpWidth::Double),
        _ => Err(DecodeError::ReservedFunct { opcode: OP_FP }),
    }
}

fn decode_branch(word: u32) -> Op {
    let kind = match funct3(word) {
        0b000 => BranchKind::Beq,
        0b001 => BranchKind::Bne,
        0b100 => BranchKind::Blt,
        0b101 => BranchKind::Bge,
        0b110 => BranchKind::Bltu,
        0b111 => BranchKind::Bgeu,
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_BRANCH }),
    };
    Op::Branch { kind, rs1: rs1(word), rs2: rs2(word), imm: imm_b(word) }
}

fn decode_load(word: u32, xlen: Xlen) -> Op {
    let kind = match funct3(word) {
        0b000 => LoadKind::Lb,
        0b001 => LoadKind::Lh,
        0b010 => LoadKind::Lw,
        0b011 if xlen.is_64() => LoadKind::Ld,
        0b100 => LoadKind::Lbu,
        0b101 => LoadKind::Lhu,
        0b110 if xlen.is_64() => LoadKind::Lwu,
        0b011 | 0b110 => return illegal(DecodeError::Rv64OnlyOnRv32),
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_LOAD }),
    };
    Op::Load { kind, rd: rd(word), rs1: rs1(word), imm: imm_i(word) }
}

fn decode_store(word: u32, xlen: Xlen) -> Op {
    let kind = match funct3(word) {
        0b000 => StoreKind::Sb,
        0b001 => StoreKind::Sh,
        0b010 => StoreKind::Sw,
        0b011 if xlen.is_64() => StoreKind::Sd,
        0b011 => return illegal(DecodeError::Rv64OnlyOnRv32),
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_STORE }),
    };
    Op::Store { kind, rs1: rs1(word), rs2: rs2(word), imm: imm_s(word) }
}

fn decode_op_imm(word: u32, xlen: Xlen, word_form: bool) -> Op {
    let f3 = funct3(word);
    let f7 = funct7(word);
    let (kind, imm) = match f3 {
        0b000 => (IntAluKind::Add, imm_i(word)),
        0b010 => (IntAluKind::Slt, imm_i(word)),
        0b011 => (IntAluKind::Sltu, imm_i(word)),
        0b100 => (IntAluKind::Xor, imm_i(word)),
        0b110 => (IntAluKind::Or, imm_i(word)),
        0b111 => (IntAluKind::And, imm_i(word)),
        0b001 => {
            let shamt = if word_form { shamt5(word) } else if xlen.is_64() { shamt6(word) } else { shamt5(word) };
            if f7 & !0b1 != 0 {
                return illegal(DecodeError::ReservedFunct { opcode: OP_IMM });
            }
            match max_shamt(xlen, word_form, shamt) {
                Ok(()) => (IntAluKind::Sll, shamt as i32),
                Err(e) => return illegal(e),
            }
        }
        0b101 => {
            let shamt = if word_form { shamt5(word) } else if xlen.is_64() { shamt6(word) } else { shamt5(word) };
            let top = if word_form { f7 } else if xlen.is_64() { extract(word, 26, 6) } else { f7 };
            let kind = match top {
                0b0000000 | 0 => IntAluKind::Srl,
                0b0100000 | 0b010000 => IntAluKind::Sra,
                _ => return illegal(DecodeError::ReservedFunct { opcode: OP_IMM }),
            };
            match max_shamt(xlen, word_form, shamt) {
                Ok(()) => (kind, shamt as i32),
                Err(e) => return illegal(e),
            }
        }
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_IMM }),
    };
    Op::IntImm { kind, rd: rd(word), rs1: rs1(word), imm, word: word_form }
}

fn max_shamt(xlen: Xlen, word_form: bool, shamt: u32) -> Result<(), DecodeError> {
    let limit = if word_form { 32 } else { xlen.bits() };
    if shamt >= limit {
        Err(DecodeError::ShiftAmountOutOfRange { shamt, xlen_bits: limit })
    } else {
        Ok(())
    }
}

fn decode_op_rr(word: u32, _xlen: Xlen, word_form: bool) -> Op {
    let f3 = funct3(word);
    let f7 = funct7(word);
    let kind = match (f3, f7) {
        (0b000, 0b0000000) => IntAluKind::Add,
        (0b000, 0b0100000) => IntAluKind::Sub,
        (0b001, 0b0000000) => IntAluKind::Sll,
        (0b010, 0b0000000) if !word_form => IntAluKind::Slt,
        (0b011, 0b0000000) if !word_form => IntAluKind::Sltu,
        (0b100, 0b0000000) if !word_form => IntAluKind::Xor,
        (0b101, 0b0000000) => IntAluKind::Srl,
        (0b101, 0b0100000) => IntAluKind::Sra,
        (0b110, 0b0000000) if !word_form => IntAluKind::Or,
        (0b111, 0b0000000) if !word_form => IntAluKind::And,
        (0b000, 0b0000001) => IntAluKind::Mul,
        (0b001, 0b0000001) if !word_form => IntAluKind::Mulh,
        (0b010, 0b0000001) if !word_form => IntAluKind::Mulhsu,
        (0b011, 0b0000001) if !word_form => IntAluKind::Mulhu,
        (0b100, 0b0000001) => IntAluKind::Div,
        (0b101, 0b0000001) => IntAluKind::Divu,
        (0b110, 0b0000001) => IntAluKind::Rem,
        (0b111, 0b0000001) => IntAluKind::Remu,
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_RR }),
    };
    Op::IntReg { kind, rd: rd(word), rs1: rs1(word), rs2: rs2(word), word: word_form }
}

fn decode_amo(word: u32, xlen: Xlen) -> Op {
    let f3 = funct3(word);
    let width = match f3 {
        0b010 => MemWidth::Word,
        0b011 if xlen.is_64() => MemWidth::Double,
        0b011 => return illegal(DecodeError::Rv64OnlyOnRv32),
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_AMO }),
    };
    let funct5 = extract(word, 27, 5);
    let kind = match funct5 {
        0b00010 => AmoKind::Lr,
        0b00011 => AmoKind::Sc,
        0b00001 => AmoKind::Swap,
        0b00000 => AmoKind::Add,
        0b00100 => AmoKind::Xor,
        0b01100 => AmoKind::And,
        0b01000 => AmoKind::Or,
        0b10000 => AmoKind::Min,
        0b10100 => AmoKind::Max,
        0b11000 => AmoKind::Minu,
        0b11100 => AmoKind::Maxu,
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_AMO }),
    };
    let aq = extract(word, 26, 1) != 0;
    let rl = extract(word, 25, 1) != 0;
    Op::Amo { kind, width, rd: rd(word), rs1: rs1(word), rs2: rs2(word), aq, rl }
}

fn decode_fp_load(word: u32) -> Op {
    let width = match funct3(word) {
        0b010 => FpWidth::Single,
        0b011 => FpWidth::Double,
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_FP_LOAD }),
    };
    Op::FpLoad { width, rd: rd(word), rs1: rs1(word), imm: imm_i(word) }
}

fn decode_fp_store(word: u32) -> Op {
    let width = match funct3(word) {
        0b010 => FpWidth::Single,
        0b011 => FpWidth::Double,
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_FP_STORE }),
    };
    Op::FpStore { width, rs1: rs1(word), rs2: rs2(word), imm: imm_s(word) }
}

fn decode_fma(word: u32, kind: FmaKind) -> Op {
    let width = match fp_width(extract(word, 25, 2)) {
        Ok(w) => w,
        Err(e) => return illegal(e),
    };
    let rs3 = extract(word, 27, 5) as u8;
    Op::FpFma {
        kind,
        width,
        rd: rd(word),
        rs1: rs1(word),
        rs2: rs2(word),
        rs3,
        rm: rm(word),
    }
}

fn decode_fp(word: u32) -> Op {
    let funct7v = funct7(word);
    let fmt = funct7v & 0b11;
    let top5 = funct7v >> 2;
    let width = match fp_width(fmt) {
        Ok(w) => w,
        Err(e) => return illegal(e),
    };
    let rd_ = rd(word);
    let rs1_ = rs1(word);
    let rs2_ = rs2(word);
    let rm_ = rm(word);
    let kind = match top5 {
        0b00000 => FpOpKind::Add,
        0b00001 => FpOpKind::Sub,
        0b00010 => FpOpKind::Mul,
        0b00011 => FpOpKind::Div,
        0b01011 => FpOpKind::Sqrt,
        0b00100 => match rm_ {
            0b000 => FpOpKind::SgnJ,
            0b001 => FpOpKind::SgnJn,
            0b010 => FpOpKind::SgnJx,
            _ => return illegal(DecodeError::ReservedFunct { opcode: OP_FP }),
        },
        0b00101 => match rm_ {
            0b000 => FpOpKind::Min,
            0b001 => FpOpKind::Max,
            _ => return illegal(DecodeError::ReservedFunct { opcode: OP_FP }),
        },
        0b10100 => match rm_ {
            0b010 => FpOpKind::Eq,
            0b001 => FpOpKind::Lt,
            0b000 => FpOpKind::Le,
            _ => return illegal(DecodeError::ReservedFunct { opcode: OP_FP }),
        },
        0b11100 if rm_ == 0b001 => FpOpKind::Class,
        0b11100 if rm_ == 0b000 => FpOpKind::MvToInt,
        0b11110 if rm_ == 0b000 => FpOpKind::MvFromInt,
        0b01000 => {
            let dest_is_double = (rs2_ & 1) == 1;
            let _ = dest_is_double;
            FpOpKind::CvtFmt
        }
        0b11000 => FpOpKind::CvtToInt { unsigned: rs2_ & 1 == 1, wide: rs2_ & 0b10 != 0 },
        0b11010 => FpOpKind::CvtFromInt { unsigned: rs2_ & 1 == 1, wide: rs2_ & 0b10 != 0 },
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_FP }),
    };
    Op::FpOp { kind, width, rd: rd_, rs1: rs1_, rs2: rs2_, rm: rm_ }
}

fn decode_system(word: u32) -> Op {
    let f3 = funct3(word);
    if f3 == 0 {
        let f12 = funct12(word);
        return match f12 {
            0x000 => Op::System(SystemKind::Ecall),
            0x001 => Op::System(SystemKind::Ebreak),
            0x102 => Op::System(SystemKind::Sret),
            0x302 => Op::System(SystemKind::Mret),
            0x105 => Op::System(SystemKind::Wfi),
            _ if f12 >> 5 == 0b0001001 => Op::System(SystemKind::SfenceVma),
            _ => illegal(DecodeError::ReservedFunct { opcode: OP_SYSTEM }),
        };
    }
    let csr = funct12(word) as u16;
    let rd_ = rd(word);
    let rs1_ = rs1(word);
    let kind = match f3 & 0b11 {
        0b01 => CsrKind::Rw,
        0b10 => CsrKind::Rs,
        0b11 => CsrKind::Rc,
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_SYSTEM }),
    };
    let src = if f3 & 0b100 != 0 { CsrSrc::Imm(rs1_) } else { CsrSrc::Reg(rs1_) };
    Op::System(SystemKind::Csr { kind, csr, rd: rd_, src })
}

fn decode_vector(word: u32) -> Op {
    const OPIVV: u32 = 0b000;
    const OPIVI: u32 = 0b011;
    const OPMVV: u32 = 0b010;
    const OPCFG: u32 = 0b111;

    let f3 = funct3(word);
    let vm = extract(word, 25, 1) != 0;
    let vs2 = rs2(word);
    let vd = rd(word);

    if f3 == OPCFG {
        let rs1_field = rs1(word);
        let rd_ = vd;
        return if extract(word, 31, 1) == 0 {
            // vsetvli: zimm[10:0] in bits[30:20]
            let zimm = extract(word, 20, 11);
            Op::VsetVl { rd: rd_, rs1_is_imm: false, rs1_or_avl: rs1_field, zimm_vtype: zimm }
        } else if extract(word, 30, 1) == 1 {
            // vsetivli: uimm[4:0] in rs1 field, zimm[9:0] in bits[29:20]
            let zimm = extract(word, 20, 10);
            Op::VsetVl { rd: rd_, rs1_is_imm: true, rs1_or_avl: rs1_field, zimm_vtype: zimm }
        } else {
            // vsetvl: vtype from rs2 register, not decodable statically;
            // carried through as rs1_or_avl=rs1, zimm_vtype unused (0),
            // with rs1_is_imm reused to flag "vtype in register" via vs2.
            Op::VsetVl { rd: rd_, rs1_is_imm: false, rs1_or_avl: rs1_field, zimm_vtype: u32::from(vs2) | 0x8000_0000 }
        };
    }

    let funct6 = extract(word, 26, 6);
    let src1 = match f3 {
        OPIVV | OPMVV => VecSrc1::Vreg(rs1(word)),
        OPIVI => VecSrc1::Imm(sextract(word, 15, 5) as i8),
        _ => VecSrc1::Xreg(rs1(word)),
    };
    let kind = match (funct6, f3, vm) {
        (0b010111, OPIVV, true) | (0b010111, OPIVI, true) => VectorOpKind::Move,
        (0b010111, OPIVV, false) | (0b010111, OPIVI, false) => VectorOpKind::Merge,
        (0b010111, OPMVV, true) => VectorOpKind::Compress,
        (0b010000, _, false) => VectorOpKind::Adc,
        (0b010010, _, false) => VectorOpKind::Sbc,
        (0b010001, _, false) => VectorOpKind::Madc { has_carry_in: true },
        (0b010001, _, true) => VectorOpKind::Madc { has_carry_in: false },
        (0b010011, _, false) => VectorOpKind::Msbc { has_carry_in: true },
        (0b010011, _, true) => VectorOpKind::Msbc { has_carry_in: false },
        _ => return illegal(DecodeError::ReservedFunct { opcode: OP_V }),
    };
    Op::Vector(VectorOp { kind, vd, vs2, src1, vm })
}
