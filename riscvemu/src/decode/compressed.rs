//! The 16-bit Compressed-extension decoder (spec §4.2, second bullet).
//!
//! Each compressed form expands to the equivalent [`super::Op`] variant a
//! 32-bit encoding of the same instruction would produce, so the emitter
//! (spec §4.3) never needs to know whether an instruction arrived compressed.
//! Quadrant (bits\[1:0\]) then `funct3` (bits\[15:13\]) select the form,
//! mirroring the per-extension module split of `riscvemu/src/rv32i.rs` etc.,
//! generalized to the C extension (RVC is nearly universal in real RISC-V
//! binaries, so a complete frontend needs it even where the base operation
//! surface stays silent on compressed encodings).

use crate::bits::*;
use crate::error::DecodeError;
use crate::xlen::Xlen;

use super::{BranchKind, IntAluKind, LoadKind, Op, StoreKind};

/// Decode one 16-bit compressed instruction word.
pub fn decode(op: u16, xlen: Xlen) -> Op {
    match c_quadrant(op) {
        0b00 => decode_q0(op),
        0b01 => decode_q1(op, xlen),
        0b10 => decode_q2(op, xlen),
        _ => unreachable!("c_quadrant masks to 2 bits"),
    }
}

fn illegal(e: DecodeError) -> Op {
    Op::Illegal(e)
}

fn nonzero_rd(rd: u8) -> Result<u8, DecodeError> {
    if rd == 0 {
        Err(DecodeError::CompressedRdZero)
    } else {
        Ok(rd)
    }
}

fn decode_q0(op: u16) -> Op {
    match c_funct3(op) {
        0b000 => {
            let imm = c_addi4spn_imm(op);
            if imm == 0 {
                return illegal(DecodeError::ReservedCompressed(op));
            }
            let rd = c_reg_prime(op, 2);
            Op::IntImm { kind: IntAluKind::Add, rd, rs1: 2, imm: imm as i32, word: false }
        }
        0b010 => {
            let rd = c_reg_prime(op, 2);
            let rs1 = c_reg_prime(op, 7);
            Op::Load { kind: LoadKind::Lw, rd, rs1, imm: c_lw_imm(op) as i32 }
        }
        0b011 => {
            let rd = c_reg_prime(op, 2);
            let rs1 = c_reg_prime(op, 7);
            Op::Load { kind: LoadKind::Ld, rd, rs1, imm: c_ld_imm(op) as i32 }
        }
        0b110 => {
            let rs2 = c_reg_prime(op, 2);
            let rs1 = c_reg_prime(op, 7);
            Op::Store { kind: StoreKind::Sw, rs1, rs2, imm: c_lw_imm(op) as i32 }
        }
        0b111 => {
            let rs2 = c_reg_prime(op, 2);
            let rs1 = c_reg_prime(op, 7);
            Op::Store { kind: StoreKind::Sd, rs1, rs2, imm: c_ld_imm(op) as i32 }
        }
        _ => illegal(DecodeError::ReservedCompressed(op)),
    }
}

fn decode_q1(op: u16, xlen: Xlen) -> Op {
    match c_funct3(op) {
        0b000 => {
            // C.NOP when rd==0, else C.ADDI
            let rd = c_reg(op, 7);
            Op::IntImm { kind: IntAluKind::Add, rd, rs1: rd, imm: c_i_imm(op), word: false }
        }
        0b001 if xlen.is_64() => {
            // C.ADDIW
            let rd = c_reg(op, 7);
            match nonzero_rd(rd) {
                Ok(rd) => Op::IntImm { kind: IntAluKind::Add, rd, rs1: rd, imm: c_i_imm(op), word: true },
                Err(e) => illegal(e),
            }
        }
        0b001 => {
            // C.JAL (RV32 only): x1 link
            Op::Jal { rd: 1, imm: c_j_imm(op) }
        }
        0b010 => {
            // C.LI
            let rd = c_reg(op, 7);
            Op::IntImm { kind: IntAluKind::Add, rd, rs1: 0, imm: c_i_imm(op), word: false }
        }
        0b011 => {
            let rd = c_reg(op, 7);
            if rd == 2 {
                let imm = c_addi16sp_imm(op);
                if imm == 0 {
                    return illegal(DecodeError::ReservedCompressed(op));
                }
                Op::IntImm { kind: IntAluKind::Add, rd: 2, rs1: 2, imm, word: false }
            } else {
                let imm = c_lui_imm(op);
                if imm == 0 {
                    return illegal(DecodeError::ReservedCompressed(op));
                }
                match nonzero_rd(rd) {
                    Ok(rd) => Op::Lui { rd, imm },
                    Err(e) => illegal(e),
                }
            }
        }
        0b100 => decode_q1_alu(op, xlen),
        0b101 => Op::Jal { rd: 0, imm: c_j_imm(op) },
        0b110 => {
            let rs1 = c_reg_prime(op, 7);
            Op::Branch { kind: BranchKind::Beq, rs1, rs2: 0, imm: c_b_imm(op) }
        }
        0b111 => {
            let rs1 = c_reg_prime(op, 7);
            Op::Branch { kind: BranchKind::Bne, rs1, rs2: 0, imm: c_b_imm(op) }
        }
        _ => illegal(DecodeError::ReservedCompressed(op)),
    }
}

/// Quadrant 1, funct3 = 0b100: the shift/logical-immediate/register-ALU
/// cluster keyed on bits\[11:10\] and, for the register forms, bits\[6:5\].
fn decode_q1_alu(op: u16, xlen: Xlen) -> Op {
    let rd = c_reg_prime(op, 7);
    let top2 = c_extract(op, 10, 2);
    match top2 {
        0b00 => {
            // C.SRLI
            let shamt = c_zimm(op);
            Op::IntImm { kind: IntAluKind::Srl, rd, rs1: rd, imm: shamt as i32, word: false }
        }
        0b01 => {
            // C.SRAI
            let shamt = c_zimm(op);
            Op::IntImm { kind: IntAluKind::Sra, rd, rs1: rd, imm: shamt as i32, word: false }
        }
        0b10 => {
            // C.ANDI
            Op::IntImm { kind: IntAluKind::And, rd, rs1: rd, imm: c_i_imm(op), word: false }
        }
        0b11 => {
            let rs2 = c_reg_prime(op, 2);
            let sub_select = c_extract(op, 5, 2);
            let is_word = c_extract(op, 12, 1) == 1;
            let kind = match (is_word, sub_select) {
                (false, 0b00) => IntAluKind::Sub,
                (false, 0b01) => IntAluKind::Xor,
                (false, 0b10) => IntAluKind::Or,
                (false, 0b11) => IntAluKind::And,
                (true, 0b00) if xlen.is_64() => IntAluKind::Sub,
                (true, 0b01) if xlen.is_64() => IntAluKind::Add,
                (true, _) => return illegal(DecodeError::ReservedCompressed(op)),
                _ => unreachable!("sub_select masked to 2 bits"),
            };
            Op::IntReg { kind, rd, rs1: rd, rs2, word: is_word }
        }
        _ => unreachable!("top2 masked to 2 bits"),
    }
}

fn decode_q2(op: u16, xlen: Xlen) -> Op {
    match c_funct3(op) {
        0b000 => {
            // C.SLLI
            let rd = c_reg(op, 7);
            let shamt = c_zimm(op);
            Op::IntImm { kind: IntAluKind::Sll, rd, rs1: rd, imm: shamt as i32, word: false }
        }
        0b010 => {
            // C.LWSP
            let rd = c_reg(op, 7);
            match nonzero_rd(rd) {
                Ok(rd) => Op::Load { kind: LoadKind::Lw, rd, rs1: 2, imm: c_lwsp_imm(op) as i32 },
                Err(e) => illegal(e),
            }
        }
        0b011 if xlen.is_64() => {
            // C.LDSP
            let rd = c_reg(op, 7);
            match nonzero_rd(rd) {
                Ok(rd) => Op::Load { kind: LoadKind::Ld, rd, rs1: 2, imm: c_ldsp_imm(op) as i32 },
                Err(e) => illegal(e),
            }
        }
        0b100 => decode_q2_jr_mv(op),
        0b110 => {
            // C.SWSP
            let rs2 = c_reg(op, 2);
            Op::Store { kind: StoreKind::Sw, rs1: 2, rs2, imm: c_swsp_imm(op) as i32 }
        }
        0b111 if xlen.is_64() => {
            // C.SDSP
            let rs2 = c_reg(op, 2);
            Op::Store { kind: StoreKind::Sd, rs1: 2, rs2, imm: c_sdsp_imm(op) as i32 }
        }
        _ => illegal(DecodeError::ReservedCompressed(op)),
    }
}

/// Quadrant 2, funct3 = 0b100: C.JR/C.MV/C.EBREAK/C.JALR/C.ADD, disambiguated
/// by bit\[12\] and whether `rs2` (bits\[6:2\]) is zero.
fn decode_q2_jr_mv(op: u16) -> Op {
    let bit12 = c_extract(op, 12, 1);
    let rd_rs1 = c_reg(op, 7);
    let rs2 = c_reg(op, 2);
    match (bit12, rs2) {
        (0, 0) => {
            if rd_rs1 == 0 {
                illegal(DecodeError::ReservedCompressed(op))
            } else {
                Op::Jalr { rd: 0, rs1: rd_rs1, imm: 0 }
            }
        }
        (0, _) => Op::IntReg { kind: IntAluKind::Add, rd: rd_rs1, rs1: 0, rs2, word: false },
        (1, 0) if rd_rs1 == 0 => Op::System(super::SystemKind::Ebreak),
        (1, 0) => Op::Jalr { rd: 1, rs1: rd_rs1, imm: 0 },
        (1, _) => Op::IntReg { kind: IntAluKind::Add, rd: rd_rs1, rs1: rd_rs1, rs2, word: false },
        _ => unreachable!("bit12 masked to 1 bit"),
    }
}
