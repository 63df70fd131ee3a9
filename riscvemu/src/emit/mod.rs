//! The IR emitter (spec §4.3): one routine family per major decoded group,
//! dispatching from a [`crate::decode::Op`] to builder calls on an
//! [`IrBuilder`]. Mirrors `hart.rs`'s per-group `execute_*_rv32i` function
//! split, generalized from "execute against a `Hart`" to "emit IR against a
//! builder" — the frontend never runs the operation itself.

pub mod alu;
pub mod branch;
pub mod fp;
pub mod memory;
pub mod system;

use crate::decode::Op;
use crate::ir::IrBuilder;
use crate::xlen::Xlen;

/// Per-block scratch mutated only by the emitter (spec §3 "Decoder
/// context"). Created fresh for each instruction by the TB builder.
#[derive(Debug, Clone, Copy)]
pub struct DecoderContext {
    pub guest_pc: u64,
    pub next_pc: u64,
    pub opcode: u32,
    pub mem_index: u32,
    pub single_step: bool,
    pub bstate: BlockState,
}

/// Control-flow state the emitter leaves behind for the TB builder to act on
/// (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Keep decoding.
    None,
    /// End block, re-enter execution for side effects.
    Stop,
    /// Control flow has been redirected; the emitter already produced the
    /// exit sequence.
    Branch,
}

impl DecoderContext {
    pub fn new(guest_pc: u64, instr_len: u32, opcode: u32, mem_index: u32, single_step: bool) -> Self {
        DecoderContext {
            guest_pc,
            next_pc: guest_pc + instr_len as u64,
            opcode,
            mem_index,
            single_step,
            bstate: BlockState::None,
        }
    }
}

/// Dispatches decoded operations to the per-group emit routines, holding the
/// target configuration those routines need (XLEN for shift masking and
/// RV64-only legality, RVC-enabled for the branch/jump misalignment check).
pub struct Emitter<'b, B: IrBuilder> {
    pub builder: &'b mut B,
    pub xlen: Xlen,
    pub rvc_enabled: bool,
}

impl<'b, B: IrBuilder> Emitter<'b, B> {
    pub fn new(builder: &'b mut B, xlen: Xlen, rvc_enabled: bool) -> Self {
        Emitter { builder, xlen, rvc_enabled }
    }

    /// Emit IR for one decoded operation, updating `ctx.bstate` as needed.
    pub fn emit(&mut self, op: &Op, ctx: &mut DecoderContext) {
        match op {
            Op::Lui { rd, imm } => alu::emit_lui(self, *rd, *imm),
            Op::Auipc { rd, imm } => alu::emit_auipc(self, ctx, *rd, *imm),
            Op::Jal { rd, imm } => branch::emit_jal(self, ctx, *rd, *imm),
            Op::Jalr { rd, rs1, imm } => branch::emit_jalr(self, ctx, *rd, *rs1, *imm),
            Op::Branch { kind, rs1, rs2, imm } => branch::emit_branch(self, ctx, *kind, *rs1, *rs2, *imm),
            Op::Load { kind, rd, rs1, imm } => memory::emit_load(self, ctx, *kind, *rd, *rs1, *imm),
            Op::Store { kind, rs1, rs2, imm } => memory::emit_store(self, ctx, *kind, *rs1, *rs2, *imm),
            Op::IntImm { kind, rd, rs1, imm, word } => alu::emit_int_imm(self, *kind, *rd, *rs1, *imm, *word),
            Op::IntReg { kind, rd, rs1, rs2, word } => alu::emit_int_reg(self, *kind, *rd, *rs1, *rs2, *word),
            Op::Fence => {}
            Op::FenceI => system::emit_fence_i(self, ctx),
            Op::Amo { kind, width, rd, rs1, rs2, aq, rl } => {
                memory::emit_amo(self, ctx, *kind, *width, *rd, *rs1, *rs2, *aq, *rl)
            }
            Op::FpLoad { width, rd, rs1, imm } => memory::emit_fp_load(self, ctx, *width, *rd, *rs1, *imm),
            Op::FpStore { width, rs1, rs2, imm } => memory::emit_fp_store(self, ctx, *width, *rs1, *rs2, *imm),
            Op::FpOp { kind, width, rd, rs1, rs2, rm } => fp::emit_fp_op(self, *kind, *width, *rd, *rs1, *rs2, *rm),
            Op::FpFma { kind, width, rd, rs1, rs2, rs3, rm } => {
                fp::emit_fp_fma(self, *kind, *width, *rd, *rs1, *rs2, *rs3, *rm)
            }
            Op::System(kind) => system::emit_system(self, ctx, kind),
            Op::VsetVl { rd, rs1_is_imm, rs1_or_avl, zimm_vtype } => {
                system::emit_vsetvl(self, ctx, *rd, *rs1_is_imm, *rs1_or_avl, *zimm_vtype)
            }
            Op::Vector(vop) => system::emit_vector(self, ctx, vop),
            Op::Illegal(_) => system::emit_illegal(self, ctx),
        }
    }
}
