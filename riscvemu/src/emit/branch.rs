//! Branches and jumps (spec §4.3 "Branches and jumps").

use super::{BlockState, DecoderContext, Emitter};
use crate::decode::BranchKind;
use crate::ir::{Cond, ExceptionCause, IrBuilder};

fn branch_cond(kind: BranchKind) -> Cond {
    match kind {
        BranchKind::Beq => Cond::Eq,
        BranchKind::Bne => Cond::Ne,
        BranchKind::Blt => Cond::LtS,
        BranchKind::Bge => Cond::GeS,
        BranchKind::Bltu => Cond::LtU,
        BranchKind::Bgeu => Cond::GeU,
    }
}

/// Emit the target-alignment check shared by branches and `JALR`: when RVC
/// is disabled and the target's low bits indicate misalignment, raise
/// Instruction-Address-Misaligned instead of chaining to it. `JAL` performs
/// its own version of this check (see [`emit_jal`]) since it must skip the
/// link-register write on the faulting path, which this helper's
/// already-terminal branches can't do after the fact.
fn emit_aligned_jump<B: IrBuilder>(e: &mut Emitter<B>, target_const: Option<u64>, target_temp: Option<crate::ir::Temp>) {
    match (target_const, target_temp) {
        (Some(dest), None) => {
            if !e.rvc_enabled && dest & 0b11 != 0 {
                let bad = e.builder.const_temp(dest);
                e.builder.raise_exception_bad_addr(ExceptionCause::InstructionAddressMisaligned, bad);
            } else {
                e.builder.goto_tb(0, dest);
            }
        }
        (None, Some(t)) => {
            if !e.rvc_enabled {
                let two = e.builder.const_temp(0b11);
                let masked = e.builder.alu2(crate::ir::AluOp::And, t, two);
                let zero = e.builder.const_temp(0);
                let label_ok = e.builder.new_label();
                e.builder.branch(Cond::Eq, masked, zero, label_ok);
                e.builder.raise_exception_bad_addr(ExceptionCause::InstructionAddressMisaligned, t);
                e.builder.set_label(label_ok);
            }
            e.builder.set_pc_temp(t);
            e.builder.exit_tb();
        }
        _ => unreachable!("exactly one of target_const/target_temp is set"),
    }
}

/// One conditional branch (`BEQ`/`BNE`/`BLT`/`BGE`/`BLTU`/`BGEU`): branch to
/// a "taken" label on the condition, otherwise fall through to a
/// `goto_tb(1, pc + instr_len)` for the untaken path (spec §4.3).
pub fn emit_branch<B: IrBuilder>(e: &mut Emitter<B>, ctx: &mut DecoderContext, kind: BranchKind, rs1: u8, rs2: u8, imm: i32) {
    let lhs = e.builder.read_gpr(rs1);
    let rhs = e.builder.read_gpr(rs2);
    let taken = e.builder.new_label();
    e.builder.branch(branch_cond(kind), lhs, rhs, taken);
    e.builder.goto_tb(1, ctx.next_pc);
    e.builder.set_label(taken);
    let dest = (ctx.guest_pc as i64).wrapping_add(imm as i64) as u64;
    emit_aligned_jump(e, Some(dest), None);
    ctx.bstate = BlockState::Branch;
}

/// `JAL rd, imm`: the alignment check runs before the link-register write,
/// so a misaligned target faults without clobbering `rd` (spec §4.3 orders
/// the check ahead of the return-address write).
pub fn emit_jal<B: IrBuilder>(e: &mut Emitter<B>, ctx: &mut DecoderContext, rd: u8, imm: i32) {
    let dest = (ctx.guest_pc as i64).wrapping_add(imm as i64) as u64;
    if !e.rvc_enabled && dest & 0b11 != 0 {
        let bad = e.builder.const_temp(dest);
        e.builder.raise_exception_bad_addr(ExceptionCause::InstructionAddressMisaligned, bad);
    } else {
        let link = e.builder.const_temp(ctx.next_pc);
        e.builder.write_gpr(rd, link);
        e.builder.goto_tb(0, dest);
    }
    ctx.bstate = BlockState::Branch;
}

/// `JALR rd, rs1, imm`: data-dependent target, so this always exits the TB
/// (never chains) rather than using `goto_tb`.
pub fn emit_jalr<B: IrBuilder>(e: &mut Emitter<B>, ctx: &mut DecoderContext, rd: u8, rs1: u8, imm: i32) {
    let base = e.builder.read_gpr(rs1);
    let off = e.builder.const_temp(imm as i64 as u64);
    let raw_target = e.builder.alu2(crate::ir::AluOp::Add, base, off);
    let mask = e.builder.const_temp(!1u64);
    let target = e.builder.alu2(crate::ir::AluOp::And, raw_target, mask);

    let link = e.builder.const_temp(ctx.next_pc);
    e.builder.write_gpr(rd, link);

    emit_aligned_jump(e, None, Some(target));
    ctx.bstate = BlockState::Branch;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{HelperSymbol, Label, MemWidth, Temp};
    use crate::xlen::Xlen;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        WriteGpr(u8),
        RaiseBadAddr,
        GotoTb,
    }

    #[derive(Default)]
    struct RecordingBuilder {
        calls: Vec<Call>,
        next: u32,
    }

    impl RecordingBuilder {
        fn fresh(&mut self) -> Temp {
            self.next += 1;
            Temp(self.next)
        }
    }

    impl IrBuilder for RecordingBuilder {
        fn const_temp(&mut self, _value: u64) -> Temp {
            self.fresh()
        }
        fn mov(&mut self, _src: Temp) -> Temp {
            self.fresh()
        }
        fn sext32(&mut self, _src: Temp) -> Temp {
            self.fresh()
        }
        fn alu2(&mut self, _op: crate::ir::AluOp, _lhs: Temp, _rhs: Temp) -> Temp {
            self.fresh()
        }
        fn mulh(&mut self, _op: crate::ir::AluOp, _lhs: Temp, _rhs: Temp) -> Temp {
            self.fresh()
        }
        fn compare(&mut self, _cond: Cond, _lhs: Temp, _rhs: Temp) -> Temp {
            self.fresh()
        }
        fn cond_move(&mut self, _cond_temp: Temp, _if_true: Temp, _if_false: Temp) -> Temp {
            self.fresh()
        }
        fn load(&mut self, _addr: Temp, _width: MemWidth, _extend: crate::ir::Extend, _mem_index: u32) -> Temp {
            self.fresh()
        }
        fn store(&mut self, _addr: Temp, _value: Temp, _width: MemWidth, _mem_index: u32) {}
        fn new_label(&mut self) -> Label {
            Label(0)
        }
        fn set_label(&mut self, _label: Label) {}
        fn branch(&mut self, _cond: Cond, _lhs: Temp, _rhs: Temp, _target: Label) {}
        fn jump(&mut self, _target: Label) {}
        fn read_gpr(&mut self, _n: u8) -> Temp {
            self.fresh()
        }
        fn write_gpr(&mut self, n: u8, _value: Temp) {
            self.calls.push(Call::WriteGpr(n));
        }
        fn read_fpr(&mut self, _n: u8) -> Temp {
            self.fresh()
        }
        fn write_fpr(&mut self, _n: u8, _value: Temp) {}
        fn set_pc_const(&mut self, _pc: u64) {}
        fn set_pc_temp(&mut self, _value: Temp) {}
        fn goto_tb(&mut self, _slot: u8, _dest_pc: u64) {
            self.calls.push(Call::GotoTb);
        }
        fn exit_tb(&mut self) {}
        fn call_helper(&mut self, _helper: HelperSymbol, _args: &[Temp]) -> Option<Temp> {
            None
        }
        fn raise_exception(&mut self, _cause: crate::ir::ExceptionCause) {}
        fn raise_exception_bad_addr(&mut self, _cause: crate::ir::ExceptionCause, _bad_addr: Temp) {
            self.calls.push(Call::RaiseBadAddr);
        }
    }

    #[test]
    fn jal_misaligned_target_raises_without_writing_link_register() {
        let mut b = RecordingBuilder::default();
        let mut e = Emitter::new(&mut b, Xlen::Rv32, false);
        // guest_pc=0x1002, imm=8 -> dest=0x100A, misaligned with RVC off.
        let mut ctx = DecoderContext::new(0x1002, 4, 0, 0, false);
        emit_jal(&mut e, &mut ctx, 1, 8);
        assert_eq!(b.calls, vec![Call::RaiseBadAddr], "no link write on the faulting path");
    }

    #[test]
    fn jal_aligned_target_writes_link_then_chains() {
        let mut b = RecordingBuilder::default();
        let mut e = Emitter::new(&mut b, Xlen::Rv32, false);
        let mut ctx = DecoderContext::new(0x1000, 4, 0, 0, false);
        emit_jal(&mut e, &mut ctx, 1, 8);
        assert_eq!(b.calls, vec![Call::WriteGpr(1), Call::GotoTb]);
    }
}
