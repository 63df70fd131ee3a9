//! Loads, stores, and non-atomic atomics (spec §4.3 "Loads and stores",
//! "Atomics (A-extension)").

use super::{DecoderContext, Emitter};
use crate::decode::{AmoKind, FpWidth, LoadKind, StoreKind};
use crate::ir::{AluOp, Cond, Extend, ExceptionCause, IrBuilder, MemWidth};

fn load_shape(kind: LoadKind) -> (MemWidth, Extend) {
    match kind {
        LoadKind::Lb => (MemWidth::Byte, Extend::Sign),
        LoadKind::Lh => (MemWidth::Half, Extend::Sign),
        LoadKind::Lw => (MemWidth::Word, Extend::Sign),
        LoadKind::Ld => (MemWidth::Double, Extend::Sign),
        LoadKind::Lbu => (MemWidth::Byte, Extend::Zero),
        LoadKind::Lhu => (MemWidth::Half, Extend::Zero),
        LoadKind::Lwu => (MemWidth::Word, Extend::Zero),
    }
}

fn store_width(kind: StoreKind) -> MemWidth {
    match kind {
        StoreKind::Sb => MemWidth::Byte,
        StoreKind::Sh => MemWidth::Half,
        StoreKind::Sw => MemWidth::Word,
        StoreKind::Sd => MemWidth::Double,
    }
}

/// `LB/LH/LW/LD/LBU/LHU/LWU rd, imm(rs1)`: `addr = rs1 + sext(imm)`, PC is
/// set before the memory op so a faulting access reports the right PC.
pub fn emit_load<B: IrBuilder>(e: &mut Emitter<B>, ctx: &DecoderContext, kind: LoadKind, rd: u8, rs1: u8, imm: i32) {
    let base = e.builder.read_gpr(rs1);
    let off = e.builder.const_temp(imm as i64 as u64);
    let addr = e.builder.alu2(AluOp::Add, base, off);
    e.builder.set_pc_const(ctx.guest_pc);
    let (width, extend) = load_shape(kind);
    let value = e.builder.load(addr, width, extend, ctx.mem_index);
    e.builder.write_gpr(rd, value);
}

/// `SB/SH/SW/SD rs2, imm(rs1)`.
pub fn emit_store<B: IrBuilder>(e: &mut Emitter<B>, ctx: &DecoderContext, kind: StoreKind, rs1: u8, rs2: u8, imm: i32) {
    let base = e.builder.read_gpr(rs1);
    let off = e.builder.const_temp(imm as i64 as u64);
    let addr = e.builder.alu2(AluOp::Add, base, off);
    let value = e.builder.read_gpr(rs2);
    e.builder.set_pc_const(ctx.guest_pc);
    e.builder.store(addr, value, store_width(kind), ctx.mem_index);
}

/// `mstatus.FS` guard shared by FP loads/stores and every FP-arithmetic
/// emit routine (spec §4.3 "additionally guard on `mstatus.FS != 0`").
pub fn emit_fs_guard<B: IrBuilder>(e: &mut Emitter<B>) {
    let csr_addr = e.builder.const_temp(crate::csr::CsrAddress::MSTATUS.0 as u64);
    let set_mask = e.builder.const_temp(0);
    let mstatus = e.builder.call_helper(crate::ir::HelperSymbol::CsrRs, &[csr_addr, set_mask]);
    let mstatus = mstatus.expect("CsrRs helper always yields the prior CSR value");
    let mask = e.builder.const_temp(crate::csr::MSTATUS_FS_MASK);
    let fs = e.builder.alu2(AluOp::And, mstatus, mask);
    let zero = e.builder.const_temp(0);
    let ok = e.builder.new_label();
    e.builder.branch(Cond::Ne, fs, zero, ok);
    e.builder.raise_exception(ExceptionCause::IllegalInstruction);
    e.builder.set_label(ok);
}

pub fn emit_fp_load<B: IrBuilder>(e: &mut Emitter<B>, ctx: &DecoderContext, width: FpWidth, rd: u8, rs1: u8, imm: i32) {
    emit_fs_guard(e);
    let base = e.builder.read_gpr(rs1);
    let off = e.builder.const_temp(imm as i64 as u64);
    let addr = e.builder.alu2(AluOp::Add, base, off);
    e.builder.set_pc_const(ctx.guest_pc);
    let mem_width = match width {
        FpWidth::Single => MemWidth::Word,
        FpWidth::Double => MemWidth::Double,
    };
    let value = e.builder.load(addr, mem_width, Extend::Zero, ctx.mem_index);
    e.builder.write_fpr(rd, value);
}

pub fn emit_fp_store<B: IrBuilder>(e: &mut Emitter<B>, ctx: &DecoderContext, width: FpWidth, rs1: u8, rs2: u8, imm: i32) {
    emit_fs_guard(e);
    let base = e.builder.read_gpr(rs1);
    let off = e.builder.const_temp(imm as i64 as u64);
    let addr = e.builder.alu2(AluOp::Add, base, off);
    let value = e.builder.read_fpr(rs2);
    e.builder.set_pc_const(ctx.guest_pc);
    let mem_width = match width {
        FpWidth::Single => MemWidth::Word,
        FpWidth::Double => MemWidth::Double,
    };
    e.builder.store(addr, value, mem_width, ctx.mem_index);
}

/// Atomics, lowered to non-atomic load-then-store sequences (spec §4.3:
/// "a deliberate simplification... a correct implementation must replace
/// it with an atomic primitive" — see DESIGN.md for the tracked hazard).
pub fn emit_amo<B: IrBuilder>(
    e: &mut Emitter<B>,
    ctx: &DecoderContext,
    kind: AmoKind,
    width: MemWidth,
    rd: u8,
    rs1: u8,
    rs2: u8,
    _aq: bool,
    _rl: bool,
) {
    let addr = e.builder.read_gpr(rs1);
    match kind {
        AmoKind::Lr => {
            // Not atomic: a plain load.
            e.builder.set_pc_const(ctx.guest_pc);
            let v = e.builder.load(addr, width, Extend::Sign, ctx.mem_index);
            e.builder.write_gpr(rd, v);
        }
        AmoKind::Sc => {
            // Not atomic: a plain store, unconditionally reporting success.
            let v = e.builder.read_gpr(rs2);
            e.builder.set_pc_const(ctx.guest_pc);
            e.builder.store(addr, v, width, ctx.mem_index);
            let zero = e.builder.const_temp(0);
            e.builder.write_gpr(rd, zero);
        }
        AmoKind::Swap | AmoKind::Add | AmoKind::Xor | AmoKind::And | AmoKind::Or => {
            e.builder.set_pc_const(ctx.guest_pc);
            let pre = e.builder.load(addr, width, Extend::Sign, ctx.mem_index);
            let rs2v = e.builder.read_gpr(rs2);
            let new_value = match kind {
                AmoKind::Swap => rs2v,
                AmoKind::Add => e.builder.alu2(AluOp::Add, pre, rs2v),
                AmoKind::Xor => e.builder.alu2(AluOp::Xor, pre, rs2v),
                AmoKind::And => e.builder.alu2(AluOp::And, pre, rs2v),
                AmoKind::Or => e.builder.alu2(AluOp::Or, pre, rs2v),
                _ => unreachable!(),
            };
            e.builder.set_pc_const(ctx.guest_pc);
            e.builder.store(addr, new_value, width, ctx.mem_index);
            e.builder.write_gpr(rd, pre);
        }
        AmoKind::Min | AmoKind::Max | AmoKind::Minu | AmoKind::Maxu => {
            // Skip the store when the predicate fails, via a `done` label
            // (spec §4.3); `done` still writes `rd = pre-op value`.
            e.builder.set_pc_const(ctx.guest_pc);
            let pre = e.builder.load(addr, width, Extend::Sign, ctx.mem_index);
            let rs2v = e.builder.read_gpr(rs2);
            let cond = match kind {
                AmoKind::Min => Cond::LtS,
                AmoKind::Max => Cond::GeS,
                AmoKind::Minu => Cond::LtU,
                AmoKind::Maxu => Cond::GeU,
                _ => unreachable!(),
            };
            let done = e.builder.new_label();
            e.builder.branch(cond, pre, rs2v, done);
            e.builder.set_pc_const(ctx.guest_pc);
            e.builder.store(addr, rs2v, width, ctx.mem_index);
            e.builder.set_label(done);
            e.builder.write_gpr(rd, pre);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Cond as IrCond, ExceptionCause, HelperSymbol, Label, Temp};
    use crate::xlen::Xlen;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        SetPcConst(u64),
        Load(u32),
        Store(u32),
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
        fn alu2(&mut self, _op: AluOp, _lhs: Temp, _rhs: Temp) -> Temp {
            self.fresh()
        }
        fn mulh(&mut self, _op: AluOp, _lhs: Temp, _rhs: Temp) -> Temp {
            self.fresh()
        }
        fn compare(&mut self, _cond: IrCond, _lhs: Temp, _rhs: Temp) -> Temp {
            self.fresh()
        }
        fn cond_move(&mut self, _cond_temp: Temp, _if_true: Temp, _if_false: Temp) -> Temp {
            self.fresh()
        }
        fn load(&mut self, _addr: Temp, _width: MemWidth, _extend: Extend, mem_index: u32) -> Temp {
            self.calls.push(Call::Load(mem_index));
            self.fresh()
        }
        fn store(&mut self, _addr: Temp, _value: Temp, _width: MemWidth, mem_index: u32) {
            self.calls.push(Call::Store(mem_index));
        }
        fn new_label(&mut self) -> Label {
            Label(0)
        }
        fn set_label(&mut self, _label: Label) {}
        fn branch(&mut self, _cond: IrCond, _lhs: Temp, _rhs: Temp, _target: Label) {}
        fn jump(&mut self, _target: Label) {}
        fn read_gpr(&mut self, _n: u8) -> Temp {
            self.fresh()
        }
        fn write_gpr(&mut self, _n: u8, _value: Temp) {}
        fn read_fpr(&mut self, _n: u8) -> Temp {
            self.fresh()
        }
        fn write_fpr(&mut self, _n: u8, _value: Temp) {}
        fn set_pc_const(&mut self, pc: u64) {
            self.calls.push(Call::SetPcConst(pc));
        }
        fn set_pc_temp(&mut self, _value: Temp) {}
        fn goto_tb(&mut self, _slot: u8, _dest_pc: u64) {}
        fn exit_tb(&mut self) {}
        fn call_helper(&mut self, _helper: HelperSymbol, _args: &[Temp]) -> Option<Temp> {
            None
        }
        fn raise_exception(&mut self, _cause: ExceptionCause) {}
        fn raise_exception_bad_addr(&mut self, _cause: ExceptionCause, _bad_addr: Temp) {}
    }

    #[test]
    fn amo_add_sets_pc_before_load_and_store_with_context_mem_index() {
        let mut b = RecordingBuilder::default();
        let mut e = Emitter::new(&mut b, Xlen::Rv64, true);
        let ctx = DecoderContext::new(0x4000, 4, 0, 7, false);
        emit_amo(&mut e, &ctx, AmoKind::Add, MemWidth::Word, 3, 1, 2, false, false);
        assert_eq!(b.calls[0], Call::SetPcConst(0x4000));
        assert!(matches!(b.calls[1], Call::Load(7)));
        assert!(b.calls.iter().any(|c| *c == Call::SetPcConst(0x4000) && matches!(c, Call::SetPcConst(_))));
        let store_idx = b.calls.iter().position(|c| matches!(c, Call::Store(_))).expect("must store");
        assert!(matches!(b.calls[store_idx], Call::Store(7)));
        assert!(matches!(b.calls[store_idx - 1], Call::SetPcConst(0x4000)));
    }

    #[test]
    fn lr_sets_pc_before_its_load() {
        let mut b = RecordingBuilder::default();
        let mut e = Emitter::new(&mut b, Xlen::Rv64, true);
        let ctx = DecoderContext::new(0x8008, 4, 0, 2, false);
        emit_amo(&mut e, &ctx, AmoKind::Lr, MemWidth::Double, 5, 1, 0, false, false);
        assert_eq!(b.calls, vec![Call::SetPcConst(0x8008), Call::Load(2)]);
    }
}
