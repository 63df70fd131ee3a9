//! A text-dumping [`IrBuilder`]: the only concrete implementation shipped in
//! this workspace (spec §6/§9 — the real code-generating back-end is
//! external and unmodeled). Every call appends one line of pseudo-assembly
//! to an internal buffer; `take_lines` drains it between translation blocks.

use riscvemu::ir::{AluOp, Cond, Extend, ExceptionCause, HelperSymbol, IrBuilder, Label, MemWidth, Temp};

#[derive(Default)]
pub struct TextIrBuilder {
    lines: Vec<String>,
    next_temp: u32,
    next_label: u32,
}

impl TextIrBuilder {
    pub fn new() -> Self {
        TextIrBuilder::default()
    }

    fn fresh(&mut self) -> Temp {
        self.next_temp += 1;
        Temp(self.next_temp)
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

impl IrBuilder for TextIrBuilder {
    fn const_temp(&mut self, value: u64) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = const 0x{value:x}"));
        t
    }

    fn mov(&mut self, src: Temp) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = mov {src}"));
        t
    }

    fn sext32(&mut self, src: Temp) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = sext32 {src}"));
        t
    }

    fn alu2(&mut self, op: AluOp, lhs: Temp, rhs: Temp) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = {op:?} {lhs}, {rhs}"));
        t
    }

    fn mulh(&mut self, op: AluOp, lhs: Temp, rhs: Temp) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = mulh.{op:?} {lhs}, {rhs}"));
        t
    }

    fn compare(&mut self, cond: Cond, lhs: Temp, rhs: Temp) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = cmp.{cond:?} {lhs}, {rhs}"));
        t
    }

    fn cond_move(&mut self, cond_temp: Temp, if_true: Temp, if_false: Temp) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = condmove {cond_temp} ? {if_true} : {if_false}"));
        t
    }

    fn load(&mut self, addr: Temp, width: MemWidth, extend: Extend, mem_index: u32) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = load.{width:?}.{extend:?} [{addr}] (mem={mem_index})"));
        t
    }

    fn store(&mut self, addr: Temp, value: Temp, width: MemWidth, mem_index: u32) {
        self.lines.push(format!("store.{width:?} [{addr}], {value} (mem={mem_index})"));
    }

    fn new_label(&mut self) -> Label {
        self.next_label += 1;
        Label(self.next_label)
    }

    fn set_label(&mut self, label: Label) {
        self.lines.push(format!("{label}:"));
    }

    fn branch(&mut self, cond: Cond, lhs: Temp, rhs: Temp, target: Label) {
        self.lines.push(format!("br.{cond:?} {lhs}, {rhs}, {target}"));
    }

    fn jump(&mut self, target: Label) {
        self.lines.push(format!("jmp {target}"));
    }

    fn read_gpr(&mut self, n: u8) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = read_gpr x{n}"));
        t
    }

    fn write_gpr(&mut self, n: u8, value: Temp) {
        if n != 0 {
            self.lines.push(format!("write_gpr x{n}, {value}"));
        }
    }

    fn read_fpr(&mut self, n: u8) -> Temp {
        let t = self.fresh();
        self.lines.push(format!("{t} = read_fpr f{n}"));
        t
    }

    fn write_fpr(&mut self, n: u8, value: Temp) {
        self.lines.push(format!("write_fpr f{n}, {value}"));
    }

    fn set_pc_const(&mut self, pc: u64) {
        self.lines.push(format!("set_pc 0x{pc:x}"));
    }

    fn set_pc_temp(&mut self, value: Temp) {
        self.lines.push(format!("set_pc {value}"));
    }

    fn goto_tb(&mut self, slot: u8, dest_pc: u64) {
        self.lines.push(format!("goto_tb[{slot}] 0x{dest_pc:x}"));
    }

    fn exit_tb(&mut self) {
        self.lines.push("exit_tb".to_string());
    }

    fn call_helper(&mut self, helper: HelperSymbol, args: &[Temp]) -> Option<Temp> {
        let t = self.fresh();
        let arglist = args.iter().map(Temp::to_string).collect::<Vec<_>>().join(", ");
        self.lines.push(format!("{t} = call {helper}({arglist})"));
        Some(t)
    }

    fn raise_exception(&mut self, cause: ExceptionCause) {
        self.lines.push(format!("raise {cause:?}"));
    }

    fn raise_exception_bad_addr(&mut self, cause: ExceptionCause, bad_addr: Temp) {
        self.lines.push(format!("raise {cause:?}, addr={bad_addr}"));
    }
}
