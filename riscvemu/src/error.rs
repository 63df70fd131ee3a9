//! Error types for the decoder, emitter and TB builder.
//!
//! Mirrors the `DecodeError`/`ExecutionError`/`Trap` hierarchy of
//! `riscvemu/src/hart.rs`; split here into a decode-time error (recoverable
//! — the decoder returns it, and the caller emits an Illegal-Instruction
//! sequence and continues translating per spec §7) and an emit-time error
//! (a host invariant violation, which spec §7 calls fatal).

use thiserror::Error;

/// Failure to decode a 16- or 32-bit guest opcode word into an operation.
///
/// A `DecodeError` is not itself fatal: per spec §4.2/§7 the caller reacts by
/// emitting an Illegal-Instruction exception raise and setting the block
/// state to `STOP`, then continues translating subsequent blocks normally.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("reserved or unimplemented opcode 0x{0:02x}")]
    ReservedOpcode(u32),
    #[error("reserved funct3/funct7/funct12 combination for opcode 0x{opcode:02x}")]
    ReservedFunct { opcode: u32 },
    #[error("shift amount {shamt} is not legal for XLEN={xlen_bits}")]
    ShiftAmountOutOfRange { shamt: u32, xlen_bits: u32 },
    #[error("RV64-only encoding used while targeting RV32")]
    Rv64OnlyOnRv32,
    #[error("reserved compressed-instruction quadrant/funct3 combination 0x{0:04x}")]
    ReservedCompressed(u16),
    #[error("compressed instruction used rd'=x0, which these C-forms forbid")]
    CompressedRdZero,
}

/// A host-side invariant the emitter is required to uphold was violated.
///
/// Per spec §7 this indicates an emitter bug, never a malformed guest
/// program; callers should treat it as fatal and abort translation of the
/// block (and, in a real engine, the process) rather than attempt recovery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("temp-allocator leak detected at guest pc 0x{guest_pc:x}: {detail}")]
    TempLeak { guest_pc: u64, detail: String },
    #[error("host IR buffer is full while translating guest pc 0x{guest_pc:x}")]
    BufferFull { guest_pc: u64 },
}

/// Errors surfaced by the vector-helper layer (spec §4.3 "Vector helpers").
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VectorError {
    #[error("vector extension disabled (mstatus.VS == 0)")]
    VectorDisabled,
    #[error("vector register index {index} is not aligned to LMUL group size {group_size}")]
    MisalignedIndex { index: u8, group_size: u8 },
    #[error("unsupported vsew value {0} (must be 8, 16, 32 or 64)")]
    UnsupportedSew(u32),
    #[error("vcompress.vm requires vstart == 0, got {0}")]
    CompressRequiresZeroVstart(u32),
}

/// Errors surfaced fetching guest code for translation (spec §6 `fetch_u32`).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    #[error("page fault fetching guest instruction at pc 0x{0:x}")]
    PageFault(u64),
}
