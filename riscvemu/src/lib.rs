#![forbid(unsafe_code)]

//! RISC-V guest-to-host translation frontend.
//!
//! This crate decodes a stream of RISC-V guest instructions and emits an
//! intermediate representation (IR) of host-side micro-operations for an
//! external back-end to lower to native code, one translation block (TB) at
//! a time. It does not execute guest code and does not itself generate
//! native machine code; see [`ir::IrBuilder`] for the seam where a real
//! back-end plugs in.

pub mod bits;
pub mod csr;
pub mod decode;
pub mod emit;
pub mod error;
pub mod helpers;
pub mod ir;
pub mod tb;
pub mod vector;
pub mod xlen;

pub use error::{DecodeError, EmitError};
pub use xlen::Xlen;
